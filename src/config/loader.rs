//! Configuration loading from disk and from request bodies.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::document::MockDocument;
use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `admin.api_key`.
pub const ADMIN_KEY_ENV: &str = "MOCK_ADMIN_KEY";

/// Error type for server configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Error type for mock document parsing.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("parse yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("document is empty")]
    Empty,
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: ServerConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply environment overrides on top of file or default configuration.
pub fn apply_env_overrides(config: &mut ServerConfig) {
    if let Ok(key) = std::env::var(ADMIN_KEY_ENV) {
        if !key.trim().is_empty() {
            config.admin.api_key = key;
        }
    }
}

/// Parse a mock document from raw bytes.
///
/// A content type mentioning YAML forces YAML. Anything else is tried as
/// JSON first and then as YAML; the YAML error is reported when both fail.
pub fn parse_document(raw: &[u8], content_type: Option<&str>) -> Result<MockDocument, DocumentError> {
    // A truncated file mid-write must not replace the active routes.
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(DocumentError::Empty);
    }

    let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
    if content_type.contains("yaml") || content_type.contains("yml") {
        return Ok(serde_yaml::from_slice(raw)?);
    }

    match serde_json::from_slice(raw) {
        Ok(doc) => Ok(doc),
        Err(json_err) => {
            tracing::debug!(error = %json_err, "Document is not JSON, trying YAML");
            Ok(serde_yaml::from_slice(raw)?)
        }
    }
}

/// Load a mock document from disk, using the file extension as a hint.
pub fn load_document(path: &Path) -> Result<MockDocument, DocumentError> {
    let raw = fs::read(path)?;
    let hint = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => Some("application/yaml"),
        _ => None,
    };
    parse_document(&raw, hint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[listener]
bind_address = "127.0.0.1:9000"

[observability]
log_format = "json"

[mock]
document = "mocks.yaml"
watch = true
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.timeouts.request_secs, 30);
        assert_eq!(config.observability.log_format, crate::config::schema::LogFormat::Json);
        assert_eq!(config.mock.document.as_deref(), Some("mocks.yaml"));
    }

    #[test]
    fn test_parse_document_rejects_empty_input() {
        let inputs: [&[u8]; 2] = [b"", b"   \n\t"];
        for raw in inputs {
            assert!(matches!(
                parse_document(raw, Some("application/yaml")),
                Err(DocumentError::Empty)
            ));
            assert!(matches!(parse_document(raw, None), Err(DocumentError::Empty)));
        }

        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        assert!(matches!(load_document(file.path()), Err(DocumentError::Empty)));
    }

    #[test]
    fn test_load_config_rejects_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[listener]\nbind_address = \"bogus\"").unwrap();

        match load_config(file.path()) {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 1),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_document_json_then_yaml() {
        let json = br#"{"project": "a", "routes": []}"#;
        assert_eq!(parse_document(json, None).unwrap().project, "a");

        let yaml = b"project: b\nroutes: []\n";
        assert_eq!(parse_document(yaml, Some("text/plain")).unwrap().project, "b");
        assert_eq!(parse_document(yaml, Some("application/x-yaml")).unwrap().project, "b");
    }

    #[test]
    fn test_parse_document_reports_yaml_error() {
        let err = parse_document(b"routes: [unclosed", None).unwrap_err();
        assert!(matches!(err, DocumentError::Yaml(_)));
    }

    #[test]
    fn test_load_document_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "project: from-disk").unwrap();

        let doc = load_document(file.path()).unwrap();
        assert_eq!(doc.project, "from-disk");
    }
}
