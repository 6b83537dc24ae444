//! Path template compilation.
//!
//! # Responsibilities
//! - Turn `/users/:id/orders` into an anchored pattern
//! - Record parameter names in template order
//! - Match concrete request paths and return captures
//!
//! # Design Decisions
//! - A parameter captures exactly one segment (never `/`)
//! - Literal segments are regex-escaped
//! - Templates and paths get a single leading slash before use
//! - No match is `None`, not an error

use regex::Regex;
use thiserror::Error;

/// Errors produced while compiling a path template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty parameter name in segment {0}")]
    EmptyParameter(usize),

    #[error("duplicate parameter name '{0}'")]
    DuplicateParameter(String),

    #[error("invalid pattern: {0}")]
    Pattern(String),
}

/// Compiled form of a path template.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    pattern: Regex,
    param_names: Vec<String>,
}

impl PathMatcher {
    /// Compile a template using the leading-colon parameter convention.
    pub fn compile(template: &str) -> Result<Self, PathError> {
        let normalized = normalize_path(template);
        let mut param_names: Vec<String> = Vec::new();
        let mut pattern = String::from("^");

        for (i, segment) in normalized[1..].split('/').enumerate() {
            pattern.push('/');
            match segment.strip_prefix(':') {
                Some(name) => {
                    if name.is_empty() {
                        return Err(PathError::EmptyParameter(i));
                    }
                    if param_names.iter().any(|n| n == name) {
                        return Err(PathError::DuplicateParameter(name.to_string()));
                    }
                    param_names.push(name.to_string());
                    pattern.push_str("([^/]+)");
                }
                None => pattern.push_str(&regex::escape(segment)),
            }
        }
        pattern.push('$');

        let pattern = Regex::new(&pattern).map_err(|e| PathError::Pattern(e.to_string()))?;
        Ok(Self {
            pattern,
            param_names,
        })
    }

    /// Parameter names, aligned with the values returned by [`Self::captures`].
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Match a request path, returning captured values in template order.
    pub fn captures(&self, path: &str) -> Option<Vec<String>> {
        let normalized = normalize_path(path);
        let caps = self.pattern.captures(&normalized)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect(),
        )
    }

    /// Match a request path, pairing each capture with its parameter name.
    pub fn match_params(&self, path: &str) -> Option<Vec<(String, String)>> {
        let values = self.captures(path)?;
        Some(self.param_names.iter().cloned().zip(values).collect())
    }
}

/// Collapse any leading slashes into exactly one.
pub fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}
