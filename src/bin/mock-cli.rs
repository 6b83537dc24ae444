use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "mock-cli")]
#[command(about = "Management CLI for the mock API server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8787")]
    url: String,

    #[arg(short, long, env = "MOCK_ADMIN_KEY", default_value = "dev")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server status and active project
    Status,
    /// List compiled routes and their scenarios
    Routes,
    /// Print the OpenAPI outline of the active routes
    Openapi,
    /// Import a mock document (JSON or YAML)
    Import {
        /// Path to the document
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert("x-admin-key", HeaderValue::from_str(&cli.key)?);

    let res = match cli.command {
        Commands::Status => {
            client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Routes => {
            client
                .get(format!("{}/admin/routes", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Openapi => {
            client
                .get(format!("{}/admin/openapi", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Import { file } => {
            let content_type = match file.extension().and_then(|e| e.to_str()) {
                Some("yaml") | Some("yml") => "application/yaml",
                _ => "application/json",
            };
            let body = tokio::fs::read(&file).await?;
            client
                .post(format!("{}/admin/import", cli.url))
                .headers(headers)
                .header(CONTENT_TYPE, content_type)
                .body(body)
                .send()
                .await?
        }
    };
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
