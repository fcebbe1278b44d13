use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::document::TemplateMode;

/// Application configuration loaded from environment variables.
/// Fails at startup if the service credential is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    /// Root under which each run gets its own `<output_file_name>/` directory.
    pub output_root: PathBuf,
    pub checkpoint_database_url: String,
    pub pandoc_bin: String,
    /// Invoked as `<bin> <input.html> <output.pdf>`.
    pub html_renderer_bin: String,
    pub template_mode: TemplateMode,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let template_mode = match std::env::var("TEMPLATE_MODE") {
            Ok(raw) => raw
                .parse::<TemplateMode>()
                .map_err(anyhow::Error::msg)
                .context("TEMPLATE_MODE must be 'sections' or 'placeholders'")?,
            Err(_) => TemplateMode::Sections,
        };

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            output_root: std::env::var("OUTPUT_ROOT")
                .unwrap_or_else(|_| "output".to_string())
                .into(),
            checkpoint_database_url: std::env::var("CHECKPOINT_DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://output/sessions.db".to_string()),
            pandoc_bin: std::env::var("PANDOC_BIN").unwrap_or_else(|_| "pandoc".to_string()),
            html_renderer_bin: std::env::var("HTML_RENDERER_BIN")
                .unwrap_or_else(|_| "weasyprint".to_string()),
            template_mode,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
        })
    }
}

/// `RUST_LOG`, read ahead of `Config` so every subcommand logs the same way.
pub fn log_level() -> String {
    std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
}

fn require_env(key: &str) -> Result<String> {
    let value = std::env::var(key)
        .with_context(|| format!("Required environment variable '{key}' is not set"))?;
    if value.trim().is_empty() {
        anyhow::bail!("Required environment variable '{key}' is empty");
    }
    Ok(value)
}
