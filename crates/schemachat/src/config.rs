// schemachat/crates/schemachat/src/config.rs

use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    pub llm_timeout_seconds: u64,
    pub database_url: String,
    pub auth_base_url: String,
    pub auth_timeout_seconds: u64,
    pub api_host: String,
    pub api_port: u16,
    pub request_timeout_seconds: u64,
    pub cors_allowed_origins: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            warn!("Failed to load .env file: {}. Using system environment variables.", e);
        } else {
            info!("Loaded environment variables from .env file");
        }

        let openai_api_key = env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable not set")?;
        if openai_api_key.trim().is_empty() {
            anyhow::bail!("OPENAI_API_KEY is empty");
        }

        let auth_base_url = env::var("AUTH_BASE_URL")
            .context("AUTH_BASE_URL environment variable not set")?;
        Self::check_http_url("AUTH_BASE_URL", &auth_base_url)?;

        let llm_base_url = env::var("LLM_BASE_URL").unwrap_or_else(|_| "https://api.openai.com".into());
        Self::check_http_url("LLM_BASE_URL", &llm_base_url)?;

        let llm_temperature: f32 = parse_var("LLM_TEMPERATURE", "0.7")?;
        if !(0.0..=2.0).contains(&llm_temperature) {
            anyhow::bail!("LLM_TEMPERATURE must be between 0 and 2, got {}", llm_temperature);
        }

        Ok(Self {
            openai_api_key,
            llm_base_url,
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4-turbo-preview".into()),
            llm_temperature,
            llm_max_tokens: parse_var("LLM_MAX_TOKENS", "1000")?,
            llm_timeout_seconds: parse_var("LLM_TIMEOUT_SECONDS", "120")?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://./data/projects.db".into()),
            auth_base_url,
            auth_timeout_seconds: parse_var("AUTH_TIMEOUT_SECONDS", "10")?,
            api_host: env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            api_port: parse_var("API_PORT", "8000")?,
            request_timeout_seconds: parse_var("REQUEST_TIMEOUT_SECONDS", "180")?,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .filter(|origins| !origins.trim().is_empty()),
        })
    }

    fn check_http_url(name: &str, value: &str) -> Result<()> {
        if value.starts_with("http://") || value.starts_with("https://") {
            Ok(())
        } else {
            Err(anyhow::anyhow!("{} must be an http(s) URL, got: {}", name, value))
        }
    }

    /// Secrets are never printed.
    pub fn print_config(&self) {
        info!("Current Configuration:");
        info!("- API: {}:{}", self.api_host, self.api_port);
        info!("- LLM Endpoint: {}", self.llm_base_url);
        info!("- LLM Model: {}", self.llm_model);
        info!("- LLM Temperature: {}", self.llm_temperature);
        info!("- LLM Max Tokens: {}", self.llm_max_tokens);
        info!("- LLM Timeout: {}s", self.llm_timeout_seconds);
        info!("- Database: {}", self.database_url);
        info!("- Identity Service: {}", self.auth_base_url);
        info!("- Request Timeout: {}s", self.request_timeout_seconds);
        match &self.cors_allowed_origins {
            Some(origins) => info!("- CORS Origins: {}", origins),
            None => info!("- CORS Origins: any"),
        }
    }

    pub fn api_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.api_host, self.api_port)
            .parse()
            .with_context(|| format!("Invalid API address {}:{}", self.api_host, self.api_port))
    }
}

fn parse_var<T>(name: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse()
        .with_context(|| format!("Invalid value for {}: {}", name, raw))
}
