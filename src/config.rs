use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    /// Base URL this service is reachable at; embedded in outbound requests
    /// as the webhook notification target.
    pub public_base_url: String,
    pub processor: ProcessorConfig,
}

/// Credentials and mode for the payment processor's REST API. All values are
/// supplied externally; nothing here is derived.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub api_url: String,
    pub api_key: String,
    pub locale: String,
    pub test_mode: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok(); // Load .env file if present

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        require_url("PUBLIC_BASE_URL", &public_base_url)?;

        let processor_api_url = env::var("PROCESSOR_API_URL")?;
        require_url("PROCESSOR_API_URL", &processor_api_url)?;

        Ok(Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL")?,
            public_base_url,
            processor: ProcessorConfig {
                api_url: processor_api_url,
                api_key: env::var("PROCESSOR_API_KEY")?,
                locale: env::var("PROCESSOR_LOCALE").unwrap_or_else(|_| "en_US".to_string()),
                test_mode: env::var("PROCESSOR_TEST_MODE")
                    .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                    .unwrap_or(false),
            },
        })
    }
}

fn require_url(name: &str, value: &str) -> Result<()> {
    url::Url::parse(value).with_context(|| format!("{name} is not a valid URL"))?;
    Ok(())
}
