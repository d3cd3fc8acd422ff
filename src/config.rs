// src/config.rs
use std::env;
use thiserror::Error;

const DEV_JWT_SECRET: &str = "default_secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                tracing::warn!("JWT_SECRET not set. Falling back to the development secret; run generate_jwt_secret for production.");
                DEV_JWT_SECRET.to_string()
            }
        };

        let openai_api_key = env::var("OPENAI_API_KEY").ok().filter(|key| !key.is_empty());
        if openai_api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY not found. The chat relay will report that it is not configured.");
        }

        Ok(Self {
            database_url,
            jwt_secret,
            openai_api_key,
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        })
    }
}
