use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;
use std::env;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_ENVIRONMENT: &str = "local";

/// Settings shared by every service: where to bind.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Config {
    /// Load `.env` files for the active environment, then read `HOST` and `PORT`.
    ///
    /// Precedence (lowest first): built-in defaults, an optional
    /// `configuration.{yaml,toml,json}` file, then the environment.
    pub fn load() -> Result<Self, AppError> {
        load_env_files();
        Self::from_sources(env::var("HOST").ok(), env::var("PORT").ok())
    }

    fn from_sources(host: Option<String>, port: Option<String>) -> Result<Self, AppError> {
        let config = Cfg::builder()
            .set_default("host", DEFAULT_HOST)?
            .set_default("port", i64::from(DEFAULT_PORT))?
            .add_source(File::with_name("configuration").required(false))
            .set_override_option("host", host)?
            .set_override_option("port", port)?
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Name of the active environment, from `ENVIRONMENT` (or `NODE_ENV`), defaulting to `local`.
pub fn environment() -> String {
    env::var("ENVIRONMENT")
        .or_else(|_| env::var("NODE_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENVIRONMENT.to_string())
}

pub fn is_production() -> bool {
    matches!(environment().as_str(), "prod" | "production")
}

/// Load `.env.{environment}` then `.env`. Variables already set win.
pub fn load_env_files() {
    let environment = environment();
    if dotenvy::from_filename(format!(".env.{}", environment)).is_ok() {
        tracing::debug!(environment = %environment, "Loaded environment file");
    }
    dotenvy::dotenv().ok();
}
