//! Server configuration
//!
//! Loaded from environment variables (a `.env` file is honored) with
//! defaults suitable for local development.

use anyhow::{bail, Result};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://darkroom.db";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 3600;

pub const DEFAULT_MAX_CONCURRENT_PROCESSES: usize = 3;

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Allowed origins; a single "*" entry allows any origin
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
    pub max_age_secs: u64,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on concurrently processing jobs
    pub max_concurrent: usize,
}

impl Config {
    /// Load configuration from the environment
    ///
    /// Recognized variables: `SERVER_HOST`, `SERVER_PORT`,
    /// `SHUTDOWN_TIMEOUT`, `DATABASE_URL`, `DB_MAX_CONNECTIONS`,
    /// `DB_CONNECT_TIMEOUT`, `CORS_ALLOWED_ORIGINS`,
    /// `CORS_ALLOW_CREDENTIALS`, `CORS_MAX_AGE`, `MAX_CONCURRENT_PROCESSES`.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let server = ServerConfig {
            host: env_or("SERVER_HOST", DEFAULT_HOST),
            port: parse_env("SERVER_PORT", DEFAULT_PORT)?,
            shutdown_timeout_secs: parse_env("SHUTDOWN_TIMEOUT", DEFAULT_SHUTDOWN_TIMEOUT_SECS)?,
        };

        let database = DatabaseConfig {
            url: env_or("DATABASE_URL", DEFAULT_DATABASE_URL),
            max_connections: parse_env("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            connect_timeout_secs: parse_env("DB_CONNECT_TIMEOUT", DEFAULT_DB_CONNECT_TIMEOUT_SECS)?,
        };

        let cors = CorsConfig {
            allowed_origins: env_or("CORS_ALLOWED_ORIGINS", "*")
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            allow_credentials: parse_env("CORS_ALLOW_CREDENTIALS", false)?,
            max_age_secs: parse_env("CORS_MAX_AGE", DEFAULT_CORS_MAX_AGE_SECS)?,
        };

        let pipeline = PipelineConfig {
            max_concurrent: parse_env("MAX_CONCURRENT_PROCESSES", DEFAULT_MAX_CONCURRENT_PROCESSES)?,
        };

        let config = Self { server, database, cors, pipeline };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            bail!("SERVER_HOST must not be empty");
        }
        if self.server.port == 0 {
            bail!("SERVER_PORT must be non-zero");
        }
        if self.database.url.is_empty() {
            bail!("DATABASE_URL must not be empty");
        }
        if self.database.max_connections == 0 {
            bail!("DB_MAX_CONNECTIONS must be at least 1");
        }
        if self.pipeline.max_concurrent == 0 {
            bail!("MAX_CONCURRENT_PROCESSES must be at least 1");
        }
        if self.cors.allowed_origins.is_empty() {
            bail!("CORS_ALLOWED_ORIGINS must name at least one origin or '*'");
        }
        Ok(())
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {key}: {e}")),
        Err(_) => Ok(default),
    }
}
