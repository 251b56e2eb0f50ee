use crate::error::{AppError, Result};
use std::{env, path::PathBuf, time::Duration};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub listing: ListingConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseDriver {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub driver: DatabaseDriver,
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageDriver {
    Local { root: PathBuf, public_url: String },
    S3 { bucket: String, assets_url: String },
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub driver: StorageDriver,
    pub max_image_kb: usize,
}

#[derive(Debug, Clone)]
pub struct ListingConfig {
    pub session_idle_timeout: Duration,
}

fn parse_var<T: std::str::FromStr>(name: &str, default: &str) -> Result<T> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| AppError::ConfigError(format!("Invalid {} value", name)))
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_var("PORT", "3000")?,
                max_body_size: parse_var("MAX_BODY_SIZE", "10485760")?,
            },
            database: DatabaseConfig::from_env()?,
            cors: CorsConfig {
                allowed_origins: env::var("FRONTEND_URL")?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            auth: AuthConfig {
                jwt_secret: env::var("JWT_SECRET")
                    .map_err(|_| AppError::ConfigError("JWT_SECRET not set".to_string()))?,
            },
            storage: StorageConfig::from_env()?,
            listing: ListingConfig {
                session_idle_timeout: Duration::from_secs(parse_var(
                    "LISTING_SESSION_TTL_SECS",
                    "1800",
                )?),
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self> {
        let driver = match env::var("DB_DRIVER")
            .unwrap_or_else(|_| "postgres".to_string())
            .as_str()
        {
            "postgres" => DatabaseDriver::Postgres,
            "memory" => DatabaseDriver::Memory,
            other => {
                return Err(AppError::ConfigError(format!(
                    "Invalid DB_DRIVER value: {}",
                    other
                )));
            }
        };

        let url = env::var("DB_URL").ok();
        if driver == DatabaseDriver::Postgres && url.is_none() {
            return Err(AppError::ConfigError("DB_URL not set".to_string()));
        }

        Ok(Self {
            driver,
            url,
            max_connections: parse_var("DB_MAX_CONNECTIONS", "20")?,
        })
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self> {
        let driver = match env::var("STORAGE_DRIVER")
            .unwrap_or_else(|_| "local".to_string())
            .as_str()
        {
            "local" => StorageDriver::Local {
                root: PathBuf::from(
                    env::var("STORAGE_ROOT").unwrap_or_else(|_| "storage/public".to_string()),
                ),
                public_url: env::var("STORAGE_PUBLIC_URL")
                    .unwrap_or_else(|_| "/storage".to_string())
                    .trim_end_matches('/')
                    .to_string(),
            },
            "s3" => StorageDriver::S3 {
                bucket: env::var("S3_BUCKET")
                    .map_err(|_| AppError::ConfigError("S3_BUCKET not set".to_string()))?,
                assets_url: env::var("ASSETS_URL")
                    .map_err(|_| AppError::ConfigError("ASSETS_URL not set".to_string()))?
                    .trim_end_matches('/')
                    .to_string(),
            },
            other => {
                return Err(AppError::ConfigError(format!(
                    "Invalid STORAGE_DRIVER value: {}",
                    other
                )));
            }
        };

        Ok(Self {
            driver,
            max_image_kb: parse_var("MAX_IMAGE_SIZE_KB", "1024")?,
        })
    }
}
