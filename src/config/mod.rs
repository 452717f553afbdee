use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: SECRET_KEY (or JWT_SECRET) must be set")]
    MissingSecret,

    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection string; when absent one is assembled from the DB* parts below.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub name: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub connect_retries: u32,
    pub retry_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub bcrypt_cost: u32,
    pub cors_origins: Vec<String>,
}

/// Tokens never live longer than a year.
pub const MAX_JWT_EXPIRY_HOURS: u64 = 24 * 365;

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. `from_env` is the
    /// production entry point; tests pass a map so they never touch process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(&lookup);

        if config.security.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingSecret);
        }

        Ok(config)
    }

    fn with_overrides<F>(mut self, lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(v) = lookup("BIND_ADDR") {
            self.server.host = v;
        }
        if let Some(v) = lookup("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Some(v) = lookup("REQUEST_TIMEOUT_SECS") {
            self.server.request_timeout_secs = v.parse().unwrap_or(self.server.request_timeout_secs);
        }

        // Database overrides
        if let Some(v) = lookup("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.database.url = Some(v);
            }
        }
        if let Some(v) = lookup("DBHOST") {
            self.database.host = v;
        }
        if let Some(v) = lookup("DBPORT") {
            self.database.port = v.parse().unwrap_or(self.database.port);
        }
        if let Some(v) = lookup("DBUSER") {
            self.database.user = v;
        }
        if let Some(v) = lookup("DBPASS") {
            self.database.password = v;
        }
        if let Some(v) = lookup("DBNAME") {
            self.database.name = v;
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Some(v) = lookup("DATABASE_CONNECT_RETRIES") {
            self.database.connect_retries = v.parse().unwrap_or(self.database.connect_retries);
        }
        if let Some(v) = lookup("DATABASE_RETRY_DELAY_SECS") {
            self.database.retry_delay_secs = v.parse().unwrap_or(self.database.retry_delay_secs);
        }

        // Security overrides
        if let Some(v) = lookup("SECRET_KEY").or_else(|| lookup("JWT_SECRET")) {
            self.security.jwt_secret = v;
        }
        if let Some(v) = lookup("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v
                .parse::<u64>()
                .ok()
                .filter(|hours| (1..=MAX_JWT_EXPIRY_HOURS).contains(hours))
                .unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Some(v) = lookup("BCRYPT_COST") {
            self.security.bcrypt_cost = v
                .parse::<u32>()
                .ok()
                .filter(|cost| (4..=31).contains(cost))
                .unwrap_or(self.security.bcrypt_cost);
        }
        if let Some(v) = lookup("CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                request_timeout_secs: 30,
            },
            database: DatabaseConfig::defaults(10, 30),
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                bcrypt_cost: 10,
                cors_origins: vec!["http://localhost:5173".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                request_timeout_secs: 15,
            },
            database: DatabaseConfig::defaults(20, 10),
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                bcrypt_cost: 10,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                request_timeout_secs: 10,
            },
            database: DatabaseConfig::defaults(50, 5),
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                bcrypt_cost: 12,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

impl DatabaseConfig {
    fn defaults(max_connections: u32, connection_timeout: u64) -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            name: "buyncon".to_string(),
            max_connections,
            connection_timeout,
            connect_retries: 5,
            retry_delay_secs: 2,
        }
    }

    /// Connection string: `DATABASE_URL` verbatim, or assembled from the DB* parts.
    pub fn connection_url(&self) -> Result<String, ConfigError> {
        if let Some(raw) = &self.url {
            let parsed = url::Url::parse(raw)
                .map_err(|e| ConfigError::InvalidDatabaseUrl(e.to_string()))?;
            return Ok(parsed.into());
        }

        let base = format!("postgres://{}:{}/{}", self.host, self.port, self.name);
        let mut url = url::Url::parse(&base)
            .map_err(|e| ConfigError::InvalidDatabaseUrl(e.to_string()))?;
        url.set_username(&self.user)
            .map_err(|_| ConfigError::InvalidDatabaseUrl("cannot set username".to_string()))?;
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| ConfigError::InvalidDatabaseUrl("cannot set password".to_string()))?;
        }
        Ok(url.into())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}
