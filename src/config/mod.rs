use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
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
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Hosted PostgreSQL store that owns the member directory
    pub primary_url: Option<String>,
    /// Self-hosted MySQL copy written by the sync job
    pub secondary: SecondaryTarget,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

/// The secondary store is reachable either by a full URL or by host/credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecondaryTarget {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Rows per multi-row upsert statement; 1 writes row by row
    pub batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_expiry_hours: u64,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(port) = env::var("FLOCK_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|v| v.parse().ok())
        {
            self.server.port = port;
        }

        // Database overrides
        if let Ok(v) = env::var("PRIMARY_DATABASE_URL").or_else(|_| env::var("DATABASE_URL")) {
            self.database.primary_url = Some(v);
        }
        if let Ok(v) = env::var("SECONDARY_DATABASE_URL") {
            self.database.secondary.url = Some(v);
        }
        if let Ok(v) = env::var("MYSQL_HOST") {
            self.database.secondary.host = Some(v);
        }
        if let Ok(v) = env::var("MYSQL_PORT") {
            self.database.secondary.port = v.parse().ok();
        }
        if let Ok(v) = env::var("MYSQL_USER") {
            self.database.secondary.user = Some(v);
        }
        if let Ok(v) = env::var("MYSQL_PASSWORD") {
            self.database.secondary.password = Some(v);
        }
        if let Ok(v) = env::var("MYSQL_DATABASE") {
            self.database.secondary.database = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Sync overrides
        if let Ok(v) = env::var("SYNC_BATCH_SIZE") {
            self.sync.batch_size = v
                .parse()
                .ok()
                .filter(|size: &usize| *size > 0)
                .unwrap_or(self.sync.batch_size);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_AUDIENCE") {
            self.security.jwt_audience = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 3000 },
            database: DatabaseConfig {
                primary_url: None,
                secondary: SecondaryTarget::default(),
                max_connections: 5,
                connection_timeout: 30,
            },
            sync: SyncConfig { batch_size: 100 },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_audience: "authenticated".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig { port: 3000 },
            database: DatabaseConfig {
                primary_url: None,
                secondary: SecondaryTarget::default(),
                max_connections: 10,
                connection_timeout: 10,
            },
            sync: SyncConfig { batch_size: 100 },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_audience: "authenticated".to_string(),
                jwt_expiry_hours: 24,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig { port: 8080 },
            database: DatabaseConfig {
                primary_url: None,
                secondary: SecondaryTarget::default(),
                max_connections: 20,
                connection_timeout: 5,
            },
            sync: SyncConfig { batch_size: 250 },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_audience: "authenticated".to_string(),
                jwt_expiry_hours: 4,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.sync.batch_size, 100);
        assert_eq!(config.security.jwt_audience, "authenticated");
        assert!(config.database.primary_url.is_none());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.security.jwt_expiry_hours, 4);
        assert!(config.database.max_connections > AppConfig::development().database.max_connections);
    }

    #[test]
    fn jwt_secret_is_never_serialized() {
        let mut config = AppConfig::development();
        config.security.jwt_secret = "super-secret".to_string();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("super-secret"));
    }
}
