//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

/// HTTP header name for the bootstrap admin key.
pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";

/// Cookie the site stores the backend access token in.
pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";

/// Development default values - NEVER use in production.
pub mod defaults {
    pub const DEV_HOST: &str = "127.0.0.1";
    pub const DEV_PORT: u16 = 8080;
    pub const DEV_ANON_KEY: &str = "dev-anon-key";
    pub const DEV_SERVICE_ROLE_KEY: &str = "dev-service-role-key";
    pub const DEV_JWT_SECRET: &str = "dev-jwt-secret-do-not-use-in-production";
    pub const DEV_ADMIN_KEY: &str = "dev-admin-key-do-not-use-in-production";
    pub const PROFILE_TABLE: &str = "profiles";
    pub const SEARCH_FUNCTION: &str = "search_profiles";
    pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 5;
    pub const HTTP_TIMEOUT_SECS: u64 = 10;
}

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse environment from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    /// Check if this is a development environment.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Check if this is a production environment.
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Hosted backend (table API + auth API) settings.
#[derive(Debug, Clone)]
pub struct BackendSettings {
    /// Project base URL. `None` selects the in-memory backend (development only).
    pub url: Option<String>,
    /// Public (anon) API key sent as `apikey` on every request
    pub anon_key: SecretString,
    /// Service-role key used for admin identity updates
    pub service_role_key: SecretString,
    /// HS256 secret the backend signs access tokens with
    pub jwt_secret: SecretString,
    /// Table holding member profiles
    pub profile_table: String,
    /// Server-side search procedure name
    pub search_function: String,
    /// Procedure that creates the profile table, called once at startup
    /// when the table is missing. `None` disables the bootstrap.
    pub bootstrap_function: Option<String>,
    /// Connect timeout for backend calls
    pub connect_timeout: Duration,
    /// Total request timeout for backend calls
    pub request_timeout: Duration,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Runtime environment
    pub environment: Environment,
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Admin key for bootstrap operations (granting the first admin role)
    pub admin_key: Option<String>,
    /// Hosted backend configuration
    pub backend: BackendSettings,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In development mode (RUST_ENV=development) every variable has a
    /// default and a missing `SUPABASE_URL` selects the in-memory backend.
    /// In production mode the backend URL, keys and JWT secret are required
    /// and must not match development defaults.
    ///
    /// Environment variables:
    /// - `RUST_ENV`: Environment (development/production) - REQUIRED
    /// - `CLANHUB_HOST`: Server host (default: 127.0.0.1)
    /// - `CLANHUB_PORT`: Server port (default: 8080)
    /// - `SUPABASE_URL`: Backend project URL
    /// - `SUPABASE_ANON_KEY`: Public API key
    /// - `SUPABASE_SERVICE_ROLE_KEY`: Service-role key for admin identity updates
    /// - `SUPABASE_JWT_SECRET`: Access token signing secret
    /// - `CLANHUB_ADMIN_KEY`: Bootstrap admin key (optional)
    /// - `CLANHUB_PROFILE_TABLE`: Profile table name (default: profiles)
    /// - `CLANHUB_SEARCH_FUNCTION`: Search procedure (default: search_profiles)
    /// - `CLANHUB_BOOTSTRAP_FUNCTION`: Table-creating procedure called when the
    ///   profile table is missing at startup (optional, e.g. create_profiles_table_direct)
    /// - `CLANHUB_HTTP_CONNECT_TIMEOUT_SECS`: Backend connect timeout (default: 5)
    /// - `CLANHUB_HTTP_TIMEOUT_SECS`: Backend request timeout (default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_str = env::var("RUST_ENV").map_err(|_| ConfigError::MissingEnvVar("RUST_ENV"))?;

        let environment = Environment::parse(&env_str).ok_or(ConfigError::InvalidValue(
            "RUST_ENV must be 'development' or 'production'",
        ))?;

        let host = env::var("CLANHUB_HOST").unwrap_or_else(|_| defaults::DEV_HOST.to_string());

        let port = env::var("CLANHUB_PORT")
            .unwrap_or_else(|_| defaults::DEV_PORT.to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue("CLANHUB_PORT must be a valid port number"))?;

        let admin_key = if environment.is_development() {
            Some(
                env::var("CLANHUB_ADMIN_KEY")
                    .unwrap_or_else(|_| defaults::DEV_ADMIN_KEY.to_string()),
            )
        } else {
            env::var("CLANHUB_ADMIN_KEY").ok()
        };

        let connect_timeout_secs = env::var("CLANHUB_HTTP_CONNECT_TIMEOUT_SECS")
            .unwrap_or_else(|_| defaults::HTTP_CONNECT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue("CLANHUB_HTTP_CONNECT_TIMEOUT_SECS must be a valid number")
            })?;

        let request_timeout_secs = env::var("CLANHUB_HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| defaults::HTTP_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue("CLANHUB_HTTP_TIMEOUT_SECS must be a valid number")
            })?;

        let backend = BackendSettings {
            url: env::var("SUPABASE_URL")
                .ok()
                .map(|u| u.trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty()),
            anon_key: secret_var("SUPABASE_ANON_KEY", defaults::DEV_ANON_KEY),
            service_role_key: secret_var("SUPABASE_SERVICE_ROLE_KEY", defaults::DEV_SERVICE_ROLE_KEY),
            jwt_secret: secret_var("SUPABASE_JWT_SECRET", defaults::DEV_JWT_SECRET),
            profile_table: env::var("CLANHUB_PROFILE_TABLE")
                .unwrap_or_else(|_| defaults::PROFILE_TABLE.to_string()),
            search_function: env::var("CLANHUB_SEARCH_FUNCTION")
                .unwrap_or_else(|_| defaults::SEARCH_FUNCTION.to_string()),
            bootstrap_function: env::var("CLANHUB_BOOTSTRAP_FUNCTION")
                .ok()
                .filter(|f| !f.trim().is_empty()),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            request_timeout: Duration::from_secs(request_timeout_secs),
        };

        let config = Config {
            environment,
            host,
            port,
            admin_key,
            backend,
        };

        if environment.is_production() {
            config.validate_production()?;
        }

        Ok(config)
    }

    /// Validate that production configuration does not use development defaults.
    fn validate_production(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.backend.url.is_none() {
            errors.push(
                "SUPABASE_URL is not set. The in-memory backend is development only.".to_string(),
            );
        }

        if self.backend.anon_key.expose_secret() == defaults::DEV_ANON_KEY {
            errors.push("SUPABASE_ANON_KEY is using development default.".to_string());
        }

        if self.backend.service_role_key.expose_secret() == defaults::DEV_SERVICE_ROLE_KEY {
            errors.push("SUPABASE_SERVICE_ROLE_KEY is using development default.".to_string());
        }

        if self.backend.jwt_secret.expose_secret() == defaults::DEV_JWT_SECRET {
            errors.push(
                "SUPABASE_JWT_SECRET is using development default. Set the project JWT secret."
                    .to_string(),
            );
        }

        if let Some(ref key) = self.admin_key
            && key == defaults::DEV_ADMIN_KEY
        {
            errors.push(
                "CLANHUB_ADMIN_KEY is using development default. Set a secure admin key or remove it."
                    .to_string(),
            );
        }

        if !errors.is_empty() {
            return Err(ConfigError::ProductionValidation(errors));
        }

        Ok(())
    }

    /// Get the server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode.
    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }
}

fn secret_var(name: &str, default: &str) -> SecretString {
    SecretString::from(env::var(name).unwrap_or_else(|_| default.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(&'static str),

    #[error("Production configuration validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    ProductionValidation(Vec<String>),
}
