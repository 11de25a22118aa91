//! Application settings and configuration structures.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// Which persistent store backs the document collections
    pub storage: StorageSettings,

    /// Database configuration (PostgreSQL)
    pub database: DatabaseSettings,

    /// Which store backs the connection registry
    pub presence: PresenceSettings,

    /// Redis configuration
    pub redis: RedisSettings,

    /// Session token settings
    pub jwt: JwtSettings,

    /// Identity provider token verification
    pub identity: IdentitySettings,

    /// Blob storage for uploaded photos
    pub blob: BlobSettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// WebSocket configuration
    pub websocket: WebSocketSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,
}

/// Persistent store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    /// Process-local maps; state is lost on restart
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub backend: StorageBackend,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,

    /// Apply pending migrations at startup
    pub run_migrations: bool,
}

/// Connection registry backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceBackend {
    /// Shared across nodes
    Redis,
    /// Single node only
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresenceSettings {
    pub backend: PresenceBackend,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// Redis connection URL
    pub url: String,
}

/// Session token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for signing session tokens
    pub secret: String,

    /// Session token expiry in minutes
    pub expiry_minutes: i64,

    /// `iss` claim of issued session tokens
    pub issuer: String,
}

/// Identity provider ID token verification.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentitySettings {
    /// Secret the identity provider signs ID tokens with
    pub secret: String,

    /// Accepted `iss` claim of ID tokens
    pub issuer: String,
}

/// Blob store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BlobSettings {
    /// Directory uploads are written under
    pub root: String,

    /// URL prefix the directory is served from
    pub public_base_url: String,

    /// Largest accepted upload in bytes
    pub max_upload_bytes: usize,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins (comma-separated in env)
    pub allowed_origins: Vec<String>,
}

/// WebSocket configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketSettings {
    /// Maximum message size in bytes (default: 64KB)
    pub max_message_size: usize,

    /// Maximum frame size in bytes (default: 16KB)
    pub max_frame_size: usize,

    /// Interval between server pings in milliseconds (default: 30000)
    pub heartbeat_interval_ms: u64,

    /// Close the socket after this long without any client frame (default: 90)
    pub heartbeat_timeout_secs: u64,
}

/// Minimum required length for JWT secret (256 bits = 32 bytes)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. Built-in defaults
    /// 2. config/default.toml (base configuration)
    /// 3. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 4. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// if a secret is too short, or if the chosen backend lacks its URL.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        // Determine the running environment
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("storage.backend", "postgres")?
            .set_default("database.url", "")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("database.run_migrations", true)?
            .set_default("presence.backend", "redis")?
            .set_default("redis.url", "redis://127.0.0.1:6379")?
            .set_default("jwt.expiry_minutes", 60 * 24)?
            .set_default("jwt.issuer", "chat-coordinator")?
            .set_default("identity.issuer", "identity-provider")?
            .set_default("blob.root", "./uploads")?
            .set_default("blob.public_base_url", "http://localhost:3000/uploads")?
            .set_default("blob.max_upload_bytes", 5 * 1024 * 1024)?
            .set_default("cors.allowed_origins", vec!["http://localhost:3000"])?
            .set_default("websocket.max_message_size", 65536_i64)? // 64KB
            .set_default("websocket.max_frame_size", 16384_i64)? // 16KB
            .set_default("websocket.heartbeat_interval_ms", 30000_i64)?
            .set_default("websocket.heartbeat_timeout_secs", 90_i64)?
            // Load from config files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Load from environment variables
            // APP__SERVER__PORT=3000 -> server.port = 3000
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            // Map simple environment variables
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("redis.url", std::env::var("REDIS_URL").ok())?
            .set_override_option("jwt.secret", std::env::var("JWT_SECRET").ok())?
            .set_override_option("identity.secret", std::env::var("IDENTITY_SECRET").ok())?
            .build()?
            .try_deserialize()
            .and_then(|settings: Self| settings.validate().map(|_| settings))
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, secret) in [("JWT", &self.jwt.secret), ("Identity", &self.identity.secret)] {
            if secret.len() < MIN_JWT_SECRET_LENGTH {
                return Err(ConfigError::Message(format!(
                    "{} secret must be at least {} characters for security. Current length: {}",
                    name,
                    MIN_JWT_SECRET_LENGTH,
                    secret.len()
                )));
            }
        }

        if self.storage.backend == StorageBackend::Postgres && self.database.url.is_empty() {
            return Err(ConfigError::Message(
                "database.url is required when storage.backend = \"postgres\"".into(),
            ));
        }

        if self.presence.backend == PresenceBackend::Redis && self.redis.url.is_empty() {
            return Err(ConfigError::Message(
                "redis.url is required when presence.backend = \"redis\"".into(),
            ));
        }

        Ok(())
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Settings for a single process with in-memory backends, used by tests
    /// and local runs without PostgreSQL or Redis.
    pub fn in_memory(blob_root: impl Into<String>) -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".into(),
                port: 0,
            },
            storage: StorageSettings {
                backend: StorageBackend::Memory,
            },
            database: DatabaseSettings {
                url: String::new(),
                max_connections: 1,
                min_connections: 0,
                acquire_timeout: 5,
                run_migrations: false,
            },
            presence: PresenceSettings {
                backend: PresenceBackend::Memory,
            },
            redis: RedisSettings { url: String::new() },
            jwt: JwtSettings {
                secret: "local-session-secret-at-least-32-chars".into(),
                expiry_minutes: 60,
                issuer: "chat-coordinator".into(),
            },
            identity: IdentitySettings {
                secret: "local-identity-secret-at-least-32-chars".into(),
                issuer: "identity-provider".into(),
            },
            blob: BlobSettings {
                root: blob_root.into(),
                public_base_url: "http://localhost/uploads".into(),
                max_upload_bytes: 1024 * 1024,
            },
            cors: CorsSettings {
                allowed_origins: vec!["*".into()],
            },
            websocket: WebSocketSettings {
                max_message_size: 65536,
                max_frame_size: 16384,
                heartbeat_interval_ms: 30000,
                heartbeat_timeout_secs: 90,
            },
            environment: "test".into(),
        }
    }
}

impl ServerSettings {
    /// Get the socket address for binding.
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}
