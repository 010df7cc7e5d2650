//! Server configuration loading.
//!
//! The server reads a single TOML file (`stratus.toml` by default) holding
//! the listen address, logging level, the authorization core configuration,
//! signing key material, and the bootstrap client/membership seeds.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};

use stratus_auth::config::AuthConfig;
use stratus_auth::types::{GrantType, OrgRole, TokenAuthMethod};

/// Root server configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [server]
/// host = "0.0.0.0"
/// port = 8080
///
/// [logging]
/// level = "info"
///
/// [auth]
/// issuer = "https://id.example.com"
///
/// [[clients]]
/// client_id = "web-app"
/// name = "Web Application"
/// grant_types = ["authorization_code", "refresh_token"]
/// redirect_uris = ["https://app.example.com/callback"]
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP listener configuration.
    pub server: HttpConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Authorization core configuration.
    pub auth: AuthConfig,

    /// Signing key material. Ephemeral when omitted.
    pub signing_key: SigningKeyConfig,

    /// Clients registered at startup.
    pub clients: Vec<ClientSeed>,

    /// Organization memberships seeded at startup.
    pub memberships: Vec<MembershipSeed>,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address.
    pub host: IpAddr,

    /// Bind port.
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 8080,
        }
    }
}

impl HttpConfig {
    /// Returns the socket address to bind.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level directive (`error`, `warn`, `info`, `debug`, `trace`, or
    /// any `tracing-subscriber` filter string). `RUST_LOG` takes priority.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Signing key material.
///
/// When the paths are omitted the server generates an ephemeral RSA key at
/// startup; tokens stop verifying across restarts, which is fine for
/// development but not for production.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningKeyConfig {
    /// Path to the PKCS#8 PEM private key.
    pub private_key_path: Option<String>,

    /// Path to the PEM public key.
    pub public_key_path: Option<String>,

    /// Key ID advertised in the JWKS. Random when omitted.
    pub kid: Option<String>,
}

/// A client registered from configuration at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientSeed {
    /// Client identifier.
    pub client_id: String,

    /// Human-readable name.
    pub name: String,

    /// Plaintext client secret; hashed before registration. Required for
    /// confidential clients.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Allowed grant types.
    pub grant_types: Vec<GrantType>,

    /// Registered redirect URIs (exact-match).
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    /// Allowed scopes. Empty means any scope.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Token endpoint authentication method.
    #[serde(default = "default_token_auth_method")]
    pub token_auth_method: TokenAuthMethod,

    /// Whether the client can keep a secret.
    #[serde(default)]
    pub confidential: bool,

    /// Access token lifetime override in seconds.
    #[serde(default)]
    pub access_token_lifetime: Option<i64>,

    /// Refresh token lifetime override in seconds.
    #[serde(default)]
    pub refresh_token_lifetime: Option<i64>,
}

fn default_token_auth_method() -> TokenAuthMethod {
    TokenAuthMethod::None
}

/// An organization membership seeded from configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MembershipSeed {
    /// Member user ID.
    pub user_id: String,

    /// Organization ID.
    pub org_id: String,

    /// Organization display name.
    pub org_name: String,

    /// Role, one of `owner`, `admin`, `member`.
    pub role: OrgRole,
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Cannot read configuration file '{path}': {source}")]
    Io {
        /// The path that failed.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file could not be parsed.
    #[error("Cannot parse configuration file '{path}': {source}")]
    Parse {
        /// The path that failed.
        path: String,
        /// The underlying TOML error.
        source: toml::de::Error,
    },

    /// A configuration value failed validation.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Loads and validates the configuration.
///
/// A missing file at the default path falls back to defaults; an explicitly
/// requested file must exist.
///
/// # Errors
///
/// Returns `ConfigError` when the file cannot be read or parsed, or when
/// validation fails.
pub fn load_config(path: &str, explicit: bool) -> Result<ServerConfig, ConfigError> {
    let config = if Path::new(path).exists() {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?
    } else if explicit {
        return Err(ConfigError::Io {
            path: path.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        });
    } else {
        ServerConfig::default()
    };

    config.validate()?;
    Ok(config)
}

impl ServerConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for inconsistent values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.auth
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        match (
            &self.signing_key.private_key_path,
            &self.signing_key.public_key_path,
        ) {
            (Some(_), Some(_)) | (None, None) => {}
            _ => {
                return Err(ConfigError::Invalid(
                    "private_key_path and public_key_path must be set together".to_string(),
                ));
            }
        }

        for client in &self.clients {
            if client.confidential && client.client_secret.is_none() {
                return Err(ConfigError::Invalid(format!(
                    "Confidential client '{}' has no client_secret",
                    client.client_id
                )));
            }
        }

        Ok(())
    }
}
