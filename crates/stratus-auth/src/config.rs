//! Authorization server configuration.
//!
//! Configuration types for the OAuth 2.0 core: token lifetimes, device-flow
//! pacing, tenant-context TTL, and signing options.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root authorization configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// issuer = "https://id.example.com"
///
/// [auth.oauth]
/// authorization_code_lifetime = "60s"
/// access_token_lifetime = "1h"
///
/// [auth.device]
/// code_lifetime = "10m"
/// poll_interval = "5s"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Server issuer URL (used in token `iss` claim).
    /// This should be the public base URL of the authorization server.
    pub issuer: String,

    /// Audience for access tokens (the logical resource-server identifier).
    pub audience: String,

    /// URL of the interactive login page. Unauthenticated authorization
    /// requests are redirected here with a `return_to` parameter.
    pub login_url: String,

    /// Scopes advertised in the discovery document.
    pub scopes_supported: Vec<String>,

    /// OAuth 2.0 configuration.
    pub oauth: OAuthConfig,

    /// Device authorization grant configuration.
    pub device: DeviceConfig,

    /// Tenant-context hand-off configuration.
    pub tenant: TenantConfig,

    /// Token signing configuration.
    pub signing: SigningConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8080".to_string(),
            audience: "stratus".to_string(),
            login_url: "http://localhost:8080/login".to_string(),
            scopes_supported: vec![
                "openid".to_string(),
                "profile".to_string(),
                "email".to_string(),
                "offline_access".to_string(),
            ],
            oauth: OAuthConfig::default(),
            device: DeviceConfig::default(),
            tenant: TenantConfig::default(),
            signing: SigningConfig::default(),
        }
    }
}

/// OAuth 2.0 configuration.
///
/// Controls token lifetimes and refresh token behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Authorization code lifetime.
    /// Codes are single-use and should be very short-lived.
    #[serde(with = "humantime_serde")]
    pub authorization_code_lifetime: Duration,

    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// ID token lifetime.
    #[serde(with = "humantime_serde")]
    pub id_token_lifetime: Duration,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// Rotate refresh tokens on use.
    /// When enabled, each refresh revokes the presented token and issues a
    /// replacement, which detects token theft.
    pub refresh_token_rotation: bool,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            authorization_code_lifetime: Duration::from_secs(60),
            access_token_lifetime: Duration::from_secs(3600), // 1 hour
            id_token_lifetime: Duration::from_secs(3600),
            refresh_token_lifetime: Duration::from_secs(30 * 24 * 3600), // 30 days
            refresh_token_rotation: true,
        }
    }
}

/// Device authorization grant configuration (RFC 8628).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device code lifetime. The user must approve within this window.
    #[serde(with = "humantime_serde")]
    pub code_lifetime: Duration,

    /// Initial required polling interval.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Penalty added to the required interval each time a client polls
    /// too fast (RFC 8628 recommends 5 seconds).
    #[serde(with = "humantime_serde")]
    pub slow_down_penalty: Duration,

    /// Path (relative to the issuer) where users enter their user code.
    pub verification_path: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            code_lifetime: Duration::from_secs(600), // 10 minutes
            poll_interval: Duration::from_secs(5),
            slow_down_penalty: Duration::from_secs(5),
            verification_path: "/device".to_string(),
        }
    }
}

/// Tenant-context hand-off configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TenantConfig {
    /// TTL for tenant-context entries. Bounds the race window between an
    /// organization switch in the browser and the back-channel token
    /// exchange that should observe it.
    #[serde(with = "humantime_serde")]
    pub context_ttl: Duration,

    /// Prefix for the default (personal) tenant derived from the user id
    /// when no explicit or session tenant applies.
    pub default_org_prefix: String,
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            context_ttl: Duration::from_secs(300), // 5 minutes
            default_org_prefix: "personal:".to_string(),
        }
    }
}

/// Token signing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Signing algorithm. Only "RS256" is supported.
    pub algorithm: String,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            algorithm: "RS256".to_string(),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The issuer URL is empty
    /// - The signing algorithm is not supported
    /// - Any lifetime is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::InvalidValue(
                "issuer cannot be empty".to_string(),
            ));
        }

        if self.signing.algorithm != "RS256" {
            return Err(ConfigError::InvalidValue(format!(
                "Invalid signing algorithm: '{}'. Only RS256 is supported",
                self.signing.algorithm
            )));
        }

        if self.oauth.authorization_code_lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "authorization_code_lifetime must be > 0".to_string(),
            ));
        }

        if self.oauth.access_token_lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "access_token_lifetime must be > 0".to_string(),
            ));
        }

        if self.device.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "device poll_interval must be > 0".to_string(),
            ));
        }

        if self.tenant.context_ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "tenant context_ttl must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}
