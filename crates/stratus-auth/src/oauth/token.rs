//! Token endpoint wire types.
//!
//! Request/response/error types for the OAuth 2.0 token endpoint.
//!
//! # Supported Grant Types
//!
//! - `authorization_code` - Exchange an authorization code (PKCE) for tokens
//! - `refresh_token` - Rotate a refresh token
//! - `urn:ietf:params:oauth:grant-type:device_code` - Device flow (RFC 8628)

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AuthError;
use crate::types::GrantType;

// =============================================================================
// Grant Dispatch
// =============================================================================

/// A parsed, validated grant from a token request.
///
/// Closed enum: every grant the endpoint supports has a variant carrying
/// exactly the parameters that grant needs, so dispatch is exhaustive and
/// a new grant cannot be added without deciding its handling everywhere.
#[derive(Debug, Clone)]
pub enum Grant {
    /// `authorization_code`. The verifier is required whenever the code
    /// was issued with a PKCE challenge, which the exchange enforces.
    AuthorizationCode {
        code: String,
        redirect_uri: String,
        code_verifier: Option<String>,
    },
    /// `refresh_token`.
    RefreshToken { refresh_token: String },
    /// `urn:ietf:params:oauth:grant-type:device_code`.
    DeviceCode { device_code: String },
}

impl Grant {
    /// Parses a token request into a grant, checking per-grant required
    /// parameters.
    ///
    /// # Errors
    ///
    /// Returns `unsupported_grant_type` for unknown grant types and
    /// `invalid_request` when a required parameter is missing.
    pub fn from_request(request: &TokenRequest) -> Result<Self, AuthError> {
        match request.grant_type.as_str() {
            "authorization_code" => Ok(Self::AuthorizationCode {
                code: request
                    .code
                    .clone()
                    .ok_or_else(|| AuthError::invalid_request("Missing parameter: code"))?,
                redirect_uri: request.redirect_uri.clone().ok_or_else(|| {
                    AuthError::invalid_request("Missing parameter: redirect_uri")
                })?,
                code_verifier: request.code_verifier.clone(),
            }),
            "refresh_token" => Ok(Self::RefreshToken {
                refresh_token: request.refresh_token.clone().ok_or_else(|| {
                    AuthError::invalid_request("Missing parameter: refresh_token")
                })?,
            }),
            "urn:ietf:params:oauth:grant-type:device_code" => Ok(Self::DeviceCode {
                device_code: request.device_code.clone().ok_or_else(|| {
                    AuthError::invalid_request("Missing parameter: device_code")
                })?,
            }),
            other => Err(AuthError::unsupported_grant_type(other)),
        }
    }

    /// Returns the corresponding registered grant type.
    #[must_use]
    pub fn grant_type(&self) -> GrantType {
        match self {
            Self::AuthorizationCode { .. } => GrantType::AuthorizationCode,
            Self::RefreshToken { .. } => GrantType::RefreshToken,
            Self::DeviceCode { .. } => GrantType::DeviceCode,
        }
    }
}

// =============================================================================
// Token Request
// =============================================================================

/// Token request parameters.
///
/// Handles all supported grant types. Different fields are required
/// depending on `grant_type`:
///
/// - `authorization_code`: code, redirect_uri, client_id, and
///   code_verifier when the code was issued with a PKCE challenge
/// - `refresh_token`: refresh_token
/// - device_code URN: device_code, client_id
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    /// OAuth 2.0 grant type.
    pub grant_type: String,

    /// Authorization code (for authorization_code grant).
    #[serde(default)]
    pub code: Option<String>,

    /// Redirect URI (must match the authorization request).
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// PKCE code verifier (for authorization_code grant).
    #[serde(default)]
    pub code_verifier: Option<String>,

    /// Client ID (for public clients or client_secret_post).
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret (for client_secret_post authentication).
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Refresh token (for refresh_token grant).
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Device code (for the device_code grant).
    #[serde(default)]
    pub device_code: Option<String>,

    /// Requested scope.
    #[serde(default)]
    pub scope: Option<String>,
}

// =============================================================================
// Token Response
// =============================================================================

/// Successful token response.
///
/// # Example Response
///
/// ```json
/// {
///   "access_token": "eyJhbG...",
///   "token_type": "Bearer",
///   "expires_in": 3600,
///   "scope": "openid profile",
///   "refresh_token": "abc123..."
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token (JWT).
    pub access_token: String,

    /// Token type, always "Bearer".
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,

    /// Granted scopes (space-separated).
    pub scope: String,

    /// Refresh token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// ID token (if the openid scope was granted).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl TokenResponse {
    /// Creates a new token response with required fields.
    #[must_use]
    pub fn new(access_token: String, expires_in: u64, scope: String) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            scope,
            refresh_token: None,
            id_token: None,
        }
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, token: String) -> Self {
        self.refresh_token = Some(token);
        self
    }

    /// Sets the ID token.
    #[must_use]
    pub fn with_id_token(mut self, token: String) -> Self {
        self.id_token = Some(token);
        self
    }
}

// =============================================================================
// Token Error
// =============================================================================

/// OAuth 2.0 token error codes (RFC 6749 Section 5.2 and RFC 8628
/// Section 3.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenErrorCode {
    /// Malformed request or missing parameter.
    InvalidRequest,
    /// Client authentication failed.
    InvalidClient,
    /// Invalid, expired, revoked or replayed grant.
    InvalidGrant,
    /// Client is not authorized for this grant type.
    UnauthorizedClient,
    /// Grant type not supported by this server.
    UnsupportedGrantType,
    /// Requested scope is invalid or exceeds the granted scope.
    InvalidScope,
    /// Device flow: the user has not yet decided (keep polling).
    AuthorizationPending,
    /// Device flow: polling too fast, increase the interval.
    SlowDown,
    /// Device flow: the user denied the request.
    AccessDenied,
    /// Device flow: the device code has expired.
    ExpiredToken,
    /// Internal server error.
    ServerError,
}

impl TokenErrorCode {
    /// Returns the wire-format error code string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::InvalidScope => "invalid_scope",
            Self::AuthorizationPending => "authorization_pending",
            Self::SlowDown => "slow_down",
            Self::AccessDenied => "access_denied",
            Self::ExpiredToken => "expired_token",
            Self::ServerError => "server_error",
        }
    }
}

impl fmt::Display for TokenErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Token error response body.
///
/// # Example Response
///
/// ```json
/// {
///   "error": "authorization_pending",
///   "error_description": "The user has not yet approved the request"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenErrorResponse {
    /// OAuth 2.0 error code.
    pub error: TokenErrorCode,

    /// Human-readable error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    /// Updated minimum polling interval, present on `slow_down`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
}

impl TokenErrorResponse {
    /// Creates a new token error response.
    #[must_use]
    pub fn new(error: TokenErrorCode) -> Self {
        Self {
            error,
            error_description: None,
            interval: None,
        }
    }

    /// Creates a token error response with a description.
    #[must_use]
    pub fn with_description(error: TokenErrorCode, description: impl Into<String>) -> Self {
        Self {
            error,
            error_description: Some(description.into()),
            interval: None,
        }
    }
}

impl From<&AuthError> for TokenErrorResponse {
    fn from(err: &AuthError) -> Self {
        let code = match err {
            AuthError::InvalidClient { .. } | AuthError::Unauthorized { .. } => {
                TokenErrorCode::InvalidClient
            }
            AuthError::InvalidGrant { .. } | AuthError::PkceVerificationFailed => {
                TokenErrorCode::InvalidGrant
            }
            AuthError::UnauthorizedClient { .. } => TokenErrorCode::UnauthorizedClient,
            AuthError::InvalidScope { .. } => TokenErrorCode::InvalidScope,
            AuthError::UnsupportedGrantType { .. } => TokenErrorCode::UnsupportedGrantType,
            AuthError::AuthorizationPending => TokenErrorCode::AuthorizationPending,
            AuthError::SlowDown { .. } => TokenErrorCode::SlowDown,
            AuthError::AccessDenied { .. } => TokenErrorCode::AccessDenied,
            AuthError::ExpiredToken => TokenErrorCode::ExpiredToken,
            AuthError::InvalidRequest { .. } | AuthError::UnsupportedResponseType { .. } => {
                TokenErrorCode::InvalidRequest
            }
            _ => TokenErrorCode::ServerError,
        };

        let mut response = Self::with_description(code, err.to_string());
        if let AuthError::SlowDown { interval_secs } = err {
            response.interval = Some(*interval_secs);
        }
        // Internal detail is not surfaced to clients
        if code == TokenErrorCode::ServerError {
            response.error_description = Some("Internal server error".to_string());
        }
        response
    }
}

// =============================================================================
// Tests
// =============================================================================
