//! OAuth 2.0 client domain types.
//!
//! Clients are registered at deployment time (bootstrap from configuration)
//! and are immutable afterwards: the registry only supports lookup.

use serde::{Deserialize, Serialize};

// =============================================================================
// Grant Type
// =============================================================================

/// OAuth 2.0 grant types.
///
/// Defines the authorization flows a client is allowed to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization Code flow (with PKCE for public clients).
    AuthorizationCode,
    /// Refresh Token flow.
    RefreshToken,
    /// Device Authorization flow (RFC 8628).
    DeviceCode,
}

impl GrantType {
    /// Returns the OAuth 2.0 `grant_type` parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
            Self::DeviceCode => "urn:ietf:params:oauth:grant-type:device_code",
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Token Endpoint Auth Method
// =============================================================================

/// How a client authenticates at the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenAuthMethod {
    /// Public client, identified by `client_id` only.
    None,
    /// HTTP Basic authentication with client_id/client_secret.
    ClientSecretBasic,
    /// client_id/client_secret in the form body.
    ClientSecretPost,
}

impl TokenAuthMethod {
    /// Returns the method name as used in discovery metadata.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ClientSecretBasic => "client_secret_basic",
            Self::ClientSecretPost => "client_secret_post",
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// A registered OAuth 2.0 client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    /// Unique client identifier used in OAuth flows.
    pub client_id: String,

    /// SHA-256 digest (base64url) of the client secret, for confidential
    /// clients. Never the plaintext secret.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret_hash: Option<String>,

    /// Human-readable display name.
    pub name: String,

    /// OAuth 2.0 grant types this client is allowed to use.
    pub grant_types: Vec<GrantType>,

    /// Allowed redirect URIs for the authorization code flow.
    /// Matched by exact string comparison.
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    /// OAuth scopes this client is allowed to request.
    /// Empty list means all scopes are allowed.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Token endpoint authentication method.
    pub token_auth_method: TokenAuthMethod,

    /// Whether this is a confidential client (holds a secret).
    pub confidential: bool,

    /// Whether this client is currently active and can be used.
    pub active: bool,

    /// Access token lifetime override in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_lifetime: Option<i64>,

    /// Refresh token lifetime override in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_lifetime: Option<i64>,

    /// Whether PKCE is required for the authorization code flow.
    /// Public clients always require PKCE regardless of this setting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pkce_required: Option<bool>,
}

impl Client {
    /// Validates the client registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the registration is internally inconsistent.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.client_id.is_empty() {
            return Err(ClientValidationError::EmptyClientId);
        }

        if self.name.is_empty() {
            return Err(ClientValidationError::EmptyName);
        }

        if self.grant_types.is_empty() {
            return Err(ClientValidationError::NoGrantTypes);
        }

        // Confidential clients must carry a secret digest
        if self.confidential && self.client_secret_hash.is_none() {
            return Err(ClientValidationError::MissingSecret);
        }

        // Public clients must not declare a secret-based auth method
        if !self.confidential
            && matches!(
                self.token_auth_method,
                TokenAuthMethod::ClientSecretBasic | TokenAuthMethod::ClientSecretPost
            )
        {
            return Err(ClientValidationError::PublicClientWithSecretAuth);
        }

        // Authorization code flow requires redirect URIs
        if self.grant_types.contains(&GrantType::AuthorizationCode)
            && self.redirect_uris.is_empty()
        {
            return Err(ClientValidationError::NoRedirectUris);
        }

        Ok(())
    }

    /// Checks if the given redirect URI is registered for this client.
    #[must_use]
    pub fn is_redirect_uri_allowed(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|allowed| allowed == uri)
    }

    /// Checks if the given grant type is allowed for this client.
    #[must_use]
    pub fn is_grant_type_allowed(&self, grant_type: GrantType) -> bool {
        self.grant_types.contains(&grant_type)
    }

    /// Checks if the given scope is allowed for this client.
    ///
    /// An empty scopes list means all scopes are allowed.
    #[must_use]
    pub fn is_scope_allowed(&self, scope: &str) -> bool {
        self.scopes.is_empty() || self.scopes.iter().any(|allowed| allowed == scope)
    }

    /// Returns whether PKCE is required for this client.
    ///
    /// PKCE is always required for public clients. For confidential clients,
    /// it depends on the `pkce_required` setting (defaults to false).
    #[must_use]
    pub fn requires_pkce(&self) -> bool {
        if !self.confidential {
            true
        } else {
            self.pkce_required.unwrap_or(false)
        }
    }

}

// =============================================================================
// Validation Error
// =============================================================================

/// Errors that can occur during client validation.
#[derive(Debug, thiserror::Error)]
pub enum ClientValidationError {
    /// Client ID cannot be empty.
    #[error("Client ID cannot be empty")]
    EmptyClientId,

    /// Client name cannot be empty.
    #[error("Client name cannot be empty")]
    EmptyName,

    /// At least one grant type is required.
    #[error("At least one grant type is required")]
    NoGrantTypes,

    /// Authorization code flow requires redirect URIs.
    #[error("Authorization code flow requires redirect URIs")]
    NoRedirectUris,

    /// Confidential clients require a client secret.
    #[error("Confidential clients require a client secret")]
    MissingSecret,

    /// Public clients cannot use a secret-based token auth method.
    #[error("Public clients cannot use a secret-based token auth method")]
    PublicClientWithSecretAuth,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn make_public_client() -> Client {
        Client {
            client_id: "web-app".to_string(),
            client_secret_hash: None,
            name: "Web App".to_string(),
            grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
            redirect_uris: vec!["https://app.example/callback".to_string()],
            scopes: vec![],
            token_auth_method: TokenAuthMethod::None,
            confidential: false,
            active: true,
            access_token_lifetime: None,
            refresh_token_lifetime: None,
            pkce_required: None,
        }
    }

    fn make_confidential_client() -> Client {
        Client {
            client_id: "cli-tool".to_string(),
            client_secret_hash: Some("digest".to_string()),
            name: "CLI Tool".to_string(),
            grant_types: vec![GrantType::DeviceCode, GrantType::RefreshToken],
            redirect_uris: vec![],
            scopes: vec!["openid".to_string(), "profile".to_string()],
            token_auth_method: TokenAuthMethod::ClientSecretBasic,
            confidential: true,
            active: true,
            access_token_lifetime: Some(1800),
            refresh_token_lifetime: Some(86400),
            pkce_required: Some(false),
        }
    }

    #[test]
    fn test_valid_clients() {
        assert!(make_public_client().validate().is_ok());
        assert!(make_confidential_client().validate().is_ok());
    }

    #[test]
    fn test_empty_client_id() {
        let mut client = make_public_client();
        client.client_id = String::new();
        assert!(matches!(
            client.validate(),
            Err(ClientValidationError::EmptyClientId)
        ));
    }

    #[test]
    fn test_no_grant_types() {
        let mut client = make_public_client();
        client.grant_types = vec![];
        assert!(matches!(
            client.validate(),
            Err(ClientValidationError::NoGrantTypes)
        ));
    }

    #[test]
    fn test_auth_code_without_redirect_uris() {
        let mut client = make_public_client();
        client.redirect_uris = vec![];
        assert!(matches!(
            client.validate(),
            Err(ClientValidationError::NoRedirectUris)
        ));
    }

    #[test]
    fn test_confidential_without_secret() {
        let mut client = make_confidential_client();
        client.client_secret_hash = None;
        assert!(matches!(
            client.validate(),
            Err(ClientValidationError::MissingSecret)
        ));
    }

    #[test]
    fn test_public_client_with_secret_auth() {
        let mut client = make_public_client();
        client.token_auth_method = TokenAuthMethod::ClientSecretPost;
        assert!(matches!(
            client.validate(),
            Err(ClientValidationError::PublicClientWithSecretAuth)
        ));
    }

    #[test]
    fn test_redirect_uri_exact_match() {
        let client = make_public_client();
        assert!(client.is_redirect_uri_allowed("https://app.example/callback"));
        assert!(!client.is_redirect_uri_allowed("https://app.example/callback/"));
        assert!(!client.is_redirect_uri_allowed("https://evil.example/callback"));
    }

    #[test]
    fn test_grant_type_allowed() {
        let client = make_confidential_client();
        assert!(client.is_grant_type_allowed(GrantType::DeviceCode));
        assert!(client.is_grant_type_allowed(GrantType::RefreshToken));
        assert!(!client.is_grant_type_allowed(GrantType::AuthorizationCode));
    }

    #[test]
    fn test_scope_allowed() {
        let open = make_public_client();
        assert!(open.is_scope_allowed("anything"));

        let restricted = make_confidential_client();
        assert!(restricted.is_scope_allowed("openid"));
        assert!(!restricted.is_scope_allowed("admin"));
    }

    #[test]
    fn test_requires_pkce() {
        let public = make_public_client();
        assert!(public.requires_pkce());

        let mut confidential = make_confidential_client();
        assert!(!confidential.requires_pkce());
        confidential.pkce_required = Some(true);
        assert!(confidential.requires_pkce());
    }

    #[test]
    fn test_grant_type_as_str() {
        assert_eq!(GrantType::AuthorizationCode.as_str(), "authorization_code");
        assert_eq!(GrantType::RefreshToken.as_str(), "refresh_token");
        assert_eq!(
            GrantType::DeviceCode.as_str(),
            "urn:ietf:params:oauth:grant-type:device_code"
        );
    }

    #[test]
    fn test_serde_roundtrip() {
        let client = make_confidential_client();
        let json = serde_json::to_string(&client).unwrap();
        let parsed: Client = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.client_id, client.client_id);
        assert_eq!(parsed.grant_types, client.grant_types);
        assert_eq!(parsed.token_auth_method, client.token_auth_method);
    }
}
