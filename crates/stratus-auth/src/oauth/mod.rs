//! OAuth 2.0 protocol types and front-channel services.

pub mod authorize;
pub mod code;
pub mod device;
pub mod pkce;
pub mod token;

pub use authorize::{AuthorizationRequest, AuthorizationService, AuthorizeContext};
pub use code::AuthorizationCode;
pub use device::{
    DeviceAuthorization, DeviceAuthorizationResponse, DeviceFlowService, DeviceStatus,
    DeviceVerdict,
};
pub use pkce::{PkceChallenge, PkceChallengeMethod, PkceError, PkceVerifier};
pub use token::{Grant, TokenErrorCode, TokenErrorResponse, TokenRequest, TokenResponse};
