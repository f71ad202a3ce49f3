//! Authentication module
//!
//! Password hashing, access token issuance/validation, refresh token
//! lifecycle and credential extraction from request headers.

mod claims;
mod credentials;
mod jwt;
mod password;
mod refresh_token;

pub use claims::{Claims, TOKEN_ISSUER};
pub use credentials::{
    extract_api_key, extract_bearer, parse_authorization, API_KEY_SCHEME, BEARER_SCHEME,
};
pub use jwt::{default_access_token_ttl, issue_access_token, validate_access_token};
pub use password::{verify_password, PasswordHasher, PasswordVerifier};
pub use refresh_token::{default_refresh_token_lifetime, generate_refresh_token, RefreshTokenManager};
