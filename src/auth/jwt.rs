//! Access token issuance and validation
//!
//! Access tokens are HS256 JWTs carrying [`Claims`]. They are stateless:
//! there is no server-side revocation, so a leaked token stays usable until
//! `exp`. Keep the TTL short.

use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::{Claims, TOKEN_ISSUER};
use crate::error::{AppError, AuthError};

/// Default access token lifetime
pub fn default_access_token_ttl() -> Duration {
    Duration::hours(1)
}

/// Issue a signed access token for `user_id`, valid for `ttl`.
///
/// # Errors
/// Returns `Internal` if `ttl` overflows the calendar or signing fails
pub fn issue_access_token(user_id: Uuid, secret: &str, ttl: Duration) -> Result<String, AppError> {
    let claims = Claims::new(user_id, ttl)?;

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate an access token and return the user ID it was issued for.
///
/// The signature is verified before any claim is looked at; expiry is then
/// checked by the decoder and again here against the current clock.
///
/// # Errors
/// - `InvalidSignature` if the token was not signed with `secret`
/// - `TokenExpired` if `exp` has passed
/// - `MalformedToken` for anything else (bad encoding, wrong issuer, bad subject)
pub fn validate_access_token(token: &str, secret: &str) -> Result<Uuid, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_issuer(&[TOKEN_ISSUER]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        let err = match e.kind() {
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::MalformedToken,
        };
        tracing::debug!(reason = %e, error = %err, "Access token rejected");
        err
    })?;

    if claims.is_expired() {
        return Err(AuthError::TokenExpired);
    }

    claims.user_id()
}
