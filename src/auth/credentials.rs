//! Credential extraction from request headers
//!
//! Pure parsing of `Authorization: <Scheme> <value>`. The scheme word must
//! match exactly (case-sensitive) and the value must be exactly one
//! whitespace-free field.

use actix_web::http::header::{HeaderMap, AUTHORIZATION};

use crate::error::AuthError;

pub const BEARER_SCHEME: &str = "Bearer";
pub const API_KEY_SCHEME: &str = "ApiKey";

/// Extract the token from `Authorization: Bearer <token>`
pub fn extract_bearer(headers: &HeaderMap) -> Result<String, AuthError> {
    extract_scheme(headers, BEARER_SCHEME)
}

/// Extract the key from `Authorization: ApiKey <key>`
///
/// The key is returned as-is; comparing it with the configured service key
/// is the caller's job.
pub fn extract_api_key(headers: &HeaderMap) -> Result<String, AuthError> {
    extract_scheme(headers, API_KEY_SCHEME)
}

fn extract_scheme(headers: &HeaderMap, scheme: &str) -> Result<String, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    parse_authorization(value, scheme).map(str::to_string)
}

/// Parse a raw `Authorization` header value for `scheme`
///
/// # Errors
/// - `MissingCredential` if the value is empty or blank
/// - `MalformedHeader` unless the value is exactly `<scheme> <credential>`
pub fn parse_authorization<'a>(value: &'a str, scheme: &str) -> Result<&'a str, AuthError> {
    let fields: Vec<&str> = value.split_whitespace().collect();

    match fields.as_slice() {
        [] => Err(AuthError::MissingCredential),
        [found, credential] if *found == scheme => Ok(*credential),
        _ => Err(AuthError::MalformedHeader),
    }
}
