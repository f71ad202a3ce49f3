//! Session Routes
//!
//! Login, access token refresh, refresh token revocation and the current
//! user endpoint. Handlers only orchestrate the auth core; every failure is
//! tagged with the handler's request id and rendered by `RequestError`.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{
    extract_bearer, issue_access_token, PasswordVerifier, RefreshTokenManager, BEARER_SCHEME,
};
use crate::configuration::AuthSettings;
use crate::error::{AuthError, ErrorContext, RequestError};
use crate::middleware::AuthenticatedUser;
use crate::store::{with_deadline, CredentialStore};

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response with access and refresh tokens
#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: String,
    pub token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Refresh response carrying a new access token
#[derive(Serialize, Deserialize)]
pub struct RefreshResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Serialize, Deserialize)]
pub struct CurrentUserResponse {
    pub user_id: String,
}

/// POST /api/login
///
/// Verifies email and password, then issues an access token and a refresh
/// token.
///
/// # Errors
/// - 401: unknown email or wrong password (same response and bcrypt work for both)
/// - 500/503: token generation or storage failure, including the store deadline
pub async fn login(
    form: web::Json<LoginRequest>,
    credentials: web::Data<dyn CredentialStore>,
    verifier: web::Data<PasswordVerifier>,
    refresh_tokens: web::Data<RefreshTokenManager>,
    auth_config: web::Data<AuthSettings>,
) -> Result<HttpResponse, RequestError> {
    let context = ErrorContext::new("user_login");

    let credential = with_deadline(
        auth_config.store_timeout(),
        credentials.find_credential_by_email(form.email.trim()),
    )
    .await
    .map_err(|e| context.fail(e))?;

    verifier
        .verify(
            &form.password,
            credential.as_ref().map(|c| c.password_hash.as_str()),
        )
        .map_err(|e| context.fail(e))?;
    let user_id = credential
        .map(|c| c.user_id)
        .ok_or_else(|| context.fail(AuthError::InvalidCredential))?;

    let ttl = auth_config.access_token_ttl().map_err(|e| context.fail(e))?;
    let token =
        issue_access_token(user_id, &auth_config.jwt_secret, ttl).map_err(|e| context.fail(e))?;
    let refresh_token = refresh_tokens
        .create(user_id)
        .await
        .map_err(|e| context.fail(e))?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(LoginResponse {
        user_id: user_id.to_string(),
        token,
        refresh_token,
        token_type: BEARER_SCHEME.to_string(),
        expires_in: auth_config.access_token_ttl_seconds,
    }))
}

/// POST /api/refresh
///
/// Exchanges `Authorization: Bearer <refresh_token>` for a new access token.
/// The refresh token itself is left untouched and stays usable until it
/// expires or is revoked.
///
/// # Errors
/// - 401: missing header, or unknown, revoked or expired refresh token
pub async fn refresh(
    req: HttpRequest,
    refresh_tokens: web::Data<RefreshTokenManager>,
    auth_config: web::Data<AuthSettings>,
) -> Result<HttpResponse, RequestError> {
    let context = ErrorContext::new("token_refresh");

    let refresh_token = extract_bearer(req.headers()).map_err(|e| context.fail(e))?;
    let user_id = refresh_tokens
        .authenticate(&refresh_token)
        .await
        .map_err(|e| context.fail(e))?;
    let ttl = auth_config.access_token_ttl().map_err(|e| context.fail(e))?;
    let token =
        issue_access_token(user_id, &auth_config.jwt_secret, ttl).map_err(|e| context.fail(e))?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        "Access token refreshed"
    );

    Ok(HttpResponse::Ok().json(RefreshResponse {
        token,
        token_type: BEARER_SCHEME.to_string(),
        expires_in: auth_config.access_token_ttl_seconds,
    }))
}

/// POST /api/revoke
///
/// Revokes the refresh token in `Authorization: Bearer <refresh_token>`.
///
/// # Errors
/// - 401: missing header or unknown refresh token
pub async fn revoke(
    req: HttpRequest,
    refresh_tokens: web::Data<RefreshTokenManager>,
) -> Result<HttpResponse, RequestError> {
    let context = ErrorContext::new("token_revoke");

    let refresh_token = extract_bearer(req.headers()).map_err(|e| context.fail(e))?;
    refresh_tokens
        .revoke(&refresh_token)
        .await
        .map_err(|e| context.fail(e))?;

    tracing::info!(request_id = %context.request_id, "Refresh token revoked");

    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/me
///
/// **Requires a valid access token**; the user is injected by `JwtMiddleware`.
pub async fn current_user(user: web::ReqData<AuthenticatedUser>) -> HttpResponse {
    HttpResponse::Ok().json(CurrentUserResponse {
        user_id: user.user_id.to_string(),
    })
}
