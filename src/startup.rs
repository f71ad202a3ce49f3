use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{PasswordVerifier, RefreshTokenManager};
use crate::configuration::AuthSettings;
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{current_user, health_check, login, refresh, revoke};
use crate::store::{CredentialStore, RefreshTokenStore};

pub fn run(
    listener: TcpListener,
    refresh_store: Arc<dyn RefreshTokenStore>,
    credential_store: Arc<dyn CredentialStore>,
    auth_config: AuthSettings,
) -> Result<Server, std::io::Error> {
    let invalid_config =
        |e: String| std::io::Error::new(std::io::ErrorKind::InvalidInput, e);

    let refresh_lifetime = auth_config
        .refresh_token_lifetime()
        .map_err(|e| invalid_config(e.to_string()))?;
    let refresh_tokens = web::Data::new(
        RefreshTokenManager::new(refresh_store)
            .with_lifetime(refresh_lifetime)
            .with_store_timeout(auth_config.store_timeout()),
    );
    let password_verifier = web::Data::new(
        PasswordVerifier::new(&auth_config.password_hasher())
            .map_err(|e| invalid_config(e.to_string()))?,
    );
    let credentials: web::Data<dyn CredentialStore> = web::Data::from(credential_store);
    let jwt_secret = auth_config.jwt_secret.clone();
    let auth_config = web::Data::new(auth_config);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(LoggerMiddleware)
            // Shared state
            .app_data(refresh_tokens.clone())
            .app_data(credentials.clone())
            .app_data(password_verifier.clone())
            .app_data(auth_config.clone())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api")
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/revoke", web::post().to(revoke))
                    // Protected routes (require a valid access token)
                    .service(
                        web::resource("/me")
                            .wrap(JwtMiddleware::new(&jwt_secret))
                            .route(web::get().to(current_user)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
