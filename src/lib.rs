//! Credential verification and session lifecycle.
//!
//! - [`auth`]: password hashing, access tokens, refresh tokens, header parsing
//! - [`store`]: the Resource Store traits and their adapters
//! - [`startup`]: the actix-web service wiring the core into login, refresh
//!   and revoke endpoints

pub mod auth;
pub mod configuration;
pub mod error;
pub mod logger;
pub mod middleware;
pub mod routes;
pub mod startup;
pub mod store;
pub mod telemetry;
