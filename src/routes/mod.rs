mod auth;
mod health_check;

pub use auth::{
    current_user, login, refresh, revoke, CurrentUserResponse, LoginRequest, LoginResponse,
    RefreshResponse,
};
pub use health_check::health_check;
