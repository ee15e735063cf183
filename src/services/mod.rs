pub mod auth;
pub use auth::{AuthError, AuthService, Claims, LoginOutcome, LoginRequest};
