/// Middleware module
///
/// Request authorization for protected routes.

mod auth_middleware;

pub use auth_middleware::{AuthMiddleware, ACCESS_TOKEN_COOKIE};
