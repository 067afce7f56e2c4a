mod account;
mod auth;
mod cookies;
mod health_check;

pub use account::{current_user, update_account, update_avatar, update_cover_image};
pub use auth::{change_password, login, logout, refresh_token, register};
pub use cookies::{CookiePolicy, REFRESH_TOKEN_COOKIE};
pub use health_check::health_check;
