/// Session cookie policy
///
/// Tokens travel in `HttpOnly` cookies, `Secure` only in production.

use actix_web::cookie::Cookie;

use crate::configuration::Environment;
use crate::middleware::ACCESS_TOKEN_COOKIE;

pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    secure: bool,
}

impl CookiePolicy {
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            secure: environment == Environment::Production,
        }
    }

    fn build(&self, name: &'static str, value: String) -> Cookie<'static> {
        Cookie::build(name, value)
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .finish()
    }

    pub fn access(&self, token: &str) -> Cookie<'static> {
        self.build(ACCESS_TOKEN_COOKIE, token.to_string())
    }

    pub fn refresh(&self, token: &str) -> Cookie<'static> {
        self.build(REFRESH_TOKEN_COOKIE, token.to_string())
    }

    /// Expired, emptied versions of both session cookies.
    pub fn removals(&self) -> [Cookie<'static>; 2] {
        let mut access = self.build(ACCESS_TOKEN_COOKIE, String::new());
        let mut refresh = self.build(REFRESH_TOKEN_COOKIE, String::new());
        access.make_removal();
        refresh.make_removal();
        [access, refresh]
    }
}
