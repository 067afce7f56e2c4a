/// Request Authorization Gate
///
/// Takes the access token from the `accessToken` cookie or an
/// `Authorization: Bearer` header (cookie first), resolves it to an identity
/// and injects the `PublicIdentity` into request extensions for handlers.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::error::{AppError, AuthError};
use crate::session::SessionCoordinator;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Middleware for protecting routes
pub struct AuthMiddleware {
    coordinator: web::Data<SessionCoordinator>,
}

impl AuthMiddleware {
    pub fn new(coordinator: web::Data<SessionCoordinator>) -> Self {
        Self { coordinator }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            coordinator: self.coordinator.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    coordinator: web::Data<SessionCoordinator>,
}

/// Extract the presented access token, preferring the cookie.
fn presented_token(req: &ServiceRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(ACCESS_TOKEN_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let coordinator = self.coordinator.clone();

        Box::pin(async move {
            let token = match presented_token(&req) {
                Some(token) => token,
                None => {
                    tracing::warn!(path = %req.path(), "Missing access token");
                    return Err(AppError::Auth(AuthError::MissingToken).into());
                }
            };

            let identity = coordinator.authenticate(&token).await?;
            tracing::debug!(user_id = %identity.id, "Access token validated");

            req.extensions_mut().insert(identity);
            service.call(req).await
        })
    }
}
