/// Session Routes
///
/// Registration, login, token refresh, logout and password change.

use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::auth::TokenPair;
use crate::domain::{NewIdentity, PublicIdentity};
use crate::error::{AppError, AuthError, ErrorContext, ValidationError};
use crate::response::ApiResponse;
use crate::routes::cookies::{CookiePolicy, REFRESH_TOKEN_COOKIE};
use crate::session::SessionCoordinator;

/// User registration request
///
/// File paths come from the upload handler in front of this service.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub avatar_path: Option<PathBuf>,
    pub cover_image_path: Option<PathBuf>,
}

/// Either `username` or `email` identifies the account.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: PublicIdentity,
    pub access_token: String,
    pub refresh_token: String,
}

fn with_session_cookies(
    status: StatusCode,
    policy: &CookiePolicy,
    tokens: &TokenPair,
    body: impl Serialize,
) -> HttpResponse {
    HttpResponse::build(status)
        .cookie(policy.access(&tokens.access_token))
        .cookie(policy.refresh(&tokens.refresh_token))
        .json(body)
}

/// POST /api/v1/users/register
///
/// # Errors
/// - 400: Missing or invalid username/email/password
/// - 409: Username or email already registered
/// - 500: Hashing, store or asset failure
pub async fn register(
    form: web::Json<RegisterRequest>,
    coordinator: web::Data<SessionCoordinator>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let identity = coordinator
        .register(NewIdentity {
            username: form.username,
            email: form.email,
            password: form.password,
            full_name: form.full_name,
            avatar_path: form.avatar_path,
            cover_image_path: form.cover_image_path,
        })
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::new(
        StatusCode::CREATED,
        identity,
        "User registered successfully",
    )))
}

/// POST /api/v1/users/login
///
/// Tokens are returned both as cookies and in the body for non-cookie clients.
///
/// # Errors
/// - 400: Neither username nor email given
/// - 404: No such user
/// - 401: Wrong password
pub async fn login(
    form: web::Json<LoginRequest>,
    coordinator: web::Data<SessionCoordinator>,
    policy: web::Data<CookiePolicy>,
) -> Result<HttpResponse, AppError> {
    let identifier = form
        .username
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .or(form.email.as_deref())
        .ok_or_else(|| ValidationError::EmptyField("username or email".to_string()))?;

    let outcome = coordinator.login(identifier, &form.password).await?;

    let body = ApiResponse::new(
        StatusCode::OK,
        LoginResponse {
            user: outcome.identity,
            access_token: outcome.tokens.access_token.clone(),
            refresh_token: outcome.tokens.refresh_token.clone(),
        },
        "User logged in successfully",
    );
    Ok(with_session_cookies(StatusCode::OK, &policy, &outcome.tokens, body))
}

/// POST /api/v1/users/refresh-token
///
/// Reads the refresh token from the `refreshToken` cookie, falling back to
/// the JSON body. The presented token is rotated out.
///
/// # Errors
/// - 401: Missing, invalid, expired or revoked refresh token
pub async fn refresh_token(
    req: HttpRequest,
    form: Option<web::Json<RefreshRequest>>,
    coordinator: web::Data<SessionCoordinator>,
    policy: web::Data<CookiePolicy>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    let from_cookie = req
        .cookie(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty());
    let presented = from_cookie
        .or_else(|| form.and_then(|f| f.into_inner().refresh_token))
        .filter(|v| !v.trim().is_empty())
        .ok_or(AppError::Auth(AuthError::MissingToken))?;

    let tokens = coordinator.refresh(&presented).await.map_err(|e| {
        context.log_error(&e);
        e
    })?;

    let body = ApiResponse::new(StatusCode::OK, &tokens, "Access token refreshed successfully");
    Ok(with_session_cookies(StatusCode::OK, &policy, &tokens, body))
}

/// POST /api/v1/users/logout
pub async fn logout(
    identity: web::ReqData<PublicIdentity>,
    coordinator: web::Data<SessionCoordinator>,
    policy: web::Data<CookiePolicy>,
) -> Result<HttpResponse, AppError> {
    coordinator.logout(identity.id).await?;

    let mut response = HttpResponse::Ok();
    for cookie in policy.removals() {
        response.cookie(cookie);
    }
    Ok(response.json(ApiResponse::new(
        StatusCode::OK,
        serde_json::json!({}),
        "User logged out successfully",
    )))
}

/// POST /api/v1/users/change-password
///
/// # Errors
/// - 400: Blank passwords
/// - 401: Old password does not match
pub async fn change_password(
    identity: web::ReqData<PublicIdentity>,
    form: web::Json<ChangePasswordRequest>,
    coordinator: web::Data<SessionCoordinator>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("change_password").with_user_id(identity.id.to_string());

    coordinator
        .change_password(identity.id, &form.old_password, &form.new_password)
        .await
        .map_err(|e| {
            context.log_error(&e);
            e
        })?;

    Ok(HttpResponse::Ok().json(ApiResponse::new(
        StatusCode::OK,
        serde_json::json!({}),
        "Password changed successfully",
    )))
}
