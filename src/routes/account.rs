/// Account Routes
///
/// Profile reads and updates for the authenticated identity. All routes sit
/// behind the authorization gate.

use actix_web::{http::StatusCode, web, HttpResponse};
use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::PublicIdentity;
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::session::SessionCoordinator;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub full_name: String,
    pub email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarRequest {
    pub avatar_path: PathBuf,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverImageRequest {
    pub cover_image_path: PathBuf,
}

fn ok(identity: PublicIdentity, message: &str) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::new(StatusCode::OK, identity, message))
}

/// GET /api/v1/users/current-user
pub async fn current_user(
    identity: web::ReqData<PublicIdentity>,
    coordinator: web::Data<SessionCoordinator>,
) -> Result<HttpResponse, AppError> {
    let identity = coordinator.current_identity(identity.id).await?;
    Ok(ok(identity, "Current user fetched successfully"))
}

/// PATCH /api/v1/users/update-account
///
/// # Errors
/// - 400: Blank or invalid full name / email
/// - 409: Email belongs to another account
pub async fn update_account(
    identity: web::ReqData<PublicIdentity>,
    form: web::Json<UpdateAccountRequest>,
    coordinator: web::Data<SessionCoordinator>,
) -> Result<HttpResponse, AppError> {
    let identity = coordinator
        .update_account(identity.id, &form.full_name, &form.email)
        .await?;
    Ok(ok(identity, "Account details updated successfully"))
}

/// PATCH /api/v1/users/avatar
pub async fn update_avatar(
    identity: web::ReqData<PublicIdentity>,
    form: web::Json<AvatarRequest>,
    coordinator: web::Data<SessionCoordinator>,
) -> Result<HttpResponse, AppError> {
    let identity = coordinator
        .update_avatar(identity.id, &form.avatar_path)
        .await?;
    Ok(ok(identity, "Avatar updated successfully"))
}

/// PATCH /api/v1/users/cover-image
pub async fn update_cover_image(
    identity: web::ReqData<PublicIdentity>,
    form: web::Json<CoverImageRequest>,
    coordinator: web::Data<SessionCoordinator>,
) -> Result<HttpResponse, AppError> {
    let identity = coordinator
        .update_cover_image(identity.id, &form.cover_image_path)
        .await?;
    Ok(ok(identity, "Cover image updated successfully"))
}
