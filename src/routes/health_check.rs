use actix_web::{http::StatusCode, HttpResponse};

use crate::response::ApiResponse;

pub async fn health_check() -> HttpResponse {
    tracing::debug!("Health check endpoint called");
    HttpResponse::Ok().json(ApiResponse::new(StatusCode::OK, "OK", "Health check passed"))
}
