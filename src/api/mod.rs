// src/api/mod.rs
pub mod comments;
pub mod dashboard;
pub mod health;
pub mod likes;
pub mod playlists;
pub mod shared;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;

use crate::error::AppError;
use actix_web::{web, HttpResponse};

pub fn configure(cfg: &mut web::ServiceConfig) {
    // Extractor failures go through the same error envelope as handler errors
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::bad_request(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::bad_request(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::bad_request(err.to_string()).into()),
    );

    cfg.service(
        web::scope("/api/v1")
            .configure(health::configure)
            .configure(users::configure)
            .configure(videos::configure)
            .configure(comments::configure)
            .configure(likes::configure)
            .configure(playlists::configure)
            .configure(subscriptions::configure)
            .configure(tweets::configure)
            .configure(dashboard::configure),
    );
}

pub async fn not_found() -> Result<HttpResponse, AppError> {
    Err(AppError::not_found("Route not found"))
}
