//! Application error type.
//!
//! Every handler returns `Result<_, AppError>`; the `ResponseError` impl below
//! is the one place errors become HTTP responses.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::pooled_connection::deadpool::PoolError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Database error: {0}")]
    Database(DieselError),

    #[error("Database pool error: {0}")]
    Pool(String),

    #[error("Media host error: {0}")]
    Media(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized(message.into())
    }

    /// Message safe to show a client. Server-side details stay in the log.
    fn public_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Pool(_) => "Database error".to_string(),
            AppError::Media(_) => "Media host request failed".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<DieselError> for AppError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => AppError::NotFound("Resource not found".to_string()),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                log::warn!("Unique violation: {}", info.message());
                AppError::Conflict("Already exists".to_string())
            }
            other => AppError::Database(other),
        }
    }
}

impl From<PoolError> for AppError {
    fn from(err: PoolError) -> Self {
        AppError::Pool(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Media(err.to_string())
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        AppError::BadRequest(format!("Invalid multipart payload: {err}"))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorEnvelope {
    status_code: u16,
    message: String,
    success: bool,
    errors: Vec<String>,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Media(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}", self);
        }

        HttpResponse::build(status).json(ErrorEnvelope {
            status_code: status.as_u16(),
            message: self.public_message(),
            success: false,
            errors: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_of(err: AppError) -> serde_json::Value {
        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[actix_web::test]
    async fn client_errors_keep_their_message() {
        let body = body_of(AppError::bad_request("videoId is required")).await;
        assert_eq!(body["statusCode"], 400);
        assert_eq!(body["message"], "videoId is required");
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"], serde_json::json!([]));
    }

    #[actix_web::test]
    async fn server_errors_hide_details() {
        let err = AppError::Internal(anyhow::anyhow!("connection reset by peer"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(err).await;
        assert_eq!(body["statusCode"], 500);
        assert_eq!(body["message"], "Internal server error");
    }

    #[test]
    fn diesel_not_found_maps_to_404() {
        let err = AppError::from(DieselError::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn unique_violation_hides_constraint() {
        let info = r#"duplicate key value violates unique constraint "users_email_key""#;
        let err = AppError::from(DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new(info.to_string()),
        ));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        let body = body_of(err).await;
        assert_eq!(body["message"], "Already exists");
    }

    #[test]
    fn client_variants_are_4xx() {
        for err in [
            AppError::bad_request("x"),
            AppError::unauthorized("x"),
            AppError::Forbidden("x".into()),
            AppError::not_found("x"),
            AppError::Conflict("x".into()),
            AppError::PayloadTooLarge("x".into()),
        ] {
            assert!(err.status_code().is_client_error(), "{err:?}");
        }
    }
}
