use crate::error::AppError;
use actix_web::body::BoxBody;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, Responder};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

/// Success envelope shared by every endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T = serde_json::Value> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
            message: message.into(),
            success: status.as_u16() < 400,
        }
    }

    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, data, message)
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CREATED, data, message)
    }

    fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK)
    }

    pub fn with_cookies(self, cookies: Vec<Cookie<'static>>) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status());
        for cookie in cookies {
            builder.cookie(cookie);
        }
        builder.json(self)
    }
}

impl ApiResponse {
    /// Envelope with an empty object as data.
    pub fn empty(message: impl Into<String>) -> Self {
        Self::ok(json!({}), message)
    }
}

impl<T: Serialize> Responder for ApiResponse<T> {
    type Body = BoxBody;

    fn respond_to(self, _req: &HttpRequest) -> HttpResponse<Self::Body> {
        HttpResponse::build(self.status()).json(self)
    }
}

/// Parses a path or query identifier, naming the offending field on failure.
pub fn parse_id(raw: &str, field: &str) -> Result<Uuid, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::bad_request(format!("{field} is required")));
    }
    Uuid::parse_str(raw).map_err(|_| AppError::bad_request(format!("Invalid {field}")))
}

/// Trimmed, non-empty text or `None`.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Only Gmail addresses are accepted for accounts.
pub fn is_gmail(email: &str) -> bool {
    let email = email.trim().to_lowercase();
    match email.strip_suffix("@gmail.com") {
        Some(local) => !local.is_empty() && !local.contains('@'),
        None => false,
    }
}

pub fn session_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .finish()
}

pub fn expired_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = session_cookie(name, String::new());
    cookie.make_removal();
    cookie
}
