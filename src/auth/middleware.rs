//! Request authentication.
//!
//! Handlers that require a signed-in caller take an [`AuthUser`] argument.

use super::tokens::TokenKeys;
use crate::error::AppError;
use actix_web::dev::Payload;
use actix_web::http::header::{HeaderMap, AUTHORIZATION};
use actix_web::{web, FromRequest, HttpRequest};
use std::future::{ready, Ready};
use uuid::Uuid;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Identity of the caller, taken from a verified access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, AppError> {
    let keys = req
        .app_data::<web::Data<TokenKeys>>()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("token keys are not registered")))?;

    let token = req
        .cookie(ACCESS_COOKIE)
        .map(|c| c.value().to_owned())
        .filter(|t| !t.is_empty())
        .or_else(|| bearer_token(req.headers()))
        .ok_or_else(|| AppError::unauthorized("Unauthorized request"))?;

    let claims = keys.verify_access(&token)?;
    Ok(AuthUser {
        id: claims.sub,
        username: claims.username,
    })
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tokens::TokenSubject;
    use crate::config::AuthConfig;
    use actix_web::cookie::Cookie;
    use actix_web::test::TestRequest;

    fn keys() -> web::Data<TokenKeys> {
        web::Data::new(TokenKeys::new(&AuthConfig::default()))
    }

    fn token_for(keys: &TokenKeys, id: Uuid) -> String {
        keys.issue_access(&TokenSubject {
            id,
            email: "a@gmail.com",
            username: "a",
            full_name: "A",
        })
        .unwrap()
    }

    #[test]
    fn accepts_bearer_header() {
        let keys = keys();
        let id = Uuid::new_v4();
        let req = TestRequest::default()
            .app_data(keys.clone())
            .insert_header((AUTHORIZATION, format!("Bearer {}", token_for(&keys, id))))
            .to_http_request();
        assert_eq!(authenticate(&req).unwrap().id, id);
    }

    #[test]
    fn accepts_cookie() {
        let keys = keys();
        let id = Uuid::new_v4();
        let req = TestRequest::default()
            .app_data(keys.clone())
            .cookie(Cookie::new(ACCESS_COOKIE, token_for(&keys, id)))
            .to_http_request();
        assert_eq!(authenticate(&req).unwrap().username, "a");
    }

    #[test]
    fn missing_token_is_unauthorized() {
        let req = TestRequest::default().app_data(keys()).to_http_request();
        assert!(matches!(authenticate(&req), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn tampered_token_is_unauthorized() {
        let req = TestRequest::default()
            .app_data(keys())
            .insert_header((AUTHORIZATION, "Bearer abc.def.ghi"))
            .to_http_request();
        assert!(matches!(authenticate(&req), Err(AppError::Unauthorized(_))));
    }
}
