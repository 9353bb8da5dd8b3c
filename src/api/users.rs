use crate::api::shared::{
    expired_cookie, is_gmail, non_blank, parse_id, session_cookie, ApiResponse,
};
use crate::auth::middleware::{ACCESS_COOKIE, REFRESH_COOKIE};
use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::tokens::{TokenPair, TokenSubject};
use crate::auth::{AuthUser, TokenKeys};
use crate::config::AppConfig;
use crate::db::models::{AccountChanges, NewUser, User, Video, WithOwner};
use crate::db::schema::{subscriptions, users, videos};
use crate::db::{array_remove, in_id_order, with_owners, DbPool};
use crate::error::AppError;
use crate::services::media::{MediaHost, ResourceKind, UploadedMedia};
use crate::services::upload::collect_form;
use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/refresh-token", web::post().to(refresh_token))
            .route("/change-password", web::post().to(change_password))
            .route("/current-user", web::get().to(current_user))
            .route("/update-account", web::patch().to(update_account))
            .route("/check-username", web::post().to(check_username))
            .route("/update-avatar", web::patch().to(update_avatar))
            .route("/update-cover", web::patch().to(update_cover))
            .route("/channel/{username}", web::get().to(channel_profile))
            .route("/history", web::get().to(watch_history))
            .route("/delete-history/{video_id}", web::patch().to(delete_history)),
    );
}

fn subject(user: &User) -> TokenSubject<'_> {
    TokenSubject {
        id: user.id,
        email: &user.email,
        username: &user.username,
        full_name: &user.full_name,
    }
}

fn session_cookies(pair: &TokenPair) -> Vec<actix_web::cookie::Cookie<'static>> {
    vec![
        session_cookie(ACCESS_COOKIE, pair.access_token.clone()),
        session_cookie(REFRESH_COOKIE, pair.refresh_token.clone()),
    ]
}

/// Issues a token pair and stores the refresh token on the user row.
async fn start_session(
    conn: &mut AsyncPgConnection,
    keys: &TokenKeys,
    user: &User,
) -> Result<TokenPair, AppError> {
    let pair = keys.issue_pair(&subject(user))?;
    diesel::update(users::table.find(user.id))
        .set(users::refresh_token.eq(Some(pair.refresh_token.as_str())))
        .execute(conn)
        .await?;
    Ok(pair)
}

async fn find_user(conn: &mut AsyncPgConnection, id: Uuid) -> Result<User, AppError> {
    users::table
        .find(id)
        .select(User::as_select())
        .first::<User>(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found("User does not exist"))
}

async fn username_taken(conn: &mut AsyncPgConnection, username: &str) -> Result<bool, AppError> {
    Ok(
        diesel::select(diesel::dsl::exists(
            users::table.filter(users::username.eq(username)),
        ))
        .get_result::<bool>(conn)
        .await?,
    )
}

const REGISTER_FIELDS: &[&str] = &[
    "fullName",
    "email",
    "username",
    "password",
    "avatar",
    "coverImage",
];

pub async fn register(
    payload: Multipart,
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    media: web::Data<MediaHost>,
) -> Result<ApiResponse<User>, AppError> {
    let mut form = collect_form(payload, REGISTER_FIELDS, &config.storage).await?;

    let (Some(full_name), Some(email), Some(username), Some(password)) = (
        form.text("fullName"),
        form.text("email"),
        form.text("username"),
        form.text("password"),
    ) else {
        return Err(AppError::bad_request("All fields are required"));
    };

    if !is_gmail(email) {
        return Err(AppError::bad_request("Only Gmail addresses are accepted"));
    }

    let full_name = full_name.to_string();
    let email = email.to_lowercase();
    let username = username.to_lowercase();
    let password = password.to_string();

    let avatar = form
        .take_file("avatar")
        .ok_or_else(|| AppError::bad_request("Avatar file is required"))?;
    let cover = form.take_file("coverImage");

    let conn = &mut pool.get().await?;

    if username_taken(conn, &username).await? {
        return Err(AppError::Conflict("Username already exists".into()));
    }
    let email_taken: bool = diesel::select(diesel::dsl::exists(
        users::table.filter(users::email.eq(&email)),
    ))
    .get_result(conn)
    .await?;
    if email_taken {
        return Err(AppError::Conflict("User with this email already exists".into()));
    }

    let password = hash_password_blocking(password).await?;

    let avatar = media.upload(avatar, ResourceKind::Image, None).await?;
    let cover = match cover {
        Some(file) => match media.upload(file, ResourceKind::Image, None).await {
            Ok(uploaded) => Some(uploaded),
            Err(e) => {
                media.discard(&avatar.public_id, ResourceKind::Image).await;
                return Err(e);
            }
        },
        None => None,
    };

    let now = Utc::now().naive_utc();
    let new_user = NewUser {
        id: Uuid::new_v4(),
        username,
        email,
        full_name,
        avatar: avatar.url.clone(),
        avatar_public_id: avatar.public_id.clone(),
        cover_image: cover.as_ref().map(|c| c.url.clone()).unwrap_or_default(),
        cover_image_public_id: cover
            .as_ref()
            .map(|c| c.public_id.clone())
            .unwrap_or_default(),
        password,
        created_at: now,
        updated_at: now,
    };

    let inserted = diesel::insert_into(users::table)
        .values(&new_user)
        .returning(User::as_returning())
        .get_result(conn)
        .await;

    match inserted {
        Ok(user) => {
            log::info!("Registered user {} ({})", user.username, user.id);
            Ok(ApiResponse::created(user, "User registered successfully"))
        }
        Err(e) => {
            media.discard(&avatar.public_id, ResourceKind::Image).await;
            if let Some(cover) = &cover {
                media.discard(&cover.public_id, ResourceKind::Image).await;
            }
            Err(e.into())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionData {
    user: User,
    access_token: String,
    refresh_token: String,
}

pub async fn login(
    body: web::Json<LoginRequest>,
    pool: web::Data<DbPool>,
    keys: web::Data<TokenKeys>,
) -> Result<HttpResponse, AppError> {
    let username = non_blank(body.username.as_deref()).map(str::to_lowercase);
    let email = non_blank(body.email.as_deref()).map(str::to_lowercase);

    if username.is_none() && email.is_none() {
        return Err(AppError::bad_request("username or email is required"));
    }
    if email.as_deref().is_some_and(|e| !is_gmail(e)) {
        return Err(AppError::bad_request("Only Gmail addresses are accepted"));
    }
    let password = non_blank(body.password.as_deref())
        .ok_or_else(|| AppError::bad_request("Password is required"))?
        .to_string();

    let conn = &mut pool.get().await?;

    // A NULL comparison never matches, so an absent key drops out of the OR
    let user = users::table
        .filter(
            users::username
                .nullable()
                .eq(username)
                .or(users::email.nullable().eq(email)),
        )
        .select(User::as_select())
        .first::<User>(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found("User does not exist"))?;

    if !verify_password_blocking(password, user.password.clone()).await? {
        return Err(AppError::unauthorized("Invalid user credentials"));
    }

    let pair = start_session(conn, &keys, &user).await?;
    let cookies = session_cookies(&pair);
    let data = SessionData {
        user,
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    };

    Ok(ApiResponse::ok(data, "User logged in successfully").with_cookies(cookies))
}

pub async fn logout(auth: AuthUser, pool: web::Data<DbPool>) -> Result<HttpResponse, AppError> {
    let conn = &mut pool.get().await?;
    diesel::update(users::table.find(auth.id))
        .set(users::refresh_token.eq(None::<String>))
        .execute(conn)
        .await?;

    Ok(ApiResponse::empty("User logged out").with_cookies(vec![
        expired_cookie(ACCESS_COOKIE),
        expired_cookie(REFRESH_COOKIE),
    ]))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

pub async fn refresh_token(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    pool: web::Data<DbPool>,
    keys: web::Data<TokenKeys>,
) -> Result<HttpResponse, AppError> {
    let incoming = req
        .cookie(REFRESH_COOKIE)
        .map(|c| c.value().to_owned())
        .filter(|t| !t.is_empty())
        .or_else(|| body.and_then(|b| b.into_inner().refresh_token))
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::unauthorized("Unauthorized request"))?;

    let claims = keys.verify_refresh(&incoming)?;

    let conn = &mut pool.get().await?;
    let user = users::table
        .find(claims.sub)
        .select(User::as_select())
        .first::<User>(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::unauthorized("Invalid refresh token"))?;

    if user.refresh_token.as_deref() != Some(incoming.as_str()) {
        return Err(AppError::unauthorized("Refresh token is expired or used"));
    }

    let pair = start_session(conn, &keys, &user).await?;
    let cookies = session_cookies(&pair);
    let data = json!({
        "accessToken": pair.access_token,
        "refreshToken": pair.refresh_token,
    });

    Ok(ApiResponse::ok(data, "Access token refreshed").with_cookies(cookies))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

pub async fn change_password(
    auth: AuthUser,
    body: web::Json<ChangePasswordRequest>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse, AppError> {
    let (Some(old_password), Some(new_password)) = (
        non_blank(body.old_password.as_deref()),
        non_blank(body.new_password.as_deref()),
    ) else {
        return Err(AppError::bad_request("Old and new passwords are required"));
    };
    let (old_password, new_password) = (old_password.to_string(), new_password.to_string());

    let conn = &mut pool.get().await?;
    let user = find_user(conn, auth.id).await?;

    if !verify_password_blocking(old_password, user.password.clone()).await? {
        return Err(AppError::bad_request("Invalid old password"));
    }

    let hashed = hash_password_blocking(new_password).await?;
    diesel::update(users::table.find(user.id))
        .set((
            users::password.eq(hashed),
            users::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)
        .await?;

    Ok(ApiResponse::empty("Password changed successfully"))
}

pub async fn current_user(
    auth: AuthUser,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse<User>, AppError> {
    let conn = &mut pool.get().await?;
    let user = find_user(conn, auth.id).await?;
    Ok(ApiResponse::ok(user, "Current user fetched successfully"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

pub async fn update_account(
    auth: AuthUser,
    body: web::Json<UpdateAccountRequest>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse<User>, AppError> {
    let full_name = non_blank(body.full_name.as_deref()).map(str::to_string);
    let email = non_blank(body.email.as_deref()).map(str::to_lowercase);

    if full_name.is_none() && email.is_none() {
        return Err(AppError::bad_request("At least one field is required"));
    }
    if email.as_deref().is_some_and(|e| !is_gmail(e)) {
        return Err(AppError::bad_request("Only Gmail addresses are accepted"));
    }

    let conn = &mut pool.get().await?;
    let user = diesel::update(users::table.find(auth.id))
        .set(&AccountChanges {
            full_name,
            email,
            updated_at: Utc::now().naive_utc(),
        })
        .returning(User::as_returning())
        .get_result(conn)
        .await?;

    Ok(ApiResponse::ok(user, "Account details updated successfully"))
}

#[derive(Debug, Deserialize)]
pub struct CheckUsernameRequest {
    pub username: Option<String>,
}

pub async fn check_username(
    body: web::Json<CheckUsernameRequest>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse, AppError> {
    let username = non_blank(body.username.as_deref())
        .ok_or_else(|| AppError::bad_request("Username is required"))?
        .to_lowercase();

    let conn = &mut pool.get().await?;
    let matched = username_taken(conn, &username).await?;
    let message = if matched {
        "Username already taken"
    } else {
        "Username is available"
    };

    Ok(ApiResponse::ok(json!({ "usernameMatched": matched }), message))
}

#[derive(Debug, Clone, Copy)]
enum ProfileImage {
    Avatar,
    Cover,
}

impl ProfileImage {
    fn field(self) -> &'static str {
        match self {
            ProfileImage::Avatar => "avatar",
            ProfileImage::Cover => "coverImage",
        }
    }

    fn public_id(self, user: &User) -> &str {
        match self {
            ProfileImage::Avatar => &user.avatar_public_id,
            ProfileImage::Cover => &user.cover_image_public_id,
        }
    }
}

async fn store_profile_image(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
    slot: ProfileImage,
    uploaded: &UploadedMedia,
) -> Result<User, diesel::result::Error> {
    let target = users::table.find(user_id);
    let now = Utc::now().naive_utc();
    match slot {
        ProfileImage::Avatar => {
            diesel::update(target)
                .set((
                    users::avatar.eq(&uploaded.url),
                    users::avatar_public_id.eq(&uploaded.public_id),
                    users::updated_at.eq(now),
                ))
                .returning(User::as_returning())
                .get_result(conn)
                .await
        }
        ProfileImage::Cover => {
            diesel::update(target)
                .set((
                    users::cover_image.eq(&uploaded.url),
                    users::cover_image_public_id.eq(&uploaded.public_id),
                    users::updated_at.eq(now),
                ))
                .returning(User::as_returning())
                .get_result(conn)
                .await
        }
    }
}

async fn replace_profile_image(
    auth: AuthUser,
    payload: Multipart,
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    media: web::Data<MediaHost>,
    slot: ProfileImage,
) -> Result<User, AppError> {
    let mut form = collect_form(payload, &[slot.field()], &config.storage).await?;
    let file = form
        .take_file(slot.field())
        .ok_or_else(|| AppError::bad_request(format!("{} file is missing", slot.field())))?;

    let conn = &mut pool.get().await?;
    let previous = find_user(conn, auth.id).await?;

    let uploaded = media.upload(file, ResourceKind::Image, None).await?;
    let user = match store_profile_image(conn, auth.id, slot, &uploaded).await {
        Ok(user) => user,
        Err(e) => {
            media.discard(&uploaded.public_id, ResourceKind::Image).await;
            return Err(e.into());
        }
    };

    media
        .discard(slot.public_id(&previous), ResourceKind::Image)
        .await;
    Ok(user)
}

pub async fn update_avatar(
    auth: AuthUser,
    payload: Multipart,
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    media: web::Data<MediaHost>,
) -> Result<ApiResponse<User>, AppError> {
    let user =
        replace_profile_image(auth, payload, pool, config, media, ProfileImage::Avatar).await?;
    Ok(ApiResponse::ok(user, "Avatar updated successfully"))
}

pub async fn update_cover(
    auth: AuthUser,
    payload: Multipart,
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    media: web::Data<MediaHost>,
) -> Result<ApiResponse<User>, AppError> {
    let user =
        replace_profile_image(auth, payload, pool, config, media, ProfileImage::Cover).await?;
    Ok(ApiResponse::ok(user, "Cover image updated successfully"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub subscribers_count: i64,
    pub channels_subscribed_to_count: i64,
    pub is_subscribed: bool,
}

pub async fn channel_profile(
    auth: AuthUser,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse<ChannelProfile>, AppError> {
    let username = non_blank(Some(path.as_str()))
        .ok_or_else(|| AppError::bad_request("Username is missing"))?
        .to_lowercase();

    let conn = &mut pool.get().await?;
    let channel = users::table
        .filter(users::username.eq(&username))
        .select(User::as_select())
        .first::<User>(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found("Channel does not exist"))?;

    let subscribers_count: i64 = subscriptions::table
        .filter(subscriptions::channel_id.eq(channel.id))
        .count()
        .get_result(conn)
        .await?;
    let channels_subscribed_to_count: i64 = subscriptions::table
        .filter(subscriptions::subscriber_id.eq(channel.id))
        .count()
        .get_result(conn)
        .await?;
    let is_subscribed: bool = diesel::select(diesel::dsl::exists(
        subscriptions::table
            .filter(subscriptions::channel_id.eq(channel.id))
            .filter(subscriptions::subscriber_id.eq(auth.id)),
    ))
    .get_result(conn)
    .await?;

    let profile = ChannelProfile {
        id: channel.id,
        username: channel.username,
        full_name: channel.full_name,
        avatar: channel.avatar,
        cover_image: channel.cover_image,
        subscribers_count,
        channels_subscribed_to_count,
        is_subscribed,
    };
    Ok(ApiResponse::ok(profile, "User channel fetched successfully"))
}

pub async fn watch_history(
    auth: AuthUser,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse<Vec<WithOwner<Video>>>, AppError> {
    let conn = &mut pool.get().await?;
    let user = find_user(conn, auth.id).await?;

    let watched = videos::table
        .filter(videos::id.eq_any(&user.watch_history))
        .select(Video::as_select())
        .load::<Video>(conn)
        .await?;
    let watched = in_id_order(&user.watch_history, watched, |v| v.id);
    let history = with_owners(conn, watched).await?;

    Ok(ApiResponse::ok(history, "Watch history fetched successfully"))
}

pub async fn delete_history(
    auth: AuthUser,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse, AppError> {
    let video_id = parse_id(&path, "videoId")?;

    let conn = &mut pool.get().await?;
    let updated = diesel::update(
        users::table
            .find(auth.id)
            .filter(users::watch_history.contains(vec![video_id])),
    )
    .set(users::watch_history.eq(array_remove(users::watch_history, video_id)))
    .execute(conn)
    .await?;
    let removed = updated > 0;

    let message = if removed {
        "Video removed from watch history"
    } else {
        "Video was not in watch history"
    };
    Ok(ApiResponse::ok(json!({ "removed": removed }), message))
}

#[cfg(test)]
mod tests {
    use crate::services::upload::tests::{content_type, encode, Part};
    use crate::test_support::bearer_for;
    use actix_web::http::header::{AUTHORIZATION, CONTENT_TYPE};
    use actix_web::test;
    use serde_json::{json, Value};
    use uuid::Uuid;

    fn register_request(parts: &[Part<'_>]) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/v1/users/register")
            .insert_header((CONTENT_TYPE, content_type()))
            .set_payload(encode(parts))
    }

    #[actix_web::test]
    async fn register_rejects_non_gmail_before_touching_the_database() {
        let app = test_app!();
        let req = register_request(&[
            Part::Text("fullName", "Jo Doe"),
            Part::Text("email", "jo@yahoo.com"),
            Part::Text("username", "jo"),
            Part::Text("password", "secret"),
            Part::File("avatar", "a.png", b"png"),
        ])
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Only Gmail addresses are accepted");
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn register_requires_every_text_field() {
        let app = test_app!();
        let req = register_request(&[
            Part::Text("fullName", "Jo Doe"),
            Part::Text("email", "jo@gmail.com"),
            Part::Text("username", "   "),
            Part::Text("password", "secret"),
        ])
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "All fields are required");
    }

    #[actix_web::test]
    async fn register_requires_avatar() {
        let app = test_app!();
        let req = register_request(&[
            Part::Text("fullName", "Jo Doe"),
            Part::Text("email", "jo@gmail.com"),
            Part::Text("username", "jo"),
            Part::Text("password", "secret"),
            Part::File("coverImage", "c.png", b"png"),
        ])
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Avatar file is required");
    }

    #[actix_web::test]
    async fn login_needs_username_or_email() {
        let app = test_app!();
        let req = test::TestRequest::post()
            .uri("/api/v1/users/login")
            .set_json(json!({ "password": "secret" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn login_with_non_gmail_email_is_rejected() {
        let app = test_app!();
        let req = test::TestRequest::post()
            .uri("/api/v1/users/login")
            .set_json(json!({ "email": "jo@outlook.com", "password": "secret" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn malformed_json_uses_error_envelope() {
        let app = test_app!();
        let req = test::TestRequest::post()
            .uri("/api/v1/users/login")
            .insert_header((CONTENT_TYPE, "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn current_user_requires_a_token() {
        let app = test_app!();
        let req = test::TestRequest::get()
            .uri("/api/v1/users/current-user")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Unauthorized request");
    }

    #[actix_web::test]
    async fn refresh_without_any_token_is_unauthorized() {
        let app = test_app!();
        let req = test::TestRequest::post()
            .uri("/api/v1/users/refresh-token")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }

    #[actix_web::test]
    async fn update_account_needs_a_field() {
        let app = test_app!();
        let req = test::TestRequest::patch()
            .uri("/api/v1/users/update-account")
            .insert_header((AUTHORIZATION, bearer_for(Uuid::new_v4())))
            .set_json(json!({ "fullName": " " }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "At least one field is required");
    }

    #[actix_web::test]
    async fn update_avatar_requires_the_file() {
        let app = test_app!();
        let req = test::TestRequest::patch()
            .uri("/api/v1/users/update-avatar")
            .insert_header((AUTHORIZATION, bearer_for(Uuid::new_v4())))
            .insert_header((CONTENT_TYPE, content_type()))
            .set_payload(encode(&[Part::Text("note", "no file")]))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn delete_history_rejects_bad_id() {
        let app = test_app!();
        let req = test::TestRequest::patch()
            .uri("/api/v1/users/delete-history/not-a-uuid")
            .insert_header((AUTHORIZATION, bearer_for(Uuid::new_v4())))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Invalid videoId");
    }
}
