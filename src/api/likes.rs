use crate::api::shared::{parse_id, ApiResponse};
use crate::auth::AuthUser;
use crate::db::models::{Video, WithOwner};
use crate::db::query::PageParams;
use crate::db::schema::{comments, likes, tweets, videos};
use crate::db::toggle::{toggle_like, LikeTarget};
use crate::db::{with_owners, DbPool};
use crate::error::AppError;
use actix_web::web;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use serde_json::json;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/likes")
            .route("/toggle/vid/{video_id}", web::post().to(toggle_video_like))
            .route("/toggle/com/{comment_id}", web::post().to(toggle_comment_like))
            .route("/toggle/tweet/{tweet_id}", web::post().to(toggle_tweet_like))
            .route("/video/{video_id}", web::get().to(is_video_liked))
            .route("/videos", web::get().to(liked_videos)),
    );
}

async fn target_exists(conn: &mut AsyncPgConnection, target: LikeTarget) -> Result<bool, AppError> {
    let found = match target {
        LikeTarget::Video(id) => {
            diesel::select(diesel::dsl::exists(videos::table.find(id)))
                .get_result::<bool>(conn)
                .await?
        }
        LikeTarget::Comment(id) => {
            diesel::select(diesel::dsl::exists(comments::table.find(id)))
                .get_result::<bool>(conn)
                .await?
        }
        LikeTarget::Tweet(id) => {
            diesel::select(diesel::dsl::exists(tweets::table.find(id)))
                .get_result::<bool>(conn)
                .await?
        }
    };
    Ok(found)
}

async fn toggle(
    auth: AuthUser,
    pool: web::Data<DbPool>,
    target: LikeTarget,
    missing: &'static str,
) -> Result<ApiResponse, AppError> {
    let conn = &mut pool.get().await?;
    if !target_exists(conn, target).await? {
        return Err(AppError::not_found(missing));
    }

    let liked = toggle_like(conn, auth.id, target).await?.is_active();
    let message = if liked { "Liked" } else { "Like removed" };
    Ok(ApiResponse::ok(json!({ "liked": liked }), message))
}

pub async fn toggle_video_like(
    auth: AuthUser,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse, AppError> {
    let id = parse_id(&path, "videoId")?;
    toggle(auth, pool, LikeTarget::Video(id), "Video not found").await
}

pub async fn toggle_comment_like(
    auth: AuthUser,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse, AppError> {
    let id = parse_id(&path, "commentId")?;
    toggle(auth, pool, LikeTarget::Comment(id), "Comment not found").await
}

pub async fn toggle_tweet_like(
    auth: AuthUser,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse, AppError> {
    let id = parse_id(&path, "tweetId")?;
    toggle(auth, pool, LikeTarget::Tweet(id), "Tweet not found").await
}

pub async fn is_video_liked(
    auth: AuthUser,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse, AppError> {
    let video_id = parse_id(&path, "videoId")?;

    let conn = &mut pool.get().await?;
    let is_liked: bool = diesel::select(diesel::dsl::exists(
        likes::table
            .filter(likes::liked_by.eq(auth.id))
            .filter(likes::video_id.eq(video_id)),
    ))
    .get_result(conn)
    .await?;

    Ok(ApiResponse::ok(json!({ "isLiked": is_liked }), "Like status fetched"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikedVideoPage {
    pub liked_videos: Vec<WithOwner<Video>>,
    pub total_pages: i64,
}

pub async fn liked_videos(
    auth: AuthUser,
    params: web::Query<PageParams>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse<LikedVideoPage>, AppError> {
    let page = params.into_inner().into_request()?;
    let me = auth.id;

    let conn = &mut pool.get().await?;
    let total: i64 = likes::table
        .inner_join(videos::table.on(likes::video_id.eq(videos::id.nullable())))
        .filter(likes::liked_by.eq(me))
        .filter(videos::is_published.eq(true))
        .count()
        .get_result(conn)
        .await?;
    let rows = likes::table
        .inner_join(videos::table.on(likes::video_id.eq(videos::id.nullable())))
        .filter(likes::liked_by.eq(me))
        .filter(videos::is_published.eq(true))
        .order((likes::created_at.desc(), likes::id.desc()))
        .offset(page.offset())
        .limit(page.limit())
        .select(Video::as_select())
        .load::<Video>(conn)
        .await?;

    let listing = LikedVideoPage {
        liked_videos: with_owners(conn, rows).await?,
        total_pages: page.total_pages(total),
    };
    Ok(ApiResponse::ok(listing, "Liked videos fetched successfully"))
}
