use crate::api::shared::{parse_id, ApiResponse};
use crate::auth::{ensure_owner, AuthUser};
use crate::config::AppConfig;
use crate::db::models::{NewVideo, OwnerSummary, Video, VideoChanges, WithOwner};
use crate::db::query::{PageRequest, SortOrder, VideoQuery};
use crate::db::schema::{subscriptions, users, videos};
use crate::db::{array_append, with_owners, DbPool};
use crate::error::AppError;
use crate::services::media::{MediaHost, ResourceKind};
use crate::services::upload::collect_form;
use actix_multipart::Multipart;
use actix_web::web;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/videos")
            .route("", web::get().to(list_videos))
            .route("", web::post().to(publish_video))
            .route("/watch/{video_id}", web::get().to(watch_video))
            .route("/watch/{video_id}", web::patch().to(add_view))
            .route("/toggle/publish/{video_id}", web::patch().to(toggle_publish))
            .route("/{video_id}", web::patch().to(update_video))
            .route("/{video_id}", web::delete().to(delete_video)),
    );
}

/// `?page=&limit=&query=&sortBy=&userId=` on video listings.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VideoListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub query: Option<String>,
    pub sort_by: Option<String>,
    pub user_id: Option<String>,
}

impl VideoListParams {
    /// Validates paging and sorting and builds the shared part of the query.
    pub fn listing_query(&self) -> Result<(VideoQuery, PageRequest), AppError> {
        let page = PageRequest::new(self.page, self.limit)?;
        let sort = SortOrder::parse(self.sort_by.as_deref())?;
        let query = VideoQuery::new()
            .title_contains(self.query.as_deref())
            .sorted_by_duration(sort);
        Ok((query, page))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoPage {
    pub videos: Vec<WithOwner<Video>>,
    pub total_pages: i64,
}

/// Runs `query` and attaches owner profiles to the page.
pub async fn load_video_page(
    conn: &mut AsyncPgConnection,
    query: &VideoQuery,
    page: PageRequest,
) -> Result<VideoPage, AppError> {
    let paged = query.load(conn, page).await?;
    Ok(VideoPage {
        videos: with_owners(conn, paged.items).await?,
        total_pages: paged.total_pages,
    })
}

async fn find_video(conn: &mut AsyncPgConnection, id: Uuid) -> Result<Video, AppError> {
    videos::table
        .find(id)
        .select(Video::as_select())
        .first::<Video>(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found("Video not found"))
}

pub async fn list_videos(
    params: web::Query<VideoListParams>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse<VideoPage>, AppError> {
    let (mut query, page) = params.listing_query()?;
    query = query.published_only();
    if let Some(raw) = params.user_id.as_deref() {
        query = query.owned_by(parse_id(raw, "userId")?);
    }

    let conn = &mut pool.get().await?;
    let listing = load_video_page(conn, &query, page).await?;
    Ok(ApiResponse::ok(listing, "Videos fetched successfully"))
}

const PUBLISH_FIELDS: &[&str] = &["title", "description", "videoFile", "thumbnail"];
const UPDATE_FIELDS: &[&str] = &["title", "description", "thumbnail"];

pub async fn publish_video(
    auth: AuthUser,
    payload: Multipart,
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    media: web::Data<MediaHost>,
) -> Result<ApiResponse<Video>, AppError> {
    let mut form = collect_form(payload, PUBLISH_FIELDS, &config.storage).await?;

    let (Some(title), Some(description)) = (form.text("title"), form.text("description")) else {
        return Err(AppError::bad_request("All fields are required"));
    };
    let (title, description) = (title.to_string(), description.to_string());
    let (Some(video_file), Some(thumbnail)) =
        (form.take_file("videoFile"), form.take_file("thumbnail"))
    else {
        return Err(AppError::bad_request("All fields are required"));
    };

    let conn = &mut pool.get().await?;

    let uploaded_video = media.upload(video_file, ResourceKind::Video, None).await?;
    let uploaded_thumbnail = match media.upload(thumbnail, ResourceKind::Image, None).await {
        Ok(uploaded) => uploaded,
        Err(e) => {
            media
                .discard(&uploaded_video.public_id, ResourceKind::Video)
                .await;
            return Err(e);
        }
    };

    let now = Utc::now().naive_utc();
    let new_video = NewVideo {
        id: Uuid::new_v4(),
        video_file: uploaded_video.url.clone(),
        video_public_id: uploaded_video.public_id.clone(),
        thumbnail: uploaded_thumbnail.url.clone(),
        thumbnail_public_id: uploaded_thumbnail.public_id.clone(),
        title,
        description,
        duration: uploaded_video.duration.unwrap_or_default(),
        owner_id: auth.id,
        created_at: now,
        updated_at: now,
    };

    let inserted = diesel::insert_into(videos::table)
        .values(&new_video)
        .returning(Video::as_returning())
        .get_result(conn)
        .await;

    match inserted {
        Ok(video) => {
            log::info!("{} published video {}", auth.username, video.id);
            Ok(ApiResponse::created(video, "Video published successfully"))
        }
        Err(e) => {
            media
                .discard(&uploaded_video.public_id, ResourceKind::Video)
                .await;
            media
                .discard(&uploaded_thumbnail.public_id, ResourceKind::Image)
                .await;
            Err(e.into())
        }
    }
}

/// Channel card shown next to a video being watched.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchOwner {
    pub id: Uuid,
    pub username: String,
    pub avatar: String,
    pub subscribers_count: i64,
    pub is_subscribed: bool,
}

#[derive(Debug, Serialize)]
pub struct WatchedVideo {
    #[serde(flatten)]
    pub video: Video,
    pub owner: Option<WatchOwner>,
}

/// A video as seen by a viewer. Unpublished videos of other channels are
/// reported as removed.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WatchOutcome<T = WatchedVideo> {
    Available(T),
    Removed { message: &'static str },
}

impl<T> WatchOutcome<T> {
    const REMOVED: Self = WatchOutcome::Removed {
        message: "Video removed by owner",
    };
}

async fn watch_owner(
    conn: &mut AsyncPgConnection,
    owner_id: Uuid,
    viewer: Uuid,
) -> Result<Option<WatchOwner>, AppError> {
    let Some(owner) = users::table
        .find(owner_id)
        .select(OwnerSummary::as_select())
        .first::<OwnerSummary>(conn)
        .await
        .optional()?
    else {
        return Ok(None);
    };

    let subscribers_count: i64 = subscriptions::table
        .filter(subscriptions::channel_id.eq(owner_id))
        .count()
        .get_result(conn)
        .await?;
    let is_subscribed: bool = diesel::select(diesel::dsl::exists(
        subscriptions::table
            .filter(subscriptions::channel_id.eq(owner_id))
            .filter(subscriptions::subscriber_id.eq(viewer)),
    ))
    .get_result(conn)
    .await?;

    Ok(Some(WatchOwner {
        id: owner.id,
        username: owner.username,
        avatar: owner.avatar,
        subscribers_count,
        is_subscribed,
    }))
}

/// Appends `video_id` to the viewer's history unless it is already there.
async fn record_watch(
    conn: &mut AsyncPgConnection,
    viewer: Uuid,
    video_id: Uuid,
) -> Result<(), diesel::result::Error> {
    diesel::update(
        users::table
            .find(viewer)
            .filter(diesel::dsl::not(users::watch_history.contains(vec![video_id]))),
    )
    .set(users::watch_history.eq(array_append(users::watch_history, video_id)))
    .execute(conn)
    .await
    .map(|_| ())
}

pub async fn watch_video(
    auth: AuthUser,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse<WatchOutcome>, AppError> {
    let video_id = parse_id(&path, "videoId")?;

    let conn = &mut pool.get().await?;
    let video = find_video(conn, video_id).await?;

    if !video.is_published && video.owner_id != auth.id {
        return Ok(ApiResponse::ok(WatchOutcome::REMOVED, "Video is not available"));
    }

    let owner = watch_owner(conn, video.owner_id, auth.id).await?;
    if let Err(e) = record_watch(conn, auth.id, video.id).await {
        log::warn!("Failed to record watch of {} by {}: {}", video.id, auth.id, e);
    }

    Ok(ApiResponse::ok(
        WatchOutcome::Available(WatchedVideo { video, owner }),
        "Video fetched successfully",
    ))
}

/// Counts a view on a published video. Unpublished videos are left untouched.
pub async fn add_view(
    path: web::Path<String>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse<WatchOutcome<Video>>, AppError> {
    let video_id = parse_id(&path, "videoId")?;

    let conn = &mut pool.get().await?;
    let counted = diesel::update(
        videos::table
            .find(video_id)
            .filter(videos::is_published.eq(true)),
    )
    .set(videos::views.eq(videos::views + 1))
    .returning(Video::as_returning())
    .get_result(conn)
    .await
    .optional()?;

    match counted {
        Some(video) => Ok(ApiResponse::ok(WatchOutcome::Available(video), "View added")),
        None => {
            find_video(conn, video_id).await?;
            Ok(ApiResponse::ok(WatchOutcome::REMOVED, "Video is not available"))
        }
    }
}

pub async fn update_video(
    auth: AuthUser,
    path: web::Path<String>,
    payload: Multipart,
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    media: web::Data<MediaHost>,
) -> Result<ApiResponse<Video>, AppError> {
    let video_id = parse_id(&path, "videoId")?;
    let mut form = collect_form(payload, UPDATE_FIELDS, &config.storage).await?;

    let title = form.text("title").map(str::to_string);
    let description = form.text("description").map(str::to_string);
    let thumbnail = form.take_file("thumbnail");
    if title.is_none() && description.is_none() && thumbnail.is_none() {
        return Err(AppError::bad_request("At least one field is required"));
    }

    let conn = &mut pool.get().await?;
    let video = find_video(conn, video_id).await?;
    ensure_owner(&video, auth.id)?;

    let uploaded = match thumbnail {
        Some(file) => Some(media.upload(file, ResourceKind::Image, None).await?),
        None => None,
    };

    let changes = VideoChanges {
        title,
        description,
        thumbnail: uploaded.as_ref().map(|u| u.url.clone()),
        thumbnail_public_id: uploaded.as_ref().map(|u| u.public_id.clone()),
        updated_at: Utc::now().naive_utc(),
    };
    let updated = diesel::update(videos::table.find(video.id))
        .set(&changes)
        .returning(Video::as_returning())
        .get_result(conn)
        .await;

    match (updated, uploaded) {
        (Ok(updated), Some(_)) => {
            media
                .discard(&video.thumbnail_public_id, ResourceKind::Image)
                .await;
            Ok(ApiResponse::ok(updated, "Video updated successfully"))
        }
        (Ok(updated), None) => Ok(ApiResponse::ok(updated, "Video updated successfully")),
        (Err(e), Some(uploaded)) => {
            media.discard(&uploaded.public_id, ResourceKind::Image).await;
            Err(e.into())
        }
        (Err(e), None) => Err(e.into()),
    }
}

pub async fn delete_video(
    auth: AuthUser,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
    media: web::Data<MediaHost>,
) -> Result<ApiResponse, AppError> {
    let video_id = parse_id(&path, "videoId")?;

    let conn = &mut pool.get().await?;
    let video = find_video(conn, video_id).await?;
    ensure_owner(&video, auth.id)?;

    media
        .destroy(&video.video_public_id, ResourceKind::Video)
        .await?;
    media
        .destroy(&video.thumbnail_public_id, ResourceKind::Image)
        .await?;

    diesel::delete(videos::table.find(video.id))
        .execute(conn)
        .await?;

    log::info!("{} deleted video {}", auth.username, video.id);
    Ok(ApiResponse::empty("Video deleted successfully"))
}

pub async fn toggle_publish(
    auth: AuthUser,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse, AppError> {
    let video_id = parse_id(&path, "videoId")?;

    let conn = &mut pool.get().await?;
    let video = find_video(conn, video_id).await?;
    ensure_owner(&video, auth.id)?;

    let is_published: bool = diesel::update(videos::table.find(video.id))
        .set((
            videos::is_published.eq(diesel::dsl::not(videos::is_published)),
            videos::updated_at.eq(Utc::now().naive_utc()),
        ))
        .returning(videos::is_published)
        .get_result(conn)
        .await?;

    Ok(ApiResponse::ok(
        json!({ "isPublished": is_published }),
        "Publish status toggled",
    ))
}
