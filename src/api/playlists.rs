use crate::api::shared::{non_blank, parse_id, ApiResponse};
use crate::auth::{ensure_owner, AuthUser};
use crate::db::models::{Playlist, PlaylistChanges, VideoSummary, WithOwner};
use crate::db::schema::{playlists, videos};
use crate::db::{array_append, array_remove, in_id_order, with_owners, DbPool};
use crate::error::AppError;
use actix_web::web;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/playlist")
            .route("", web::post().to(create_playlist))
            .route("/user/{user_id}", web::get().to(user_playlists))
            .route("/add/{video_id}/{playlist_id}", web::patch().to(add_video))
            .route("/remove/{video_id}/{playlist_id}", web::patch().to(remove_video))
            .route("/{playlist_id}", web::get().to(get_playlist))
            .route("/{playlist_id}", web::patch().to(update_playlist))
            .route("/{playlist_id}", web::delete().to(delete_playlist)),
    );
}

/// A playlist with its video ids resolved to `V`, in playlist order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistView<V> {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_by: Uuid,
    pub videos: Vec<V>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl<V> PlaylistView<V> {
    fn new(playlist: Playlist, videos: Vec<V>) -> Self {
        Self {
            id: playlist.id,
            name: playlist.name,
            description: playlist.description,
            created_by: playlist.created_by,
            videos,
            created_at: playlist.created_at,
            updated_at: playlist.updated_at,
        }
    }
}

async fn find_playlist(conn: &mut AsyncPgConnection, id: Uuid) -> Result<Playlist, AppError> {
    playlists::table
        .find(id)
        .select(Playlist::as_select())
        .first::<Playlist>(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found("Playlist not found"))
}

async fn video_summaries(
    conn: &mut AsyncPgConnection,
    ids: &[Uuid],
) -> Result<Vec<VideoSummary>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    Ok(videos::table
        .filter(videos::id.eq_any(ids))
        .select(VideoSummary::as_select())
        .load::<VideoSummary>(conn)
        .await?)
}

#[derive(Debug, Deserialize)]
pub struct CreatePlaylistRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub async fn create_playlist(
    auth: AuthUser,
    body: web::Json<CreatePlaylistRequest>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse<Playlist>, AppError> {
    let (Some(name), Some(description)) = (
        non_blank(body.name.as_deref()),
        non_blank(body.description.as_deref()),
    ) else {
        return Err(AppError::bad_request("Name and description are required"));
    };

    let now = Utc::now().naive_utc();
    let playlist = Playlist {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: description.to_string(),
        created_by: auth.id,
        videos: Vec::new(),
        created_at: now,
        updated_at: now,
    };

    let conn = &mut pool.get().await?;
    let playlist = diesel::insert_into(playlists::table)
        .values(&playlist)
        .returning(Playlist::as_returning())
        .get_result(conn)
        .await?;

    Ok(ApiResponse::created(playlist, "Playlist created successfully"))
}

pub async fn user_playlists(
    _auth: AuthUser,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse<Vec<PlaylistView<VideoSummary>>>, AppError> {
    let user_id = parse_id(&path, "userId")?;

    let conn = &mut pool.get().await?;
    let owned = playlists::table
        .filter(playlists::created_by.eq(user_id))
        .order((playlists::created_at.asc(), playlists::id.asc()))
        .select(Playlist::as_select())
        .load::<Playlist>(conn)
        .await?;

    let mut ids: Vec<Uuid> = owned.iter().flat_map(|p| p.videos.iter().copied()).collect();
    ids.sort_unstable();
    ids.dedup();
    let summaries: HashMap<Uuid, VideoSummary> = video_summaries(conn, &ids)
        .await?
        .into_iter()
        .map(|v| (v.id, v))
        .collect();

    let views = owned
        .into_iter()
        .map(|playlist| {
            let videos = playlist
                .videos
                .iter()
                .filter_map(|id| summaries.get(id).cloned())
                .collect();
            PlaylistView::new(playlist, videos)
        })
        .collect();

    Ok(ApiResponse::ok(views, "Playlists fetched successfully"))
}

pub async fn get_playlist(
    _auth: AuthUser,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse<PlaylistView<WithOwner<VideoSummary>>>, AppError> {
    let playlist_id = parse_id(&path, "playlistId")?;

    let conn = &mut pool.get().await?;
    let playlist = find_playlist(conn, playlist_id).await?;
    let rows = video_summaries(conn, &playlist.videos).await?;
    let ordered = in_id_order(&playlist.videos, rows, |v| v.id);
    let videos = with_owners(conn, ordered).await?;

    Ok(ApiResponse::ok(
        PlaylistView::new(playlist, videos),
        "Playlist fetched successfully",
    ))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePlaylistRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub async fn update_playlist(
    auth: AuthUser,
    path: web::Path<String>,
    body: web::Json<UpdatePlaylistRequest>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse<Playlist>, AppError> {
    let playlist_id = parse_id(&path, "playlistId")?;
    let changes = PlaylistChanges {
        name: non_blank(body.name.as_deref()).map(str::to_string),
        description: non_blank(body.description.as_deref()).map(str::to_string),
        updated_at: Utc::now().naive_utc(),
    };
    if changes.name.is_none() && changes.description.is_none() {
        return Err(AppError::bad_request("Name or description is required"));
    }

    let conn = &mut pool.get().await?;
    let playlist = find_playlist(conn, playlist_id).await?;
    ensure_owner(&playlist, auth.id)?;

    let updated = diesel::update(playlists::table.find(playlist.id))
        .set(&changes)
        .returning(Playlist::as_returning())
        .get_result(conn)
        .await?;

    Ok(ApiResponse::ok(updated, "Playlist updated successfully"))
}

pub async fn delete_playlist(
    auth: AuthUser,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse, AppError> {
    let playlist_id = parse_id(&path, "playlistId")?;

    let conn = &mut pool.get().await?;
    let playlist = find_playlist(conn, playlist_id).await?;
    ensure_owner(&playlist, auth.id)?;

    diesel::delete(playlists::table.find(playlist.id))
        .execute(conn)
        .await?;

    Ok(ApiResponse::empty("Playlist deleted successfully"))
}

fn video_and_playlist(path: &(String, String)) -> Result<(Uuid, Uuid), AppError> {
    Ok((
        parse_id(&path.0, "videoId")?,
        parse_id(&path.1, "playlistId")?,
    ))
}

pub async fn add_video(
    auth: AuthUser,
    path: web::Path<(String, String)>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse<Playlist>, AppError> {
    let (video_id, playlist_id) = video_and_playlist(&path)?;

    let conn = &mut pool.get().await?;
    let playlist = find_playlist(conn, playlist_id).await?;
    ensure_owner(&playlist, auth.id)?;

    let video_exists: bool =
        diesel::select(diesel::dsl::exists(videos::table.find(video_id)))
            .get_result(conn)
            .await?;
    if !video_exists {
        return Err(AppError::not_found("Video not found"));
    }

    // Only rows that do not hold the video yet are updated
    let updated = diesel::update(
        playlists::table
            .find(playlist.id)
            .filter(diesel::dsl::not(playlists::videos.contains(vec![video_id]))),
    )
    .set((
        playlists::videos.eq(array_append(playlists::videos, video_id)),
        playlists::updated_at.eq(Utc::now().naive_utc()),
    ))
    .returning(Playlist::as_returning())
    .get_result(conn)
    .await
    .optional()?
    .ok_or_else(|| AppError::Conflict("Video is already in the playlist".into()))?;

    Ok(ApiResponse::ok(updated, "Video added to playlist"))
}

pub async fn remove_video(
    auth: AuthUser,
    path: web::Path<(String, String)>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse<Playlist>, AppError> {
    let (video_id, playlist_id) = video_and_playlist(&path)?;

    let conn = &mut pool.get().await?;
    let playlist = find_playlist(conn, playlist_id).await?;
    ensure_owner(&playlist, auth.id)?;

    let updated = diesel::update(
        playlists::table
            .find(playlist.id)
            .filter(playlists::videos.contains(vec![video_id])),
    )
    .set((
        playlists::videos.eq(array_remove(playlists::videos, video_id)),
        playlists::updated_at.eq(Utc::now().naive_utc()),
    ))
    .returning(Playlist::as_returning())
    .get_result(conn)
    .await
    .optional()?
    .ok_or_else(|| AppError::not_found("Video is not in the playlist"))?;

    Ok(ApiResponse::ok(updated, "Video removed from playlist"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bearer_for, LiveDb};
    use actix_web::http::header::AUTHORIZATION;
    use actix_web::test;
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn create_requires_name_and_description() {
        let app = test_app!();
        let req = test::TestRequest::post()
            .uri("/api/v1/playlist")
            .insert_header((AUTHORIZATION, bearer_for(Uuid::new_v4())))
            .set_json(json!({ "description": "no name" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Name and description are required");
    }

    #[actix_web::test]
    async fn add_names_the_bad_identifier() {
        let app = test_app!();
        let req = test::TestRequest::patch()
            .uri(&format!("/api/v1/playlist/add/{}/oops", Uuid::new_v4()))
            .insert_header((AUTHORIZATION, bearer_for(Uuid::new_v4())))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Invalid playlistId");
    }

    #[actix_web::test]
    async fn update_needs_a_field() {
        let app = test_app!();
        let req = test::TestRequest::patch()
            .uri(&format!("/api/v1/playlist/{}", Uuid::new_v4()))
            .insert_header((AUTHORIZATION, bearer_for(Uuid::new_v4())))
            .set_json(json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn created_playlist_reads_back_empty() {
        let db = LiveDb::start().await;
        let pool = db.pool.clone();
        let app = test_app!(pool);
        let me = Uuid::new_v4();

        let req = test::TestRequest::post()
            .uri("/api/v1/playlist")
            .insert_header((AUTHORIZATION, bearer_for(me)))
            .set_json(json!({ "name": "Favorites", "description": "my picks" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);
        let created: Value = test::read_body_json(resp).await;
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/playlist/{id}"))
            .insert_header((AUTHORIZATION, bearer_for(me)))
            .to_request();
        let fetched: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched["data"]["name"], "Favorites");
        assert_eq!(fetched["data"]["description"], "my picks");
        assert_eq!(fetched["data"]["videos"], json!([]));
    }

    #[actix_web::test]
    async fn strangers_leave_playlist_unchanged() {
        let db = LiveDb::start().await;
        let pool = db.pool.clone();
        let app = test_app!(pool);
        let owner = Uuid::new_v4();

        let req = test::TestRequest::post()
            .uri("/api/v1/playlist")
            .insert_header((AUTHORIZATION, bearer_for(owner)))
            .set_json(json!({ "name": "Mine", "description": "hands off" }))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::delete()
            .uri(&format!("/api/v1/playlist/{id}"))
            .insert_header((AUTHORIZATION, bearer_for(Uuid::new_v4())))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 403);

        let req = test::TestRequest::patch()
            .uri(&format!("/api/v1/playlist/{id}"))
            .insert_header((AUTHORIZATION, bearer_for(Uuid::new_v4())))
            .set_json(json!({ "name": "Taken" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 403);

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/playlist/{id}"))
            .insert_header((AUTHORIZATION, bearer_for(owner)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let fetched: Value = test::read_body_json(resp).await;
        assert_eq!(fetched["data"]["name"], "Mine");
        assert_eq!(fetched["data"]["description"], "hands off");
    }
}
