use crate::api::shared::{non_blank, parse_id, ApiResponse};
use crate::auth::{ensure_owner, AuthUser};
use crate::db::models::{Comment, WithOwner};
use crate::db::query::PageParams;
use crate::db::schema::{comments, videos};
use crate::db::{with_owners, DbPool};
use crate::error::AppError;
use actix_web::web;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/comments")
            .route("/{video_id}", web::get().to(list_comments))
            .route("/{video_id}", web::post().to(add_comment))
            .route("/update/{comment_id}", web::patch().to(update_comment))
            .route("/update/{comment_id}", web::delete().to(delete_comment)),
    );
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    pub content: Option<String>,
}

impl CommentBody {
    fn content(&self) -> Result<String, AppError> {
        non_blank(self.content.as_deref())
            .map(str::to_string)
            .ok_or_else(|| AppError::bad_request("Comment content is required"))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPage {
    pub comments: Vec<WithOwner<Comment>>,
    pub total_pages: i64,
}

async fn find_comment(conn: &mut AsyncPgConnection, id: Uuid) -> Result<Comment, AppError> {
    comments::table
        .find(id)
        .select(Comment::as_select())
        .first::<Comment>(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found("Comment not found"))
}

pub async fn list_comments(
    _auth: AuthUser,
    path: web::Path<String>,
    params: web::Query<PageParams>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse<CommentPage>, AppError> {
    let video_id = parse_id(&path, "videoId")?;
    let page = params.into_inner().into_request()?;

    let conn = &mut pool.get().await?;
    let total: i64 = comments::table
        .filter(comments::video_id.eq(video_id))
        .count()
        .get_result(conn)
        .await?;
    let rows = comments::table
        .filter(comments::video_id.eq(video_id))
        .order((comments::created_at.asc(), comments::id.asc()))
        .offset(page.offset())
        .limit(page.limit())
        .select(Comment::as_select())
        .load::<Comment>(conn)
        .await?;

    let listing = CommentPage {
        comments: with_owners(conn, rows).await?,
        total_pages: page.total_pages(total),
    };
    Ok(ApiResponse::ok(listing, "Comments fetched successfully"))
}

pub async fn add_comment(
    auth: AuthUser,
    path: web::Path<String>,
    body: web::Json<CommentBody>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse<Comment>, AppError> {
    let video_id = parse_id(&path, "videoId")?;
    let content = body.content()?;

    let conn = &mut pool.get().await?;
    let video_exists: bool =
        diesel::select(diesel::dsl::exists(videos::table.find(video_id)))
            .get_result(conn)
            .await?;
    if !video_exists {
        return Err(AppError::not_found("Video not found"));
    }

    let now = Utc::now().naive_utc();
    let comment = diesel::insert_into(comments::table)
        .values(&Comment {
            id: Uuid::new_v4(),
            content,
            video_id,
            owner_id: auth.id,
            created_at: now,
            updated_at: now,
        })
        .returning(Comment::as_returning())
        .get_result(conn)
        .await?;

    Ok(ApiResponse::created(comment, "Comment added successfully"))
}

pub async fn update_comment(
    auth: AuthUser,
    path: web::Path<String>,
    body: web::Json<CommentBody>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse<Comment>, AppError> {
    let comment_id = parse_id(&path, "commentId")?;
    let content = body.content()?;

    let conn = &mut pool.get().await?;
    let comment = find_comment(conn, comment_id).await?;
    ensure_owner(&comment, auth.id)?;

    let updated = diesel::update(comments::table.find(comment.id))
        .set((
            comments::content.eq(content),
            comments::updated_at.eq(Utc::now().naive_utc()),
        ))
        .returning(Comment::as_returning())
        .get_result(conn)
        .await?;

    Ok(ApiResponse::ok(updated, "Comment updated successfully"))
}

pub async fn delete_comment(
    auth: AuthUser,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse, AppError> {
    let comment_id = parse_id(&path, "commentId")?;

    let conn = &mut pool.get().await?;
    let comment = find_comment(conn, comment_id).await?;
    ensure_owner(&comment, auth.id)?;

    diesel::delete(comments::table.find(comment.id))
        .execute(conn)
        .await?;

    Ok(ApiResponse::empty("Comment deleted successfully"))
}
