use crate::api::shared::{parse_id, ApiResponse};
use crate::auth::{ensure_owner, AuthUser};
use crate::config::AppConfig;
use crate::db::models::{Tweet, TweetChanges, WithOwner};
use crate::db::query::PageParams;
use crate::db::schema::tweets;
use crate::db::{with_owners, DbPool};
use crate::error::AppError;
use crate::services::media::{MediaHost, ResourceKind};
use crate::services::upload::collect_form;
use actix_multipart::Multipart;
use actix_web::web;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use uuid::Uuid;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tweets")
            .route("", web::post().to(create_tweet))
            .route("/user/{user_id}", web::get().to(user_tweets))
            .route("/{tweet_id}", web::patch().to(update_tweet))
            .route("/{tweet_id}", web::delete().to(delete_tweet)),
    );
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetPage {
    pub tweets: Vec<WithOwner<Tweet>>,
    pub total_pages: i64,
}

async fn find_tweet(conn: &mut AsyncPgConnection, id: Uuid) -> Result<Tweet, AppError> {
    tweets::table
        .find(id)
        .select(Tweet::as_select())
        .first::<Tweet>(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found("Tweet not found"))
}

const TWEET_FIELDS: &[&str] = &["content", "tweetImage"];

pub async fn create_tweet(
    auth: AuthUser,
    payload: Multipart,
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    media: web::Data<MediaHost>,
) -> Result<ApiResponse<Tweet>, AppError> {
    let mut form = collect_form(payload, TWEET_FIELDS, &config.storage).await?;
    let content = form
        .text("content")
        .map(str::to_string)
        .ok_or_else(|| AppError::bad_request("Tweet content is required"))?;
    let image = form.take_file("tweetImage");

    let conn = &mut pool.get().await?;

    let uploaded = match image {
        Some(file) => Some(media.upload(file, ResourceKind::Image, None).await?),
        None => None,
    };

    let now = Utc::now().naive_utc();
    let tweet = Tweet {
        id: Uuid::new_v4(),
        content,
        tweet_image: uploaded.as_ref().map(|u| u.url.clone()).unwrap_or_default(),
        tweet_image_public_id: uploaded
            .as_ref()
            .map(|u| u.public_id.clone())
            .unwrap_or_default(),
        owner_id: auth.id,
        created_at: now,
        updated_at: now,
    };

    match diesel::insert_into(tweets::table)
        .values(&tweet)
        .returning(Tweet::as_returning())
        .get_result(conn)
        .await
    {
        Ok(tweet) => Ok(ApiResponse::created(tweet, "Tweet created successfully")),
        Err(e) => {
            if let Some(uploaded) = &uploaded {
                media.discard(&uploaded.public_id, ResourceKind::Image).await;
            }
            Err(e.into())
        }
    }
}

/// A user's tweets, newest first.
pub async fn user_tweets(
    _auth: AuthUser,
    path: web::Path<String>,
    params: web::Query<PageParams>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse<TweetPage>, AppError> {
    let user_id = parse_id(&path, "userId")?;
    let page = params.into_inner().into_request()?;

    let conn = &mut pool.get().await?;
    let total: i64 = tweets::table
        .filter(tweets::owner_id.eq(user_id))
        .count()
        .get_result(conn)
        .await?;
    let rows = tweets::table
        .filter(tweets::owner_id.eq(user_id))
        .order((tweets::created_at.desc(), tweets::id.desc()))
        .offset(page.offset())
        .limit(page.limit())
        .select(Tweet::as_select())
        .load::<Tweet>(conn)
        .await?;

    let listing = TweetPage {
        tweets: with_owners(conn, rows).await?,
        total_pages: page.total_pages(total),
    };
    Ok(ApiResponse::ok(listing, "Tweets fetched successfully"))
}

pub async fn update_tweet(
    auth: AuthUser,
    path: web::Path<String>,
    payload: Multipart,
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    media: web::Data<MediaHost>,
) -> Result<ApiResponse<Tweet>, AppError> {
    let tweet_id = parse_id(&path, "tweetId")?;
    let mut form = collect_form(payload, TWEET_FIELDS, &config.storage).await?;
    let content = form.text("content").map(str::to_string);
    let image = form.take_file("tweetImage");
    if content.is_none() && image.is_none() {
        return Err(AppError::bad_request("Content or image is required"));
    }

    let conn = &mut pool.get().await?;
    let tweet = find_tweet(conn, tweet_id).await?;
    ensure_owner(&tweet, auth.id)?;

    let uploaded = match image {
        Some(file) => Some(media.upload(file, ResourceKind::Image, None).await?),
        None => None,
    };

    let changes = TweetChanges {
        content,
        tweet_image: uploaded.as_ref().map(|u| u.url.clone()),
        tweet_image_public_id: uploaded.as_ref().map(|u| u.public_id.clone()),
        updated_at: Utc::now().naive_utc(),
    };
    let updated = diesel::update(tweets::table.find(tweet.id))
        .set(&changes)
        .returning(Tweet::as_returning())
        .get_result(conn)
        .await;

    match (updated, uploaded) {
        (Ok(updated), Some(_)) => {
            media
                .discard(&tweet.tweet_image_public_id, ResourceKind::Image)
                .await;
            Ok(ApiResponse::ok(updated, "Tweet updated successfully"))
        }
        (Ok(updated), None) => Ok(ApiResponse::ok(updated, "Tweet updated successfully")),
        (Err(e), Some(uploaded)) => {
            media.discard(&uploaded.public_id, ResourceKind::Image).await;
            Err(e.into())
        }
        (Err(e), None) => Err(e.into()),
    }
}

pub async fn delete_tweet(
    auth: AuthUser,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
    media: web::Data<MediaHost>,
) -> Result<ApiResponse, AppError> {
    let tweet_id = parse_id(&path, "tweetId")?;

    let conn = &mut pool.get().await?;
    let tweet = find_tweet(conn, tweet_id).await?;
    ensure_owner(&tweet, auth.id)?;

    media
        .destroy(&tweet.tweet_image_public_id, ResourceKind::Image)
        .await?;
    diesel::delete(tweets::table.find(tweet.id))
        .execute(conn)
        .await?;

    Ok(ApiResponse::empty("Tweet deleted successfully"))
}
