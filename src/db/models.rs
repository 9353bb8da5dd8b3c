use crate::auth::Owned;
use crate::db::schema::{comments, likes, playlists, subscriptions, tweets, users, videos};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize, Queryable, Selectable, Identifiable, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub avatar_public_id: String,
    pub cover_image: String,
    pub cover_image_public_id: String,
    pub watch_history: Vec<Uuid>,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub avatar_public_id: String,
    pub cover_image: String,
    pub cover_image_public_id: String,
    pub password: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Profile fields a user may edit. `None` leaves the column untouched.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = users)]
pub struct AccountChanges {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub updated_at: NaiveDateTime,
}

/// Public slice of a user embedded in other records.
#[derive(Debug, Serialize, Queryable, Selectable, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub avatar: String,
}

#[derive(Debug, Serialize, Queryable, Selectable, Identifiable, Clone)]
#[diesel(table_name = videos)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: Uuid,
    pub video_file: String,
    pub video_public_id: String,
    pub thumbnail: String,
    pub thumbnail_public_id: String,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub views: i32,
    pub is_published: bool,
    pub owner_id: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = videos)]
pub struct NewVideo {
    pub id: Uuid,
    pub video_file: String,
    pub video_public_id: String,
    pub thumbnail: String,
    pub thumbnail_public_id: String,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub owner_id: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = videos)]
pub struct VideoChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub thumbnail_public_id: Option<String>,
    pub updated_at: NaiveDateTime,
}

/// Card-sized view of a video, used inside playlists.
#[derive(Debug, Serialize, Queryable, Selectable, Clone)]
#[diesel(table_name = videos)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub id: Uuid,
    pub title: String,
    pub thumbnail: String,
    pub views: i32,
    pub duration: f64,
    pub owner_id: Uuid,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize, Queryable, Selectable, Identifiable, Insertable, Clone)]
#[diesel(table_name = comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub video_id: Uuid,
    pub owner_id: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = likes)]
pub struct NewLike {
    pub id: Uuid,
    pub liked_by: Uuid,
    pub video_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
    pub tweet_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize, Queryable, Selectable, Identifiable, Insertable, Clone)]
#[diesel(table_name = playlists)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_by: Uuid,
    pub videos: Vec<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = playlists)]
pub struct PlaylistChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Serialize, Queryable, Selectable, Identifiable, Insertable, Clone)]
#[diesel(table_name = subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub subscriber_id: Uuid,
    pub channel_id: Uuid,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize, Queryable, Selectable, Identifiable, Insertable, Clone)]
#[diesel(table_name = tweets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    pub id: Uuid,
    pub content: String,
    pub tweet_image: String,
    pub tweet_image_public_id: String,
    pub owner_id: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = tweets)]
pub struct TweetChanges {
    pub content: Option<String>,
    pub tweet_image: Option<String>,
    pub tweet_image_public_id: Option<String>,
    pub updated_at: NaiveDateTime,
}

/// A record with its owner's public profile attached.
#[derive(Debug, Serialize)]
pub struct WithOwner<T> {
    #[serde(flatten)]
    pub record: T,
    pub owner: Option<OwnerSummary>,
}

impl Owned for Video {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

impl Owned for VideoSummary {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

impl Owned for Comment {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

impl Owned for Tweet {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

impl Owned for Playlist {
    fn owner_id(&self) -> Uuid {
        self.created_by
    }
}
