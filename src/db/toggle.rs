//! Create-if-absent / delete-if-present associations.
//!
//! Both toggles delete first and insert only when nothing was deleted. The
//! insert ignores conflicts on the (actor, target) unique index, so two racing
//! toggles both settle on "active" instead of writing a duplicate row.

use crate::db::models::{NewLike, Subscription};
use crate::db::schema::{likes, subscriptions};
use crate::error::AppError;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggled {
    Active,
    Inactive,
}

impl Toggled {
    pub fn is_active(self) -> bool {
        matches!(self, Toggled::Active)
    }

    fn after_delete(removed: usize) -> Option<Self> {
        (removed > 0).then_some(Toggled::Inactive)
    }
}

/// What a like points at. Exactly one target per like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeTarget {
    Video(Uuid),
    Comment(Uuid),
    Tweet(Uuid),
}

impl LikeTarget {
    fn new_like(self, liked_by: Uuid) -> NewLike {
        let (video_id, comment_id, tweet_id) = match self {
            LikeTarget::Video(id) => (Some(id), None, None),
            LikeTarget::Comment(id) => (None, Some(id), None),
            LikeTarget::Tweet(id) => (None, None, Some(id)),
        };
        NewLike {
            id: Uuid::new_v4(),
            liked_by,
            video_id,
            comment_id,
            tweet_id,
            created_at: Utc::now().naive_utc(),
        }
    }
}

pub async fn toggle_like(
    conn: &mut AsyncPgConnection,
    liked_by: Uuid,
    target: LikeTarget,
) -> Result<Toggled, AppError> {
    let mine = likes::table.filter(likes::liked_by.eq(liked_by));
    let removed = match target {
        LikeTarget::Video(id) => {
            diesel::delete(mine.filter(likes::video_id.eq(id)))
                .execute(conn)
                .await?
        }
        LikeTarget::Comment(id) => {
            diesel::delete(mine.filter(likes::comment_id.eq(id)))
                .execute(conn)
                .await?
        }
        LikeTarget::Tweet(id) => {
            diesel::delete(mine.filter(likes::tweet_id.eq(id)))
                .execute(conn)
                .await?
        }
    };

    if let Some(state) = Toggled::after_delete(removed) {
        return Ok(state);
    }

    diesel::insert_into(likes::table)
        .values(target.new_like(liked_by))
        .on_conflict_do_nothing()
        .execute(conn)
        .await?;

    Ok(Toggled::Active)
}

pub async fn toggle_subscription(
    conn: &mut AsyncPgConnection,
    subscriber: Uuid,
    channel: Uuid,
) -> Result<Toggled, AppError> {
    let removed = diesel::delete(
        subscriptions::table
            .filter(subscriptions::subscriber_id.eq(subscriber))
            .filter(subscriptions::channel_id.eq(channel)),
    )
    .execute(conn)
    .await?;

    if let Some(state) = Toggled::after_delete(removed) {
        return Ok(state);
    }

    let edge = Subscription {
        id: Uuid::new_v4(),
        subscriber_id: subscriber,
        channel_id: channel,
        created_at: Utc::now().naive_utc(),
    };
    diesel::insert_into(subscriptions::table)
        .values(&edge)
        .on_conflict_do_nothing()
        .execute(conn)
        .await?;

    Ok(Toggled::Active)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::LiveDb;

    #[test]
    fn delete_count_decides_state() {
        assert_eq!(Toggled::after_delete(0), None);
        assert_eq!(Toggled::after_delete(1), Some(Toggled::Inactive));
        assert!(Toggled::Active.is_active());
        assert!(!Toggled::Inactive.is_active());
    }

    #[test]
    fn like_rows_have_a_single_target() {
        let id = Uuid::new_v4();
        let by = Uuid::new_v4();
        let tweet = LikeTarget::Tweet(id).new_like(by);
        assert_eq!(
            (tweet.video_id, tweet.comment_id, tweet.tweet_id),
            (None, None, Some(id))
        );
        let video = LikeTarget::Video(id).new_like(by);
        assert_eq!(
            (video.video_id, video.comment_id, video.tweet_id),
            (Some(id), None, None)
        );
    }

    #[actix_web::test]
    async fn sequential_toggles_alternate() {
        let db = LiveDb::start().await;
        let pool = db.pool.clone();
        let conn = &mut pool.get().await.unwrap();
        let me = Uuid::new_v4();
        let tweet = LikeTarget::Tweet(Uuid::new_v4());

        assert_eq!(toggle_like(conn, me, tweet).await.unwrap(), Toggled::Active);
        assert_eq!(toggle_like(conn, me, tweet).await.unwrap(), Toggled::Inactive);
        assert_eq!(toggle_like(conn, me, tweet).await.unwrap(), Toggled::Active);

        let rows: i64 = likes::table
            .filter(likes::liked_by.eq(me))
            .count()
            .get_result(conn)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[actix_web::test]
    async fn subscription_toggle_alternates() {
        let db = LiveDb::start().await;
        let pool = db.pool.clone();
        let conn = &mut pool.get().await.unwrap();
        let (me, channel) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(toggle_subscription(conn, me, channel).await.unwrap().is_active());
        assert!(!toggle_subscription(conn, me, channel).await.unwrap().is_active());
        assert!(toggle_subscription(conn, me, channel).await.unwrap().is_active());
    }
}
