use crate::api::shared::ApiResponse;
use crate::api::videos::{load_video_page, VideoListParams, VideoPage};
use crate::auth::AuthUser;
use crate::db::schema::{subscriptions, videos};
use crate::db::DbPool;
use crate::error::AppError;
use actix_web::web;
use diesel::dsl::sum;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Serialize;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/dashboard")
            .route("/stats", web::get().to(channel_stats))
            .route("/videos", web::get().to(channel_videos)),
    );
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStats {
    pub total_channels_views: i64,
    pub total_subscribers_count: i64,
    pub total_video_count: i64,
}

pub async fn channel_stats(
    auth: AuthUser,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse<ChannelStats>, AppError> {
    let conn = &mut pool.get().await?;

    let total_views: Option<i64> = videos::table
        .filter(videos::owner_id.eq(auth.id))
        .select(sum(videos::views))
        .get_result(conn)
        .await?;
    let total_video_count: i64 = videos::table
        .filter(videos::owner_id.eq(auth.id))
        .count()
        .get_result(conn)
        .await?;
    let total_subscribers_count: i64 = subscriptions::table
        .filter(subscriptions::channel_id.eq(auth.id))
        .count()
        .get_result(conn)
        .await?;

    let stats = ChannelStats {
        total_channels_views: total_views.unwrap_or(0),
        total_subscribers_count,
        total_video_count,
    };
    Ok(ApiResponse::ok(stats, "Channel stats fetched successfully"))
}

/// The caller's own videos, published or not.
pub async fn channel_videos(
    auth: AuthUser,
    params: web::Query<VideoListParams>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse<VideoPage>, AppError> {
    let (query, page) = params.listing_query()?;
    let query = query.owned_by(auth.id);

    let conn = &mut pool.get().await?;
    let listing = load_video_page(conn, &query, page).await?;
    Ok(ApiResponse::ok(listing, "Channel videos fetched successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::NewVideo;
    use crate::test_support::{bearer_for, LiveDb};
    use actix_web::http::header::AUTHORIZATION;
    use actix_web::test;
    use chrono::Utc;
    use serde_json::Value;
    use uuid::Uuid;

    #[actix_web::test]
    async fn stats_require_sign_in() {
        let app = test_app!();
        let req = test::TestRequest::get()
            .uri("/api/v1/dashboard/stats")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }

    #[actix_web::test]
    async fn channel_videos_validate_sort() {
        let app = test_app!();
        let req = test::TestRequest::get()
            .uri("/api/v1/dashboard/videos?sortBy=random")
            .insert_header((AUTHORIZATION, bearer_for(Uuid::new_v4())))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn stats_sum_views_across_own_videos() {
        let db = LiveDb::start().await;
        let pool = db.pool.clone();
        let me = Uuid::new_v4();
        {
            let conn = &mut pool.get().await.unwrap();
            let now = Utc::now().naive_utc();
            let rows: Vec<NewVideo> = (0..2)
                .map(|i| NewVideo {
                    id: Uuid::new_v4(),
                    video_file: format!("https://cdn.example.com/{i}.mp4"),
                    video_public_id: String::new(),
                    thumbnail: format!("https://cdn.example.com/{i}.png"),
                    thumbnail_public_id: String::new(),
                    title: format!("clip {i}"),
                    description: "stats".into(),
                    duration: 1.0,
                    owner_id: me,
                    created_at: now,
                    updated_at: now,
                })
                .collect();
            diesel::insert_into(videos::table)
                .values(&rows)
                .execute(conn)
                .await
                .unwrap();
            diesel::update(videos::table.filter(videos::owner_id.eq(me)))
                .set(videos::views.eq(7))
                .execute(conn)
                .await
                .unwrap();
        }

        let app = test_app!(pool);
        let req = test::TestRequest::get()
            .uri("/api/v1/dashboard/stats")
            .insert_header((AUTHORIZATION, bearer_for(me)))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["totalChannelsViews"], 14);
        assert_eq!(body["data"]["totalVideoCount"], 2);
        assert_eq!(body["data"]["totalSubscribersCount"], 0);
    }
}
