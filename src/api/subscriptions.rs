use crate::api::shared::{parse_id, ApiResponse};
use crate::auth::AuthUser;
use crate::db::models::{OwnerSummary, Subscription};
use crate::db::schema::{subscriptions, users};
use crate::db::toggle::toggle_subscription;
use crate::db::{owner_summaries, DbPool};
use crate::error::AppError;
use actix_web::web;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/subscriptions")
            .route("/c/{channel_id}", web::post().to(toggle_channel))
            .route("/c/{channel_id}", web::get().to(channel_subscribers))
            .route("/u/{subscriber_id}", web::get().to(subscribed_channels)),
    );
}

#[derive(Debug, Serialize)]
pub struct SubscriberEntry {
    pub id: Uuid,
    pub subscriber: OwnerSummary,
}

#[derive(Debug, Serialize)]
pub struct ChannelEntry {
    pub id: Uuid,
    pub channel: OwnerSummary,
}

pub async fn toggle_channel(
    auth: AuthUser,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse, AppError> {
    let channel_id = parse_id(&path, "channelId")?;

    let conn = &mut pool.get().await?;
    let channel_exists: bool = diesel::select(diesel::dsl::exists(users::table.find(channel_id)))
        .get_result(conn)
        .await?;
    if !channel_exists {
        return Err(AppError::not_found("Channel not found"));
    }

    let subscribed = toggle_subscription(conn, auth.id, channel_id)
        .await?
        .is_active();
    let message = if subscribed {
        "Subscribed"
    } else {
        "Unsubscribed"
    };
    Ok(ApiResponse::ok(json!({ "isSubscribed": subscribed }), message))
}

/// Users following `channelId`, oldest subscription first.
pub async fn channel_subscribers(
    _auth: AuthUser,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse<Vec<SubscriberEntry>>, AppError> {
    let channel_id = parse_id(&path, "channelId")?;

    let conn = &mut pool.get().await?;
    let edges = subscriptions::table
        .filter(subscriptions::channel_id.eq(channel_id))
        .order((subscriptions::created_at.asc(), subscriptions::id.asc()))
        .select(Subscription::as_select())
        .load::<Subscription>(conn)
        .await?;

    let ids: Vec<Uuid> = edges.iter().map(|e| e.subscriber_id).collect();
    let profiles = owner_summaries(conn, &ids).await?;
    let subscribers = edges
        .into_iter()
        .filter_map(|edge| {
            profiles
                .get(&edge.subscriber_id)
                .cloned()
                .map(|subscriber| SubscriberEntry {
                    id: edge.id,
                    subscriber,
                })
        })
        .collect();

    Ok(ApiResponse::ok(subscribers, "Subscribers fetched successfully"))
}

/// Channels `subscriberId` follows. Channels whose user is gone are skipped.
pub async fn subscribed_channels(
    _auth: AuthUser,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
) -> Result<ApiResponse<Vec<ChannelEntry>>, AppError> {
    let subscriber_id = parse_id(&path, "subscriberId")?;

    let conn = &mut pool.get().await?;
    let edges = subscriptions::table
        .filter(subscriptions::subscriber_id.eq(subscriber_id))
        .order((subscriptions::created_at.asc(), subscriptions::id.asc()))
        .select(Subscription::as_select())
        .load::<Subscription>(conn)
        .await?;

    let ids: Vec<Uuid> = edges.iter().map(|e| e.channel_id).collect();
    let profiles = owner_summaries(conn, &ids).await?;
    let channels = edges
        .into_iter()
        .filter_map(|edge| {
            profiles
                .get(&edge.channel_id)
                .cloned()
                .map(|channel| ChannelEntry {
                    id: edge.id,
                    channel,
                })
        })
        .collect();

    Ok(ApiResponse::ok(channels, "Subscribed channels fetched successfully"))
}

#[cfg(test)]
mod tests {
    use crate::test_support::bearer_for;
    use actix_web::http::header::AUTHORIZATION;
    use actix_web::test;
    use serde_json::Value;
    use uuid::Uuid;

    #[actix_web::test]
    async fn toggle_rejects_bad_channel_id() {
        let app = test_app!();
        let req = test::TestRequest::post()
            .uri("/api/v1/subscriptions/c/channel")
            .insert_header((AUTHORIZATION, bearer_for(Uuid::new_v4())))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Invalid channelId");
    }

    #[actix_web::test]
    async fn listing_requires_sign_in() {
        let app = test_app!();
        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/subscriptions/u/{}", Uuid::new_v4()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }
}
