use crate::api::shared::ApiResponse;
use actix_web::web;
use serde_json::json;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/healthcheck").route(web::get().to(health_check)));
}

async fn health_check() -> ApiResponse {
    ApiResponse::ok(
        json!({
            "status": "ok",
            "timestamp": chrono::Utc::now().to_rfc3339()
        }),
        "Server is working correctly",
    )
}

#[cfg(test)]
mod tests {
    use actix_web::test;

    #[actix_web::test]
    async fn reports_ok_in_envelope() {
        let app = test_app!();
        let req = test::TestRequest::get().uri("/api/v1/healthcheck").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["statusCode"], 200);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "ok");
    }

    #[actix_web::test]
    async fn unknown_route_uses_error_envelope() {
        let app = test_app!();
        let req = test::TestRequest::get().uri("/api/v1/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"], serde_json::json!([]));
    }
}
