use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;

#[cfg(test)]
#[macro_use]
mod test_support;

mod api;
mod auth;
mod config;
mod db;
mod error;
mod services;

fn cors_policy(origin: Option<&str>) -> Cors {
    match origin {
        Some(origin) => Cors::default()
            .allowed_origin(origin)
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .supports_credentials()
            .max_age(3600),
        None => Cors::permissive(),
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists
    dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config::AppConfig::new().context("Failed to load configuration")?;

    log::info!(
        "Starting server on {}:{}",
        config.server.host,
        config.server.port
    );

    let pool = db::create_pool(&config.database).context("Failed to create database pool")?;
    let keys = web::Data::new(auth::TokenKeys::new(&config.auth));
    let media = web::Data::new(services::media::MediaHost::new(config.media.clone()));
    let pool = web::Data::new(pool);
    let bind = (config.server.host.clone(), config.server.port);
    let config = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(cors_policy(config.server.cors_origin.as_deref()))
            .app_data(pool.clone())
            .app_data(keys.clone())
            .app_data(media.clone())
            .app_data(config.clone())
            .configure(api::configure)
            .default_service(web::to(api::not_found))
    })
    .bind(bind)
    .context("Failed to bind server address")?
    .run()
    .await
    .context("Server stopped with an error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;

    #[actix_web::test]
    async fn configured_origin_is_allowed_with_credentials() {
        let app = test::init_service(
            App::new()
                .wrap(cors_policy(Some("https://tube.example.com")))
                .configure(api::configure),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/api/v1/healthcheck")
            .insert_header((header::ORIGIN, "https://tube.example.com"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let headers = resp.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://tube.example.com"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }
}
