mod classifier;
mod routes;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use classifier::config::{config_path, load_policy};
use routes::configure_routes;
use std::env;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config_path = config_path();
    log::info!("Loading classifier policy from {}", config_path.display());

    let policy = match load_policy(&config_path) {
        Ok(policy) => policy,
        Err(e) => {
            log::error!("Failed to load classifier policy: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Classifier policy loading failed: {}", e),
            ));
        }
    };
    log::info!(
        "Classifier policy: default confidence {}, sentinel confidence {}, up to {} row(s)",
        policy.default_confidence,
        policy.sentinel_confidence,
        policy.max_rows
    );

    let policy = web::Data::new(policy);

    let port = env::var("PORT").unwrap_or_else(|_| "8081".to_string());
    let bind_address = format!("0.0.0.0:{}", port);

    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(policy.clone())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
