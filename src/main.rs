use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use std::io;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod model;
mod models;
mod reporting;
mod routes;
mod utils;

use config::Config;
use db::{init_db, run_migrations};

use crate::docs::ApiDoc;
use crate::routes::Limiters;
use crate::utils::company_cache;
use tracing::{error, info};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "timecore is running"
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = Config::from_env().map_err(|e| io::Error::other(format!("{e:#}")))?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(addr = %config.server_addr, "Server starting...");

    let pool = init_db(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| {
            error!(error = %e, "Database connection failed");
            io::Error::other(e)
        })?;

    if config.run_migrations {
        run_migrations(&pool).await.map_err(|e| {
            error!(error = %e, "Migrations failed");
            io::Error::other(e)
        })?;
        info!("Migrations applied");
    }

    company_cache::init(config.company_cache_ttl);

    let pool_for_cache_warmup = pool.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = company_cache::warmup_company_cache(&pool_for_cache_warmup, 250).await {
            error!(error = %e, "Failed to warmup company cache");
        }
    });

    let limiters = Limiters::from_config(&config).map_err(|e| io::Error::other(format!("{e:#}")))?;
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        let config = config.clone();
        let limiters = limiters.clone();

        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .service(index)
            // auth + protected routes with rate limiting
            .configure(move |cfg| routes::configure(cfg, &config, &limiters))
    })
    .bind(server_addr)?
    .run()
    .await
}
