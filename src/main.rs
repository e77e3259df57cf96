use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;

mod api;
mod auth;
mod clock;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod rules;
mod store;
mod utils;

use crate::clock::WorkClock;
use crate::config::Config;
use crate::db::init_store;
use crate::docs::ApiDoc;
use crate::routes::Limiters;
use crate::rules::calendar::WeekdayCalendar;
use crate::utils::{email_cache, email_filter, seed};
use tracing::{error, info};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(storage = %config.storage, addr = %config.server_addr, "Server starting...");

    let stores = init_store(&config).await?;

    if config.seed_demo_users {
        seed::seed_demo_users(stores.users.as_ref()).await?;
    }

    let users_for_filter = stores.users.clone();
    let users_for_cache = stores.users.clone();

    actix_web::rt::spawn(async move {
        if let Err(e) = email_filter::warmup_email_filter(users_for_filter.as_ref(), 100).await {
            error!(error = ?e, "Failed to warm up email filter");
        }
    });

    actix_web::rt::spawn(async move {
        if let Err(e) = email_cache::warmup_email_cache(users_for_cache.as_ref(), 250).await {
            error!(error = ?e, "Failed to warm up email cache");
        }
    });

    let clock = WorkClock::system(
        config.work_offset,
        WeekdayCalendar::with_holidays(config.holidays.iter().copied()),
    );
    let limiters = Limiters::from_config(&config);
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(clock.clone()))
            .app_data(Data::from(stores.attendance.clone()))
            .app_data(Data::from(stores.users.clone()))
            .configure(|cfg| routes::configure(cfg, &config.api_prefix, &limiters))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    info!("Server stopped");
    Ok(())
}
