use crate::{
    api::{attendance, dashboard, team},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::ApiError,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{HttpResponse, Responder, middleware::from_fn, web};
use serde_json::json;
use std::sync::Arc;

/// Per-route limiter allowing `requests_per_min` per client IP, all usable as a burst.
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request((60_000 / u64::from(requests_per_min)).max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

/// Built once; every worker's clone shares the same quota state.
#[derive(Clone)]
pub struct Limiters {
    login: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
    register: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
    refresh: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
    protected: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
}

impl Limiters {
    pub fn from_config(config: &Config) -> Self {
        Self {
            login: Arc::new(build_limiter(config.rate_login_per_min)),
            register: Arc::new(build_limiter(config.rate_register_per_min)),
            refresh: Arc::new(build_limiter(config.rate_refresh_per_min)),
            protected: Arc::new(build_limiter(config.rate_protected_per_min)),
        }
    }
}

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "OK",
        "message": "Server is running"
    }))
}

/// Malformed bodies and query strings get the same `{"message"}` shape as every other error.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::bad_request(err.to_string()).into())
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| ApiError::bad_request(err.to_string()).into())
}

pub fn configure(cfg: &mut web::ServiceConfig, api_prefix: &str, limiters: &Limiters) {
    cfg.app_data(json_config()).app_data(query_config());

    cfg.service(
        web::scope(api_prefix)
            .route("/health", web::get().to(health))
            // Public auth routes
            .service(
                web::resource("/auth/login")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/auth/register")
                    .wrap(limiters.register.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/auth/refresh")
                    .wrap(limiters.refresh.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            // Protected routes
            .service(
                web::scope("")
                    .wrap(from_fn(auth_middleware))
                    .wrap(limiters.protected.clone())
                    .route("/auth/me", web::get().to(handlers::me))
                    .service(
                        web::scope("/attendance")
                            .route("/checkin", web::post().to(attendance::check_in))
                            .route("/checkout/{id}", web::put().to(attendance::check_out))
                            .route("/my-history", web::get().to(attendance::my_history))
                            .route("/my-summary", web::get().to(attendance::my_summary))
                            .route("/today", web::get().to(attendance::today))
                            // manager only
                            .route("/all", web::get().to(team::all))
                            .route("/employee/{userId}", web::get().to(team::employee))
                            .route("/summary", web::get().to(team::summary))
                            .route("/today-status", web::get().to(team::today_status))
                            .route("/export", web::get().to(team::export)),
                    )
                    .service(
                        web::scope("/dashboard")
                            .route("/employee", web::get().to(dashboard::employee))
                            .route("/employee/{userId}", web::get().to(dashboard::employee_for))
                            .route("/manager", web::get().to(dashboard::manager))
                            .route("/department-stats", web::get().to(dashboard::department_stats))
                            .route("/weekly-trends", web::get().to(dashboard::weekly_trends)),
                    ),
            ),
    );
}

// LOGIN / REGISTER
//  ├─ token (access)
//  └─ refreshToken

// API REQUEST
//  └─ Authorization: Bearer token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with Authorization: Bearer refreshToken
//       └─ returns a new token pair
