pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::IdentityConfig;
use crate::services::{ActivityTracker, IdentityService, IdentityStore, JwtService, PayloadCipher};
use service_core::error::AppError;
use service_core::middleware::{
    ip_rate_limit_middleware, request_id_middleware, security_headers_middleware, IpRateLimiter,
};

#[derive(Clone)]
pub struct AppState {
    pub config: IdentityConfig,
    pub store: Arc<dyn IdentityStore>,
    pub identity: IdentityService,
    pub jwt: JwtService,
    pub cipher: PayloadCipher,
    pub activity: ActivityTracker,
    pub login_rate_limiter: IpRateLimiter,
    pub register_rate_limiter: IpRateLimiter,
    pub forgot_rate_limiter: IpRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
}

pub fn build_router(state: AppState) -> Router {
    // Credential-guessing surfaces get their own, tighter limits.
    let login_limiter = state.login_rate_limiter.clone();
    let login_route = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(login_limiter, ip_rate_limit_middleware));

    let register_limiter = state.register_rate_limiter.clone();
    let register_route = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .layer(from_fn_with_state(
            register_limiter,
            ip_rate_limit_middleware,
        ));

    let forgot_limiter = state.forgot_rate_limiter.clone();
    let forgot_route = Router::new()
        .route("/auth/forgot", post(handlers::auth::request_password_reset))
        .layer(from_fn_with_state(forgot_limiter, ip_rate_limit_middleware));

    let ip_limiter = state.ip_rate_limiter.clone();

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/google", get(handlers::social::google_login))
        .route(
            "/auth/google/callback",
            get(handlers::social::google_callback),
        )
        .route("/auth/reset", post(handlers::auth::reset_password))
        .route("/auth/setores", get(handlers::auth::list_sectors))
        .route("/auth/funcoes", get(handlers::auth::list_functions))
        .merge(login_route)
        .merge(register_route)
        .merge(forgot_route)
        .merge(
            Router::new()
                .route("/auth/me", get(handlers::profile::me))
                .route("/auth/profile", put(handlers::profile::update_profile))
                .layer(from_fn_with_state(
                    state.clone(),
                    middleware::auth_middleware,
                )),
        )
        .with_state(state.clone())
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(service_core::middleware::REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .frontend_url
                        .parse::<axum::http::HeaderValue>()
                        .unwrap_or_else(|_| axum::http::HeaderValue::from_static("*")),
                )
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                ]),
        )
}

/// Service health check
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<axum::Json<serde_json::Value>, AppError> {
    Ok(axum::Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
    })))
}
