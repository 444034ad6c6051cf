use identity_service::{
    build_router,
    config::IdentityConfig,
    services::{
        ActivityTracker, Database, IdentityService, IdentityStore, JwtService, MailProvider,
        NoopMailer, PayloadCipher, SmtpMailer,
    },
    AppState,
};
use service_core::middleware::create_ip_rate_limiter;
use service_core::observability::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid (the transport cipher key
    // in particular has no fallback).
    let config = IdentityConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting identity service"
    );

    // Initialize database connection
    let pool = identity_service::db::create_pool(&config.database)
        .await
        .map_err(|e| service_core::error::AppError::DatabaseError(anyhow::anyhow!(e)))?;
    identity_service::db::run_migrations(&pool)
        .await
        .map_err(|e| service_core::error::AppError::DatabaseError(anyhow::anyhow!(e)))?;
    let store: Arc<dyn IdentityStore> = Arc::new(Database::new(pool));
    tracing::info!("Database initialized");

    // Mail transport degrades to a logged link when unconfigured.
    let mail: Arc<dyn MailProvider> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(smtp)?),
        None => {
            tracing::warn!("SMTP not configured; recovery links will only be logged");
            Arc::new(NoopMailer)
        }
    };

    if config.google.is_none() {
        tracing::warn!("Google OAuth not configured; federated sign-in is disabled");
    }

    let jwt = JwtService::new(&config.session.secret, config.session.ttl_hours);
    let cipher = PayloadCipher::new(&config.cipher_key);
    let activity = ActivityTracker::new(Duration::from_secs(config.idle_window_minutes * 60));

    let identity = IdentityService::new(
        store.clone(),
        mail,
        jwt.clone(),
        config.recovery_token_ttl_minutes,
        config.frontend_url.clone(),
    );

    let login_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.login_attempts,
        config.rate_limit.login_window_seconds,
    );
    let register_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.register_attempts,
        config.rate_limit.register_window_seconds,
    );
    let forgot_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.forgot_attempts,
        config.rate_limit.forgot_window_seconds,
    );
    let ip_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.global_ip_limit,
        config.rate_limit.global_ip_window_seconds,
    );

    let state = AppState {
        config: config.clone(),
        store,
        identity,
        jwt,
        cipher,
        activity: activity.clone(),
        login_rate_limiter,
        register_rate_limiter,
        forgot_rate_limiter,
        ip_rate_limiter,
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Pending idle timers die with the process, not after it.
    activity.shutdown();

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
