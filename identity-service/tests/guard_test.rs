//! Guard behavior over real routes: every guard re-fetches the caller's
//! current functions and sector from the store before deciding.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

use identity_service::{
    config::{DatabaseConfig, IdentityConfig, RateLimitConfig, SessionConfig},
    dtos::RegisterRequest,
    middleware::{
        admin_guard, admin_or_lead_guard, auth_middleware, route_access_guard, RouteAccess,
    },
    models::{Funcao, Setor},
    services::{
        ActivityTracker, IdentityService, IdentityStore, JwtService, MemoryIdentityStore,
        NoopMailer, PayloadCipher, KEY_LEN,
    },
    AppState,
};
use service_core::config::Environment;
use service_core::middleware::create_ip_rate_limiter;

fn test_state() -> (AppState, Arc<MemoryIdentityStore>) {
    let config = IdentityConfig {
        environment: Environment::Dev,
        service_name: "identity-service".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        port: 8080,
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        session: SessionConfig {
            secret: "test-session-secret".to_string(),
            ttl_hours: 24,
        },
        cipher_key: [7u8; KEY_LEN],
        recovery_token_ttl_minutes: 30,
        idle_window_minutes: 15,
        frontend_url: "http://localhost:3000".to_string(),
        google: None,
        smtp: None,
        rate_limit: RateLimitConfig {
            login_attempts: 1000,
            login_window_seconds: 60,
            register_attempts: 1000,
            register_window_seconds: 60,
            forgot_attempts: 1000,
            forgot_window_seconds: 60,
            global_ip_limit: 10000,
            global_ip_window_seconds: 60,
        },
    };

    let store = Arc::new(MemoryIdentityStore::new());
    let jwt = JwtService::new(&config.session.secret, config.session.ttl_hours);
    let identity = IdentityService::new(
        store.clone(),
        Arc::new(NoopMailer),
        jwt.clone(),
        30,
        config.frontend_url.clone(),
    );

    let state = AppState {
        cipher: PayloadCipher::new(&config.cipher_key),
        config,
        store: store.clone() as Arc<dyn IdentityStore>,
        identity,
        jwt,
        activity: ActivityTracker::new(Duration::from_secs(900)),
        login_rate_limiter: create_ip_rate_limiter(1000, 60),
        register_rate_limiter: create_ip_rate_limiter(1000, 60),
        forgot_rate_limiter: create_ip_rate_limiter(1000, 60),
        ip_rate_limiter: create_ip_rate_limiter(10000, 60),
    };

    (state, store)
}

/// Router with one route per guard configuration under test.
fn guarded_router(state: AppState) -> Router {
    let admin_only = Router::new()
        .route("/admin-only", get(|| async { "ok" }))
        .layer(from_fn_with_state(state.clone(), admin_guard));

    let admin_or_lead = Router::new()
        .route("/admin-or-lead", get(|| async { "ok" }))
        .layer(from_fn_with_state(state.clone(), admin_or_lead_guard));

    let requires_admin_function = Router::new()
        .route("/requires-admin-function", get(|| async { "ok" }))
        .layer(from_fn_with_state(
            (
                state.clone(),
                RouteAccess::functions([Funcao::Administrador]),
            ),
            route_access_guard,
        ));

    let requires_financeiro_sector = Router::new()
        .route("/requires-financeiro-sector", get(|| async { "ok" }))
        .layer(from_fn_with_state(
            (state.clone(), RouteAccess::sectors([Setor::Financeiro])),
            route_access_guard,
        ));

    let requires_both = Router::new()
        .route("/requires-both", get(|| async { "ok" }))
        .layer(from_fn_with_state(
            (
                state.clone(),
                RouteAccess {
                    allowed_functions: vec![Funcao::Administrador],
                    allowed_sectors: vec![Setor::Financeiro],
                },
            ),
            route_access_guard,
        ));

    let open = Router::new()
        .route("/open", get(|| async { "ok" }))
        .layer(from_fn_with_state(
            (state.clone(), RouteAccess::default()),
            route_access_guard,
        ));

    admin_only
        .merge(admin_or_lead)
        .merge(requires_admin_function)
        .merge(requires_financeiro_sector)
        .merge(requires_both)
        .merge(open)
        .layer(from_fn_with_state(state, auth_middleware))
}

async fn seed_staff(
    state: &AppState,
    email: &str,
    sector: Setor,
    functions: Vec<Funcao>,
) -> (i64, String) {
    let session = state
        .identity
        .register(RegisterRequest {
            first_name: "Ana".to_string(),
            last_name: "Silva".to_string(),
            email: email.to_string(),
            password: Some("Str0ng!pass".to_string()),
            phone: None,
            sector,
            functions: Some(functions),
            provider: None,
            provider_id: None,
            photo_url: None,
        })
        .await
        .unwrap();
    (session.staff.id, session.session_token)
}

async fn get_with_token(router: &Router, path: &str, token: &str) -> StatusCode {
    router
        .clone()
        .oneshot(
            Request::builder()
                .uri(path)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn test_route_access_truth_table_for_colaborador_in_financeiro() {
    let (state, _store) = test_state();
    let router = guarded_router(state.clone());
    let (_, token) = seed_staff(
        &state,
        "colab@example.com",
        Setor::Financeiro,
        vec![Funcao::Colaborador],
    )
    .await;

    // allowedFunctions=[ADMINISTRADOR], allowedSectors=[] -> deny.
    assert_eq!(
        get_with_token(&router, "/requires-admin-function", &token).await,
        StatusCode::FORBIDDEN
    );

    // allowedFunctions=[], allowedSectors=[FINANCEIRO] -> allow.
    assert_eq!(
        get_with_token(&router, "/requires-financeiro-sector", &token).await,
        StatusCode::OK
    );

    // Both constrained: sector matches but function does not -> deny.
    assert_eq!(
        get_with_token(&router, "/requires-both", &token).await,
        StatusCode::FORBIDDEN
    );

    // Nothing constrained -> allow.
    assert_eq!(
        get_with_token(&router, "/open", &token).await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_admin_passes_every_route() {
    let (state, _store) = test_state();
    let router = guarded_router(state.clone());
    let (_, token) = seed_staff(
        &state,
        "admin@example.com",
        Setor::Marketing,
        vec![Funcao::Administrador],
    )
    .await;

    for path in [
        "/admin-only",
        "/admin-or-lead",
        "/requires-admin-function",
        "/requires-financeiro-sector",
        "/requires-both",
        "/open",
    ] {
        assert_eq!(
            get_with_token(&router, path, &token).await,
            StatusCode::OK,
            "admin should pass {}",
            path
        );
    }
}

#[tokio::test]
async fn test_admin_guard_rejects_colaborador() {
    let (state, _store) = test_state();
    let router = guarded_router(state.clone());
    let (_, token) = seed_staff(
        &state,
        "colab@example.com",
        Setor::Financeiro,
        vec![Funcao::Colaborador],
    )
    .await;

    assert_eq!(
        get_with_token(&router, "/admin-only", &token).await,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_admin_or_lead_guard() {
    let (state, _store) = test_state();
    let router = guarded_router(state.clone());

    let (_, lead_token) = seed_staff(
        &state,
        "lead@example.com",
        Setor::Eventos,
        vec![Funcao::LiderEventos],
    )
    .await;
    let (_, colab_token) = seed_staff(
        &state,
        "colab@example.com",
        Setor::Eventos,
        vec![Funcao::Colaborador],
    )
    .await;

    assert_eq!(
        get_with_token(&router, "/admin-or-lead", &lead_token).await,
        StatusCode::OK
    );
    assert_eq!(
        get_with_token(&router, "/admin-or-lead", &colab_token).await,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_guard_refetches_current_attributes() {
    let (state, store) = test_state();
    let router = guarded_router(state.clone());
    let (staff_id, token) = seed_staff(
        &state,
        "promoted@example.com",
        Setor::Financeiro,
        vec![Funcao::Colaborador],
    )
    .await;

    assert_eq!(
        get_with_token(&router, "/admin-only", &token).await,
        StatusCode::FORBIDDEN
    );

    // Promote through the store; the old token must pick up the new
    // functions because guards never trust claim data.
    state
        .identity
        .update_profile(
            staff_id,
            identity_service::dtos::UpdateProfileRequest {
                functions: Some(vec![Funcao::Administrador]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(
        get_with_token(&router, "/admin-only", &token).await,
        StatusCode::OK
    );

    // A deleted subject stops being authenticated entirely, even with a
    // syntactically valid token.
    store.soft_delete(staff_id).await;
    assert_eq!(
        get_with_token(&router, "/admin-only", &token).await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_guarded_routes_reject_missing_token() {
    let (state, _store) = test_state();
    let router = guarded_router(state);

    let status = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/open")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
        .status();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
