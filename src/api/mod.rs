use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;
use crate::predictor::{PlaceholderPredictor, Predictor};
use crate::services::{
    AnalysisService, AuthService, MediaStorage, SeaOrmAnalysisService, SeaOrmAuthService,
    TokenIssuer,
};

mod analysis;
pub mod auth;
mod error;
mod observability;
mod types;

pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    pub store: Store,

    pub storage: Arc<MediaStorage>,

    pub auth_service: Arc<dyn AuthService>,

    pub analysis_service: Arc<dyn AnalysisService>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

/// Builds application state with the placeholder predictor.
pub async fn create_app_state(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let predictor = Arc::new(PlaceholderPredictor::new(config.predictor.input_size));
    create_app_state_with_predictor(config, predictor, prometheus_handle).await
}

/// Builds application state around an arbitrary predictor.
pub async fn create_app_state_with_predictor(
    config: Config,
    predictor: Arc<dyn Predictor>,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let storage = Arc::new(MediaStorage::new(&config.storage));
    storage.ensure_dirs().await?;

    let auth_service = Arc::new(SeaOrmAuthService::new(
        store.clone(),
        TokenIssuer::from_config(&config.auth),
        config.security.clone(),
    ));

    let analysis_service = Arc::new(SeaOrmAnalysisService::new(
        store.clone(),
        storage.clone(),
        predictor,
    ));

    Ok(Arc::new(AppState {
        config: Arc::new(config),
        store,
        storage,
        auth_service,
        analysis_service,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = &state.config.server.cors_allowed_origins;
    let max_upload_bytes = state.config.server.max_upload_bytes;

    let api_router = Router::new()
        .merge(create_protected_router(state.clone()))
        .route("/users/register/", post(auth::register))
        .route("/users/token/", post(auth::obtain_token))
        .route("/users/token/refresh/", post(auth::refresh_token))
        .with_state(state.clone());

    let cors_layer = if cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .route("/health", get(observability::health))
        .nest_service(
            state.storage.media_url(),
            tower_http::services::ServeDir::new(state.storage.media_root()),
        )
        .with_state(state.clone())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/me/", get(auth::me))
        .route("/analysis/upload/", post(analysis::upload))
        .route("/analysis/history/", get(analysis::history))
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
