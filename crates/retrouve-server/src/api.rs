use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::{Path, State},
    http::{header, Method},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use retrouve_shared::types::UserId;
use retrouve_store::{Database, Profile};

use crate::config::ServerConfig;
use crate::error::{GatewayError, ServerError};
use crate::gateway;
use crate::media::{content_type_for, MediaStore};
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::rooms::Rooms;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub media: Arc<MediaStore>,
    pub rooms: Rooms,
    pub rate_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Lock the store.  The guard must never be held across an `await`;
    /// every gateway handler collects its store results before suspending.
    pub fn store(&self) -> Result<MutexGuard<'_, Database>, GatewayError> {
        self.db.lock().map_err(|_| GatewayError::LockPoisoned)
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(gateway::ws_handler))
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/media/:file_name", get(media_download))
        .route("/profiles", post(profile_upsert))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server until it fails or the process shuts down.
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Serialize)]
struct InfoResponse {
    name: String,
    version: &'static str,
}

async fn server_info(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn media_download(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Response, ServerError> {
    let data = state.media.open(&file_name).await?;
    Ok((
        [(header::CONTENT_TYPE, content_type_for(&file_name))],
        data,
    )
        .into_response())
}

/// Profile push from the user service: keeps the local cache of display
/// names and avatars current.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileSync {
    user_id: UserId,
    full_name: String,
    #[serde(default)]
    picture_url: Option<String>,
}

#[derive(Serialize)]
struct ProfileSyncResponse {
    success: bool,
}

async fn profile_upsert(
    State(state): State<AppState>,
    Json(payload): Json<ProfileSync>,
) -> Result<Json<ProfileSyncResponse>, ServerError> {
    let profile = Profile {
        user_id: payload.user_id,
        full_name: payload.full_name,
        picture_url: payload.picture_url,
        updated_at: Utc::now(),
    };

    let db = state
        .db
        .lock()
        .map_err(|_| ServerError::Internal("state lock poisoned".to_string()))?;
    db.upsert_profile(&profile)?;

    Ok(Json(ProfileSyncResponse { success: true }))
}
