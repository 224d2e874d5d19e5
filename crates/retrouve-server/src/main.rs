//! # retrouve-server
//!
//! Realtime chat backend for the Retrouvé lost-and-found application.
//!
//! This binary provides:
//! - **WebSocket gateway** (`GET /ws`) carrying the chat event protocol:
//!   rooms, message send/broadcast, inbox and feed pagination, read
//!   receipts, pin/mute/delete
//! - **Media storage** for image attachments, served at `GET /media/{file}`
//! - **Profile cache sync** endpoint for the external user service
//! - **Per-IP rate limiting** to protect against abuse

mod api;
mod config;
mod error;
mod gateway;
mod media;
mod rate_limit;
mod rooms;

use std::sync::{Arc, Mutex};

use tracing::info;
use tracing_subscriber::EnvFilter;

use retrouve_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::media::MediaStore;
use crate::rate_limit::RateLimiter;
use crate::rooms::Rooms;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,retrouve_server=debug")),
        )
        .init();

    info!("Starting Retrouvé chat server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    // Store (runs migrations on open)
    let db = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    let db = Arc::new(Mutex::new(db));

    // Media store (creates directory if missing)
    let media = Arc::new(
        MediaStore::new(
            config.media_storage_path.clone(),
            config.max_attachment_size,
            config.public_base_url.clone(),
        )
        .await?,
    );

    // Room registry for the realtime gateway
    let rooms = Rooms::new();

    // Rate limiter: 20 req/s sustained, burst of 60
    let rate_limiter = RateLimiter::default();

    let http_addr = config.http_addr;
    let app_state = AppState {
        db,
        media,
        rooms,
        rate_limiter: rate_limiter.clone(),
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic rate limiter cleanup (every 5 minutes, evict buckets idle >10 min)
    let rl = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rl.evict_idle(600.0).await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP server (blocks until shutdown)
    // -----------------------------------------------------------------------
    // tokio::select! ensures that if either the HTTP server or a shutdown
    // signal arrives, we exit cleanly.
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
