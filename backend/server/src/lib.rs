//! Documentation of the Open Making guestbook backend.
//!
//!
//!
//! # General Infrastructure
//! - Visitors leave a name, a comment and optionally the course they took
//! - Everyone sees the list of previous entries, newest first
//! - One store service ([`store::Guestbook`]) owns the rules, the HTTP routes are thin adapters
//! - Storage is injected at startup: Redis in production, an in-memory map locally
//! - The webring navigator is served from the same process, see the `webring` crate
//!
//!
//!
//! # Routes
//!
//! | method | path | result |
//! |---|---|---|
//! | `GET` | `/api/guestbook` | `200`, public entries newest first |
//! | `POST` | `/api/guestbook` | `201` created entry, `400`, `429` |
//! | `DELETE` | `/api/guestbook?id=<id>` | `200`, `400`, `401`, `404` |
//! | `OPTIONS` | `/api/guestbook` | `200`, permissive CORS |
//! | `GET` | `/api/webring?host=<host>&theme=<light\|dark>&style=<compact\|full>` | HTML fragment |
//!
//! Errors are always `{"error": "<message>"}`.
//!
//!
//!
//! # Preventing Spam
//!
//! - One accepted submission per address per minute
//! - The address is the socket peer. Behind `TRUSTED_PROXY_HOPS` reverse proxies it is
//!   the `X-Forwarded-For` entry that many places from the right, never the left-most
//!   one, which the client controls
//! - The address is stored next to the entry for moderation but never returned
//! - At most 1000 entries are kept, the oldest fall off
//!
//!
//!
//! # Notes
//!
//! ## Concurrency
//! Submissions and deletions are a read-modify-write of one blob. Two writers at the
//! same moment can lose one update. Acceptable for guestbook traffic, so there is no
//! locking or versioning.
//!
//! ## Admin secret
//! There is no built-in fallback password. Without `ADMIN_PASSWORD` (Docker secret or
//! environment variable) every delete is rejected.
//!
//!
//!
//! # Setup
//!
//! Run locally with in-memory storage.
//! ```sh
//! RUST_LOG=info cargo run -p backend
//! ```
//!
//! Run against Redis.
//! ```sh
//! STORAGE_BACKEND=redis REDIS_URL=redis://127.0.0.1:6379 APP_ENV=production cargo run -p backend
//! ```
//!
//! Seed some entries. The tester fakes a proxy hop per entry, so the server has to trust one.
//! ```sh
//! TRUSTED_PROXY_HOPS=1 cargo run -p backend
//! cargo run -p tester -- seed 25
//! ```
use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    Router,
    http::{
        Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod storage;
pub mod store;
pub mod utils;

use config::Config;
use routes::{delete_handler, list_handler, method_not_allowed, submit_handler, webring_handler};
use state::AppState;

pub async fn start_server() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::new(config).await?;

    info!("Starting server...");
    let app = router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shut down");

    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route(
            "/api/guestbook",
            get(list_handler)
                .post(submit_handler)
                .delete(delete_handler)
                .options(|| async { StatusCode::OK })
                .fallback(method_not_allowed),
        )
        .route("/api/webring", get(webring_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
