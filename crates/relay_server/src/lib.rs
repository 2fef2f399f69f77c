//! Relay server: HTTP surface over the relay engine.
pub mod config;
mod error;
mod handlers;
mod router;

pub use config::{ConfigError, RelayConfig, ARTICLE_GENERATION};
pub use error::ApiError;
pub use router::{build_router, AppState};

use axum::Router;
use tokio::net::TcpListener;

/// Serves `router` on an already-bound listener until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
