//! HTTP surface of the chat gateway.
//!
//! - `GET  /health`   liveness probe
//! - `POST /api/chat` neighborhood-aware completion, streamed or buffered

pub mod error;
pub mod relay;
pub mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use tokio::net::TcpListener;
use tracing::info;

use crate::llm::provider::LlmProvider;
use crate::prompt::PromptProfile;
use relay::ResponseMode;

pub use routes::app_router;

/// Per-process state shared by every request. Nothing in it changes after
/// startup; the dataset is re-read from `dataset_path` on each request.
pub struct AppState<P> {
    /// `None` when no API key was configured; requests then fail with 500.
    pub llm: Option<Arc<P>>,
    pub dataset_path: Arc<PathBuf>,
    pub profile: PromptProfile,
    pub mode: ResponseMode,
}

impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            llm: self.llm.clone(),
            dataset_path: Arc::clone(&self.dataset_path),
            profile: self.profile,
            mode: self.mode,
        }
    }
}

pub async fn serve<P: LlmProvider>(bind_addr: &str, state: AppState<P>) -> Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|err| anyhow!("Failed to bind {bind_addr}: {err}"))?;
    info!(
        addr = %listener.local_addr()?,
        mode = ?state.mode,
        profile = ?state.profile,
        dataset = %state.dataset_path.display(),
        llm_configured = state.llm.is_some(),
        "chat gateway listening"
    );

    axum::serve(listener, app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| anyhow!("HTTP server failed: {err}"))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
