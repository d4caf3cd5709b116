use std::net::SocketAddr;

use axum::{
    routing::{get, post},
    Router,
};
use teloxide::types::Update;
use tokio::sync::{broadcast, mpsc};
use tower_http::trace::TraceLayer;

pub mod health;
pub mod webhook;

#[derive(Clone)]
pub struct WebState {
    /// Expected `X-Telegram-Bot-Api-Secret-Token`, if any.
    pub secret: Option<String>,
    /// `None` in polling mode; the webhook route then answers 404.
    pub updates: Option<mpsc::Sender<Update>>,
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(health::health_check))
        .route("/health", get(health::health_check))
        .route("/webhook", post(webhook::receive_update))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(
    port: u16,
    state: WebState,
    mut shutdown_signal: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("HTTP listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown_signal.recv().await;
        })
        .await?;

    Ok(())
}
