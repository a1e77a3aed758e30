//! Main HTTP gateway server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use perceptor_understanding::TextPipeline;
use perceptor_vision::FrameProcessor;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, instrument};

use crate::{health_api, image_upload, ws_session};

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub pipeline: Arc<TextPipeline>,
    pub frames: Arc<FrameProcessor>,
    pub frame_interval: Duration,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(
        pipeline: Arc<TextPipeline>,
        frames: Arc<FrameProcessor>,
        frame_interval: Duration,
    ) -> Self {
        Self {
            pipeline,
            frames,
            frame_interval,
            started_at: Instant::now(),
        }
    }
}

/// Router-level settings.
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    pub max_upload_bytes: usize,
    pub cors_permissive: bool,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024,
            cors_permissive: true,
        }
    }
}

pub fn build_router(state: GatewayState, options: &GatewayOptions) -> Router {
    let app = Router::new()
        .route("/process-image/", post(image_upload::process_image))
        .route("/summarize-image/", post(image_upload::summarize_image))
        .route("/ws/detect-objects", get(ws_session::detect_objects))
        .route("/api/health", get(health_api::get_health))
        .layer(DefaultBodyLimit::max(options.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if options.cors_permissive {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Bind `addr` and serve until Ctrl-C.
#[instrument(skip(state, options))]
pub async fn start_server(addr: SocketAddr, state: GatewayState, options: GatewayOptions) -> Result<()> {
    let app = build_router(state, &options);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Gateway listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
