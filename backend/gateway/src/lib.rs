//! perceptor HTTP/WebSocket gateway
//!
//! Image upload endpoints, the object-detection frame stream and health.

pub mod error;
pub mod health_api;
pub mod image_upload;
pub mod server;
pub mod ws_protocol;
pub mod ws_session;

pub use error::ApiError;
pub use server::{GatewayOptions, GatewayState, build_router, start_server};
pub use ws_session::{CloseReason, SessionSummary, run_session};
