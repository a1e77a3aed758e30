//! `/ws/detect-objects`: one frame in, one result out, until the stream ends.
//!
//! Frames on one connection are handled strictly in order. After each reply
//! the session sleeps for the configured frame interval. Any per-frame failure
//! sends an error frame and a close frame, then ends the session. A client
//! that leaves mid-frame gets its in-flight inference dropped.

use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::stream::Peekable;
use futures::{Sink, SinkExt, Stream, StreamExt};
use perceptor_core::{ErrorKind, FrameResult, PerceptorError};
use perceptor_logging::{EventLogger, PipelineEvent};
use perceptor_vision::FrameProcessor;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::server::GatewayState;
use crate::ws_protocol::ErrorFrame;

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Client sent a close frame or the stream ended.
    ClientClosed,
    /// Reading from the socket failed.
    Transport(String),
    /// Writing to the socket failed.
    SendFailed,
    /// A frame could not be processed.
    FrameError(ErrorKind),
}

impl CloseReason {
    fn describe(&self) -> String {
        match self {
            CloseReason::ClientClosed => "client_closed".to_string(),
            CloseReason::Transport(e) => format!("transport_error: {e}"),
            CloseReason::SendFailed => "send_failed".to_string(),
            CloseReason::FrameError(kind) => format!("frame_error: {}", kind.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames: u64,
    pub reason: CloseReason,
}

pub async fn detect_objects(ws: WebSocketUpgrade, State(state): State<GatewayState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let (sink, stream) = socket.split();
        run_session(sink, stream, state.frames.clone(), state.frame_interval).await;
    })
}

/// Drive one streaming session to completion.
pub async fn run_session<S, R>(
    mut sink: S,
    stream: R,
    frames: Arc<FrameProcessor>,
    interval: Duration,
) -> SessionSummary
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let session_id = Uuid::new_v4().to_string();
    info!(session = %session_id, "Stream session opened");
    let mut stream = stream.peekable();
    let mut processed = 0u64;

    let reason = loop {
        let message = match stream.next().await {
            None => break CloseReason::ClientClosed,
            Some(Err(err)) => break CloseReason::Transport(err.to_string()),
            Some(Ok(message)) => message,
        };

        let started = Instant::now();
        let outcome = match message {
            Message::Close(_) => break CloseReason::ClientClosed,
            Message::Ping(_) | Message::Pong(_) => continue,
            message => tokio::select! {
                outcome = process_message(&frames, message) => outcome,
                reason = client_gone(&mut stream) => {
                    debug!(session = %session_id, "Client left mid-frame; dropping inference");
                    break reason;
                }
            },
        };

        match outcome {
            Ok(result) => {
                processed += 1;
                log_frame(&session_id, processed, &result, started);
                if let Err(reason) = send_result(&mut sink, &result).await {
                    break reason;
                }
            }
            Err(err) => {
                warn!(session = %session_id, kind = err.kind().as_str(), error = %err, "Frame failed");
                send_error_and_close(&mut sink, &err).await;
                break CloseReason::FrameError(err.kind());
            }
        }

        tokio::time::sleep(interval).await;
    };

    let summary = SessionSummary {
        frames: processed,
        reason,
    };
    EventLogger::log_event(
        &session_id,
        PipelineEvent::SessionClosed {
            frames: summary.frames,
            reason: summary.reason.describe(),
        },
    );
    info!(session = %session_id, frames = summary.frames, "Stream session closed");
    summary
}

async fn process_message(frames: &FrameProcessor, message: Message) -> Result<FrameResult, PerceptorError> {
    match message {
        Message::Text(text) => frames.process_payload(text.as_str()).await,
        Message::Binary(bytes) => frames.process_bytes(&bytes).await,
        _ => Err(PerceptorError::InvalidInput("expected a text or binary frame".to_string())),
    }
}

/// Resolves once the client has closed or the transport failed. A queued
/// frame leaves it pending; the loop reads that frame next.
async fn client_gone<R>(stream: &mut Peekable<R>) -> CloseReason
where
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    match Pin::new(stream).peek().await {
        None | Some(Ok(Message::Close(_))) => CloseReason::ClientClosed,
        Some(Err(err)) => CloseReason::Transport(err.to_string()),
        Some(Ok(_)) => std::future::pending().await,
    }
}

fn log_frame(session_id: &str, frame: u64, result: &FrameResult, started: Instant) {
    EventLogger::log_event(
        session_id,
        PipelineEvent::FrameProcessed {
            frame,
            detected: result.object.as_ref().map(|o| o.class_label.clone()),
            latency_ms: started.elapsed().as_millis() as u64,
        },
    );
}

async fn send_result<S>(sink: &mut S, result: &FrameResult) -> Result<(), CloseReason>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let json = serde_json::to_string(result).map_err(|e| {
        warn!(error = %e, "Failed to serialize frame result");
        CloseReason::SendFailed
    })?;
    sink.send(Message::Text(json.into())).await.map_err(|e| {
        debug!(error = %e, "Client went away");
        CloseReason::SendFailed
    })
}

async fn send_error_and_close<S>(sink: &mut S, err: &PerceptorError)
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let code = match err {
        PerceptorError::Decode(_) | PerceptorError::InvalidInput(_) => close_code::INVALID,
        _ => close_code::ERROR,
    };
    if let Ok(json) = serde_json::to_string(&ErrorFrame::from(err)) {
        if let Err(e) = sink.send(Message::Text(json.into())).await {
            debug!(error = %e, "Could not deliver error frame");
            return;
        }
    }
    let close = Message::Close(Some(CloseFrame {
        code,
        reason: err.kind().as_str().into(),
    }));
    if let Err(e) = sink.send(close).await {
        debug!(error = %e, "Could not deliver close frame");
    }
}

#[cfg(test)]
mod tests {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use futures::channel::mpsc;
    use image::RgbImage;
    use perceptor_core::Detection;
    use perceptor_vision::{DepthMap, ObjectDetector, StaticDepth};
    use serde_json::Value;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    use super::*;
    use crate::server::GatewayOptions;
    use crate::server::test_support::{frames, person, spawn, state};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = std::io::Cursor::new(Vec::new());
        RgbImage::new(width, height)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn text_frame(width: u32, height: u32) -> Message {
        Message::Text(STANDARD.encode(png(width, height)).into())
    }

    /// Feed `incoming` to a session, keep the client side open until
    /// `replies` messages arrived, then hang up and collect the rest.
    async fn run_paced(
        incoming: Vec<Message>,
        processor: Arc<FrameProcessor>,
        replies: usize,
        interval: Duration,
    ) -> (SessionSummary, Vec<Message>) {
        let (client_tx, server_rx) = mpsc::unbounded::<Result<Message, axum::Error>>();
        let (server_tx, mut client_rx) = mpsc::unbounded::<Message>();
        for message in incoming {
            client_tx.unbounded_send(Ok(message)).unwrap();
        }

        let session = tokio::spawn(run_session(server_tx, server_rx, processor, interval));
        let mut outgoing = Vec::new();
        while outgoing.len() < replies {
            match client_rx.next().await {
                Some(message) => outgoing.push(message),
                None => break,
            }
        }
        drop(client_tx);

        let summary = session.await.unwrap();
        outgoing.extend(client_rx.collect::<Vec<_>>().await);
        (summary, outgoing)
    }

    async fn run(
        incoming: Vec<Message>,
        processor: Arc<FrameProcessor>,
        replies: usize,
    ) -> (SessionSummary, Vec<Message>) {
        run_paced(incoming, processor, replies, Duration::from_millis(1)).await
    }

    fn text_json(message: &Message) -> Value {
        match message {
            Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("expected text message, got {other:?}"),
        }
    }

    struct SlowDetector;

    impl ObjectDetector for SlowDetector {
        fn name(&self) -> &str {
            "slow"
        }

        fn detect(&self, _frame: &RgbImage) -> Result<Vec<Detection>, PerceptorError> {
            std::thread::sleep(Duration::from_millis(400));
            Ok(vec![person()])
        }
    }


    #[tokio::test]
    async fn test_reports_best_detection_per_frame() {
        let (summary, outgoing) = run(
            vec![text_frame(4, 4), Message::Binary(png(4, 4).into())],
            frames(vec![person()]),
            2,
        )
        .await;

        assert_eq!(summary.frames, 2);
        assert_eq!(summary.reason, CloseReason::ClientClosed);
        assert_eq!(outgoing.len(), 2);
        for message in &outgoing {
            let json = text_json(message);
            assert_eq!(json["class"], "person");
            assert_eq!(json["box"], serde_json::json!([0, 0, 2, 2]));
            assert_eq!(json["depth"], 0.0);
        }
    }

    #[tokio::test]
    async fn test_empty_detection_sends_empty_object() {
        let (summary, outgoing) = run(vec![text_frame(4, 4)], frames(Vec::new()), 1).await;
        assert_eq!(summary.frames, 1);
        assert_eq!(text_json(&outgoing[0]), serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_malformed_frame_sends_error_then_close() {
        let (summary, outgoing) = run(
            vec![
                text_frame(4, 4),
                Message::Text("%%% not an image %%%".into()),
                text_frame(4, 4),
            ],
            frames(vec![person()]),
            3,
        )
        .await;

        assert_eq!(summary.frames, 1);
        assert_eq!(summary.reason, CloseReason::FrameError(ErrorKind::DecodeError));
        assert_eq!(outgoing.len(), 3);
        assert_eq!(text_json(&outgoing[1])["error"]["kind"], "decode_error");
        match &outgoing[2] {
            Message::Close(Some(frame)) => {
                assert_eq!(frame.code, close_code::INVALID);
                assert_eq!(frame.reason.as_str(), "decode_error");
            }
            other => panic!("expected close frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_session_leaves_concurrent_session_running() {
        let shared = frames(vec![person()]);
        let broken = run(
            vec![Message::Text("not base64 at all".into())],
            shared.clone(),
            2,
        );
        let healthy = run(
            vec![text_frame(4, 4), text_frame(4, 4), text_frame(4, 4)],
            shared.clone(),
            3,
        );
        let ((broken, _), (healthy, outgoing)) = tokio::join!(broken, healthy);

        assert_eq!(broken.reason, CloseReason::FrameError(ErrorKind::DecodeError));
        assert_eq!(healthy.frames, 3);
        assert_eq!(healthy.reason, CloseReason::ClientClosed);
        assert!(outgoing.iter().all(|m| text_json(m)["class"] == "person"));
    }

    #[tokio::test]
    async fn test_sleeps_frame_interval_after_each_frame() {
        let started = Instant::now();
        let (summary, outgoing) = run_paced(
            vec![text_frame(4, 4), text_frame(4, 4), text_frame(4, 4)],
            frames(vec![person()]),
            3,
            Duration::from_millis(50),
        )
        .await;

        assert_eq!(summary.frames, 3);
        assert_eq!(outgoing.len(), 3);
        assert!(started.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_client_close_ends_session() {
        let (summary, outgoing) = run(
            vec![Message::Ping(Vec::new().into()), Message::Close(None), text_frame(4, 4)],
            frames(vec![person()]),
            0,
        )
        .await;
        assert_eq!(summary.frames, 0);
        assert_eq!(summary.reason, CloseReason::ClientClosed);
        assert!(outgoing.is_empty());
    }

    #[tokio::test]
    async fn test_client_leaving_mid_frame_drops_inference() {
        let slow = Arc::new(FrameProcessor::new(
            Arc::new(SlowDetector),
            Arc::new(StaticDepth::new(DepthMap::filled(4, 4, 1.0))),
            1,
            Duration::from_secs(10),
            0.05,
        ));
        let started = Instant::now();
        let (summary, outgoing) =
            run(vec![text_frame(4, 4), Message::Close(None)], slow, 0).await;

        assert_eq!(summary.frames, 0);
        assert_eq!(summary.reason, CloseReason::ClientClosed);
        assert!(outgoing.is_empty());
        assert!(started.elapsed() < Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_responses_keep_frame_order() {
        let (_, outgoing) = run(
            vec![text_frame(2, 2), text_frame(4, 4), text_frame(8, 8)],
            frames(vec![person()]),
            3,
        )
        .await;
        assert_eq!(outgoing.len(), 3);
        assert!(outgoing.iter().all(|m| text_json(m)["class"] == "person"));
    }

    #[tokio::test]
    async fn test_transport_error_ends_session() {
        let (client_tx, server_rx) = mpsc::unbounded::<Result<Message, axum::Error>>();
        let (server_tx, _client_rx) = mpsc::unbounded::<Message>();
        client_tx
            .unbounded_send(Err(axum::Error::new(std::io::Error::other("reset"))))
            .unwrap();

        let summary = run_session(server_tx, server_rx, frames(vec![]), Duration::ZERO).await;
        assert!(matches!(summary.reason, CloseReason::Transport(_)));
    }

    #[tokio::test]
    async fn test_websocket_route_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn(state("x", dir.path()), GatewayOptions::default()).await;
        let url = format!("{}/ws/detect-objects", base.replacen("http://", "ws://", 1));
        let (mut socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();

        socket
            .send(WsMessage::Text(STANDARD.encode(png(4, 4)).into()))
            .await
            .unwrap();
        let reply = socket.next().await.unwrap().unwrap();
        let json: Value = serde_json::from_str(reply.to_text().unwrap()).unwrap();
        assert_eq!(json["class"], "person");
        assert_eq!(json["box"], serde_json::json!([0, 0, 2, 2]));

        socket.send(WsMessage::Text("%%%".into())).await.unwrap();
        let error = socket.next().await.unwrap().unwrap();
        let json: Value = serde_json::from_str(error.to_text().unwrap()).unwrap();
        assert_eq!(json["error"]["kind"], "decode_error");
        match socket.next().await.unwrap().unwrap() {
            WsMessage::Close(Some(frame)) => {
                assert_eq!(u16::from(frame.code), 1007);
                assert_eq!(frame.reason.as_str(), "decode_error");
            }
            other => panic!("expected close frame, got {other:?}"),
        }
    }
}
