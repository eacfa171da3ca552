//! Realtime channel: every connected dashboard receives the full cluster
//! snapshot after each collection cycle, plus refresh-rate change
//! notifications. Clients may request a new process-wide refresh rate.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::dashboard::server::AuthUser;
use crate::scheduler::StatusEvent;
use crate::snapshot::ClusterSnapshot;
use crate::MonitorEngine;

// ========================================
// WIRE FRAMES
// ========================================

#[derive(Debug, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
enum ServerFrame<'a> {
    Status(&'a ClusterSnapshot),
    #[serde(rename_all = "camelCase")]
    RefreshRateChanged { interval_secs: u64 },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
enum ClientFrame {
    #[serde(rename_all = "camelCase")]
    SetRefreshRate { interval_secs: u64 },
}

fn status_frame(snapshot: &ClusterSnapshot) -> Option<Message> {
    match serde_json::to_string(&ServerFrame::Status(snapshot)) {
        Ok(text) => Some(Message::Text(text.into())),
        Err(e) => {
            warn!(error = %e, "failed to serialize status frame");
            None
        }
    }
}

fn rate_frame(interval_secs: u64) -> Option<Message> {
    serde_json::to_string(&ServerFrame::RefreshRateChanged { interval_secs })
        .ok()
        .map(|text| Message::Text(text.into()))
}

// ========================================
// HANDLER
// ========================================

pub async fn ws_handler(
    AuthUser(identity): AuthUser,
    State(engine): State<MonitorEngine>,
    upgrade: WebSocketUpgrade,
) -> Response {
    debug!(user = %identity.username, "websocket upgrade");
    upgrade.on_upgrade(move |socket| serve_socket(socket, engine))
}

async fn serve_socket(socket: WebSocket, engine: MonitorEngine) {
    let (mut sink, mut stream) = socket.split();

    // Subscribe before the initial send so a cycle finishing in between is
    // not lost.
    let mut events = engine.scheduler.subscribe();

    let initial: Arc<ClusterSnapshot> = engine.scheduler.ensure_snapshot().await;
    if let Some(frame) = status_frame(&initial) {
        if sink.send(frame).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                let frame = match event {
                    Ok(StatusEvent::Status(snapshot)) => status_frame(&snapshot),
                    Ok(StatusEvent::RefreshRateChanged(secs)) => rate_frame(secs),
                    Err(RecvError::Lagged(skipped)) => {
                        // Each frame is a full snapshot, so dropped
                        // intermediates are harmless.
                        debug!(skipped, "websocket subscriber lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                if let Some(frame) = frame {
                    if sink.send(frame).await.is_err() {
                        break;
                    }
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => handle_client_frame(&engine, &text),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "websocket read error");
                        break;
                    }
                }
            }
        }
    }
}

fn handle_client_frame(engine: &MonitorEngine, text: &str) {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(ClientFrame::SetRefreshRate { interval_secs }) => {
            if let Err(e) = engine.scheduler.set_interval_secs(interval_secs) {
                warn!(error = %e, "rejected refresh rate change");
            }
        }
        Err(e) => debug!(error = %e, "ignoring malformed client frame"),
    }
}
