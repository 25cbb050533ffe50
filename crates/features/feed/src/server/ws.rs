//! The live feed WebSocket endpoint.
//!
//! A subscriber connects to `/api/feed/{salon_id}`, optionally identifies
//! itself with an `auth` frame, receives the catch-up snapshot (current stats
//! and capacity), and then every frame fanned out for that salon. Slow
//! subscribers skip to the tail of the bounded buffer instead of stalling the
//! hub.

use crate::frame::FeedFrame;
use crate::hub::FeedHub;
use crate::Feed;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bloom_derive::api_handler;
use bloom_domain::constants::FEED_TAG;
use bloom_kernel::prelude::ApiState;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

/// How long the endpoint waits for the client's `auth` frame.
const AUTH_TIMEOUT: Duration = Duration::from_secs(5);

pub fn feed_router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new().routes(routes!(feed_ws_handler))
}

#[api_handler(
    get,
    path = "/api/feed/{salon_id}",
    params(("salon_id" = String, Path, description = "Salon public id")),
    responses((status = 101, description = "Switches to the WebSocket live feed protocol")),
    tag = FEED_TAG,
)]
async fn feed_ws_handler(
    State(state): State<ApiState>,
    Path(salon_id): Path<String>,
    upgrade: WebSocketUpgrade,
) -> Response {
    let hub = match state.try_get_slice::<Feed>() {
        Ok(feed) => feed.hub.clone(),
        Err(e) => {
            tracing::error!(error = %e, "Feed slice missing");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        },
    };

    upgrade.on_upgrade(move |socket| serve_feed(socket, hub, salon_id))
}

async fn serve_feed(mut socket: WebSocket, hub: FeedHub, salon_id: String) {
    if !await_auth(&mut socket, &salon_id).await {
        return;
    }

    let (mut frames, snapshot) = hub.subscribe(&salon_id);
    info!(salon = %salon_id, subscribers = hub.subscriber_count(&salon_id), "Feed subscriber attached");

    // Catch-up: current stats, and the latest capacity when known.
    if send_frame(&mut socket, &FeedFrame::Stats(snapshot.stats)).await.is_err() {
        return;
    }
    if let Some(capacity) = snapshot.capacity {
        if send_frame(&mut socket, &FeedFrame::Capacity(capacity)).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Ok(frame) => {
                    if send_frame(&mut socket, &frame).await.is_err() {
                        break;
                    }
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(salon = %salon_id, skipped, "Feed subscriber lagged; continuing from the tail");
                },
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}, // pings are answered by the protocol layer
            },
        }
    }

    debug!(salon = %salon_id, "Feed subscriber detached");
}

/// Waits for the client's `auth` frame. A frame naming a different salon ends
/// the session; anything else (including silence) falls through to the path
/// parameter.
async fn await_auth(socket: &mut WebSocket, salon_id: &str) -> bool {
    let first = tokio::time::timeout(AUTH_TIMEOUT, socket.recv()).await;
    match first {
        Ok(Some(Ok(Message::Text(text)))) => match FeedFrame::parse(text.as_str()) {
            Ok(FeedFrame::Auth { salon_id: claimed }) if claimed != salon_id => {
                warn!(claimed = %claimed, path = %salon_id, "Feed auth salon mismatch");
                false
            },
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "Ignoring malformed first frame");
                true
            },
        },
        Ok(Some(Ok(_))) | Err(_) => true,
        Ok(Some(Err(_))) | Ok(None) => false,
    }
}

async fn send_frame(socket: &mut WebSocket, frame: &FeedFrame) -> Result<(), ()> {
    let text = match frame.to_text() {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "Dropping unencodable feed frame");
            return Ok(());
        },
    };
    socket.send(Message::Text(text.into())).await.map_err(|_| ())
}
