use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::Serialize;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::eta::eta_between;
use crate::engine::orders::{get_order, order_destination};
use crate::error::AppError;
use crate::models::location::{GeoPoint, LocationEvent};
use crate::state::AppState;

#[derive(Serialize)]
#[serde(untagged)]
enum TrackingFrame {
    Location {
        #[serde(flatten)]
        event: LocationEvent,
        eta_minutes: Option<u32>,
    },
    Warning {
        r#type: &'static str,
        message: String,
    },
}

pub async fn order_events_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| stream_order_events(socket, state))
}

async fn stream_order_events(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = BroadcastStream::new(state.order_events_tx.subscribe())
        .filter_map(|result| async move { result.ok() })
        .boxed();

    info!("order board client connected");

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize order event for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("order board client disconnected");
}

pub async fn location_handler(
    ws: WebSocketUpgrade,
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    get_order(&state, id)?;
    Ok(ws.on_upgrade(move |socket| stream_locations(socket, state, id)))
}

async fn stream_locations(socket: WebSocket, state: Arc<AppState>, order_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();
    let subscription = state.tracking.subscribe(order_id);

    info!(order_id = %order_id, "tracking client connected");

    let mut frames = Vec::new();
    let destination = match resolve_once(&state, order_id).await {
        Ok(point) => Some(point),
        Err(err) => {
            frames.push(TrackingFrame::Warning {
                r#type: "warning",
                message: err.to_string(),
            });
            None
        }
    };

    if let Some(location) = state.tracking.latest(order_id) {
        let eta_minutes = destination.map(|dest| eta_between(&location.point(), &dest));
        frames.push(TrackingFrame::Location {
            event: LocationEvent::Updated { location },
            eta_minutes,
        });
    }

    let mut send_task = tokio::spawn(async move {
        for frame in frames {
            if send_frame(&mut sender, &frame).await.is_err() {
                return;
            }
        }

        let mut events = subscription.into_stream().boxed();
        while let Some(event) = events.next().await {
            let eta_minutes = match (event.location(), destination) {
                (Some(location), Some(dest)) => Some(eta_between(&location.point(), &dest)),
                _ => None,
            };
            let frame = TrackingFrame::Location { event, eta_minutes };

            if send_frame(&mut sender, &frame).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!(order_id = %order_id, "tracking client disconnected");
}

async fn resolve_once(state: &AppState, order_id: Uuid) -> Result<GeoPoint, AppError> {
    let order = get_order(state, order_id)?;
    order_destination(state, &order).await
}

async fn send_frame<S>(sender: &mut S, frame: &TrackingFrame) -> Result<(), ()>
where
    S: futures::Sink<Message> + Unpin,
{
    let json = match serde_json::to_string(frame) {
        Ok(json) => json,
        Err(err) => {
            warn!(error = %err, "failed to serialize tracking frame for ws");
            return Ok(());
        }
    };

    sender.send(Message::Text(json)).await.map_err(|_| ())
}
