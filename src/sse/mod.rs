use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use serde::Serialize;
use std::{convert::Infallible, time::Duration};
use tokio::sync::broadcast;

use crate::AppState;

/// Idle time before a `ping` event is sent
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Store change notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum StoreEvent {
    /// Thread or reply created
    #[serde(rename_all = "camelCase")]
    ThreadAdded {
        thread_id: String,
        category_id: String,
        parent_id: Option<String>,
    },
    /// Thread replaced or upvoted
    #[serde(rename_all = "camelCase")]
    ThreadUpdated { thread_id: String },
    /// Thread removed
    #[serde(rename_all = "camelCase")]
    ThreadDeleted { thread_id: String },
    /// Bulk load finished
    ThreadsLoaded { count: usize },
    /// Category filter changed
    #[serde(rename_all = "camelCase")]
    SelectionChanged { selected_categories: Vec<String> },
    /// Heartbeat
    Ping,
}

impl StoreEvent {
    /// SSE event name, matching the `type` tag on the wire
    pub fn name(&self) -> &'static str {
        match self {
            StoreEvent::ThreadAdded { .. } => "threadAdded",
            StoreEvent::ThreadUpdated { .. } => "threadUpdated",
            StoreEvent::ThreadDeleted { .. } => "threadDeleted",
            StoreEvent::ThreadsLoaded { .. } => "threadsLoaded",
            StoreEvent::SelectionChanged { .. } => "selectionChanged",
            StoreEvent::Ping => "ping",
        }
    }

    /// Named SSE frame carrying the event as JSON
    pub fn to_sse(&self) -> Option<Event> {
        match serde_json::to_string(self) {
            Ok(json) => Some(Event::default().event(self.name()).data(json)),
            Err(e) => {
                tracing::error!("Failed to serialize {} event: {}", self.name(), e);
                None
            }
        }
    }
}

/// Shared SSE state
#[derive(Clone)]
pub struct SseState {
    sender: broadcast::Sender<StoreEvent>,
}

impl Default for SseState {
    fn default() -> Self {
        Self::new()
    }
}

impl SseState {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1024);
        Self { sender }
    }

    /// Broadcast an event to all connected clients
    pub fn broadcast(&self, event: StoreEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }
}

/// Stream store changes to one client as named events.
///
/// A client that falls behind the broadcast buffer skips the missed events
/// and has to refetch to resync.
pub async fn stream_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.sse.subscribe();

    let stream = async_stream::stream! {
        loop {
            let event = tokio::select! {
                received = rx.recv() => match received {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("Stream client lagged, {} store events dropped", n);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = tokio::time::sleep(PING_INTERVAL) => StoreEvent::Ping,
            };

            if let Some(frame) = event.to_sse() {
                yield Ok(frame);
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
