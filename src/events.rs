//! Workspace change events.
//!
//! Every state change the browser needs to reflect is published as a
//! [`WorkspaceEvent`] on a broadcast channel and forwarded to each open page
//! over Server-Sent Events. Events that replace markup carry the rendered
//! fragment alongside the JSON data so the page never renders markdown
//! itself.
//!
//! # Example
//!
//! ```rust
//! use web_tester::events::{WorkspaceEvent, sse_payload};
//!
//! let event = WorkspaceEvent::Typing { typing: true };
//! assert_eq!(event.event_name(), "typing");
//!
//! let payload = sse_payload(&event);
//! assert_eq!(payload["type"], "typing");
//! assert!(payload["html"].as_str().unwrap().contains("typing-indicator"));
//! ```

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::assistant::ChatMessage;
use crate::layout::LayoutView;
use crate::prefs::Theme;
use crate::preview::PreviewView;
use crate::ui;

/// Interval between SSE keep-alive comments.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// A change in workspace state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum WorkspaceEvent {
    /// The split fraction or drag state changed.
    #[serde(rename = "layout")]
    Layout(LayoutView),

    /// The theme changed.
    #[serde(rename = "theme")]
    Theme {
        /// New theme.
        theme: Theme,
    },

    /// Preview URL, load state or validation message changed.
    #[serde(rename = "preview")]
    Preview(PreviewView),

    /// A message was appended to the transcript.
    #[serde(rename = "message")]
    Message(ChatMessage),

    /// The transcript was replaced wholesale.
    #[serde(rename = "transcript")]
    Transcript {
        /// The full new transcript.
        messages: Vec<ChatMessage>,
    },

    /// The typing indicator turned on or off.
    #[serde(rename = "typing")]
    Typing {
        /// Whether a reply is pending.
        typing: bool,
    },

    /// A pointer drag ended; the page releases pointer capture.
    #[serde(rename = "drag.released")]
    DragReleased {
        /// Pointer that owned the drag.
        pointer_id: u32,
    },
}

impl WorkspaceEvent {
    /// SSE event name.
    #[must_use]
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Layout(_) => "layout",
            Self::Theme { .. } => "theme",
            Self::Preview(_) => "preview",
            Self::Message(_) => "message",
            Self::Transcript { .. } => "transcript",
            Self::Typing { .. } => "typing",
            Self::DragReleased { .. } => "drag.released",
        }
    }

    /// Rendered markup for events that swap part of the page.
    #[must_use]
    pub fn fragment(&self) -> Option<String> {
        let markup = match self {
            Self::Preview(view) => ui::preview_status(view),
            Self::Message(message) => ui::message(message),
            Self::Transcript { messages } => ui::transcript(messages),
            Self::Typing { typing } => ui::typing_indicator(*typing),
            Self::Theme { theme } => ui::theme_toggle(*theme),
            Self::Layout(_) | Self::DragReleased { .. } => return None,
        };
        Some(markup.into_string())
    }
}

/// JSON body of an SSE frame: the tagged event plus an optional `html` field.
#[must_use]
pub fn sse_payload(evt: &WorkspaceEvent) -> serde_json::Value {
    let mut payload = serde_json::to_value(evt).unwrap_or_else(|e| {
        serde_json::json!({ "type": "error", "data": { "message": e.to_string() } })
    });
    if let (Some(html), Some(object)) = (evt.fragment(), payload.as_object_mut()) {
        object.insert("html".to_string(), serde_json::Value::String(html));
    }
    payload
}

/// Convert an event into an SSE frame.
#[must_use]
pub fn sse_event(evt: &WorkspaceEvent) -> Event {
    Event::default()
        .event(evt.event_name())
        .data(sse_payload(evt).to_string())
}

/// Stream a broadcast subscription as SSE.
///
/// A subscriber that falls behind skips the missed events; the page
/// re-syncs from `/api/state` when it sees the `resync` frame.
pub fn sse_stream(
    rx: broadcast::Receiver<WorkspaceEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send> {
    let stream = BroadcastStream::new(rx).map(|item| {
        let frame = match item {
            Ok(evt) => sse_event(&evt),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "SSE subscriber lagged");
                Event::default().event("resync").data(skipped.to_string())
            }
        };
        Ok(frame)
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}
