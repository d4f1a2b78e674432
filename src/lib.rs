//! Web Tester
//!
//! A split-pane website preview with a simulated QA assistant. The page shows
//! an embedded frame of a target site beside a chat transcript that answers
//! with canned review notes.
//!
//! # Architecture
//!
//! - **Server**: Axum router serving the rendered page, a JSON command API and
//!   an SSE event stream
//! - **Workspace**: single-owner state run inside an actor task; every change
//!   is broadcast as a [`events::WorkspaceEvent`]
//! - **UI**: Maud templates plus a small script that forwards DOM events
//!
//! # Modules
//!
//! - [`layout`]: split fraction, pointer drags and keyboard steps
//! - [`preview`]: URL normalisation and the load/timeout state machine
//! - [`assistant`]: transcript and keyword-matched replies
//! - [`prefs`]: durable theme and pane-width preferences
//! - [`scheduler`]: cancellable one-shot timers
//! - [`workspace`]: composition, snapshot and actor handle

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::map_err_ignore)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod assistant;
pub mod config;
pub mod events;
pub mod layout;
pub mod markdown;
pub mod prefs;
pub mod preview;
pub mod scheduler;
pub mod server;
pub mod telemetry;
pub mod ui;
pub mod workspace;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::workspace::WorkspaceHandle;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Handle to the workspace actor.
    pub workspace: WorkspaceHandle,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}
