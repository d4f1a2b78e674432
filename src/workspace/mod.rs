//! The workspace shell.
//!
//! [`Workspace`] composes the layout controller, preview loader and mock
//! assistant, owns the theme, and publishes a [`WorkspaceEvent`] for every
//! change. It is single-owner state: the server runs it inside an actor task
//! (see [`actor`]) and tests drive it directly with a
//! [`ManualScheduler`](crate::scheduler::ManualScheduler).

pub mod actor;

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use url::Url;

use crate::assistant::{ChatMessage, MockAssistant, ReplyDelay};
use crate::events::WorkspaceEvent;
use crate::layout::{DragMove, LayoutController, LayoutView, PointerSample, ResizeKey};
use crate::prefs::{PreferenceStore, THEME_KEY, Theme, parse_theme, resolve_theme, set_pref};
use crate::preview::{DEFAULT_LOAD_TIMEOUT, PreviewLoader, PreviewView, UrlError};
use crate::scheduler::{Fired, Scheduler, TimerKind};

pub use actor::{WorkspaceError, WorkspaceHandle, spawn_workspace};

/// Buffered events per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 256;

/// Tunables for a workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceSettings {
    /// Origin that `/path` preview input resolves against.
    pub origin: Url,
    /// Time the preview frame gets to report.
    pub load_timeout: Duration,
    /// Bounds of the assistant's typing delay.
    pub reply_delay: ReplyDelay,
}

impl WorkspaceSettings {
    /// Default timings for `origin`.
    #[must_use]
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            reply_delay: ReplyDelay::default(),
        }
    }
}

/// Everything the page needs to render from scratch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkspaceSnapshot {
    /// Active theme.
    pub theme: Theme,
    /// Split layout.
    pub layout: LayoutView,
    /// Preview state.
    pub preview: PreviewView,
    /// Transcript in order.
    pub messages: Vec<ChatMessage>,
    /// Whether a reply is pending.
    pub typing: bool,
}

/// Composed workspace state.
#[derive(Debug)]
pub struct Workspace {
    theme: Theme,
    theme_stored: bool,
    layout: LayoutController,
    preview: PreviewLoader,
    assistant: MockAssistant,
    prefs: Arc<dyn PreferenceStore>,
    events: broadcast::Sender<WorkspaceEvent>,
}

impl Workspace {
    /// Build a workspace from stored preferences.
    pub fn new(
        settings: WorkspaceSettings,
        prefs: Arc<dyn PreferenceStore>,
        scheduler: Arc<dyn Scheduler>,
        rng: StdRng,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let stored_theme = match prefs.get(THEME_KEY) {
            Ok(raw) => raw.as_deref().and_then(parse_theme),
            Err(e) => {
                tracing::debug!(error = %e, "Theme read failed, using default");
                None
            }
        };

        tracing::info!(
            name: "workspace.created",
            origin = %settings.origin,
            load_timeout_ms = settings.load_timeout.as_millis(),
            theme = ?stored_theme,
            "Workspace created"
        );

        Self {
            theme: stored_theme.unwrap_or_default(),
            theme_stored: stored_theme.is_some(),
            layout: LayoutController::load(Arc::clone(&prefs)),
            preview: PreviewLoader::new(
                settings.origin,
                settings.load_timeout,
                Arc::clone(&scheduler),
            ),
            assistant: MockAssistant::new(scheduler, settings.reply_delay, rng),
            prefs,
            events,
        }
    }

    /// Subscribe to change events.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.events.subscribe()
    }

    /// Sender side of the event channel.
    #[must_use]
    pub fn events(&self) -> broadcast::Sender<WorkspaceEvent> {
        self.events.clone()
    }

    /// Current state for a full render.
    #[must_use]
    pub fn snapshot(&self) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            theme: self.theme,
            layout: self.layout.view(),
            preview: self.preview.view(),
            messages: self.assistant.messages().to_vec(),
            typing: self.assistant.is_typing(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Theme
    // ─────────────────────────────────────────────────────────────────────────

    /// Active theme.
    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Whether the user has picked a theme.
    #[must_use]
    pub fn theme_stored(&self) -> bool {
        self.theme_stored
    }

    /// Theme a page should show: the stored choice, else that page's system
    /// preference, else the default. Nothing is changed or broadcast, so
    /// pages with different system preferences do not affect each other.
    #[must_use]
    pub fn theme_for(&self, system: Option<Theme>) -> Theme {
        if self.theme_stored {
            self.theme
        } else {
            resolve_theme(self.prefs.as_ref(), system)
        }
    }

    /// Flip the theme a page currently shows and persist the result.
    ///
    /// `showing` is that page's theme, which may come from its system
    /// preference while nothing is stored.
    pub fn toggle_theme(&mut self, showing: Option<Theme>) -> Theme {
        self.theme = self.theme_for(showing).toggled();
        self.theme_stored = true;
        set_pref(self.prefs.as_ref(), THEME_KEY, self.theme);
        tracing::debug!(theme = %self.theme, "Theme toggled");
        self.publish(WorkspaceEvent::Theme { theme: self.theme });
        self.theme
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Layout
    // ─────────────────────────────────────────────────────────────────────────

    /// Start a divider drag for `pointer_id`.
    pub fn begin_drag(&mut self, pointer_id: u32, sample: PointerSample) -> LayoutView {
        let events = self.events.clone();
        self.layout.begin_drag(pointer_id, sample, move |pointer_id| {
            // No subscribers is fine.
            let _ = events.send(WorkspaceEvent::DragReleased { pointer_id });
        });
        self.publish_layout()
    }

    /// Feed a pointer move into the active drag.
    pub fn drag_move(&mut self, pointer_id: u32, sample: PointerSample, buttons: u16) -> DragMove {
        let outcome = self.layout.drag_to(pointer_id, sample, buttons);
        match outcome {
            DragMove::Moved { changed: true } | DragMove::Released => {
                self.publish_layout();
            }
            DragMove::Moved { changed: false } | DragMove::Ignored => {}
        }
        outcome
    }

    /// Pointer up or cancel.
    pub fn end_drag(&mut self, pointer_id: u32) -> bool {
        let ended = self.layout.end_drag(pointer_id);
        if ended {
            self.publish_layout();
        }
        ended
    }

    /// Apply a divider key press. Returns whether the key is a resize key.
    pub fn resize_key(&mut self, key: &str) -> bool {
        let Ok(key) = key.parse::<ResizeKey>() else {
            return false;
        };
        if self.layout.handle_key(key) {
            self.publish_layout();
        }
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Preview
    // ─────────────────────────────────────────────────────────────────────────

    /// Track edits to the URL field.
    pub fn preview_input(&mut self, value: &str) -> PreviewView {
        if self.preview.set_input(value) {
            self.publish_preview()
        } else {
            self.preview.view()
        }
    }

    /// Submit the URL field.
    pub fn submit_url(&mut self, raw: &str) -> Result<PreviewView, UrlError> {
        let result = self.preview.submit(raw).map(|_| ());
        let view = self.publish_preview();
        result.map(|()| view)
    }

    /// The frame reported a successful load for `token`.
    pub fn preview_loaded(&mut self, token: u64) -> bool {
        let accepted = self.preview.mark_loaded(token);
        if accepted {
            self.publish_preview();
        }
        accepted
    }

    /// The frame reported a failed load for `token`.
    pub fn preview_failed(&mut self, token: u64) -> bool {
        let accepted = self.preview.mark_failed(token);
        if accepted {
            self.publish_preview();
        }
        accepted
    }

    /// Display hostname of the active preview, empty when none.
    #[must_use]
    pub fn hostname(&self) -> String {
        self.preview.hostname()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Chat
    // ─────────────────────────────────────────────────────────────────────────

    /// Send a chat message. Blank input returns `None` and changes nothing.
    pub fn send_message(&mut self, text: &str) -> Option<ChatMessage> {
        let site = self.preview.site_name();
        let message = self.assistant.send(text, &site)?.clone();
        self.publish(WorkspaceEvent::Message(message.clone()));
        self.publish(WorkspaceEvent::Typing { typing: true });
        Some(message)
    }

    /// Reset the transcript to a single greeting.
    pub fn clear_history(&mut self) -> Vec<ChatMessage> {
        let site = self.hostname();
        let messages = self.assistant.clear(&site).to_vec();
        self.publish(WorkspaceEvent::Transcript {
            messages: messages.clone(),
        });
        self.publish(WorkspaceEvent::Typing { typing: false });
        messages
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Timers
    // ─────────────────────────────────────────────────────────────────────────

    /// Route a fired timer to its owner. Returns whether anything changed.
    pub fn on_timer(&mut self, fired: Fired) -> bool {
        match fired.kind {
            TimerKind::AssistantReply => {
                let Some(reply) = self.assistant.handle_timer(fired.handle).cloned() else {
                    return false;
                };
                self.publish(WorkspaceEvent::Message(reply));
                self.publish(WorkspaceEvent::Typing { typing: false });
                true
            }
            TimerKind::PreviewTimeout => {
                if !self.preview.handle_timeout(fired.handle) {
                    return false;
                }
                self.publish_preview();
                true
            }
        }
    }

    fn publish_layout(&self) -> LayoutView {
        let view = self.layout.view();
        self.publish(WorkspaceEvent::Layout(view));
        view
    }

    fn publish_preview(&self) -> PreviewView {
        let view = self.preview.view();
        self.publish(WorkspaceEvent::Preview(view.clone()));
        view
    }

    fn publish(&self, event: WorkspaceEvent) {
        tracing::debug!(event = event.event_name(), "Workspace event");
        // Sending fails only when no page is subscribed.
        let _ = self.events.send(event);
    }
}
