//! Embedded preview loading.
//!
//! Each accepted URL submission starts a new load attempt identified by a
//! monotonically increasing token. The embedded frame reports success or
//! failure for its token; a timeout covers sites whose framing policy makes
//! the frame report neither.
//!
//! ```text
//! Idle ──submit──▶ Loading ──loaded──▶ Loaded
//!                     │
//!                     ├──failed──▶ Errored
//!                     └─timeout──▶ Errored
//! ```
//!
//! Any state accepts a new submission, which starts over at `Loading`.

mod normalize;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::scheduler::{Scheduler, TimerHandle, TimerKind};

pub use self::normalize::{UrlError, display_hostname, normalize_url};

/// Default time the frame gets to report before the attempt is failed.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Shown when the frame reports a load error.
pub const LOAD_FAILED_MESSAGE: &str =
    "We were unable to load this page. It may restrict embedding in iframes.";

/// Shown when the frame stays silent past the timeout.
pub const LOAD_TIMED_OUT_MESSAGE: &str =
    "Loading timed out. The site may block embedding or is responding slowly.";

/// Phase of the current load attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadPhase {
    /// Nothing submitted yet.
    #[default]
    Idle,
    /// Waiting for the frame to report.
    Loading,
    /// The frame reported success.
    Loaded,
    /// The frame reported failure or timed out.
    Errored,
}

/// Serializable preview state for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewView {
    /// Active URL, empty before the first accepted submission.
    pub current_url: String,
    /// Text in the URL field.
    pub input_url: String,
    /// Inline validation message.
    pub url_error: Option<String>,
    /// Panel-level embedding failure message.
    pub load_error: Option<String>,
    /// Whether an attempt is in flight.
    pub is_loading: bool,
    /// Token of the current attempt.
    pub load_token: u64,
    /// Phase of the current attempt.
    pub phase: LoadPhase,
    /// Display hostname of the active URL.
    pub hostname: String,
}

/// Owner of the preview URL and its load state machine.
#[derive(Debug)]
pub struct PreviewLoader {
    current_url: Option<Url>,
    input_url: String,
    url_error: Option<UrlError>,
    load_error: Option<&'static str>,
    phase: LoadPhase,
    load_token: u64,
    timeout: Option<TimerHandle>,
    load_timeout: Duration,
    origin: Url,
    scheduler: Arc<dyn Scheduler>,
}

impl PreviewLoader {
    /// Create an idle loader. `/path` input resolves against `origin`.
    pub fn new(origin: Url, load_timeout: Duration, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            current_url: None,
            input_url: String::new(),
            url_error: None,
            load_error: None,
            phase: LoadPhase::Idle,
            load_token: 0,
            timeout: None,
            load_timeout,
            origin,
            scheduler,
        }
    }

    /// Active URL, if one has been accepted.
    #[must_use]
    pub fn current_url(&self) -> Option<&Url> {
        self.current_url.as_ref()
    }

    /// Phase of the current attempt.
    #[must_use]
    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    /// Token of the current attempt.
    #[must_use]
    pub fn load_token(&self) -> u64 {
        self.load_token
    }

    /// Whether an attempt is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase == LoadPhase::Loading
    }

    /// Display hostname of the active URL, empty when there is none.
    #[must_use]
    pub fn hostname(&self) -> String {
        self.current_url
            .as_ref()
            .map(|url| display_hostname(url.as_str(), Some(&self.origin)))
            .unwrap_or_default()
    }

    /// Site named in assistant replies: the active URL's hostname, else the
    /// host of the app origin.
    #[must_use]
    pub fn site_name(&self) -> String {
        let raw = self.current_url.as_ref().map_or("", Url::as_str);
        display_hostname(raw, Some(&self.origin))
    }

    /// Track edits to the URL field. Returns whether a validation error was
    /// cleared by the edit.
    pub fn set_input(&mut self, value: impl Into<String>) -> bool {
        self.input_url = value.into();
        self.url_error.take().is_some()
    }

    /// Validate `raw` and, if accepted, start a fresh load attempt.
    ///
    /// On rejection only the validation message changes; the active URL,
    /// token and phase are left alone.
    pub fn submit(&mut self, raw: &str) -> Result<&Url, UrlError> {
        self.input_url = raw.to_string();
        let url = match normalize_url(raw, &self.origin) {
            Ok(url) => url,
            Err(e) => {
                tracing::info!(input = %raw.trim(), error = %e, "Preview URL rejected");
                self.url_error = Some(e.clone());
                return Err(e);
            }
        };

        self.cancel_timeout();
        self.url_error = None;
        self.load_error = None;
        self.load_token += 1;
        self.phase = LoadPhase::Loading;
        self.input_url = url.to_string();
        self.timeout = Some(
            self.scheduler
                .schedule(self.load_timeout, TimerKind::PreviewTimeout),
        );

        tracing::debug!(url = %url, token = self.load_token, "Preview load started");
        Ok(self.current_url.insert(url))
    }

    /// The frame for `token` finished loading.
    pub fn mark_loaded(&mut self, token: u64) -> bool {
        if !self.accepts_signal(token) {
            return false;
        }
        self.cancel_timeout();
        self.phase = LoadPhase::Loaded;
        self.load_error = None;
        tracing::debug!(token, "Preview loaded");
        true
    }

    /// The frame for `token` reported an error.
    pub fn mark_failed(&mut self, token: u64) -> bool {
        if !self.accepts_signal(token) {
            return false;
        }
        self.fail(LOAD_FAILED_MESSAGE);
        tracing::debug!(token, "Preview failed");
        true
    }

    /// A timer fired. Returns whether it was this loader's live timeout.
    pub fn handle_timeout(&mut self, handle: TimerHandle) -> bool {
        if self.timeout != Some(handle) {
            return false;
        }
        self.timeout = None;
        self.fail(LOAD_TIMED_OUT_MESSAGE);
        tracing::debug!(token = self.load_token, "Preview timed out");
        true
    }

    /// Render state.
    #[must_use]
    pub fn view(&self) -> PreviewView {
        PreviewView {
            current_url: self
                .current_url
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            input_url: self.input_url.clone(),
            url_error: self.url_error.as_ref().map(ToString::to_string),
            load_error: self.load_error.map(str::to_string),
            is_loading: self.is_loading(),
            load_token: self.load_token,
            phase: self.phase,
            hostname: self.hostname(),
        }
    }

    fn accepts_signal(&self, token: u64) -> bool {
        let current = token == self.load_token && self.current_url.is_some();
        if !current {
            tracing::debug!(token, current = self.load_token, "Stale preview signal ignored");
        }
        current
    }

    fn fail(&mut self, message: &'static str) {
        self.cancel_timeout();
        self.phase = LoadPhase::Errored;
        self.load_error = Some(message);
    }

    fn cancel_timeout(&mut self) {
        if let Some(handle) = self.timeout.take() {
            self.scheduler.cancel(handle);
        }
    }
}

impl Drop for PreviewLoader {
    fn drop(&mut self) {
        self.cancel_timeout();
    }
}
