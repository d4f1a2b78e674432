//! Split-pane layout controller.
//!
//! The chat pane's share of the workspace width is a single fraction clamped
//! to [`CHAT_WIDTH_MIN`]..=[`CHAT_WIDTH_MAX`]; the preview pane takes the
//! rest. Pointer drags and keyboard steps both funnel into
//! [`LayoutController::set_fraction`], which persists every change.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::prefs::{CHAT_WIDTH_KEY, PreferenceStore, get_pref, set_pref};

/// Narrowest chat pane.
pub const CHAT_WIDTH_MIN: f64 = 0.28;
/// Widest chat pane.
pub const CHAT_WIDTH_MAX: f64 = 0.58;
/// Chat pane width when nothing is stored.
pub const DEFAULT_CHAT_WIDTH: f64 = 0.42;
/// Fraction moved by one arrow key press.
pub const KEYBOARD_RESIZE_STEP: f64 = 0.02;

/// Clamp a requested fraction into the allowed range.
#[must_use]
pub fn clamp_chat_width(value: f64) -> f64 {
    value.clamp(CHAT_WIDTH_MIN, CHAT_WIDTH_MAX)
}

/// Validator for [`CHAT_WIDTH_KEY`]: any finite float, clamped.
pub fn parse_chat_width(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(clamp_chat_width)
}

/// Geometry reported with each pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    /// Pointer x in viewport coordinates.
    pub client_x: f64,
    /// Left edge of the split container.
    pub container_left: f64,
    /// Measured width of the split container.
    pub container_width: f64,
}

impl PointerSample {
    /// Chat fraction implied by this pointer position, or `None` while the
    /// container has no measurable width.
    #[must_use]
    pub fn chat_fraction(&self) -> Option<f64> {
        let width = self.container_width;
        if !(width.is_finite() && width > 0.0) || !self.client_x.is_finite() {
            return None;
        }
        let offset = (self.client_x - self.container_left).clamp(0.0, width);
        Some(clamp_chat_width(1.0 - offset / width))
    }
}

/// Keys the divider responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeKey {
    /// Shrink the chat pane by one step.
    ArrowLeft,
    /// Grow the chat pane by one step.
    ArrowRight,
    /// Jump to the narrowest chat pane.
    Home,
    /// Jump to the widest chat pane.
    End,
}

impl FromStr for ResizeKey {
    type Err = ();

    /// Parse a DOM `KeyboardEvent.key` value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ArrowLeft" => Ok(Self::ArrowLeft),
            "ArrowRight" => Ok(Self::ArrowRight),
            "Home" => Ok(Self::Home),
            "End" => Ok(Self::End),
            _ => Err(()),
        }
    }
}

/// An active pointer drag.
///
/// Dropping the session runs its release callback exactly once, whichever way
/// the drag ends.
pub struct DragSession {
    pointer_id: u32,
    release: Option<Box<dyn FnOnce(u32) + Send>>,
}

impl DragSession {
    fn new(pointer_id: u32, release: impl FnOnce(u32) + Send + 'static) -> Self {
        Self {
            pointer_id,
            release: Some(Box::new(release)),
        }
    }

    /// Pointer that owns this drag.
    #[must_use]
    pub fn pointer_id(&self) -> u32 {
        self.pointer_id
    }
}

impl fmt::Debug for DragSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DragSession")
            .field("pointer_id", &self.pointer_id)
            .field("released", &self.release.is_none())
            .finish()
    }
}

impl Drop for DragSession {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            tracing::debug!(pointer_id = self.pointer_id, "Drag released");
            release(self.pointer_id);
        }
    }
}

/// Result of feeding a pointer move into an active drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMove {
    /// The drag continued; `changed` reports whether the fraction moved.
    Moved {
        /// Whether the applied fraction differs from before.
        changed: bool,
    },
    /// No button was held, so the drag ended.
    Released,
    /// No drag is active for this pointer.
    Ignored,
}

/// Rendered layout values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutView {
    /// Chat pane fraction.
    pub fraction: f64,
    /// Chat pane width in percent, one decimal.
    pub chat_percent: f64,
    /// Preview pane width in percent.
    pub preview_percent: f64,
    /// `aria-valuemin` for the divider.
    pub aria_min: u32,
    /// `aria-valuemax` for the divider.
    pub aria_max: u32,
    /// `aria-valuenow` for the divider.
    pub aria_now: u32,
    /// Whether a pointer drag is in progress.
    pub dragging: bool,
}

/// Owner of the split fraction.
#[derive(Debug)]
pub struct LayoutController {
    fraction: f64,
    prefs: Arc<dyn PreferenceStore>,
    drag: Option<DragSession>,
}

impl LayoutController {
    /// Start from the stored fraction, or the default.
    pub fn load(prefs: Arc<dyn PreferenceStore>) -> Self {
        let fraction = get_pref(
            prefs.as_ref(),
            CHAT_WIDTH_KEY,
            parse_chat_width,
            DEFAULT_CHAT_WIDTH,
        );
        tracing::debug!(fraction, "Layout loaded");
        Self {
            fraction,
            prefs,
            drag: None,
        }
    }

    /// Current chat pane fraction.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    /// Whether a pointer drag is in progress.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Apply a new fraction, clamped. Returns whether the value changed.
    pub fn set_fraction(&mut self, requested: f64) -> bool {
        if !requested.is_finite() {
            return false;
        }
        let next = clamp_chat_width(requested);
        if (next - self.fraction).abs() < f64::EPSILON {
            return false;
        }
        self.fraction = next;
        set_pref(self.prefs.as_ref(), CHAT_WIDTH_KEY, next);
        tracing::debug!(fraction = next, "Layout fraction changed");
        true
    }

    /// Begin a drag for `pointer_id` and apply its first sample.
    ///
    /// Any drag already in progress is released first. `release` runs once
    /// when this drag ends for any reason, including the controller being
    /// dropped.
    pub fn begin_drag(
        &mut self,
        pointer_id: u32,
        sample: PointerSample,
        release: impl FnOnce(u32) + Send + 'static,
    ) -> bool {
        self.drag = None;
        self.drag = Some(DragSession::new(pointer_id, release));
        tracing::debug!(pointer_id, "Drag started");
        sample
            .chat_fraction()
            .is_some_and(|fraction| self.set_fraction(fraction))
    }

    /// Feed a pointer move. `buttons` is the DOM bitmask of pressed buttons;
    /// zero means the up event was missed and the drag ends here.
    pub fn drag_to(&mut self, pointer_id: u32, sample: PointerSample, buttons: u16) -> DragMove {
        if self.drag.as_ref().map(DragSession::pointer_id) != Some(pointer_id) {
            return DragMove::Ignored;
        }
        if buttons == 0 {
            self.drag = None;
            return DragMove::Released;
        }
        let changed = sample
            .chat_fraction()
            .is_some_and(|fraction| self.set_fraction(fraction));
        DragMove::Moved { changed }
    }

    /// End the drag for `pointer_id` (pointer up or cancel).
    pub fn end_drag(&mut self, pointer_id: u32) -> bool {
        if self.drag.as_ref().map(DragSession::pointer_id) == Some(pointer_id) {
            self.drag = None;
            true
        } else {
            false
        }
    }

    /// Release any drag regardless of pointer.
    pub fn release_drag(&mut self) -> bool {
        self.drag.take().is_some()
    }

    /// Apply a keyboard step. Returns whether the fraction changed.
    pub fn handle_key(&mut self, key: ResizeKey) -> bool {
        let next = match key {
            ResizeKey::ArrowLeft => self.fraction - KEYBOARD_RESIZE_STEP,
            ResizeKey::ArrowRight => self.fraction + KEYBOARD_RESIZE_STEP,
            ResizeKey::Home => CHAT_WIDTH_MIN,
            ResizeKey::End => CHAT_WIDTH_MAX,
        };
        self.set_fraction(next)
    }

    /// Chat pane width in percent, rounded to one decimal.
    #[must_use]
    pub fn chat_percent(&self) -> f64 {
        (self.fraction * 1000.0).round() / 10.0
    }

    /// Preview pane width in percent.
    #[must_use]
    pub fn preview_percent(&self) -> f64 {
        (100.0 - self.chat_percent()).max(0.0)
    }

    /// Values the page renders.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn view(&self) -> LayoutView {
        LayoutView {
            fraction: self.fraction,
            chat_percent: self.chat_percent(),
            preview_percent: self.preview_percent(),
            aria_min: (CHAT_WIDTH_MIN * 100.0).round() as u32,
            aria_max: (CHAT_WIDTH_MAX * 100.0).round() as u32,
            aria_now: self.chat_percent().round() as u32,
            dragging: self.is_dragging(),
        }
    }
}
