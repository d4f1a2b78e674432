//! Server-rendered markup.
//!
//! The full page is rendered once per `GET /`; afterwards the page swaps the
//! fragments carried by workspace events. Every fragment renders its own
//! outer element with a stable id so the script can replace it in place.
//!
//! # Structure
//!
//! - [`page`]: document shell, header and split layout
//! - [`preview`]: URL form, load status and embedded frame
//! - [`transcript`]: chat messages, typing indicator and composer

mod page;
mod preview;
mod transcript;

pub use page::{page, theme_toggle};
pub use preview::{preview_panel, preview_status};
pub use transcript::{message, transcript, typing_indicator};

/// Inline flex sizing for a pane taking `percent` of the width.
fn pane_style(percent: f64) -> String {
    format!("flex-basis: {percent}%; max-width: {percent}%; flex-grow: 0")
}
