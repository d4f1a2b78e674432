//! Preview pane markup.

use maud::{Markup, html};

use super::pane_style;
use crate::preview::PreviewView;

/// Permissions granted to the embedded site.
const FRAME_SANDBOX: &str = "allow-scripts allow-same-origin allow-forms allow-popups";
const FRAME_ALLOW: &str = "accelerometer; clipboard-write; encrypted-media";

/// URL form, status overlay and frame.
pub fn preview_panel(view: &PreviewView, percent: f64) -> Markup {
    let current_url = Some(view.current_url.as_str()).filter(|url| !url.is_empty());
    html! {
        section #preview-panel .preview-panel
            aria-label="Website preview workspace"
            style=(pane_style(percent)) {
            div .form-group {
                form #url-form novalidate {
                    div .form-controls {
                        input #site-url .form-input
                            type="url"
                            name="url"
                            placeholder="Website URL"
                            value=(view.input_url)
                            inputmode="url"
                            aria-invalid=(if view.url_error.is_some() { "true" } else { "false" })
                            aria-describedby="site-url-error"
                            required;
                        button .btn .btn-primary type="submit" { "Load Site" }
                    }
                    p #site-url-error .form-hint role="alert" hidden[view.url_error.is_none()] {
                        @if let Some(error) = &view.url_error { (error) }
                    }
                }
            }
            div .preview-frame-container {
                (preview_status(view))
                iframe #preview-frame .preview-frame
                    title="website-preview"
                    src=[current_url]
                    data-token=(view.load_token)
                    sandbox=(FRAME_SANDBOX)
                    allow=(FRAME_ALLOW)
                    referrerpolicy="no-referrer"
                    hidden[view.load_error.is_some()] {}
            }
        }
    }
}

/// Loading overlay or embedding error, whichever applies.
pub fn preview_status(view: &PreviewView) -> Markup {
    html! {
        div #preview-status {
            @if view.is_loading {
                div .preview-loading aria-live="polite" {
                    div .loading-spinner aria-hidden="true" {}
                    p { "Loading website content..." }
                }
            } @else if let Some(error) = &view.load_error {
                div .preview-error role="alert" {
                    h3 { "Unable to Load Site" }
                    p { (error) }
                    p .text-tertiary {
                        "This typically occurs when websites implement security policies that prevent iframe embedding. "
                        "Try testing with a different URL or a development environment."
                    }
                }
            } @else if view.current_url.is_empty() {
                div .preview-empty {
                    p { "Enter a URL above to preview a site." }
                }
            }
        }
    }
}
