//! Document shell.

use maud::{DOCTYPE, Markup, html};

use super::{preview_panel, transcript};
use crate::layout::LayoutView;
use crate::prefs::Theme;
use crate::workspace::WorkspaceSnapshot;

const APP_TITLE: &str = "Web Tester";

/// The whole page for `snapshot`.
pub fn page(snapshot: &WorkspaceSnapshot) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" data-theme=(snapshot.theme.as_str()) {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                meta name="color-scheme" content="light dark";
                title { (APP_TITLE) }
                link rel="stylesheet" href="/static/app.css";
                script src="/static/app.js" defer {}
            }
            body {
                div class="app-shell" {
                    (header(snapshot.theme))
                    main id="app-layout" class="app-layout" {
                        (preview_panel(&snapshot.preview, snapshot.layout.preview_percent))
                        (divider(&snapshot.layout))
                        (transcript::chat_panel(
                            &snapshot.messages,
                            snapshot.typing,
                            snapshot.layout.chat_percent,
                        ))
                    }
                }
            }
        }
    }
}

fn header(theme: Theme) -> Markup {
    html! {
        header class="app-header" {
            div class="app-header__group" {
                div class="app-header__title" {
                    span class="app-header__icon" aria-hidden="true" { "🌐" }
                    span class="app-header__title-text" { (APP_TITLE) }
                }
            }
            (theme_toggle(theme))
        }
    }
}

/// Theme switch button showing the active theme.
pub fn theme_toggle(theme: Theme) -> Markup {
    let (icon, label) = match theme {
        Theme::Dark => ("🌙", "Dark mode"),
        Theme::Light => ("☀️", "Light mode"),
    };
    html! {
        button id="theme-toggle"
            type="button"
            class="theme-toggle"
            aria-label={ "Switch to " (theme.toggled().as_str()) " theme" } {
            span class="theme-toggle__icon" aria-hidden="true" { (icon) }
            span class="theme-toggle__label" { (label) }
        }
    }
}

fn divider(layout: &LayoutView) -> Markup {
    html! {
        div #panel-divider .panel-divider .is-dragging[layout.dragging]
            role="separator"
            aria-orientation="vertical"
            aria-label="Resize panels"
            aria-valuemin=(layout.aria_min)
            aria-valuemax=(layout.aria_max)
            aria-valuenow=(layout.aria_now)
            tabindex="0" {}
    }
}
