//! Chat pane markup.

use maud::{Markup, html};

use super::pane_style;
use crate::assistant::ChatMessage;
use crate::markdown;

/// Chat pane: toolbar, history and composer.
pub(super) fn chat_panel(messages: &[ChatMessage], typing: bool, percent: f64) -> Markup {
    html! {
        section #chat-panel .chat-panel aria-label="Assistant chat" style=(pane_style(percent)) {
            div .chat-panel__top {
                h2 .chat-panel__title { "Chat" }
                button #chat-clear .chat-panel__clear type="button" { "Clear Chat" }
            }
            div #chat-history .chat-panel__history role="log" aria-live="polite" {
                (transcript(messages))
                (typing_indicator(typing))
                div #chat-end aria-hidden="true" {}
            }
            form #chat-form .chat-panel__composer {
                label .sr-only for="chat-input" { "Send a message to the assistant" }
                textarea #chat-input .chat-panel__input
                    name="message"
                    placeholder="Share a goal or ask for specific feedback…"
                    rows="1"
                    spellcheck="true"
                    aria-label="Chat input" {}
                button #chat-send .chat-panel__send type="submit" disabled { "Send" }
            }
        }
    }
}

/// All messages, in order.
pub fn transcript(messages: &[ChatMessage]) -> Markup {
    html! {
        div #chat-messages {
            @for entry in messages {
                (message(entry))
            }
        }
    }
}

/// One message with its rendered markdown body.
pub fn message(message: &ChatMessage) -> Markup {
    html! {
        article id=(message.id) class={ "chat-message chat-message--" (message.role.as_str()) } {
            header .chat-message__meta {
                span .chat-message__author { (message.role.author()) }
                time .chat-message__timestamp datetime=(message.timestamp.to_rfc3339()) {
                    (message.timestamp.format("%H:%M").to_string())
                }
            }
            div .chat-message__content {
                (markdown::render(&message.content))
            }
        }
    }
}

/// Typing placeholder, empty while no reply is pending.
pub fn typing_indicator(typing: bool) -> Markup {
    html! {
        div #typing-slot {
            @if typing {
                article .chat-message .chat-message--assistant .chat-message--typing {
                    header .chat-message__meta {
                        span .chat-message__author { "Assistant" }
                        span .chat-message__timestamp { "typing…" }
                    }
                    div .typing-indicator aria-label="Assistant is typing" {
                        span {}
                        span {}
                        span {}
                    }
                }
            }
        }
    }
}
