//! Markdown rendering for chat messages.
//!
//! GitHub-flavoured extensions (tables, strikethrough, task lists) are on,
//! single newlines render as line breaks, raw HTML in a message is shown as
//! text, and links open in a new tab without a referrer.

use maud::{Markup, PreEscaped};
use pulldown_cmark::{Event, Options, Parser, html};

const LINK_OPEN: &str = "<a href=";
const LINK_OPEN_NEW_TAB: &str = r#"<a target="_blank" rel="noreferrer" href="#;

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Render `source` to an HTML string.
#[must_use]
pub fn to_html(source: &str) -> String {
    let events = Parser::new_ext(source, options()).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, events);

    // Raw HTML is escaped above, so every anchor in the output is a link.
    out.replace(LINK_OPEN, LINK_OPEN_NEW_TAB)
}

/// Render `source` as pre-escaped markup.
#[must_use]
pub fn render(source: &str) -> Markup {
    PreEscaped(to_html(source))
}
