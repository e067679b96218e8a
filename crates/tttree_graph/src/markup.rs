// SPDX-License-Identifier: MIT OR Apache-2.0
//! Markdown to HTML conversion for the markdown operator.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};

/// Converts markdown to sanitized HTML, synchronously.
pub trait MarkupConverter: Send + Sync {
    /// Render `markdown` as HTML
    fn to_html(&self, markdown: &str) -> String;
}

/// CommonMark converter that escapes raw HTML and drops script URLs.
#[derive(Debug, Clone)]
pub struct CommonMarkConverter {
    options: Options,
}

impl CommonMarkConverter {
    /// Converter with GitHub-style tables, strikethrough and task lists
    pub fn new() -> Self {
        Self {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS,
        }
    }
}

impl Default for CommonMarkConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupConverter for CommonMarkConverter {
    fn to_html(&self, markdown: &str) -> String {
        let events = Parser::new_ext(markdown, self.options).map(sanitize);
        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, events);
        out
    }
}

fn sanitize(event: Event<'_>) -> Event<'_> {
    match event {
        // Raw HTML is shown as text, never interpreted
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) if is_script_url(&dest_url) => Event::Start(Tag::Link {
            link_type,
            dest_url: CowStr::Borrowed(""),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) if is_script_url(&dest_url) => Event::Start(Tag::Image {
            link_type,
            dest_url: CowStr::Borrowed(""),
            title,
            id,
        }),
        other => other,
    }
}

fn is_script_url(url: &str) -> bool {
    let Some((scheme, _)) = url.split_once(':') else {
        return false;
    };
    let scheme: String = scheme
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    matches!(scheme.as_str(), "javascript" | "vbscript" | "data")
}
