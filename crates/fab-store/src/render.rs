//! Read-time transforms applied to stored blobs.

use pulldown_cmark::{html, Options, Parser};

/// Converts stored bytes into their display form.
///
/// Renderers must be pure: the same input always yields the same output and
/// nothing is written back to the store.
pub trait Renderer: Send + Sync {
    /// Render `source`, or explain why it cannot be rendered.
    fn render(&self, source: &[u8]) -> Result<Vec<u8>, String>;

    /// MIME type of the rendered output.
    fn content_type(&self) -> &'static str;
}

/// CommonMark to HTML via pulldown-cmark.
///
/// Tables, footnotes, strikethrough and task lists are enabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    fn options() -> Options {
        Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&self, source: &[u8]) -> Result<Vec<u8>, String> {
        let text = std::str::from_utf8(source).map_err(|e| format!("not UTF-8 text: {e}"))?;
        let mut out = String::with_capacity(text.len() + text.len() / 2);
        html::push_html(&mut out, Parser::new_ext(text, Self::options()));
        Ok(out.into_bytes())
    }

    fn content_type(&self) -> &'static str {
        "text/html; charset=utf-8"
    }
}
