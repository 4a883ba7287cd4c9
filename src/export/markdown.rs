//! Markdown to HTML conversion using comrak
//!
//! Converts (marker-bearing) markdown into an HTML body fragment. The
//! grammar is permissive: anything that is not a recognized construct is
//! rendered as literal text, so conversion cannot fail.

use crate::config::MarkdownOptions;
use comrak::{markdown_to_html, Options};

impl MarkdownOptions {
    /// Convert to comrak Options.
    pub(crate) fn to_comrak_options(&self) -> Options {
        let mut options = Options::default();

        // Extension options
        options.extension.strikethrough = self.strikethrough;
        options.extension.table = self.tables;
        options.extension.autolink = self.autolink;
        options.extension.tasklist = self.tasklist;
        options.extension.footnotes = self.footnotes;
        options.extension.header_ids = self.header_ids.clone();

        // Raw HTML passthrough; diagram markers depend on it
        options.render.unsafe_ = true;

        options
    }
}

/// Convert markdown to an HTML body fragment.
///
/// Fenced code blocks carry a `language-<tag>` class on their `<code>`
/// element for later syntax highlighting. Raw inline and block HTML
/// appears in the output unescaped.
pub fn markdown_to_html_fragment(markdown: &str, options: &MarkdownOptions) -> String {
    markdown_to_html(markdown, &options.to_comrak_options())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::diagram::extract_diagrams;

    fn convert(markdown: &str) -> String {
        markdown_to_html_fragment(markdown, &MarkdownOptions::default())
    }

    #[test]
    fn test_headings_and_emphasis() {
        let html = convert("# Title\n\nHello **world** and *you*");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<strong>world</strong>"));
        assert!(html.contains("<em>you</em>"));
    }

    #[test]
    fn test_header_ids_opt_in() {
        let options = MarkdownOptions {
            header_ids: Some("section-".to_string()),
            ..MarkdownOptions::default()
        };
        let html = markdown_to_html_fragment("## Getting Started", &options);
        assert!(html.contains("id=\"section-getting-started\""));
    }

    #[test]
    fn test_nested_lists() {
        let html = convert("- a\n  - b\n- c\n\n1. one\n2. two\n");
        assert_eq!(html.matches("<ul>").count(), 2);
        assert!(html.contains("<ol>"));
        assert!(html.contains("<li>two</li>"));
    }

    #[test]
    fn test_table() {
        let html = convert("| A | B |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<th>A</th>"));
        assert!(html.contains("<td>2</td>"));
    }

    #[test]
    fn test_strikethrough() {
        let html = convert("~~gone~~");
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn test_task_list() {
        let html = convert("- [x] done\n- [ ] todo\n");
        assert_eq!(html.matches("type=\"checkbox\"").count(), 2);
        assert!(html.contains("checked"));
    }

    #[test]
    fn test_code_block_language_class() {
        let html = convert("```rust\nfn main() {}\n```\n");
        assert!(html.contains("<code class=\"language-rust\">"));
        assert!(html.contains("fn main() {}"));
    }

    #[test]
    fn test_raw_html_passthrough() {
        let html = convert("<div class=\"note\">Careful</div>\n\nText with <kbd>Ctrl</kbd>.");
        assert!(html.contains("<div class=\"note\">Careful</div>"));
        assert!(html.contains("<kbd>Ctrl</kbd>"));
    }

    #[test]
    fn test_malformed_markdown_renders_as_text() {
        let html = convert("**unclosed and [broken](link\n\n| not | a table");
        assert!(html.contains("**unclosed"));
        assert!(html.contains("<p>"));
    }

    #[test]
    fn test_diagram_markers_survive_conversion() {
        let markdown = "# Doc\nSome text\n```mermaid\nA-->B\n```\nmore text\n\n- item\n\n  ```mermaid\n  C-->D\n  ```\n";
        let (rewritten, blocks) = extract_diagrams(markdown, &["mermaid".to_string()]);
        assert_eq!(blocks.len(), 2);

        let html = convert(&rewritten);
        for block in &blocks {
            assert_eq!(html.matches(block.token.as_str()).count(), 1);
        }
        // Markers are inert: no heading, list or paragraph is built around them
        assert!(!html.contains(&format!("<p>{}", blocks.get(0).unwrap().token)));
        assert!(html.contains("<p>more text</p>"));
    }
}
