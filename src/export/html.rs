//! HTML Document Assembly
//!
//! This module turns an HTML body fragment plus its extracted diagram
//! blocks into a complete, standalone HTML document with inlined theme
//! CSS. Diagram markers are restored as `<pre class="diagram-source">`
//! elements, and a small bootstrap script hands them to the diagram
//! runtime when the document is opened in a browser.

use crate::error::{Error, Result};
use crate::export::diagram::DiagramBlocks;
use crate::theme::ThemeColors;

/// Title used when the document has none.
const DEFAULT_TITLE: &str = "Exported Document";

// ─────────────────────────────────────────────────────────────────────────────
// Diagram Runtime
// ─────────────────────────────────────────────────────────────────────────────

/// How the diagram runtime script is made available to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagramRuntime {
    /// Referenced by URL (`<script src>`)
    Url(String),
    /// Script source embedded in the document
    Inline(String),
}

impl DiagramRuntime {
    fn script_tag(&self) -> String {
        match self {
            DiagramRuntime::Url(url) => {
                format!("<script src=\"{}\"></script>", html_escape(url))
            }
            // A literal "</script" would end the element early
            DiagramRuntime::Inline(source) => {
                format!("<script>\n{}\n</script>", source.replace("</script", "<\\/script"))
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML Generation
// ─────────────────────────────────────────────────────────────────────────────

/// Assemble a complete HTML document.
///
/// # Arguments
///
/// * `fragment` - HTML body produced by the markdown converter
/// * `diagrams` - Blocks extracted before conversion
/// * `colors` - Theme palette for the embedded CSS
/// * `title` - Optional document title
/// * `runtime` - Diagram runtime, referenced only when diagrams are present
///
/// # Errors
///
/// Returns `Error::ExtractionDefect` when the markers in `fragment` do not
/// correspond one-to-one with `diagrams`.
pub fn assemble_html_document(
    fragment: &str,
    diagrams: &DiagramBlocks,
    colors: &ThemeColors,
    title: Option<&str>,
    runtime: &DiagramRuntime,
) -> Result<String> {
    let body = restore_diagrams(fragment, diagrams)?;

    let scripts = if diagrams.is_empty() {
        String::new()
    } else {
        format!(
            "    {runtime}\n    <script>\n{bootstrap}\n    </script>\n",
            runtime = runtime.script_tag(),
            bootstrap = diagram_bootstrap(colors.diagram_theme),
        )
    };

    let doc_title = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TITLE);

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <meta name="generator" content="mdpress">
    <title>{title}</title>
    <style>
{base_css}
{theme_css}
    </style>
</head>
<body>
    <article class="markdown-body">
{body}
    </article>
{scripts}</body>
</html>
"#,
        title = html_escape(doc_title),
        base_css = BASE_CSS,
        theme_css = generate_theme_css(colors),
        body = body,
        scripts = scripts,
    );

    Ok(html)
}

/// Replace every diagram marker in `fragment` with its diagram element.
///
/// Markers are processed in the order they appear in the fragment. Each
/// block must be referenced exactly once.
fn restore_diagrams(fragment: &str, diagrams: &DiagramBlocks) -> Result<String> {
    let markers = diagrams.marker().find_markers(fragment);
    let defect = || Error::ExtractionDefect {
        expected: diagrams.len(),
        found: markers.len(),
    };

    if markers.len() != diagrams.len() {
        return Err(defect());
    }
    if markers.is_empty() {
        return Ok(fragment.to_string());
    }

    let mut seen = vec![false; diagrams.len()];
    let mut result = String::with_capacity(fragment.len());
    let mut last = 0;

    for found in &markers {
        let block = found
            .ordinal
            .and_then(|ordinal| diagrams.get(ordinal))
            .ok_or_else(defect)?;
        if std::mem::replace(&mut seen[block.ordinal], true) {
            return Err(defect());
        }

        result.push_str(&fragment[last..found.range.start]);
        result.push_str(&diagram_element(&block.language, &block.source));
        last = found.range.end;
    }
    result.push_str(&fragment[last..]);

    Ok(result)
}

/// Build the element the diagram runtime looks for.
fn diagram_element(language: &str, source: &str) -> String {
    // The HTML parser drops one newline directly after <pre>
    let leading = if source.starts_with('\n') || source.starts_with("\r\n") {
        "\n"
    } else {
        ""
    };
    format!(
        "<pre class=\"diagram-source\" data-diagram=\"{}\">{}{}</pre>",
        html_escape(language),
        leading,
        html_escape_text(source)
    )
}

/// Script that renders every `pre.diagram-source` in place.
///
/// Each element ends up with a `data-rendered` attribute: `true` once the
/// SVG is in place, `error` if the runtime rejected the source, or
/// `unavailable` when the runtime never loaded. The PDF renderer waits for
/// all elements to carry one.
fn diagram_bootstrap(diagram_theme: &str) -> String {
    format!(
        r#"(function () {{
    var blocks = Array.prototype.slice.call(document.querySelectorAll('pre.diagram-source'));
    function settle(el, state) {{ el.setAttribute('data-rendered', state); }}
    if (typeof mermaid === 'undefined') {{
        blocks.forEach(function (el) {{ settle(el, 'unavailable'); }});
        return;
    }}
    mermaid.initialize({{ startOnLoad: false, theme: '{theme}', securityLevel: 'strict' }});
    blocks.forEach(function (el, i) {{
        var source = el.textContent;
        Promise.resolve()
            .then(function () {{ return mermaid.render('mdpress-diagram-' + i, source); }})
            .then(function (result) {{
                el.innerHTML = result.svg;
                settle(el, 'true');
            }})
            .catch(function (err) {{
                el.setAttribute('data-error', String((err && err.message) || err));
                settle(el, 'error');
            }});
    }});
}})();"#,
        theme = diagram_theme,
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// CSS Generation
// ─────────────────────────────────────────────────────────────────────────────

/// Base CSS for markdown rendering (layout, typography, print).
const BASE_CSS: &str = r#"
*, *::before, *::after {
    box-sizing: border-box;
}

body {
    margin: 0;
    padding: 0;
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Noto Sans', Helvetica, Arial, sans-serif;
    font-size: 16px;
    line-height: 1.6;
}

.markdown-body {
    max-width: 900px;
    margin: 0 auto;
    padding: 32px 24px;
}

.markdown-body h1, .markdown-body h2, .markdown-body h3,
.markdown-body h4, .markdown-body h5, .markdown-body h6 {
    margin-top: 24px;
    margin-bottom: 16px;
    font-weight: 600;
    line-height: 1.25;
}

.markdown-body h1 { font-size: 2em; border-bottom: 1px solid; padding-bottom: 0.3em; }
.markdown-body h2 { font-size: 1.5em; border-bottom: 1px solid; padding-bottom: 0.3em; }
.markdown-body h3 { font-size: 1.25em; }
.markdown-body h4 { font-size: 1em; }
.markdown-body h5 { font-size: 0.875em; }
.markdown-body h6 { font-size: 0.85em; }

.markdown-body p, .markdown-body ul, .markdown-body ol,
.markdown-body blockquote, .markdown-body table, .markdown-body pre {
    margin-top: 0;
    margin-bottom: 16px;
}

.markdown-body a { text-decoration: none; }
.markdown-body a:hover { text-decoration: underline; }

.markdown-body ul, .markdown-body ol { padding-left: 2em; }
.markdown-body li + li { margin-top: 4px; }

/* Task list items rendered as <li><input type="checkbox"> */
.markdown-body li > input[type="checkbox"] {
    margin: 0 0.4em 0.2em -1.4em;
    vertical-align: middle;
}

.markdown-body blockquote {
    margin-left: 0;
    padding: 0 1em;
    border-left: 4px solid;
}

.markdown-body code {
    font-family: 'JetBrains Mono', 'Fira Code', 'Consolas', 'Monaco', monospace;
    font-size: 0.9em;
    padding: 0.2em 0.4em;
    border-radius: 4px;
}

.markdown-body pre {
    padding: 16px;
    overflow: auto;
    border-radius: 6px;
    line-height: 1.45;
}

.markdown-body pre code {
    padding: 0;
    background: transparent;
    border-radius: 0;
    font-size: 0.875em;
}

.markdown-body table { border-collapse: collapse; width: 100%; }
.markdown-body th, .markdown-body td { padding: 8px 12px; border: 1px solid; }
.markdown-body th { font-weight: 600; text-align: left; }
.markdown-body tr:nth-child(even) td { background-color: rgba(128, 128, 128, 0.05); }

.markdown-body hr { height: 2px; margin: 24px 0; border: none; }
.markdown-body img { max-width: 100%; height: auto; }
.markdown-body del { text-decoration: line-through; }

/* Diagrams: source text until the runtime replaces it with SVG */
.markdown-body pre.diagram-source[data-rendered="true"] {
    text-align: center;
    white-space: normal;
    border: none;
}

.markdown-body pre.diagram-source svg { max-width: 100%; height: auto; }

@media print {
    .markdown-body { max-width: none; padding: 0; }
    .markdown-body pre, .markdown-body table, .markdown-body pre.diagram-source { break-inside: avoid; }
    .markdown-body h1, .markdown-body h2, .markdown-body h3 { break-after: avoid; }
}
"#;

/// Generate theme-specific CSS from ThemeColors.
fn generate_theme_css(colors: &ThemeColors) -> String {
    format!(
        r#"
:root {{
    color-scheme: {color_scheme};
}}

body {{
    background-color: {bg};
    color: {text};
}}

.markdown-body h1, .markdown-body h2, .markdown-body h3,
.markdown-body h4, .markdown-body h5, .markdown-body h6 {{
    color: {heading};
}}

.markdown-body h1, .markdown-body h2 {{ border-bottom-color: {border}; }}
.markdown-body a {{ color: {link}; }}

.markdown-body blockquote {{
    color: {blockquote_text};
    border-left-color: {blockquote_border};
}}

.markdown-body code {{
    background-color: {code_bg};
    color: {code_text};
}}

.markdown-body pre {{
    background-color: {code_block_bg};
    border: 1px solid {code_block_border};
}}

.markdown-body th, .markdown-body td {{ border-color: {table_border}; }}
.markdown-body th {{ background-color: {table_header_bg}; }}
.markdown-body hr {{ background-color: {hr}; }}

.markdown-body pre.diagram-source[data-rendered="true"] {{ background-color: {diagram_bg}; }}
.markdown-body pre.diagram-source[data-rendered="error"] {{ color: {secondary}; }}
"#,
        color_scheme = colors.color_scheme(),
        bg = colors.base.background,
        text = colors.text.primary,
        heading = colors.document.heading,
        border = colors.base.border,
        link = colors.text.link,
        blockquote_text = colors.document.blockquote_text,
        blockquote_border = colors.document.blockquote_border,
        code_bg = colors.base.background_tertiary,
        code_text = colors.text.code,
        code_block_bg = colors.document.code_block_bg,
        code_block_border = colors.document.code_block_border,
        table_border = colors.document.table_border,
        table_header_bg = colors.document.table_header_bg,
        hr = colors.document.horizontal_rule,
        diagram_bg = colors.document.diagram_bg,
        secondary = colors.text.secondary,
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Utility Functions
// ─────────────────────────────────────────────────────────────────────────────

/// HTML-escape a string for use in attributes or text.
fn html_escape(s: &str) -> String {
    html_escape_text(s)
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// HTML-escape element text content.
fn html_escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarkdownOptions;
    use crate::export::diagram::extract_diagrams;
    use crate::export::markdown::markdown_to_html_fragment;

    fn runtime() -> DiagramRuntime {
        DiagramRuntime::Url("https://example.invalid/mermaid.js".to_string())
    }

    fn build(markdown: &str) -> Result<String> {
        let (rewritten, blocks) = extract_diagrams(markdown, &["mermaid".to_string()]);
        let fragment = markdown_to_html_fragment(&rewritten, &MarkdownOptions::default());
        assemble_html_document(
            &fragment,
            &blocks,
            &ThemeColors::light(),
            Some("Test Doc"),
            &runtime(),
        )
    }

    /// Text content of every diagram element, unescaped.
    fn diagram_texts(html: &str) -> Vec<String> {
        html.split("<pre class=\"diagram-source\"")
            .skip(1)
            .map(|rest| {
                let start = rest.find('>').unwrap() + 1;
                let end = rest.find("</pre>").unwrap();
                rest[start..end]
                    .replace("&lt;", "<")
                    .replace("&gt;", ">")
                    .replace("&amp;", "&")
            })
            .collect()
    }

    #[test]
    fn test_generate_html_document() {
        let html = build("# Test\n\nParagraph text.").unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Test Doc</title>"));
        assert!(html.contains("<article class=\"markdown-body\">"));
        assert!(html.contains("<h1>Test</h1>"));
        assert!(!html.contains("<script"));
        assert!(!html.contains("diagram-source\""));
    }

    #[test]
    fn test_diagrams_restored_in_order() {
        let markdown =
            "```mermaid\ngraph TD\nA-->B\n```\n\ntext\n\n```mermaid\nsequenceDiagram\nA->>B: <hi> & bye\n```\n";
        let html = build(markdown).unwrap();

        assert_eq!(
            diagram_texts(&html),
            vec![
                "graph TD\nA-->B".to_string(),
                "sequenceDiagram\nA->>B: <hi> & bye".to_string()
            ]
        );
        assert!(html.contains("A-&gt;&gt;B: &lt;hi&gt; &amp; bye"));
        assert!(!html.contains("<!--\u{E000}"));
        assert!(html.contains("<script src=\"https://example.invalid/mermaid.js\"></script>"));
        assert!(html.contains("data-rendered"));
    }

    #[test]
    fn test_placeholder_position_follows_fragment() {
        let (_, blocks) = extract_diagrams(
            "```mermaid\nfirst\n```\n```mermaid\nsecond\n```\n",
            &["mermaid".to_string()],
        );
        let marker = blocks.marker();
        let fragment = format!("<p>x</p>\n{}\n<p>y</p>\n{}\n", marker.token(1), marker.token(0));

        let html = assemble_html_document(
            &fragment,
            &blocks,
            &ThemeColors::light(),
            None,
            &runtime(),
        )
        .unwrap();
        assert_eq!(diagram_texts(&html), vec!["second", "first"]);
    }

    #[test]
    fn test_marker_count_mismatch_is_defect() {
        let (_, blocks) = extract_diagrams(
            "```mermaid\nfirst\n```\n```mermaid\nsecond\n```\n",
            &["mermaid".to_string()],
        );
        let fragment = format!("<p>only one</p>\n{}\n", blocks.marker().token(0));

        let result =
            assemble_html_document(&fragment, &blocks, &ThemeColors::light(), None, &runtime());
        assert!(matches!(
            result,
            Err(Error::ExtractionDefect {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_duplicate_marker_is_defect() {
        let (_, blocks) = extract_diagrams(
            "```mermaid\nfirst\n```\n```mermaid\nsecond\n```\n",
            &["mermaid".to_string()],
        );
        let token = blocks.marker().token(0);
        let fragment = format!("{token}\n{token}\n");

        let result =
            assemble_html_document(&fragment, &blocks, &ThemeColors::light(), None, &runtime());
        assert!(matches!(result, Err(Error::ExtractionDefect { .. })));
    }

    #[test]
    fn test_unknown_ordinal_is_defect() {
        let (_, blocks) = extract_diagrams("```mermaid\nA\n```\n", &["mermaid".to_string()]);
        let fragment = blocks.marker().token(5);

        let result =
            assemble_html_document(&fragment, &blocks, &ThemeColors::light(), None, &runtime());
        assert!(matches!(result, Err(Error::ExtractionDefect { .. })));
    }

    #[test]
    fn test_leading_newline_preserved() {
        let element = diagram_element("mermaid", "\ngraph TD");
        assert!(element.contains("data-diagram=\"mermaid\">\n\ngraph TD</pre>"));
    }

    #[test]
    fn test_inline_runtime_escapes_script_close() {
        let runtime = DiagramRuntime::Inline("var s = '</script>';".to_string());
        let tag = runtime.script_tag();
        assert!(tag.contains("'<\\/script>'"));
        assert_eq!(tag.matches("</script>").count(), 1);
    }

    #[test]
    fn test_default_title() {
        let (_, blocks) = extract_diagrams("", &[]);
        let html =
            assemble_html_document("", &blocks, &ThemeColors::dark(), Some("  "), &runtime())
                .unwrap();
        assert!(html.contains("<title>Exported Document</title>"));
    }

    #[test]
    fn test_title_escaped() {
        let (_, blocks) = extract_diagrams("", &[]);
        let html = assemble_html_document(
            "",
            &blocks,
            &ThemeColors::light(),
            Some("<b>Plans</b> & more"),
            &runtime(),
        )
        .unwrap();
        assert!(html.contains("<title>&lt;b&gt;Plans&lt;/b&gt; &amp; more</title>"));
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("Hello"), "Hello");
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("a & b"), "a &amp; b");
        assert_eq!(html_escape("\"quoted\""), "&quot;quoted&quot;");
    }

    #[test]
    fn test_theme_css_light() {
        let css = generate_theme_css(&ThemeColors::light());
        assert!(css.contains("color-scheme: light"));
        assert!(css.contains("background-color: rgb(255, 255, 255)"));
    }

    #[test]
    fn test_theme_css_dark() {
        let css = generate_theme_css(&ThemeColors::dark());
        assert!(css.contains("color-scheme: dark"));
    }

    #[test]
    fn test_bootstrap_uses_theme() {
        assert!(diagram_bootstrap("dark").contains("theme: 'dark'"));
    }
}
