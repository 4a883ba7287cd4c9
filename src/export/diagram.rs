//! Diagram Block Extraction
//!
//! Pulls fenced diagram blocks out of markdown before it reaches the
//! markdown converter, leaving a one-line marker in their place. The
//! markers are HTML comments, so the converter passes them through
//! verbatim and the HTML assembler can swap them for diagram elements.
//!
//! Each marker wraps a private-use sentinel character that does not occur
//! anywhere in the input, so no user text can be mistaken for a marker.

use crate::config::MarkdownOptions;
use comrak::nodes::NodeValue;
use comrak::{parse_document, Arena};
use std::borrow::Cow;
use std::collections::HashSet;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

/// Run counter making markers from different conversions distinct.
static EXTRACTION_RUN: AtomicU64 = AtomicU64::new(0);

/// Characters tried, in order, as the marker sentinel.
const SENTINEL_RANGES: [(u32, u32); 2] = [(0xE000, 0xF8FF), (0xFDD0, 0xFDEF)];

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// One extracted diagram block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramPlaceholder {
    /// Marker left in the markdown where the block was
    pub token: String,
    /// Diagram source without the fence lines
    pub source: String,
    /// Position among the extracted blocks, starting at 0
    pub ordinal: usize,
    /// Fence language tag, lowercased
    pub language: String,
}

/// Shape of the markers emitted by one extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerFormat {
    sentinel: char,
    run: u64,
}

/// A marker found in converted HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerMatch {
    /// Byte range of the whole marker
    pub range: Range<usize>,
    /// Ordinal encoded in the marker, `None` if it is malformed
    pub ordinal: Option<usize>,
}

/// The diagrams extracted from one document, in encounter order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramBlocks {
    marker: MarkerFormat,
    blocks: Vec<DiagramPlaceholder>,
}

impl MarkerFormat {
    /// Pick a sentinel absent from `input` and claim a fresh run number.
    fn for_input(input: &str) -> Self {
        let sentinel = SENTINEL_RANGES
            .iter()
            .flat_map(|&(lo, hi)| (lo..=hi).filter_map(char::from_u32))
            .find(|c| !input.contains(*c))
            .unwrap_or('\u{E000}');
        Self {
            sentinel,
            run: EXTRACTION_RUN.fetch_add(1, Ordering::Relaxed),
        }
    }

    fn prefix(&self) -> String {
        format!("<!--{}diagram:{}:", self.sentinel, self.run)
    }

    fn suffix(&self) -> String {
        format!("{}-->", self.sentinel)
    }

    /// Marker text for the block at `ordinal`.
    pub fn token(&self, ordinal: usize) -> String {
        format!("{}{}{}", self.prefix(), ordinal, self.suffix())
    }

    /// Find every marker of this run in `text`, in document order.
    pub fn find_markers(&self, text: &str) -> Vec<MarkerMatch> {
        let prefix = self.prefix();
        let suffix = self.suffix();
        let mut matches = Vec::new();
        let mut offset = 0;

        while let Some(found) = text[offset..].find(&prefix) {
            let start = offset + found;
            let after_prefix = start + prefix.len();
            match text[after_prefix..].find(&suffix) {
                Some(len) => {
                    let end = after_prefix + len + suffix.len();
                    let ordinal = text[after_prefix..after_prefix + len].parse().ok();
                    matches.push(MarkerMatch {
                        range: start..end,
                        ordinal,
                    });
                    offset = end;
                }
                None => {
                    // Truncated marker: still a marker, but unusable
                    matches.push(MarkerMatch {
                        range: start..text.len(),
                        ordinal: None,
                    });
                    break;
                }
            }
        }

        matches
    }
}

impl DiagramBlocks {
    pub fn marker(&self) -> MarkerFormat {
        self.marker
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, ordinal: usize) -> Option<&DiagramPlaceholder> {
        self.blocks.get(ordinal)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DiagramPlaceholder> {
        self.blocks.iter()
    }
}

impl<'a> IntoIterator for &'a DiagramBlocks {
    type Item = &'a DiagramPlaceholder;
    type IntoIter = std::slice::Iter<'a, DiagramPlaceholder>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fence Discovery
// ─────────────────────────────────────────────────────────────────────────────

/// A fenced diagram block as located by the markdown parser.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DiagramFence {
    /// Line index of the opening fence (0-based)
    first_line: usize,
    /// Line index of the last line of the block (0-based)
    last_line: usize,
    fence_char: char,
    /// Whether the last line is the block's own closing fence
    closed: bool,
    language: String,
    /// Block content with container prefixes and indentation removed
    literal: String,
}

fn strip_line_ending(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(line)
}

fn line_ending(line: &str) -> &str {
    &line[strip_line_ending(line).len()..]
}

fn fence_run(rest: &str) -> Option<(char, usize)> {
    let ch = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = rest.chars().take_while(|c| *c == ch).count();
    (len >= 3).then_some((ch, len))
}

/// Language tag from a fence info string, lowercased.
fn fence_language(info: &str) -> Option<String> {
    info.split_whitespace()
        .next()
        .map(|word| word.trim_matches(|c| c == '{' || c == '}').to_ascii_lowercase())
        .filter(|word| !word.is_empty())
}

/// Every fenced block tagged with one of `languages`, in document order.
///
/// Blocks nested in block quotes, list items and footnotes are found too,
/// because the document is parsed with the same grammar used for conversion.
fn find_diagram_fences(markdown: &str, languages: &[String], lines: &[&str]) -> Vec<DiagramFence> {
    let arena = Arena::new();
    let root = parse_document(&arena, markdown, &MarkdownOptions::default().to_comrak_options());

    // Lines on which some block or inline starts; a closing fence starts nothing
    let starts: HashSet<usize> = root
        .descendants()
        .skip(1)
        .map(|node| node.data.borrow().sourcepos.start.line.saturating_sub(1))
        .collect();

    root.descendants()
        .filter_map(|node| {
            let ast = node.data.borrow();
            let NodeValue::CodeBlock(block) = &ast.value else {
                return None;
            };
            if !block.fenced {
                return None;
            }
            let language = fence_language(&block.info)
                .filter(|lang| languages.iter().any(|l| l.eq_ignore_ascii_case(lang)))?;

            let first_line = ast.sourcepos.start.line.checked_sub(1)?;
            if first_line >= lines.len() {
                return None;
            }
            // A block left open at end of input may report a line past the end
            let last_line = ast
                .sourcepos
                .end
                .line
                .saturating_sub(1)
                .clamp(first_line, lines.len() - 1);

            let fence_char = char::from(block.fence_char);
            let closed = last_line > first_line
                && !starts.contains(&last_line)
                && is_closing_fence(lines[last_line], fence_char, block.fence_length);

            Some(DiagramFence {
                first_line,
                last_line,
                fence_char,
                closed,
                language,
                literal: block.literal.clone(),
            })
        })
        .collect()
}

/// Whether `line`, after its container prefix, is a fence closing a block
/// opened with `fence_length` copies of `fence_char`.
fn is_closing_fence(line: &str, fence_char: char, fence_length: usize) -> bool {
    let rest = strip_line_ending(line).trim_start_matches(|c| c == ' ' || c == '\t' || c == '>');
    match fence_run(rest) {
        Some((ch, len)) => ch == fence_char && len >= fence_length && rest[len..].trim().is_empty(),
        None => false,
    }
}

impl DiagramFence {
    /// Byte offset of the fence characters on the opening line.
    ///
    /// Container markers (`>`, list bullets, indentation) never contain
    /// fence characters, so everything before it is the container prefix.
    fn fence_offset(&self, opening: &str) -> usize {
        opening.find(self.fence_char).unwrap_or(0)
    }
}

/// Backslash-escape the opening line of every unterminated diagram fence.
///
/// An unterminated fence would otherwise turn the rest of its container into
/// code. Escaped, the fence line reads as literal text and everything after
/// it renders as ordinary markdown.
fn escape_unterminated_fences<'a>(markdown: &'a str, languages: &[String]) -> Cow<'a, str> {
    let mut text = Cow::Borrowed(markdown);
    let passes = markdown.lines().count();

    for _ in 0..passes {
        let lines: Vec<&str> = text.split_inclusive('\n').collect();
        let unterminated = find_diagram_fences(&text, languages, &lines)
            .into_iter()
            .find(|fence| !fence.closed);
        let Some(fence) = unterminated else {
            break;
        };

        let mut escaped = String::with_capacity(text.len() + 1);
        for (i, line) in lines.iter().enumerate() {
            if i == fence.first_line {
                let at = fence.fence_offset(line);
                escaped.push_str(&line[..at]);
                escaped.push('\\');
                escaped.push_str(&line[at..]);
            } else {
                escaped.push_str(line);
            }
        }
        text = Cow::Owned(escaped);
    }
    text
}

// ─────────────────────────────────────────────────────────────────────────────
// Extraction
// ─────────────────────────────────────────────────────────────────────────────

/// Replace every fenced block tagged with one of `languages` by a marker.
///
/// Returns the rewritten markdown and the extracted blocks in encounter
/// order. Fences are located by the markdown parser, so blocks inside block
/// quotes and nested list items are found, and diagram-looking fences inside
/// other code blocks are not. Each marker keeps the container prefix of the
/// opening fence line (`> `, list indentation) so it stays in the same
/// container.
///
/// An unterminated diagram fence is not extracted. Its opening line is
/// escaped so it shows as literal text and the content after it still
/// renders as markdown.
pub fn extract_diagrams(markdown: &str, languages: &[String]) -> (String, DiagramBlocks) {
    let source = escape_unterminated_fences(markdown, languages);
    let marker = MarkerFormat::for_input(&source);
    let lines: Vec<&str> = source.split_inclusive('\n').collect();
    let mut output = String::with_capacity(source.len());
    let mut blocks = Vec::new();
    let mut next_line = 0;

    for fence in find_diagram_fences(&source, languages, &lines) {
        if fence.first_line < next_line || !fence.closed {
            continue;
        }
        for line in &lines[next_line..fence.first_line] {
            output.push_str(line);
        }

        let opening = lines[fence.first_line];
        let ordinal = blocks.len();
        let token = marker.token(ordinal);
        output.push_str(&opening[..fence.fence_offset(opening)]);
        output.push_str(&token);
        output.push_str(line_ending(lines[fence.last_line]));

        let mut diagram = fence.literal;
        diagram.truncate(strip_line_ending(&diagram).len());

        blocks.push(DiagramPlaceholder {
            token,
            source: diagram,
            ordinal,
            language: fence.language,
        });
        next_line = fence.last_line + 1;
    }

    for line in lines.iter().skip(next_line) {
        output.push_str(line);
    }

    (output, DiagramBlocks { marker, blocks })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::markdown::markdown_to_html_fragment;

    fn mermaid() -> Vec<String> {
        vec!["mermaid".to_string()]
    }

    #[test]
    fn test_no_diagrams_returns_input_unchanged() {
        let inputs = [
            "",
            "# Title\n\nHello **world**",
            "```rust\nfn main() {}\n```\n",
            "line one\r\nline two\r\n",
            "~~~\nplain\n~~~",
        ];
        for input in inputs {
            let (output, blocks) = extract_diagrams(input, &mermaid());
            assert_eq!(output, input);
            assert!(blocks.is_empty());
        }
    }

    #[test]
    fn test_extracts_single_diagram() {
        let input = "Intro\n\n```mermaid\ngraph TD\nA-->B\n```\n\nOutro\n";
        let (output, blocks) = extract_diagrams(input, &mermaid());

        assert_eq!(blocks.len(), 1);
        let block = blocks.get(0).unwrap();
        assert_eq!(block.source, "graph TD\nA-->B");
        assert_eq!(block.ordinal, 0);
        assert_eq!(block.language, "mermaid");
        assert_eq!(output, format!("Intro\n\n{}\n\nOutro\n", block.token));
        assert!(!output.contains("graph TD"));
    }

    #[test]
    fn test_extracts_multiple_diagrams_in_order() {
        let input = "```mermaid\nfirst\n```\ntext\n```Mermaid\nsecond\n```\n";
        let (output, blocks) = extract_diagrams(input, &mermaid());

        let sources: Vec<&str> = blocks.iter().map(|b| b.source.as_str()).collect();
        assert_eq!(sources, vec!["first", "second"]);
        assert_eq!(blocks.marker().find_markers(&output).len(), 2);
        assert_ne!(blocks.get(0).unwrap().token, blocks.get(1).unwrap().token);
    }

    #[test]
    fn test_unterminated_fence_is_escaped() {
        let input = "# Doc\n\n```mermaid\ngraph TD\nA-->B\n\n## Later section\n\nMore text\n";
        let (output, blocks) = extract_diagrams(input, &mermaid());
        assert!(blocks.is_empty());
        assert_eq!(
            output,
            "# Doc\n\n\\```mermaid\ngraph TD\nA-->B\n\n## Later section\n\nMore text\n"
        );
    }

    #[test]
    fn test_unterminated_fence_keeps_later_markdown() {
        let input = "# Doc\n\n```mermaid\ngraph TD\nA-->B\n\n## Later section\n\nMore text\n";
        let (output, _) = extract_diagrams(input, &mermaid());
        let html = markdown_to_html_fragment(&output, &MarkdownOptions::default());

        assert!(html.contains("<h2>Later section</h2>"));
        assert!(html.contains("<p>More text</p>"));
        assert!(html.contains("mermaid"));
        assert!(!html.contains("<pre>"));
    }

    #[test]
    fn test_closed_diagram_after_unterminated_one_is_kept() {
        let input = "> ```mermaid\n> open\n\n```mermaid\nclosed\n```\n";
        let (output, blocks) = extract_diagrams(input, &mermaid());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks.get(0).unwrap().source, "closed");
        assert!(output.starts_with("> \\```mermaid\n"));
    }

    #[test]
    fn test_longer_fence_keeps_inner_backticks() {
        let input = "````mermaid\ngraph TD\n```\nA-->B\n````\nafter\n";
        let (output, blocks) = extract_diagrams(input, &mermaid());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks.get(0).unwrap().source, "graph TD\n```\nA-->B");
        assert!(output.ends_with("\nafter\n"));
    }

    #[test]
    fn test_closing_fence_must_match_character() {
        let input = "~~~mermaid\nA\n```\nB\n~~~\n";
        let (_, blocks) = extract_diagrams(input, &mermaid());
        assert_eq!(blocks.get(0).unwrap().source, "A\n```\nB");
    }

    #[test]
    fn test_closing_fence_with_info_does_not_close() {
        let input = "```mermaid\nA\n```text\nB\n```\n";
        let (_, blocks) = extract_diagrams(input, &mermaid());
        assert_eq!(blocks.get(0).unwrap().source, "A\n```text\nB");
    }

    #[test]
    fn test_diagram_inside_other_code_block_ignored() {
        let input = "````markdown\n```mermaid\ngraph TD\n```\n````\n";
        let (output, blocks) = extract_diagrams(input, &mermaid());
        assert!(blocks.is_empty());
        assert_eq!(output, input);
    }

    #[test]
    fn test_other_languages_ignored() {
        let input = "```plantuml\n@startuml\n@enduml\n```\n";
        let (output, blocks) = extract_diagrams(input, &mermaid());
        assert!(blocks.is_empty());
        assert_eq!(output, input);

        let (_, blocks) = extract_diagrams(input, &["plantuml".to_string()]);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_indented_fence_strips_indentation() {
        let input = "- item\n\n  ```mermaid\n  graph LR\n    X-->Y\n  ```\n";
        let (output, blocks) = extract_diagrams(input, &mermaid());
        let block = blocks.get(0).unwrap();
        assert_eq!(block.source, "graph LR\n  X-->Y");
        assert!(output.contains(&format!("\n  {}\n", block.token)));
    }

    #[test]
    fn test_four_space_indent_is_not_a_fence() {
        let input = "    ```mermaid\n    A\n    ```\n";
        let (output, blocks) = extract_diagrams(input, &mermaid());
        assert!(blocks.is_empty());
        assert_eq!(output, input);
    }

    #[test]
    fn test_crlf_line_endings() {
        let input = "```mermaid\r\ngraph TD\r\nA-->B\r\n```\r\nnext\r\n";
        let (output, blocks) = extract_diagrams(input, &mermaid());
        let block = blocks.get(0).unwrap();
        assert_eq!(block.source.replace('\r', ""), "graph TD\nA-->B");
        assert_eq!(output, format!("{}\r\nnext\r\n", block.token));
    }

    #[test]
    fn test_fence_inside_block_quote() {
        let input = "> ```mermaid\n> graph TD\n> A-->B\n> ```\n";
        let (output, blocks) = extract_diagrams(input, &mermaid());

        assert_eq!(blocks.len(), 1);
        let block = blocks.get(0).unwrap();
        assert_eq!(block.source, "graph TD\nA-->B");
        assert_eq!(output, format!("> {}\n", block.token));

        let html = markdown_to_html_fragment(&output, &MarkdownOptions::default());
        assert!(html.contains("<blockquote>"));
        assert_eq!(blocks.marker().find_markers(&html).len(), 1);
        assert!(!html.contains("language-mermaid"));
    }

    #[test]
    fn test_fence_in_nested_list_item() {
        let input = "- outer\n    - inner\n\n      ```mermaid\n      graph TD\n      A-->B\n      ```\n";
        let (output, blocks) = extract_diagrams(input, &mermaid());

        assert_eq!(blocks.len(), 1);
        let block = blocks.get(0).unwrap();
        assert_eq!(block.source, "graph TD\nA-->B");
        assert!(output.ends_with(&format!("\n      {}\n", block.token)));

        let html = markdown_to_html_fragment(&output, &MarkdownOptions::default());
        assert_eq!(blocks.marker().find_markers(&html).len(), 1);
        assert!(!html.contains("language-mermaid"));
    }

    #[test]
    fn test_fence_on_list_marker_line() {
        let input = "- ```mermaid\n  A-->B\n  ```\n- next\n";
        let (output, blocks) = extract_diagrams(input, &mermaid());
        let block = blocks.get(0).unwrap();
        assert_eq!(block.source, "A-->B");
        assert_eq!(output, format!("- {}\n- next\n", block.token));
    }

    #[test]
    fn test_fence_at_end_without_newline() {
        let input = "```mermaid\nA-->B\n```";
        let (output, blocks) = extract_diagrams(input, &mermaid());
        assert_eq!(output, blocks.get(0).unwrap().token);
    }

    #[test]
    fn test_empty_diagram() {
        let (_, blocks) = extract_diagrams("```mermaid\n```\n", &mermaid());
        assert_eq!(blocks.get(0).unwrap().source, "");
    }

    #[test]
    fn test_sentinel_avoids_input_characters() {
        let input = "user text with \u{E000} and \u{E001}\n```mermaid\nA\n```\n";
        let (_, blocks) = extract_diagrams(input, &mermaid());
        let token = &blocks.get(0).unwrap().token;
        assert!(!token.contains('\u{E000}'));
        assert!(!token.contains('\u{E001}'));
        assert!(token.contains('\u{E002}'));
    }

    #[test]
    fn test_user_text_resembling_marker_not_matched() {
        let input = "<!--diagram:0:0-->\n```mermaid\nA\n```\n";
        let (output, blocks) = extract_diagrams(input, &mermaid());
        assert_eq!(blocks.marker().find_markers(&output).len(), 1);
    }

    #[test]
    fn test_runs_produce_distinct_tokens() {
        let input = "```mermaid\nA\n```\n";
        let (_, first) = extract_diagrams(input, &mermaid());
        let (_, second) = extract_diagrams(input, &mermaid());
        assert_ne!(first.get(0).unwrap().token, second.get(0).unwrap().token);
    }

    #[test]
    fn test_find_markers_reports_malformed() {
        let (_, blocks) = extract_diagrams("```mermaid\nA\n```\n", &mermaid());
        let marker = blocks.marker();
        let good = marker.token(0);
        let truncated = &good[..good.len() - "-->".len()];
        let text = format!("{good} middle {truncated}");

        let found = marker.find_markers(&text);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].ordinal, Some(0));
        assert_eq!(found[0].range, 0..good.len());
        assert_eq!(found[1].ordinal, None);
    }
}
