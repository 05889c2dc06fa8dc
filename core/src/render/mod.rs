//! Content extraction and rich-text rendering.
//!
//! Two entry points, one per pipeline action: `extract_delta` feeds the
//! incremental path (changed rows only), `extract_full` feeds the finalize
//! re-render (whole screen, chrome dropped). Both produce the same
//! intermediate stream of content lines, which `render_to_html` turns into
//! the outgoing message text.

mod html;
mod line;
mod region;

pub use html::{escape, render_regions, split_for_sending, MESSAGE_LIMIT};
pub use line::{classify_line, LineKind};
pub use region::{group_regions, ContentRegion, ExtractedLine, RegionKind};

use crate::term::Span;

/// Extract content lines from a changed-rows delta, in row order.
pub fn extract_delta(changes: &[(usize, Vec<Span>)]) -> Vec<ExtractedLine> {
    changes
        .iter()
        .filter_map(|(_, spans)| extract_row(spans))
        .collect()
}

/// Extract content lines from a full attributed screen. Prompt rows,
/// status bars and every other kind of chrome are dropped unconditionally.
pub fn extract_full(attributed: &[Vec<Span>]) -> Vec<ExtractedLine> {
    attributed
        .iter()
        .filter_map(|spans| extract_row(spans))
        .collect()
}

/// Group and render in one step; returns an empty string when nothing
/// content-bearing survived.
pub fn render_to_html(lines: Vec<ExtractedLine>) -> String {
    render_regions(&group_regions(lines))
}

fn extract_row(spans: &[Span]) -> Option<ExtractedLine> {
    let text: String = spans.iter().map(|span| span.text.as_str()).collect();
    match classify_line(&text) {
        LineKind::Empty => Some(ExtractedLine::Blank),
        LineKind::Response => stripped_or_blank(strip_marker(spans.to_vec(), '⏺')),
        LineKind::ToolConnector => stripped_or_blank(strip_marker(spans.to_vec(), '⎿')),
        LineKind::Content => Some(ExtractedLine::Spans(spans.to_vec())),
        _ => None,
    }
}

fn stripped_or_blank(spans: Vec<Span>) -> Option<ExtractedLine> {
    let text: String = spans.iter().map(|span| span.text.as_str()).collect();
    if text.trim().is_empty() {
        Some(ExtractedLine::Blank)
    } else {
        Some(ExtractedLine::Spans(spans))
    }
}

/// Drop everything up to and including the marker glyph (plus the spacing
/// that follows it), keeping the remaining spans and their attributes.
fn strip_marker(mut spans: Vec<Span>, marker: char) -> Vec<Span> {
    for idx in 0..spans.len() {
        if let Some(pos) = spans[idx].text.find(marker) {
            let after = spans[idx].text[pos + marker.len_utf8()..]
                .trim_start()
                .to_string();
            spans.drain(..idx);
            if after.is_empty() {
                spans.remove(0);
            } else {
                spans[0].text = after;
            }
            break;
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::ColorTag;

    fn row(text: &str) -> Vec<Span> {
        vec![Span::plain(text)]
    }

    #[test]
    fn test_delta_drops_chrome_rows() {
        let changes = vec![
            (0, row("⏺ Hello there.")),
            (1, row("──────────────")),
            (2, row(" ❯ ")),
            (3, row("  esc to interrupt")),
        ];
        let lines = extract_delta(&changes);
        assert_eq!(
            lines,
            vec![ExtractedLine::Spans(vec![Span::plain("Hello there.")])]
        );
    }

    #[test]
    fn test_response_marker_stripped_attributes_kept() {
        let changes = vec![(
            0,
            vec![
                Span::plain("⏺ "),
                Span {
                    text: "bold bit".to_string(),
                    color: ColorTag::Default,
                    bold: true,
                    italic: false,
                },
            ],
        )];
        let lines = extract_delta(&changes);
        match &lines[0] {
            ExtractedLine::Spans(spans) => {
                assert_eq!(spans.len(), 1);
                assert_eq!(spans[0].text, "bold bit");
                assert!(spans[0].bold);
            }
            other => panic!("wrong extraction: {other:?}"),
        }
    }

    #[test]
    fn test_connector_marker_stripped() {
        let changes = vec![(0, row("  ⎿  Read 42 lines"))];
        let lines = extract_delta(&changes);
        assert_eq!(
            lines,
            vec![ExtractedLine::Spans(vec![Span::plain("Read 42 lines")])]
        );
    }

    #[test]
    fn test_bare_marker_becomes_blank() {
        let changes = vec![(0, row("⏺"))];
        assert_eq!(extract_delta(&changes), vec![ExtractedLine::Blank]);
    }

    #[test]
    fn test_full_extraction_drops_prompt_and_status() {
        let attributed = vec![
            row("⏺ Final answer:"),
            row("  it is 4."),
            row(""),
            row("──────────────"),
            row("│ ❯ "),
            row("  ? for shortcuts"),
        ];
        let lines = extract_full(&attributed);
        assert_eq!(lines.len(), 3);
        assert!(matches!(lines[2], ExtractedLine::Blank));
        let html = render_to_html(lines);
        assert_eq!(html, "Final answer: it is 4.");
    }
}
