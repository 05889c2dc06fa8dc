//! Grouping surviving content lines into semantic regions.
//!
//! The agent's TUI encodes structure in color: code and diff bodies render
//! in greyscale, headings in bold default, prose in plain default. A run of
//! lines with the same dominant signal becomes one region, which is the
//! unit the HTML renderer works on.

use crate::term::{ColorTag, Span};

/// A content line after chrome stripping: either a blank row (paragraph
/// separator) or an attributed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedLine {
    Blank,
    Spans(Vec<Span>),
}

/// Semantic kind of one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Prose,
    CodeBlock,
    Heading,
}

/// A contiguous block of content lines sharing one semantic kind. Blank
/// entries inside `lines` are preserved (verbatim blank lines in code,
/// paragraph breaks in prose).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRegion {
    pub kind: RegionKind,
    pub lines: Vec<ExtractedLine>,
}

/// Classify one line from its span attributes.
fn line_region_kind(spans: &[Span]) -> RegionKind {
    let mut total = 0usize;
    let mut code = 0usize;
    let mut all_bold = true;

    for span in spans {
        for ch in span.text.chars() {
            if ch.is_whitespace() {
                continue;
            }
            total += 1;
            if span.color == ColorTag::DimGrey {
                code += 1;
            }
            if !span.bold {
                all_bold = false;
            }
        }
    }

    if total == 0 {
        RegionKind::Prose
    } else if code * 2 >= total {
        RegionKind::CodeBlock
    } else if all_bold {
        RegionKind::Heading
    } else {
        RegionKind::Prose
    }
}

/// Fold a stream of extracted lines into regions. Blanks never open a
/// region; blanks between two lines of the same kind stay inside the
/// region, blanks at a kind boundary are dropped with the boundary.
pub fn group_regions(lines: Vec<ExtractedLine>) -> Vec<ContentRegion> {
    let mut regions: Vec<ContentRegion> = Vec::new();
    let mut pending_blanks = 0usize;

    for line in lines {
        match line {
            ExtractedLine::Blank => pending_blanks += 1,
            ExtractedLine::Spans(spans) => {
                let kind = line_region_kind(&spans);
                match regions.last_mut() {
                    Some(region) if region.kind == kind => {
                        for _ in 0..pending_blanks {
                            region.lines.push(ExtractedLine::Blank);
                        }
                        region.lines.push(ExtractedLine::Spans(spans));
                    }
                    _ => regions.push(ContentRegion {
                        kind,
                        lines: vec![ExtractedLine::Spans(spans)],
                    }),
                }
                pending_blanks = 0;
            }
        }
    }

    regions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(text: &str) -> ExtractedLine {
        ExtractedLine::Spans(vec![Span::plain(text)])
    }

    fn code(text: &str) -> ExtractedLine {
        ExtractedLine::Spans(vec![Span {
            text: text.to_string(),
            color: ColorTag::DimGrey,
            bold: false,
            italic: false,
        }])
    }

    fn heading(text: &str) -> ExtractedLine {
        ExtractedLine::Spans(vec![Span {
            text: text.to_string(),
            color: ColorTag::Default,
            bold: true,
            italic: false,
        }])
    }

    #[test]
    fn test_prose_then_code_then_prose() {
        let regions = group_regions(vec![
            plain("Here is the fix:"),
            code("fn main() {"),
            code("    println!(\"hi\");"),
            code("}"),
            plain("Run it with cargo."),
        ]);
        let kinds: Vec<RegionKind> = regions.iter().map(|region| region.kind).collect();
        assert_eq!(
            kinds,
            vec![RegionKind::Prose, RegionKind::CodeBlock, RegionKind::Prose]
        );
        assert_eq!(regions[1].lines.len(), 3);
    }

    #[test]
    fn test_blank_inside_code_block_is_preserved() {
        let regions = group_regions(vec![
            code("let a = 1;"),
            ExtractedLine::Blank,
            code("let b = 2;"),
        ]);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].lines.len(), 3);
        assert_eq!(regions[0].lines[1], ExtractedLine::Blank);
    }

    #[test]
    fn test_blank_at_boundary_is_dropped() {
        let regions = group_regions(vec![
            plain("intro"),
            ExtractedLine::Blank,
            code("x = 1"),
        ]);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[1].lines.len(), 1);
    }

    #[test]
    fn test_consecutive_bold_lines_form_heading() {
        let regions = group_regions(vec![
            heading("Results"),
            heading("Summary"),
            plain("All tests pass."),
        ]);
        assert_eq!(regions[0].kind, RegionKind::Heading);
        assert_eq!(regions[0].lines.len(), 2);
        assert_eq!(regions[1].kind, RegionKind::Prose);
    }

    #[test]
    fn test_mixed_line_with_minor_grey_is_prose() {
        let regions = group_regions(vec![ExtractedLine::Spans(vec![
            Span::plain("see the value "),
            Span {
                text: "x".to_string(),
                color: ColorTag::DimGrey,
                bold: false,
                italic: false,
            },
            Span::plain(" above for details"),
        ])]);
        assert_eq!(regions[0].kind, RegionKind::Prose);
    }

    #[test]
    fn test_leading_blanks_produce_no_region() {
        let regions = group_regions(vec![ExtractedLine::Blank, ExtractedLine::Blank]);
        assert!(regions.is_empty());
    }
}
