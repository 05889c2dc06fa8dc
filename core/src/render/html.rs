//! Rendering semantic regions into the messenger's HTML dialect.
//!
//! Telegram's HTML mode accepts a small inline tag set (`b`, `i`, `code`,
//! `pre`) and requires `&`, `<`, `>` entity-escaped everywhere, including
//! inside `pre` bodies. Messages cap at 4096 characters, so oversized
//! renders are split at paragraph boundaries, carrying an open code block
//! across the split by closing and reopening it.

use crate::term::{ColorTag, Span};

use super::region::{ContentRegion, ExtractedLine, RegionKind};

/// Telegram's hard per-message character limit.
pub const MESSAGE_LIMIT: usize = 4096;

const PRE_OPEN: &str = "<pre>";
const PRE_CLOSE: &str = "</pre>";

/// Entity-escape the three sentinel characters. Applied to every piece of
/// text exactly once, before any tags are wrapped around it.
pub fn escape(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// Render regions to a single HTML string, regions separated by blank
/// lines.
pub fn render_regions(regions: &[ContentRegion]) -> String {
    let mut parts = Vec::new();
    for region in regions {
        let rendered = match region.kind {
            RegionKind::CodeBlock => render_code_block(region),
            RegionKind::Heading => render_heading(region),
            RegionKind::Prose => render_prose(region),
        };
        if !rendered.is_empty() {
            parts.push(rendered);
        }
    }
    parts.join("\n\n")
}

fn render_code_block(region: &ContentRegion) -> String {
    let body: Vec<String> = region
        .lines
        .iter()
        .map(|line| match line {
            ExtractedLine::Blank => String::new(),
            // Verbatim: code keeps its own line breaks and indentation.
            ExtractedLine::Spans(spans) => escape(&plain_text(spans)),
        })
        .collect();
    format!("{PRE_OPEN}{}{PRE_CLOSE}", body.join("\n"))
}

fn render_heading(region: &ContentRegion) -> String {
    let body: Vec<String> = region
        .lines
        .iter()
        .filter_map(|line| match line {
            ExtractedLine::Blank => None,
            ExtractedLine::Spans(spans) => Some(escape(plain_text(spans).trim())),
        })
        .collect();
    if body.is_empty() {
        return String::new();
    }
    format!("<b>{}</b>", body.join("\n"))
}

/// Reflow: soft line breaks inside a paragraph collapse to spaces, blank
/// lines keep their paragraph-break meaning.
fn render_prose(region: &ContentRegion) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in &region.lines {
        match line {
            ExtractedLine::Blank => {
                if !current.is_empty() {
                    paragraphs.push(current.join(" "));
                    current = Vec::new();
                }
            }
            ExtractedLine::Spans(spans) => {
                let fragment = render_inline(spans);
                if !fragment.is_empty() {
                    current.push(fragment);
                }
            }
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    paragraphs.join("\n\n")
}

/// Render one prose line: bold/italic spans keep their tags, code-colored
/// fragments become inline `code`.
fn render_inline(spans: &[Span]) -> String {
    let trimmed = trim_spans(spans);
    let mut out = String::new();
    for span in &trimmed {
        let text = escape(&span.text);
        if text.trim().is_empty() {
            out.push_str(&text);
            continue;
        }
        let mut piece = text;
        if span.color == ColorTag::DimGrey {
            piece = format!("<code>{piece}</code>");
        }
        if span.italic {
            piece = format!("<i>{piece}</i>");
        }
        if span.bold {
            piece = format!("<b>{piece}</b>");
        }
        out.push_str(&piece);
    }
    out
}

/// Drop leading/trailing whitespace from a span run without touching
/// interior spacing.
fn trim_spans(spans: &[Span]) -> Vec<Span> {
    let mut result: Vec<Span> = spans.to_vec();
    while let Some(first) = result.first_mut() {
        let trimmed = first.text.trim_start();
        if trimmed.is_empty() {
            result.remove(0);
        } else {
            first.text = trimmed.to_string();
            break;
        }
    }
    while let Some(last) = result.last_mut() {
        let trimmed = last.text.trim_end();
        if trimmed.is_empty() {
            result.pop();
        } else {
            last.text = trimmed.to_string();
            break;
        }
    }
    result
}

fn plain_text(spans: &[Span]) -> String {
    spans.iter().map(|span| span.text.as_str()).collect()
}

/// Split rendered HTML into chunks of at most `limit` characters, cutting
/// at the nearest paragraph (then line) boundary and carrying an open
/// `pre` across the cut.
pub fn split_for_sending(text: &str, limit: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = text.to_string();
    while rest.chars().count() > limit {
        let (prefix, remainder) = split_once(&rest, limit);
        parts.push(prefix);
        rest = remainder;
    }
    parts.push(rest);
    parts
}

fn split_once(text: &str, limit: usize) -> (String, String) {
    // Keep room for the closing tag in case the cut lands inside a block.
    let budget = limit.saturating_sub(PRE_CLOSE.len());
    let hard = byte_index_of_char(text, budget);
    let window = &text[..hard];

    let (cut, gap) = window
        .rfind("\n\n")
        .map(|idx| (idx, 2))
        .or_else(|| window.rfind('\n').map(|idx| (idx, 1)))
        .filter(|&(idx, _)| idx > 0)
        .unwrap_or((hard, 0));

    let mut prefix = text[..cut].to_string();
    let mut remainder = text[cut + gap..].to_string();

    if has_open_pre(&prefix) {
        prefix.push_str(PRE_CLOSE);
        remainder = format!("{PRE_OPEN}{remainder}");
    }
    (prefix, remainder)
}

fn has_open_pre(text: &str) -> bool {
    text.matches(PRE_OPEN).count() > text.matches(PRE_CLOSE).count()
}

fn byte_index_of_char(text: &str, nth: usize) -> usize {
    text.char_indices()
        .nth(nth)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::region::group_regions;

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

    #[test]
    fn test_prose_reflow_collapses_soft_breaks() {
        let html = render_regions(&group_regions(vec![
            plain("The quick brown fox jumps"),
            plain("over the lazy dog."),
            ExtractedLine::Blank,
            plain("Second paragraph."),
        ]));
        assert_eq!(
            html,
            "The quick brown fox jumps over the lazy dog.\n\nSecond paragraph."
        );
    }

    #[test]
    fn test_code_block_keeps_line_breaks() {
        let html = render_regions(&group_regions(vec![
            code("fn main() {"),
            code("    println!(\"2 < 3\");"),
            code("}"),
        ]));
        assert_eq!(
            html,
            "<pre>fn main() {\n    println!(&quot;2 &lt; 3&quot;);\n}</pre>"
        );
    }

    #[test]
    fn test_heading_renders_bold() {
        let html = render_regions(&group_regions(vec![ExtractedLine::Spans(vec![Span {
            text: "Summary".to_string(),
            color: ColorTag::Default,
            bold: true,
            italic: false,
        }])]));
        assert_eq!(html, "<b>Summary</b>");
    }

    #[test]
    fn test_sentinels_escaped_in_prose() {
        let html = render_regions(&group_regions(vec![plain("a < b && b > c")]));
        assert_eq!(html, "a &lt; b &amp;&amp; b &gt; c");
    }

    #[test]
    fn test_inline_styles() {
        let html = render_regions(&group_regions(vec![ExtractedLine::Spans(vec![
            Span::plain("try "),
            Span {
                text: "cargo run".to_string(),
                color: ColorTag::DimGrey,
                bold: false,
                italic: false,
            },
            Span::plain(" or read the "),
            Span {
                text: "manual".to_string(),
                color: ColorTag::Default,
                bold: true,
                italic: false,
            },
        ])]));
        assert_eq!(
            html,
            "try <code>cargo run</code> or read the <b>manual</b>"
        );
    }

    #[test]
    fn test_split_under_limit_is_untouched() {
        let parts = split_for_sending("short message", 4096);
        assert_eq!(parts, vec!["short message".to_string()]);
    }

    #[test]
    fn test_split_prefers_paragraph_boundary() {
        let text = format!("{}\n\n{}", "a".repeat(80), "b".repeat(80));
        let parts = split_for_sending(&text, 100);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], "a".repeat(80));
        assert_eq!(parts[1], "b".repeat(80));
    }

    #[test]
    fn test_split_reopens_code_block() {
        let body = "x\n".repeat(100);
        let text = format!("<pre>{body}</pre>");
        let parts = split_for_sending(&text, 100);
        assert!(parts.len() > 1);
        for part in &parts {
            assert!(part.chars().count() <= 100);
        }
        assert!(parts[0].starts_with("<pre>"));
        assert!(parts[0].ends_with("</pre>"));
        for part in &parts[1..] {
            assert!(part.starts_with("<pre>"), "part not reopened: {part}");
        }
        assert!(parts.last().unwrap().ends_with("</pre>"));
    }

    #[test]
    fn test_split_concatenation_preserves_content() {
        let text = format!("{}\n{}\n{}", "a".repeat(60), "b".repeat(60), "c".repeat(60));
        let parts = split_for_sending(&text, 100);
        let glued: String = parts.join("");
        let stripped: String = glued.chars().filter(|&ch| ch != '\n').collect();
        assert_eq!(stripped, text.chars().filter(|&ch| ch != '\n').collect::<String>());
    }

    #[test]
    fn test_split_without_any_boundary_cuts_hard() {
        let text = "x".repeat(250);
        let parts = split_for_sending(&text, 100);
        assert!(parts.len() >= 3);
        assert!(parts.iter().all(|part| part.chars().count() <= 100));
        assert_eq!(parts.join(""), text);
    }
}
