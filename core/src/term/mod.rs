//! Virtual terminal for one agent session.
//!
//! The agent CLI is attached to a 120×40 PTY and redraws its TUI in place
//! (carriage-return + overwrite, cursor addressing, erase-line) rather than
//! scrolling. `TerminalEmulator` feeds the raw byte stream into a vt100
//! parser and exposes the two reads the pipeline needs: the full display
//! (for classification and finalize) and the set of rows that changed since
//! the previous delta read (for incremental extraction).
//!
//! Honored control bytes are exactly what the vt100 crate implements: CSI
//! cursor positioning (CUP/CUU/CUD/CUF/CUB), erase display/line (ED/EL),
//! SGR color/bold/italic, CR/LF/BS/TAB, and line wrap at column 120.
//! Everything else in the stream is consumed and ignored, never an error.

mod color;

pub use color::ColorTag;

/// Grid height the agent's PTY is sized to.
pub const ROWS: u16 = 40;
/// Grid width the agent's PTY is sized to.
pub const COLS: u16 = 120;

/// A maximal run of consecutive cells on one line sharing identical
/// attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub color: ColorTag,
    pub bold: bool,
    pub italic: bool,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Span {
            text: text.into(),
            color: ColorTag::Default,
            bold: false,
            italic: false,
        }
    }

    fn attrs(&self) -> (ColorTag, bool, bool) {
        (self.color, self.bold, self.italic)
    }
}

/// The virtual terminal: fixed grid, exclusively owned by one session's
/// pipeline. Nothing else ever writes to it.
pub struct TerminalEmulator {
    parser: vt100::Parser,
    /// Row snapshots as of the last `get_attributed_changes` call. Rows are
    /// reported as changed when their span rendering differs from this.
    last_seen: Vec<Vec<Span>>,
}

impl TerminalEmulator {
    pub fn new() -> Self {
        let parser = vt100::Parser::new(ROWS, COLS, 0);
        // Baseline is the blank grid, so the first delta read reports every
        // row the first feed touched.
        let last_seen = (0..ROWS).map(|_| Vec::new()).collect();
        TerminalEmulator { parser, last_seen }
    }

    /// Advance the grid state. Never fails; malformed or unsupported
    /// sequences are skipped by the parser.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.parser.process(bytes);
    }

    /// Plain-text snapshot of every row, trailing spaces trimmed.
    /// Pure read: does not affect delta state.
    pub fn get_full_display(&self) -> Vec<String> {
        let screen = self.parser.screen();
        (0..ROWS)
            .map(|row| {
                let mut line = String::with_capacity(COLS as usize);
                for col in 0..COLS {
                    match screen.cell(row, col) {
                        Some(cell) => {
                            let contents = cell.contents();
                            if contents.is_empty() {
                                line.push(' ');
                            } else {
                                line.push_str(&contents);
                            }
                        }
                        None => line.push(' '),
                    }
                }
                line.truncate(line.trim_end().len());
                line
            })
            .collect()
    }

    /// Attributed snapshot of every row. Pure read.
    pub fn get_full_attributed_lines(&self) -> Vec<Vec<Span>> {
        (0..ROWS).map(|row| self.render_row(row)).collect()
    }

    /// Rows whose contents changed since the previous call, in row order.
    /// Reading clears the change tracker: consecutive calls without an
    /// intervening feed return nothing.
    pub fn get_attributed_changes(&mut self) -> Vec<(usize, Vec<Span>)> {
        let mut changed = Vec::new();
        for row in 0..ROWS {
            let spans = self.render_row(row);
            if spans != self.last_seen[row as usize] {
                self.last_seen[row as usize] = spans.clone();
                changed.push((row as usize, spans));
            }
        }
        changed
    }

    /// Cursor position (row, col), as the agent's TUI left it.
    pub fn cursor_position(&self) -> (u16, u16) {
        self.parser.screen().cursor_position()
    }

    /// Render one row as attribute spans, with trailing blank cells dropped.
    fn render_row(&self, row: u16) -> Vec<Span> {
        let screen = self.parser.screen();

        // Find the last visually occupied column so trailing padding never
        // produces a span.
        let mut last_occupied: Option<u16> = None;
        for col in 0..COLS {
            if let Some(cell) = screen.cell(row, col) {
                let contents = cell.contents();
                if !contents.is_empty() && contents != " " {
                    last_occupied = Some(col);
                }
            }
        }
        let Some(end) = last_occupied else {
            return Vec::new();
        };

        let mut spans: Vec<Span> = Vec::new();
        for col in 0..=end {
            let (text, color, bold, italic) = match screen.cell(row, col) {
                Some(cell) => {
                    let contents = cell.contents();
                    let text = if contents.is_empty() {
                        " ".to_string()
                    } else {
                        contents
                    };
                    (
                        text,
                        ColorTag::from_vt(cell.fgcolor()),
                        cell.bold(),
                        cell.italic(),
                    )
                }
                None => (" ".to_string(), ColorTag::Default, false, false),
            };

            match spans.last_mut() {
                Some(last) if last.attrs() == (color, bold, italic) => {
                    last.text.push_str(&text);
                }
                _ => spans.push(Span {
                    text,
                    color,
                    bold,
                    italic,
                }),
            }
        }
        spans
    }
}

impl Default for TerminalEmulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_lands_on_first_row() {
        let mut term = TerminalEmulator::new();
        term.feed(b"hello world");
        let display = term.get_full_display();
        assert_eq!(display[0], "hello world");
        assert_eq!(display[1], "");
    }

    #[test]
    fn test_carriage_return_overwrites_in_place() {
        let mut term = TerminalEmulator::new();
        term.feed(b"first line");
        term.feed(b"\rSECOND....");
        let display = term.get_full_display();
        assert_eq!(display[0], "SECOND....");
    }

    #[test]
    fn test_cursor_addressing_writes_target_row() {
        let mut term = TerminalEmulator::new();
        term.feed(b"\x1b[10;5Hdeep");
        let display = term.get_full_display();
        assert_eq!(display[9], "    deep");
    }

    #[test]
    fn test_sgr_attributes_preserved() {
        let mut term = TerminalEmulator::new();
        term.feed(b"\x1b[1;31mred bold\x1b[0m plain");
        let lines = term.get_full_attributed_lines();
        let row = &lines[0];
        assert_eq!(row[0].text, "red bold");
        assert_eq!(row[0].color, ColorTag::Red);
        assert!(row[0].bold);
        assert_eq!(row[1].text, " plain");
        assert_eq!(row[1].color, ColorTag::Default);
        assert!(!row[1].bold);
    }

    #[test]
    fn test_malformed_sequence_is_skipped() {
        let mut term = TerminalEmulator::new();
        term.feed(b"\x1b[999;999;999;zok");
        term.feed(b"\x1b[4m");
        term.feed(b"after");
        // No panic, and subsequent printable bytes still land.
        let display = term.get_full_display();
        assert!(display[0].contains("after"));
    }

    #[test]
    fn test_delta_reports_changed_rows_once() {
        let mut term = TerminalEmulator::new();
        term.feed(b"one\r\ntwo");
        let first: Vec<usize> = term
            .get_attributed_changes()
            .into_iter()
            .map(|(row, _)| row)
            .collect();
        assert_eq!(first, vec![0, 1]);

        // No feed in between: nothing to report.
        assert!(term.get_attributed_changes().is_empty());

        // Touch only row 1.
        term.feed(b"\x1b[2;1HTWO");
        let second: Vec<usize> = term
            .get_attributed_changes()
            .into_iter()
            .map(|(row, _)| row)
            .collect();
        assert_eq!(second, vec![1]);
    }

    #[test]
    fn test_delta_visits_every_touched_row_exactly_once() {
        let mut term = TerminalEmulator::new();
        for row in 1..=5 {
            term.feed(format!("\x1b[{row};1Hrow {row}").as_bytes());
        }
        let mut seen = Vec::new();
        loop {
            let changes = term.get_attributed_changes();
            if changes.is_empty() {
                break;
            }
            seen.extend(changes.into_iter().map(|(row, _)| row));
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_full_reads_do_not_clear_delta() {
        let mut term = TerminalEmulator::new();
        term.feed(b"payload");
        let _ = term.get_full_display();
        let _ = term.get_full_attributed_lines();
        assert_eq!(term.get_attributed_changes().len(), 1);
    }

    #[test]
    fn test_erase_line_clears_row() {
        let mut term = TerminalEmulator::new();
        term.feed(b"doomed text");
        term.get_attributed_changes();
        term.feed(b"\x1b[1;1H\x1b[2K");
        let display = term.get_full_display();
        assert_eq!(display[0], "");
        // The row became blank: that is a change.
        let changed: Vec<usize> = term
            .get_attributed_changes()
            .into_iter()
            .map(|(row, _)| row)
            .collect();
        assert_eq!(changed, vec![0]);
    }

    #[test]
    fn test_line_wrap_at_grid_width() {
        let mut term = TerminalEmulator::new();
        let long = "x".repeat(COLS as usize + 10);
        term.feed(long.as_bytes());
        let display = term.get_full_display();
        assert_eq!(display[0].len(), COLS as usize);
        assert_eq!(display[1], "x".repeat(10));
    }

    #[test]
    fn test_unicode_box_drawing_preserved() {
        let mut term = TerminalEmulator::new();
        term.feed("╭──────╮\r\n│ ❯    │\r\n╰──────╯".as_bytes());
        let display = term.get_full_display();
        assert_eq!(display[0], "╭──────╮");
        assert!(display[1].starts_with("│ ❯"));
    }
}
