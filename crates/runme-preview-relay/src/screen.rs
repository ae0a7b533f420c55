//! Terminal screen emulation for a display surface, driven by the VTE crate.
//!
//! Hosts use [`TerminalScreen`] as the terminal channel of a panel: relayed
//! bytes go in, and the visible text comes out. The model is line-oriented
//! with scrollback, which is all a markdown renderer's output needs. Colors
//! and attributes (SGR) are parsed and dropped.

use vte::{Params, Perform};

/// Lines kept above the viewport before the oldest are discarded.
const MAX_SCROLLBACK: usize = 10_000;

/// Tab stop interval in columns.
const TAB_WIDTH: usize = 8;

/// VTE-backed screen with scrollback.
pub struct TerminalScreen {
    parser: vte::Parser,
    state: ScreenState,
}

impl std::fmt::Debug for TerminalScreen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalScreen")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl TerminalScreen {
    /// Create an empty screen with the given viewport size.
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            parser: vte::Parser::new(),
            state: ScreenState::new(usize::from(cols.max(1)), usize::from(rows.max(1))),
        }
    }

    /// Feed raw terminal bytes through the parser.
    ///
    /// Parser state is kept between calls, so escape sequences split across
    /// chunks are handled.
    pub fn process(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.parser.advance(&mut self.state, *byte);
        }
    }

    /// All lines, scrollback included, with trailing blanks trimmed.
    pub fn lines(&self) -> Vec<String> {
        self.state
            .lines
            .iter()
            .map(|line| line.iter().collect::<String>().trim_end().to_string())
            .collect()
    }

    /// The lines currently inside the viewport.
    pub fn visible_lines(&self) -> Vec<String> {
        let top = self.state.viewport_top();
        self.lines().split_off(top)
    }

    /// Full text content, lines joined with `\n`, trailing empty lines removed.
    pub fn contents(&self) -> String {
        let mut lines = self.lines();
        while lines.last().is_some_and(|line| line.is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }

    /// Cursor position as (line index, column).
    pub fn cursor(&self) -> (usize, usize) {
        (self.state.row, self.state.col)
    }

    /// Viewport size as (cols, rows).
    pub fn size(&self) -> (usize, usize) {
        (self.state.cols, self.state.rows)
    }
}

#[derive(Debug)]
struct ScreenState {
    lines: Vec<Vec<char>>,
    cols: usize,
    rows: usize,
    row: usize,
    col: usize,
}

impl ScreenState {
    fn new(cols: usize, rows: usize) -> Self {
        Self {
            lines: vec![Vec::new()],
            cols,
            rows,
            row: 0,
            col: 0,
        }
    }

    fn viewport_top(&self) -> usize {
        self.lines.len().saturating_sub(self.rows)
    }

    fn line_feed(&mut self) {
        self.row += 1;
        if self.row == self.lines.len() {
            self.lines.push(Vec::new());
        }

        let limit = MAX_SCROLLBACK + self.rows;
        if self.lines.len() > limit {
            let excess = self.lines.len() - limit;
            self.lines.drain(..excess);
            self.row -= excess;
        }
    }

    fn current_line(&mut self) -> &mut Vec<char> {
        &mut self.lines[self.row]
    }

    fn erase_in_line(&mut self, mode: u16) {
        let col = self.col;
        let line = self.current_line();
        match mode {
            0 => line.truncate(col),
            1 => {
                for cell in line.iter_mut().take(col + 1) {
                    *cell = ' ';
                }
            }
            _ => line.clear(),
        }
    }

    fn erase_in_display(&mut self, mode: u16) {
        let top = self.viewport_top();
        match mode {
            0 => {
                self.erase_in_line(0);
                for line in self.lines.iter_mut().skip(self.row + 1) {
                    line.clear();
                }
            }
            1 => {
                for line in self.lines[top.min(self.row)..self.row].iter_mut() {
                    line.clear();
                }
                self.erase_in_line(1);
            }
            _ => {
                for line in self.lines[top..].iter_mut() {
                    line.clear();
                }
            }
        }
    }

    fn move_to(&mut self, row: usize, col: usize) {
        let top = self.viewport_top();
        let target = top + row.min(self.rows - 1);
        while self.lines.len() <= target {
            self.lines.push(Vec::new());
        }
        self.row = target;
        self.col = col.min(self.cols - 1);
    }
}

fn first_param(params: &Params, default: u16) -> u16 {
    params
        .iter()
        .next()
        .map(|p| p[0])
        .filter(|n| *n != 0)
        .unwrap_or(default)
}

impl Perform for ScreenState {
    fn print(&mut self, c: char) {
        if self.col >= self.cols {
            self.line_feed();
            self.col = 0;
        }

        let col = self.col;
        let line = self.current_line();
        if line.len() <= col {
            line.resize(col, ' ');
            line.push(c);
        } else {
            line[col] = c;
        }
        self.col += 1;
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            // Backspace
            0x08 => self.col = self.col.saturating_sub(1),
            // Horizontal tab
            0x09 => self.col = ((self.col / TAB_WIDTH + 1) * TAB_WIDTH).min(self.cols - 1),
            // LF, VT, FF
            0x0A..=0x0C => self.line_feed(),
            // Carriage return
            0x0D => self.col = 0,
            _ => {}
        }
    }

    fn csi_dispatch(&mut self, params: &Params, _intermediates: &[u8], _ignore: bool, c: char) {
        match c {
            // Cursor up
            'A' => {
                let n = usize::from(first_param(params, 1));
                let top = self.viewport_top();
                self.row = self.row.saturating_sub(n).max(top);
            }
            // Cursor down
            'B' => {
                for _ in 0..first_param(params, 1) {
                    self.line_feed();
                }
            }
            // Cursor forward
            'C' => {
                let n = usize::from(first_param(params, 1));
                self.col = (self.col + n).min(self.cols - 1);
            }
            // Cursor backward
            'D' => {
                let n = usize::from(first_param(params, 1));
                self.col = self.col.saturating_sub(n);
            }
            // Cursor horizontal absolute
            'G' => self.col = usize::from(first_param(params, 1) - 1).min(self.cols - 1),
            // Cursor position
            'H' | 'f' => {
                let mut iter = params.iter();
                let row = iter.next().map(|p| p[0]).unwrap_or(1).max(1) - 1;
                let col = iter.next().map(|p| p[0]).unwrap_or(1).max(1) - 1;
                self.move_to(usize::from(row), usize::from(col));
            }
            // Erase in display
            'J' => self.erase_in_display(first_param(params, 0)),
            // Erase in line
            'K' => self.erase_in_line(first_param(params, 0)),
            // SGR and everything else carries no text
            _ => {}
        }
    }
}
