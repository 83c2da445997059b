//! Screen (§3.3/§4.2): the fixed-size grid, cursor, margins, tab stops,
//! mode flags, rendition state, selection, and the interface to history.
//!
//! Scroll/insert/delete/erase and cursor-movement/SGR transitions mirror a
//! combined grid+scrollback model, but split into a fixed `lines` array
//! plus a separate `HistoryStore`, with selection as a normalized anchor/
//! extent pair over global coordinates.

use unicode_width::UnicodeWidthChar;

use crate::cell::{CharacterCell, Rendition};
use crate::color::Color;
use crate::error::HistoryError;
use crate::extended::ExtendedCharTable;
use crate::history::{HistoryMode, HistoryStore};
use crate::line::{Line, LineFlags};
use crate::modes::{ScreenMode, ScreenModes};

#[derive(Debug, Clone, Copy)]
struct SavedCursorState {
    x: u16,
    y: u16,
    fg: Color,
    bg: Color,
    rendition: Rendition,
}

/// A selection anchor/extent pair. `anchor` is the point `set_selection_start`
/// was called at; `top_left`/`bottom_right` are the normalized extent kept
/// up to date by `set_selection_end`. Coordinates are `(column, global_row)`.
#[derive(Debug, Clone, Copy)]
struct Selection {
    block_mode: bool,
    anchor: (u16, i64),
    top_left: (u16, i64),
    bottom_right: (u16, i64),
}

pub struct Screen {
    columns: u16,
    line_count: u16,
    lines: Vec<Line>,
    cursor_x: u16,
    cursor_y: u16,
    fg: Color,
    bg: Color,
    rendition: Rendition,
    saved: Option<SavedCursorState>,
    modes: ScreenModes,
    top_margin: u16,
    bottom_margin: u16,
    tab_stops: Vec<bool>,
    selection: Option<Selection>,
    history: HistoryStore,
    history_mode: HistoryMode,
    /// Set once by `record_history_failure` and cleared by
    /// `take_history_error` (§7.3: fired once per failure, not per
    /// subsequent operation).
    pending_history_error: Option<HistoryError>,
}

impl Screen {
    pub fn new(line_count: u16, columns: u16, history_mode: HistoryMode) -> Result<Self, HistoryError> {
        let history = HistoryStore::new(&history_mode)?;
        let mut screen = Self {
            columns,
            line_count,
            lines: (0..line_count).map(|_| Line::new()).collect(),
            cursor_x: 0,
            cursor_y: 0,
            fg: Color::Default,
            bg: Color::Default,
            rendition: Rendition::empty(),
            saved: None,
            modes: ScreenModes::default(),
            top_margin: 0,
            bottom_margin: line_count.saturating_sub(1),
            tab_stops: Vec::new(),
            selection: None,
            history,
            history_mode,
            pending_history_error: None,
        };
        screen.reset_tab_stops();
        Ok(screen)
    }

    /// Degrade history to `None` and record the error for
    /// `take_history_error`, logging once via `tracing`. Further appends
    /// become no-ops rather than retrying a backend already known bad.
    fn record_history_failure(&mut self, err: HistoryError) {
        tracing::warn!(error = %err, "history backend failed, disabling scrollback capture");
        self.history = HistoryStore::None;
        self.pending_history_error = Some(err);
    }

    /// Take the last recorded history failure, if any (§7.3). The caller
    /// is expected to forward it to `OutputListener::history_error`.
    pub fn take_history_error(&mut self) -> Option<HistoryError> {
        self.pending_history_error.take()
    }

    // --- basic geometry -------------------------------------------------

    pub fn columns(&self) -> u16 {
        self.columns
    }

    pub fn line_count(&self) -> u16 {
        self.line_count
    }

    pub fn cursor_x(&self) -> u16 {
        self.cursor_x
    }

    pub fn cursor_y(&self) -> u16 {
        self.cursor_y
    }

    pub fn fg(&self) -> Color {
        self.fg
    }

    pub fn bg(&self) -> Color {
        self.bg
    }

    pub fn rendition(&self) -> Rendition {
        self.rendition
    }

    pub fn modes(&self) -> &ScreenModes {
        &self.modes
    }

    pub fn top_margin(&self) -> u16 {
        self.top_margin
    }

    pub fn bottom_margin(&self) -> u16 {
        self.bottom_margin
    }

    pub fn cell(&self, x: u16, y: u16) -> CharacterCell {
        self.lines.get(y as usize).map(|l| l.cell(x as usize)).unwrap_or_default()
    }

    pub fn line_flags(&self, y: u16) -> LineFlags {
        self.lines.get(y as usize).map(|l| l.flags).unwrap_or_default()
    }

    pub fn history(&mut self) -> &mut HistoryStore {
        &mut self.history
    }

    pub fn history_line_count(&mut self) -> usize {
        self.history.line_count()
    }

    /// Total addressable lines in global coordinates: history + on-screen.
    pub fn total_line_count(&mut self) -> usize {
        self.history.line_count() + self.line_count as usize
    }

    /// Fetch a line's cells and wrapped flag by global row index (§3.5).
    pub fn global_line(&mut self, global_row: i64) -> (Vec<CharacterCell>, bool) {
        let hist_count = self.history.line_count() as i64;
        if global_row < 0 {
            return (Vec::new(), false);
        }
        if global_row < hist_count {
            let idx = global_row as usize;
            let len = self.history.line_length(idx);
            let mut buf = vec![CharacterCell::default(); len];
            self.history.read_cells(idx, 0, len, &mut buf);
            (buf, self.history.is_wrapped(idx))
        } else {
            let row = (global_row - hist_count) as usize;
            match self.lines.get(row) {
                Some(line) => (line.cells().to_vec(), line.is_wrapped()),
                None => (Vec::new(), false),
            }
        }
    }

    // --- reset / resize ---------------------------------------------------

    pub fn reset(&mut self) {
        for line in &mut self.lines {
            line.clear_to(CharacterCell::default());
        }
        self.cursor_x = 0;
        self.cursor_y = 0;
        self.fg = Color::Default;
        self.bg = Color::Default;
        self.rendition = Rendition::empty();
        self.saved = None;
        self.modes = ScreenModes::default();
        self.top_margin = 0;
        self.bottom_margin = self.line_count.saturating_sub(1);
        self.reset_tab_stops();
        self.selection = None;
    }

    fn reset_tab_stops(&mut self) {
        self.tab_stops = vec![false; self.columns as usize];
        let mut c = 8usize;
        while c < self.columns as usize {
            self.tab_stops[c] = true;
            c += 8;
        }
    }

    /// Resize preserving upper-left content (§4.2 "Resizing"). Lines longer
    /// than the new column count are kept as-is so shrink-then-grow doesn't
    /// lose data.
    pub fn resize(&mut self, new_lines: u16, new_columns: u16) {
        if self.cursor_y >= new_lines {
            let overflow = (self.cursor_y - new_lines + 1) as usize;
            for _ in 0..overflow.min(self.lines.len()) {
                let departing = self.lines.remove(0);
                let cells: Vec<_> = (0..departing.len()).map(|c| departing.cell(c)).collect();
                if let Err(err) = self.history.append_line(&cells, departing.is_wrapped()) {
                    self.record_history_failure(err);
                }
            }
            self.cursor_y = self.cursor_y.saturating_sub(overflow as u16);
        }

        while self.lines.len() < new_lines as usize {
            self.lines.push(Line::new());
        }
        while self.lines.len() > new_lines as usize {
            self.lines.pop();
        }

        self.line_count = new_lines;
        self.columns = new_columns;
        self.top_margin = 0;
        self.bottom_margin = new_lines.saturating_sub(1);
        self.reset_tab_stops();
        self.cursor_x = self.cursor_x.min(new_columns.saturating_sub(1));
        self.cursor_y = self.cursor_y.min(new_lines.saturating_sub(1));
    }

    // --- cursor movement --------------------------------------------------

    fn clamp_col_for_vertical(&mut self) {
        self.cursor_x = self.cursor_x.min(self.columns.saturating_sub(1));
    }

    pub fn cursor_up(&mut self, n: u16) {
        let n = if n == 0 { 1 } else { n };
        self.clamp_col_for_vertical();
        let min_row = if self.cursor_y >= self.top_margin && self.cursor_y <= self.bottom_margin {
            self.top_margin
        } else {
            0
        };
        self.cursor_y = self.cursor_y.saturating_sub(n).max(min_row);
    }

    pub fn cursor_down(&mut self, n: u16) {
        let n = if n == 0 { 1 } else { n };
        self.clamp_col_for_vertical();
        let max_row = if self.cursor_y >= self.top_margin && self.cursor_y <= self.bottom_margin {
            self.bottom_margin
        } else {
            self.line_count.saturating_sub(1)
        };
        self.cursor_y = (self.cursor_y + n).min(max_row);
    }

    pub fn cursor_left(&mut self, n: u16) {
        let n = if n == 0 { 1 } else { n };
        self.cursor_x = self.cursor_x.saturating_sub(n);
    }

    pub fn cursor_right(&mut self, n: u16) {
        let n = if n == 0 { 1 } else { n };
        self.cursor_x = (self.cursor_x + n).min(self.columns.saturating_sub(1));
    }

    /// 1-based wire-protocol input.
    pub fn set_cursor_x(&mut self, x: u16) {
        let x0 = x.saturating_sub(1);
        self.cursor_x = x0.min(self.columns.saturating_sub(1));
    }

    /// 1-based wire-protocol input; offset by top_margin under ORIGIN mode.
    pub fn set_cursor_y(&mut self, y: u16) {
        let y0 = y.saturating_sub(1);
        if self.modes.is_set(ScreenMode::ORIGIN) {
            self.cursor_y = (self.top_margin + y0).min(self.bottom_margin);
        } else {
            self.cursor_y = y0.min(self.line_count.saturating_sub(1));
        }
    }

    pub fn set_cursor_yx(&mut self, y: u16, x: u16) {
        self.set_cursor_y(y);
        self.set_cursor_x(x);
    }

    /// 0-based direct addressing, used by VT52's `ESC Y row col` and the
    /// DECALN alignment fill.
    pub fn set_cursor_position_0based(&mut self, x: u16, y: u16) {
        self.cursor_x = x.min(self.columns.saturating_sub(1));
        self.cursor_y = y.min(self.line_count.saturating_sub(1));
    }

    pub fn set_tab_stop_here(&mut self) {
        if let Some(slot) = self.tab_stops.get_mut(self.cursor_x as usize) {
            *slot = true;
        }
    }

    pub fn clear_tab_stop_here(&mut self) {
        if let Some(slot) = self.tab_stops.get_mut(self.cursor_x as usize) {
            *slot = false;
        }
    }

    pub fn clear_all_tab_stops(&mut self) {
        self.tab_stops.iter_mut().for_each(|s| *s = false);
    }

    fn home_cursor(&mut self) {
        self.cursor_y = if self.modes.is_set(ScreenMode::ORIGIN) {
            self.top_margin
        } else {
            0
        };
        self.cursor_x = 0;
    }

    pub fn carriage_return(&mut self) {
        self.cursor_x = 0;
    }

    pub fn backspace(&mut self) {
        self.cursor_x = self.cursor_x.saturating_sub(1);
    }

    pub fn tab(&mut self, n: u16) {
        let n = if n == 0 { 1 } else { n };
        for _ in 0..n {
            let mut c = self.cursor_x as usize + 1;
            while c < self.columns as usize && !self.tab_stops.get(c).copied().unwrap_or(false) {
                c += 1;
            }
            self.cursor_x = c.min(self.columns.saturating_sub(1) as usize) as u16;
        }
    }

    fn is_full_screen_region(&self) -> bool {
        self.top_margin == 0 && self.bottom_margin == self.line_count.saturating_sub(1)
    }

    /// Line feed (index): scroll if on bottom margin, else move down.
    pub fn index(&mut self) {
        if self.cursor_y == self.bottom_margin {
            let top = self.top_margin;
            let bottom = self.bottom_margin;
            self.scroll_region_up(top, bottom, 1);
        } else if self.cursor_y < self.line_count.saturating_sub(1) {
            self.cursor_y += 1;
        }
    }

    pub fn reverse_index(&mut self) {
        if self.cursor_y == self.top_margin {
            let top = self.top_margin;
            let bottom = self.bottom_margin;
            self.scroll_region_down(top, bottom, 1);
        } else if self.cursor_y > 0 {
            self.cursor_y -= 1;
        }
    }

    pub fn next_line(&mut self) {
        self.carriage_return();
        self.index();
    }

    // --- scrolling ---------------------------------------------------------

    fn blank_line(&self) -> Line {
        let mut line = Line::with_capacity(self.columns as usize);
        for c in 0..self.columns as usize {
            line.set_cell(c, CharacterCell::blank(self.fg, self.bg));
        }
        line
    }

    fn invalidate_selection_on_loss(&mut self, global_top: i64, global_bottom: i64) {
        if let Some(sel) = &self.selection {
            if sel.top_left.1 <= global_bottom && sel.bottom_right.1 >= global_top {
                self.selection = None;
            }
        }
    }

    fn scroll_region_up(&mut self, top: u16, bottom: u16, n: u16) {
        if top > bottom {
            return;
        }
        let n = (if n == 0 { 1 } else { n } as usize).min((bottom - top + 1) as usize);
        let whole_screen = top == 0 && bottom == self.line_count.saturating_sub(1);
        let global_top = self.history.line_count() as i64 + top as i64;
        let mut captured_all = whole_screen;

        for _ in 0..n {
            let departing = self.lines.remove(top as usize);
            if whole_screen {
                let cells: Vec<_> = (0..departing.len()).map(|c| departing.cell(c)).collect();
                let wrapped = departing.is_wrapped();
                if let Err(err) = self.history.append_line(&cells, wrapped) {
                    self.record_history_failure(err);
                    captured_all = false;
                } else if self.history.is_none_variant() {
                    captured_all = false;
                }
            } else {
                captured_all = false;
            }
            let blank = self.blank_line();
            self.lines.insert(bottom as usize, blank);
        }

        if !captured_all {
            self.invalidate_selection_on_loss(global_top, global_top + n as i64 - 1);
        }
    }

    fn scroll_region_down(&mut self, top: u16, bottom: u16, n: u16) {
        if top > bottom {
            return;
        }
        let n = (if n == 0 { 1 } else { n } as usize).min((bottom - top + 1) as usize);
        let global_bottom = self.history.line_count() as i64 + bottom as i64;
        let global_top = global_bottom - n as i64 + 1;

        for _ in 0..n {
            self.lines.remove(bottom as usize);
            let blank = self.blank_line();
            self.lines.insert(top as usize, blank);
        }
        self.invalidate_selection_on_loss(global_top, global_bottom);
    }

    pub fn scroll_up(&mut self, n: u16) {
        let top = self.top_margin;
        let bottom = self.bottom_margin;
        self.scroll_region_up(top, bottom, n);
    }

    pub fn scroll_down(&mut self, n: u16) {
        let top = self.top_margin;
        let bottom = self.bottom_margin;
        self.scroll_region_down(top, bottom, n);
    }

    pub fn set_margins(&mut self, top: u16, bottom: u16) {
        if top < bottom && bottom < self.line_count {
            self.top_margin = top;
            self.bottom_margin = bottom;
        }
    }

    pub fn set_default_margins(&mut self) {
        self.top_margin = 0;
        self.bottom_margin = self.line_count.saturating_sub(1);
    }

    // --- editing -----------------------------------------------------------

    pub fn erase_chars(&mut self, n: u16) {
        let n = if n == 0 { 1 } else { n };
        let end = (self.cursor_x + n).min(self.columns);
        let row = self.cursor_y as usize;
        let (fg, bg) = (self.fg, self.bg);
        if let Some(line) = self.lines.get_mut(row) {
            for c in self.cursor_x..end {
                line.set_cell(c as usize, CharacterCell::blank(fg, bg));
            }
        }
    }

    pub fn delete_chars(&mut self, n: u16) {
        let n = (if n == 0 { 1 } else { n }) as usize;
        let row = self.cursor_y as usize;
        let col = self.cursor_x as usize;
        let cols = self.columns as usize;
        let (fg, bg) = (self.fg, self.bg);
        let Some(line) = self.lines.get_mut(row) else { return };
        let old: Vec<CharacterCell> = (0..cols).map(|c| line.cell(c)).collect();
        for c in col..cols {
            let src = c + n;
            let cell = if src < cols { old[src] } else { CharacterCell::blank(fg, bg) };
            line.set_cell(c, cell);
        }
    }

    pub fn insert_chars(&mut self, n: u16) {
        let n = (if n == 0 { 1 } else { n }) as usize;
        let row = self.cursor_y as usize;
        let col = self.cursor_x as usize;
        let cols = self.columns as usize;
        let (fg, bg) = (self.fg, self.bg);
        let Some(line) = self.lines.get_mut(row) else { return };
        let old: Vec<CharacterCell> = (0..cols).map(|c| line.cell(c)).collect();
        for c in col..cols {
            let cell = if c < col + n {
                CharacterCell::blank(fg, bg)
            } else {
                old[c - n]
            };
            line.set_cell(c, cell);
        }
    }

    /// Acts on the region `[cursor_y, bottom_margin]`.
    pub fn insert_lines(&mut self, n: u16) {
        if self.cursor_y >= self.top_margin && self.cursor_y <= self.bottom_margin {
            let row = self.cursor_y;
            let bottom = self.bottom_margin;
            self.scroll_region_down(row, bottom, n);
            self.cursor_x = 0;
        }
    }

    /// Acts on the region `[cursor_y, bottom_margin]`.
    pub fn delete_lines(&mut self, n: u16) {
        if self.cursor_y >= self.top_margin && self.cursor_y <= self.bottom_margin {
            let row = self.cursor_y;
            let bottom = self.bottom_margin;
            self.scroll_region_up(row, bottom, n);
            self.cursor_x = 0;
        }
    }

    // --- modes ---------------------------------------------------------------

    pub fn set_mode(&mut self, mode: ScreenMode) {
        self.modes.set(mode);
        if mode.contains(ScreenMode::ORIGIN) {
            self.home_cursor();
        }
    }

    pub fn reset_mode(&mut self, mode: ScreenMode) {
        self.modes.reset(mode);
        if mode.contains(ScreenMode::ORIGIN) {
            self.home_cursor();
        }
    }

    pub fn save_mode(&mut self, mode: ScreenMode) {
        self.modes.save(mode);
    }

    pub fn restore_mode(&mut self, mode: ScreenMode) {
        self.modes.restore(mode);
    }

    // --- rendition -------------------------------------------------------------

    pub fn set_rendition(&mut self, bits: Rendition) {
        self.rendition.insert(bits);
    }

    pub fn reset_rendition(&mut self, bits: Rendition) {
        self.rendition.remove(bits);
    }

    pub fn set_fore_color(&mut self, color: Color) {
        self.fg = color;
    }

    pub fn set_back_color(&mut self, color: Color) {
        self.bg = color;
    }

    pub fn set_default_rendition(&mut self) {
        self.fg = Color::Default;
        self.bg = Color::Default;
        self.rendition = Rendition::empty();
    }

    /// Effective (fg, bg, rendition) after applying REVERSE (§4.2
    /// "Rendition") and, under DECSCNM, a further whole-screen swap on top
    /// of that per-cell result. BOLD is left as a display hint for the
    /// rendering layer, not resolved to a brightened RGB value here.
    pub fn effective_rendition(&self) -> (Color, Color, Rendition) {
        let (fg, bg) = if self.rendition.contains(Rendition::REVERSE) {
            (self.bg, self.fg)
        } else {
            (self.fg, self.bg)
        };
        if self.modes.is_set(ScreenMode::SCREEN) {
            (bg, fg, self.rendition)
        } else {
            (fg, bg, self.rendition)
        }
    }

    // --- clearing ----------------------------------------------------------------

    pub fn clear_to_end_of_line(&mut self) {
        let row = self.cursor_y as usize;
        let col = self.cursor_x;
        let cols = self.columns;
        let (fg, bg) = (self.fg, self.bg);
        if let Some(line) = self.lines.get_mut(row) {
            for c in col..cols {
                line.set_cell(c as usize, CharacterCell::blank(fg, bg));
            }
        }
    }

    pub fn clear_to_begin_of_line(&mut self) {
        let row = self.cursor_y as usize;
        let col = self.cursor_x;
        let (fg, bg) = (self.fg, self.bg);
        if let Some(line) = self.lines.get_mut(row) {
            for c in 0..=col {
                line.set_cell(c as usize, CharacterCell::blank(fg, bg));
            }
        }
    }

    pub fn clear_entire_line(&mut self) {
        let row = self.cursor_y as usize;
        let cols = self.columns;
        let (fg, bg) = (self.fg, self.bg);
        if let Some(line) = self.lines.get_mut(row) {
            for c in 0..cols {
                line.set_cell(c as usize, CharacterCell::blank(fg, bg));
            }
        }
    }

    pub fn clear_to_end_of_screen(&mut self) {
        self.clear_to_end_of_line();
        let start = self.cursor_y as usize + 1;
        let cols = self.columns;
        let (fg, bg) = (self.fg, self.bg);
        for row in start..self.line_count as usize {
            if let Some(line) = self.lines.get_mut(row) {
                for c in 0..cols {
                    line.set_cell(c as usize, CharacterCell::blank(fg, bg));
                }
            }
        }
    }

    pub fn clear_to_begin_of_screen(&mut self) {
        let cols = self.columns;
        let (fg, bg) = (self.fg, self.bg);
        for row in 0..self.cursor_y as usize {
            if let Some(line) = self.lines.get_mut(row) {
                for c in 0..cols {
                    line.set_cell(c as usize, CharacterCell::blank(fg, bg));
                }
            }
        }
        self.clear_to_begin_of_line();
    }

    /// Scrolls the entire screen into history first (primary Screen); on
    /// the alternate Screen history is absent so this is a plain wipe
    /// (§4.2 "Clearing", §9 Open Questions).
    pub fn clear_entire_screen(&mut self) {
        if self.is_full_screen_region() && !self.history.is_none_variant() {
            let rows: Vec<(Vec<CharacterCell>, bool)> = self
                .lines
                .iter()
                .map(|line| ((0..line.len()).map(|c| line.cell(c)).collect(), line.is_wrapped()))
                .collect();
            for (cells, wrapped) in rows {
                if let Err(err) = self.history.append_line(&cells, wrapped) {
                    self.record_history_failure(err);
                    break;
                }
            }
        }
        let cols = self.columns;
        let (fg, bg) = (self.fg, self.bg);
        for line in &mut self.lines {
            for c in 0..cols {
                line.set_cell(c as usize, CharacterCell::blank(fg, bg));
            }
        }
        self.selection = None;
    }

    /// CSI 3J (xterm extension): erase scrollback without touching the
    /// visible screen.
    pub fn clear_scrollback(&mut self) {
        self.history = HistoryStore::new(&self.history_mode).unwrap_or(HistoryStore::None);
    }

    // --- character display ------------------------------------------------------

    /// §4.2 "Character display". `code_point` has already been through
    /// charset translation (Emulation's job, not Screen's).
    pub fn display_character(&mut self, code_point: u16, ext: &mut ExtendedCharTable) {
        let ch = char::from_u32(code_point as u32).unwrap_or(' ');
        let width = UnicodeWidthChar::width(ch).unwrap_or(1) as u16;

        if width == 0 {
            self.attach_combining(code_point, ext);
            return;
        }

        self.begin_char_write(width);
        let (fg, bg, rendition) = self.effective_rendition();
        let cell = CharacterCell::new(code_point, fg, bg, rendition);
        self.write_cell_at_cursor(cell, width);
    }

    /// As `display_character`, for a code point already interned in the
    /// extended-char table (combining sequence or a character outside the
    /// BMP, §3.6) rather than a literal scalar.
    pub fn display_extended_character(&mut self, key: u16, width: u16) {
        let width = width.clamp(1, 2);
        self.begin_char_write(width);
        let (fg, bg, mut rendition) = self.effective_rendition();
        rendition.insert(Rendition::EXTENDED);
        let cell = CharacterCell::new(key, fg, bg, rendition);
        self.write_cell_at_cursor(cell, width);
    }

    /// Wrap-or-backup at the margin, then shift right under INSERT mode.
    /// Shared by `display_character` and `display_extended_character`.
    fn begin_char_write(&mut self, width: u16) {
        if self.cursor_x + width > self.columns {
            if self.modes.is_set(ScreenMode::WRAP) {
                if let Some(line) = self.lines.get_mut(self.cursor_y as usize) {
                    line.flags.insert(LineFlags::WRAPPED);
                }
                self.next_line();
            } else {
                self.cursor_x = self.columns.saturating_sub(width);
            }
        }

        if self.modes.is_set(ScreenMode::INSERT) {
            self.insert_chars(width);
        }
    }

    fn write_cell_at_cursor(&mut self, cell: CharacterCell, width: u16) {
        let (fg, bg, rendition) = (cell.fg, cell.bg, cell.rendition);
        let row = self.cursor_y as usize;
        let col = self.cursor_x as usize;
        if let Some(line) = self.lines.get_mut(row) {
            line.set_cell(col, cell);
            if width == 2 {
                line.set_cell(col + 1, CharacterCell::wide_placeholder(fg, bg, rendition));
            }
        }
        self.cursor_x += width;
    }

    /// Attach a zero-width combining mark to the preceding cell, creating
    /// an extended-character entry for it. The preceding cell is treated
    /// as opaque (§9 Open Questions: combining attachment across a wrap).
    fn attach_combining(&mut self, mark_code: u16, ext: &mut ExtendedCharTable) {
        let mark = char::from_u32(mark_code as u32).unwrap_or('\u{0}');
        let (row, col) = if self.cursor_x == 0 {
            if self.cursor_y == 0 {
                return;
            }
            (self.cursor_y - 1, self.columns.saturating_sub(1))
        } else {
            (self.cursor_y, self.cursor_x - 1)
        };

        let Some(line) = self.lines.get(row as usize) else { return };
        let mut cell = line.cell(col as usize);
        let mut seq: Vec<char> = if cell.rendition.contains(Rendition::EXTENDED) {
            ext.lookup_extended_char(cell.code_point).to_vec()
        } else {
            vec![char::from_u32(cell.code_point as u32).unwrap_or(' ')]
        };
        seq.push(mark);
        let key = ext.create_extended_char(&seq);
        cell.code_point = key;
        cell.rendition.insert(Rendition::EXTENDED);
        if let Some(line) = self.lines.get_mut(row as usize) {
            line.set_cell(col as usize, cell);
        }
    }

    // --- cursor save/restore --------------------------------------------------

    pub fn save_cursor(&mut self) {
        self.saved = Some(SavedCursorState {
            x: self.cursor_x,
            y: self.cursor_y,
            fg: self.fg,
            bg: self.bg,
            rendition: self.rendition,
        });
    }

    /// Idempotent: repeated calls without an intervening `save_cursor`
    /// yield the same state (§8.1 "the saved-cursor state ... is valid
    /// whenever restored").
    pub fn restore_cursor(&mut self) {
        if let Some(s) = self.saved {
            self.cursor_x = s.x;
            self.cursor_y = s.y;
            self.fg = s.fg;
            self.bg = s.bg;
            self.rendition = s.rendition;
        }
    }

    // --- selection -----------------------------------------------------------------

    pub fn set_selection_start(&mut self, x: u16, global_row: i64, block_mode: bool) {
        self.selection = Some(Selection {
            block_mode,
            anchor: (x, global_row),
            top_left: (x, global_row),
            bottom_right: (x, global_row),
        });
    }

    pub fn set_selection_end(&mut self, x: u16, global_row: i64) {
        if let Some(sel) = &mut self.selection {
            let anchor = sel.anchor;
            let (top_left, bottom_right) = if (anchor.1, anchor.0) <= (global_row, x) {
                (anchor, (x, global_row))
            } else {
                ((x, global_row), anchor)
            };
            sel.top_left = top_left;
            sel.bottom_right = bottom_right;
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn is_selected(&self, x: u16, global_row: i64) -> bool {
        let Some(sel) = &self.selection else { return false };
        if global_row < sel.top_left.1 || global_row > sel.bottom_right.1 {
            return false;
        }
        if sel.block_mode {
            return x >= sel.top_left.0 && x <= sel.bottom_right.0;
        }
        if sel.top_left.1 == sel.bottom_right.1 {
            x >= sel.top_left.0 && x <= sel.bottom_right.0
        } else if global_row == sel.top_left.1 {
            x >= sel.top_left.0
        } else if global_row == sel.bottom_right.1 {
            x <= sel.bottom_right.0
        } else {
            true
        }
    }

    pub fn has_selection(&self) -> bool {
        self.selection.is_some()
    }

    /// §4.2 "Text extraction".
    pub fn selected_text(&mut self, preserve_line_breaks: bool, trim_trailing_space: bool) -> String {
        let Some(sel) = self.selection else { return String::new() };
        let mut result = String::new();
        let mut row = sel.top_left.1;
        while row <= sel.bottom_right.1 {
            let (cells, wrapped) = self.global_line(row);
            let (start_col, end_col) = if sel.block_mode {
                (sel.top_left.0 as usize, sel.bottom_right.0 as usize + 1)
            } else {
                let start = if row == sel.top_left.1 { sel.top_left.0 as usize } else { 0 };
                let end = if row == sel.bottom_right.1 {
                    sel.bottom_right.0 as usize + 1
                } else {
                    cells.len()
                };
                (start, end)
            };
            let end_col = end_col.min(cells.len());

            let mut line_text = String::new();
            if start_col < end_col {
                for cell in &cells[start_col..end_col] {
                    if cell.real {
                        line_text.push(char::from_u32(cell.code_point as u32).unwrap_or(' '));
                    }
                }
            }
            if trim_trailing_space && !wrapped {
                let trimmed_len = line_text.trim_end_matches(' ').len();
                line_text.truncate(trimmed_len);
            }
            result.push_str(&line_text);

            if row < sel.bottom_right.1 {
                if sel.block_mode {
                    result.push('\n');
                } else if wrapped {
                    // logical line continues; no break
                } else if preserve_line_breaks {
                    result.push('\n');
                } else {
                    result.push(' ');
                }
            }
            row += 1;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_screen() -> Screen {
        Screen::new(24, 80, HistoryMode::Bounded(100)).unwrap()
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut screen = new_screen();
        screen.cursor_up(100);
        assert_eq!(screen.cursor_y(), 0);
        screen.cursor_down(100);
        assert_eq!(screen.cursor_y(), 23);
        screen.cursor_left(100);
        assert_eq!(screen.cursor_x(), 0);
        screen.cursor_right(200);
        assert_eq!(screen.cursor_x(), 79);
    }

    #[test]
    fn wrap_at_margin_sets_wrapped_flag() {
        let mut screen = Screen::new(24, 5, HistoryMode::Bounded(100)).unwrap();
        let mut ext = ExtendedCharTable::new();
        for ch in "123456".chars() {
            screen.display_character(ch as u16, &mut ext);
        }
        assert!(screen.line_flags(0).contains(LineFlags::WRAPPED));
        assert_eq!(screen.cell(0, 1).code_point, b'6' as u16);
        assert_eq!(screen.cursor_y(), 1);
        assert_eq!(screen.cursor_x(), 1);
    }

    #[test]
    fn save_restore_cursor_is_idempotent() {
        let mut screen = new_screen();
        screen.set_cursor_yx(5, 5);
        screen.save_cursor();
        screen.set_cursor_yx(1, 1);
        screen.restore_cursor();
        assert_eq!((screen.cursor_x(), screen.cursor_y()), (4, 4));
        screen.restore_cursor();
        assert_eq!((screen.cursor_x(), screen.cursor_y()), (4, 4));
    }

    #[test]
    fn selection_normalizes_top_left_and_bottom_right() {
        let mut screen = new_screen();
        screen.set_selection_start(10, 5, false);
        screen.set_selection_end(2, 2);
        assert!(screen.is_selected(2, 2));
        assert!(screen.is_selected(10, 5));
        assert!(!screen.is_selected(0, 2));
    }

    #[test]
    fn resize_preserves_overlapping_columns() {
        let mut screen = Screen::new(5, 10, HistoryMode::Bounded(100)).unwrap();
        let mut ext = ExtendedCharTable::new();
        for ch in "hello".chars() {
            screen.display_character(ch as u16, &mut ext);
        }
        screen.resize(5, 5);
        screen.resize(5, 10);
        assert_eq!(screen.cell(0, 0).code_point, b'h' as u16);
        assert_eq!(screen.cell(4, 0).code_point, b'o' as u16);
    }
}
