//! ScreenWindow (§4.4): a viewport onto a Screen, decoupling rendering
//! from mutation. A window holds no reference to its Screen at all --
//! only which one it targets -- and every operation takes `&Screen`/
//! `&mut Screen` explicitly, resolved by whoever owns both (Emulation).

use crate::cell::{CharacterCell, Rendition};
use crate::events::OutputListener;
use crate::line::LineFlags;
use crate::screen::Screen;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Primary,
    Alternate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollMode {
    Lines,
    Pages,
}

pub struct ScreenWindow {
    target: Target,
    current_line: i64,
    window_lines: u16,
    track_output: bool,
    scroll_count: i64,
}

impl ScreenWindow {
    pub fn new(target: Target, window_lines: u16) -> Self {
        Self {
            target,
            current_line: 0,
            window_lines,
            track_output: true,
            scroll_count: 0,
        }
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn current_line(&self) -> i64 {
        self.current_line
    }

    pub fn scroll_count(&self) -> i64 {
        self.scroll_count
    }

    pub fn track_output(&self) -> bool {
        self.track_output
    }

    pub fn set_track_output(&mut self, track: bool) {
        self.track_output = track;
    }

    pub fn window_lines(&self) -> u16 {
        self.window_lines
    }

    fn max_top(&self, screen: &mut Screen) -> i64 {
        let total = screen.total_line_count() as i64;
        (total - self.window_lines as i64).max(0)
    }

    pub fn scroll_to(&mut self, line: i64, screen: &mut Screen) {
        let clamped = line.clamp(0, self.max_top(screen));
        let delta = clamped - self.current_line;
        self.current_line = clamped;
        self.scroll_count += delta;
    }

    pub fn scroll_by(&mut self, mode: ScrollMode, amount: i64, screen: &mut Screen) {
        let step = match mode {
            ScrollMode::Lines => amount,
            ScrollMode::Pages => amount * (self.window_lines as i64 / 2).max(1),
        };
        let target = self.current_line + step;
        self.scroll_to(target, screen);
    }

    /// §4.4: pin to bottom and decrement `scroll_count` by the Screen's
    /// own scrolled-lines counter, then notify the listener.
    pub fn notify_output_changed(&mut self, screen: &mut Screen, scrolled_delta: i64, listener: &mut dyn OutputListener) {
        if self.track_output {
            self.current_line = self.max_top(screen);
            self.scroll_count -= scrolled_delta;
        }
        listener.output_changed();
    }

    /// Copies `[current_line, current_line + window_lines) x [0, columns)`
    /// into `out`, row-major. Selection highlight and the cursor position
    /// marker are applied to the copy, not the underlying Screen.
    pub fn get_image(&self, screen: &mut Screen, out: &mut [CharacterCell]) {
        let cols = screen.columns() as usize;
        for row in 0..self.window_lines as usize {
            let global_row = self.current_line + row as i64;
            let (cells, _wrapped) = screen.global_line(global_row);
            for col in 0..cols {
                let idx = row * cols + col;
                if idx >= out.len() {
                    break;
                }
                let mut cell = cells.get(col).copied().unwrap_or_default();
                if screen.is_selected(col as u16, global_row) {
                    std::mem::swap(&mut cell.fg, &mut cell.bg);
                }
                out[idx] = cell;
            }
        }

        let cursor_global = screen.history_line_count() as i64 + screen.cursor_y() as i64;
        let cursor_row = cursor_global - self.current_line;
        if cursor_row >= 0 && (cursor_row as usize) < self.window_lines as usize {
            let idx = cursor_row as usize * cols + screen.cursor_x() as usize;
            if let Some(cell) = out.get_mut(idx) {
                cell.rendition.insert(Rendition::CURSOR);
            }
        }
    }

    pub fn get_line_properties(&self, screen: &mut Screen) -> Vec<LineFlags> {
        let hist_count = screen.history_line_count() as i64;
        (0..self.window_lines)
            .map(|row| {
                let global_row = self.current_line + row as i64;
                if global_row >= 0 && global_row < hist_count {
                    let mut flags = LineFlags::empty();
                    if screen.history().is_wrapped(global_row as usize) {
                        flags.insert(LineFlags::WRAPPED);
                    }
                    flags
                } else {
                    let on_screen_row = (global_row - hist_count).max(0) as u16;
                    screen.line_flags(on_screen_row)
                }
            })
            .collect()
    }

    pub fn set_selection_start(&self, screen: &mut Screen, x: u16, y: i64, block_mode: bool, listener: &mut dyn OutputListener) {
        screen.set_selection_start(x, y, block_mode);
        listener.selection_changed();
    }

    pub fn set_selection_end(&self, screen: &mut Screen, x: u16, y: i64, listener: &mut dyn OutputListener) {
        screen.set_selection_end(x, y);
        listener.selection_changed();
    }

    pub fn clear_selection(&self, screen: &mut Screen, listener: &mut dyn OutputListener) {
        screen.clear_selection();
        listener.selection_changed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryMode;

    struct NullListener;
    impl OutputListener for NullListener {}

    #[test]
    fn scroll_to_clamps_to_available_range() {
        let mut screen = Screen::new(10, 20, HistoryMode::Bounded(100)).unwrap();
        let mut window = ScreenWindow::new(Target::Primary, 10);
        window.scroll_to(1000, &mut screen);
        assert_eq!(window.current_line(), 0);
    }

    #[test]
    fn notify_output_changed_pins_to_bottom_when_tracking() {
        let mut screen = Screen::new(5, 20, HistoryMode::Bounded(100)).unwrap();
        let mut window = ScreenWindow::new(Target::Primary, 5);
        let mut listener = NullListener;
        window.scroll_to(0, &mut screen);
        window.notify_output_changed(&mut screen, 0, &mut listener);
        assert_eq!(window.current_line(), 0);
    }

    #[test]
    fn get_image_marks_cursor_cell() {
        let mut screen = Screen::new(5, 10, HistoryMode::Bounded(10)).unwrap();
        screen.set_cursor_yx(1, 1);
        let window = ScreenWindow::new(Target::Primary, 5);
        let mut buf = vec![CharacterCell::default(); 5 * 10];
        window.get_image(&mut screen, &mut buf);
        assert!(buf[0].rendition.contains(Rendition::CURSOR));
    }
}
