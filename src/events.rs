//! Per-collaborator traits standing in for a single catch-all event queue:
//! one explicit trait per concern (output, selection, session attributes)
//! instead of a signal/slot style `TerminalEvent` enum.

use crate::error::HistoryError;

/// The byte-level interface back to the child process. Emulation calls
/// this to send key/mouse translations and query replies; the PTY itself
/// is out of scope (§1).
pub trait ByteSink {
    fn send_block(&mut self, bytes: &[u8]);
}

/// Notifications a ScreenWindow's registry fires to the display layer
/// (§4.4, §5 "refresh contract").
pub trait OutputListener {
    fn output_changed(&mut self) {}
    fn selection_changed(&mut self) {}
    /// Fired once per `updateViews` event (§5).
    fn update_views(&mut self) {}
    /// §7.3: a history write/read failure degraded this Screen's history
    /// to disabled. Fired once per failure, not per subsequent operation.
    fn history_error(&mut self, _error: &HistoryError) {}
}

/// Session-level state changes driven by OSC sequences and data patterns
/// (§6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Normal,
    Bell,
    Activity,
    Silence,
}

pub trait SessionAttributeListener {
    fn change_title(&mut self, _code: u16, _text: &str) {}
    fn open_url_request(&mut self, _path: &str) {}
    fn change_tab_text_color(&mut self, _color_index: u8) {}
    fn change_background_color(&mut self, _color: crate::color::Color) {}
    fn notify_session_state(&mut self, _state: SessionState) {}
    fn zmodem_detected(&mut self) {}
}
