//! Emulation (§4.3): the escape-sequence decoder. Owns the two Screens
//! (primary and alternate), the shared charset and extended-char state, and
//! drives them from a byte stream via `vte::Perform`, falling back to a
//! hand-rolled VT52 grammar when ANSI mode is off.
//!
//! Collaborators are explicit traits (`events::ByteSink`/`OutputListener`/
//! `SessionAttributeListener`) rather than signal/slot dynamic dispatch.
//! `vte::Perform`'s methods can't carry extra arguments, so replies and
//! session events are queued internally while parsing and handed to the
//! collaborators afterwards, via `dispatch`.
//!
//! No registry of weak `ScreenWindow` references lives here: in safe Rust,
//! `ScreenWindow` already holds no reference to its Screen at all (see
//! `window.rs`), so there is no destruction-order hazard a registry would
//! need to guard against; `screen()`/`screen_mut()` stand in its place.

mod vt52;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::cell::Rendition;
use crate::charset::{CharsetDesignation, CharsetState};
use crate::color::Color;
use crate::error::HistoryError;
use crate::events::SessionState;
use crate::extended::ExtendedCharTable;
use crate::history::HistoryMode;
use crate::modes::ScreenMode;
use crate::screen::Screen;
use crate::window::Target;
use crate::zmodem::ZmodemDetector;
use vt52::{Vt52Command, Vt52Parser};

/// In-memory configuration (§7 ambient stack): no file format, built by the
/// embedder and passed to `Emulation::new`.
#[derive(Debug, Clone)]
pub struct EmulationConfig {
    /// Timeout A (§5): restarted on every received block.
    pub bulk_timeout_short: Duration,
    /// Timeout B (§5): started once per burst, not restarted.
    pub bulk_timeout_long: Duration,
    /// Rapid repeats of the same OSC number collapse to the last value
    /// within this window before firing (§4.3 ambient note).
    pub osc_coalesce_window: Duration,
    pub history_mode: HistoryMode,
}

impl Default for EmulationConfig {
    fn default() -> Self {
        Self {
            bulk_timeout_short: Duration::from_millis(10),
            bulk_timeout_long: Duration::from_millis(40),
            osc_coalesce_window: Duration::from_millis(200),
            history_mode: HistoryMode::Bounded(10_000),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseModes {
    pub tracking: bool,         // 1000
    pub button_motion: bool,    // 1002
    pub any_motion: bool,       // 1003
    pub focus_events: bool,     // 1004
    pub utf8: bool,             // 1005
    pub sgr: bool,              // 1006
    pub alternate_scroll: bool, // 1007
    pub bracketed_paste: bool,  // 2004
    pub synchronized_output: bool, // 2026
}

/// §6.2: the three mouse-event shapes a display layer can report through
/// `Emulation::mouse_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    Press,
    Drag,
    Release,
}

enum EmulationEvent {
    TitleChanged { code: u16, text: String },
    OpenUrl { path: String },
    TabTextColor { index: u8 },
    BackgroundColor { color: Color },
    SessionState(SessionState),
    ZmodemDetected,
}

pub struct Emulation {
    primary: Screen,
    alternate: Screen,
    using_alt: bool,
    charset: CharsetState,
    extended: ExtendedCharTable,
    ansi_mode: bool,
    vt52: Vt52Parser,
    cursor_keys_application: bool,
    application_keypad: bool,
    mouse: MouseModes,
    zmodem: ZmodemDetector,
    config: EmulationConfig,
    pending_responses: Vec<Vec<u8>>,
    pending_events: Vec<EmulationEvent>,
    pending_osc: HashMap<u16, (Instant, String)>,
    last_block_at: Option<Instant>,
    burst_start: Option<Instant>,
    last_printed_char: char,
    parser: vte::Parser,
}

impl Emulation {
    pub fn new(lines: u16, columns: u16, config: EmulationConfig) -> Result<Self, HistoryError> {
        let primary = Screen::new(lines, columns, config.history_mode.clone())?;
        let alternate = Screen::new(lines, columns, HistoryMode::None)?;
        Ok(Self {
            primary,
            alternate,
            using_alt: false,
            charset: CharsetState::default(),
            extended: ExtendedCharTable::new(),
            ansi_mode: true,
            vt52: Vt52Parser::new(),
            cursor_keys_application: false,
            application_keypad: false,
            mouse: MouseModes::default(),
            zmodem: ZmodemDetector::new(),
            config,
            pending_responses: Vec::new(),
            pending_events: Vec::new(),
            pending_osc: HashMap::new(),
            last_block_at: None,
            burst_start: None,
            last_printed_char: ' ',
            parser: vte::Parser::new(),
        })
    }

    pub fn screen(&self, target: Target) -> &Screen {
        match target {
            Target::Primary => &self.primary,
            Target::Alternate => &self.alternate,
        }
    }

    pub fn screen_mut(&mut self, target: Target) -> &mut Screen {
        match target {
            Target::Primary => &mut self.primary,
            Target::Alternate => &mut self.alternate,
        }
    }

    pub fn active_target(&self) -> Target {
        if self.using_alt { Target::Alternate } else { Target::Primary }
    }

    fn active_screen(&self) -> &Screen {
        if self.using_alt { &self.alternate } else { &self.primary }
    }

    fn active_screen_mut(&mut self) -> &mut Screen {
        if self.using_alt { &mut self.alternate } else { &mut self.primary }
    }

    /// Split borrow of the active screen alongside the extended-char table,
    /// needed wherever both must be touched in the same statement (`print`
    /// can't go through `active_screen_mut()` for that -- a method call
    /// borrows the whole of `self`, not just one field).
    fn active_screen_and_extended(&mut self) -> (&mut Screen, &mut ExtendedCharTable) {
        let screen = if self.using_alt { &mut self.alternate } else { &mut self.primary };
        (screen, &mut self.extended)
    }

    pub fn resize(&mut self, lines: u16, columns: u16) {
        self.primary.resize(lines, columns);
        self.alternate.resize(lines, columns);
    }

    pub fn mouse_modes(&self) -> MouseModes {
        self.mouse
    }

    /// §6.4: encode a display-layer mouse action as `CSI M Cb Cx Cy` and
    /// queue it for `dispatch`, gated on the active mouse-reporting modes.
    /// `buttons` is the button code (0/1/2 press, 64/65 wheel) with any
    /// modifier bits already folded in by the caller; release is always
    /// reported as button code 3 regardless of which button let go.
    pub fn mouse_event(&mut self, buttons: u8, column: u16, line: u16, kind: MouseEventKind) {
        let reporting = self.mouse.tracking || self.mouse.button_motion || self.mouse.any_motion;
        if !reporting {
            return;
        }
        if kind == MouseEventKind::Drag && !(self.mouse.button_motion || self.mouse.any_motion) {
            return;
        }
        let button_code = if kind == MouseEventKind::Release { 3 } else { buttons };
        let cb = 32u16 + button_code as u16;
        let cx = 32u16 + (column + 1).min(223);
        let cy = 32u16 + (line + 1).min(223);
        self.pending_responses.push(vec![0x1b, b'[', b'M', cb as u8, cx as u8, cy as u8]);
    }

    pub fn cursor_keys_application(&self) -> bool {
        self.cursor_keys_application
    }

    pub fn application_keypad(&self) -> bool {
        self.application_keypad
    }

    pub fn ansi_mode(&self) -> bool {
        self.ansi_mode
    }

    /// ESC c / external cancellation (§5 "Cancellation"): synchronous,
    /// clears both screens and resets modes, saved cursor, tab stops, and
    /// charset state.
    pub fn reset(&mut self) {
        self.primary.reset();
        self.alternate.reset();
        self.using_alt = false;
        self.charset.reset();
        self.extended.clear();
        self.ansi_mode = true;
        self.vt52 = Vt52Parser::new();
        self.cursor_keys_application = false;
        self.application_keypad = false;
        self.mouse = MouseModes::default();
        self.pending_osc.clear();
    }

    // --- byte intake -------------------------------------------------------

    /// §6.1 ByteSink's counterpart: bytes arriving from the child. Runs the
    /// ZModem side-channel detector alongside the main parser (§4.3,
    /// independent of decoding) and routes each byte to `vte` or the VT52
    /// grammar depending on the current mode.
    pub fn on_receive_block(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let now = Instant::now();
        self.last_block_at = Some(now);
        if self.burst_start.is_none() {
            self.burst_start = Some(now);
        }

        for &b in bytes {
            if self.zmodem.feed(b) {
                self.pending_events.push(EmulationEvent::ZmodemDetected);
            }
            if self.ansi_mode {
                let mut parser = std::mem::replace(&mut self.parser, vte::Parser::new());
                parser.advance(self, b);
                self.parser = parser;
            } else {
                self.feed_vt52(b);
            }
        }
    }

    fn feed_vt52(&mut self, byte: u8) {
        match self.vt52.feed(byte) {
            Vt52Command::CursorUp => self.active_screen_mut().cursor_up(1),
            Vt52Command::CursorDown => self.active_screen_mut().cursor_down(1),
            Vt52Command::CursorRight => self.active_screen_mut().cursor_right(1),
            Vt52Command::CursorLeft => self.active_screen_mut().cursor_left(1),
            Vt52Command::Home => self.active_screen_mut().set_cursor_yx(1, 1),
            Vt52Command::DirectAddress(row, col) => {
                self.active_screen_mut().set_cursor_position_0based(col, row);
            }
            Vt52Command::Identify => self.pending_responses.push(b"\x1b/Z".to_vec()),
            Vt52Command::SwitchToAnsi => self.ansi_mode = true,
            Vt52Command::Print(c) => {
                let translated = self.charset.translate(c as u16);
                let (screen, ext) = self.active_screen_and_extended();
                screen.display_character(translated, ext);
            }
            Vt52Command::None => {}
        }
    }

    /// §5 "refresh contract": call periodically from the embedder's event
    /// loop. Returns whether a frame flush is due (timeout A or B fired,
    /// whichever first) and flushes any OSC values that have sat in the
    /// coalescing window long enough.
    pub fn tick(&mut self) -> bool {
        let now = Instant::now();
        let mut due = false;
        if let Some(last) = self.last_block_at {
            if now.duration_since(last) >= self.config.bulk_timeout_short {
                due = true;
            }
        }
        if let Some(start) = self.burst_start {
            if now.duration_since(start) >= self.config.bulk_timeout_long {
                due = true;
            }
        }
        if due {
            self.last_block_at = None;
            self.burst_start = None;
        }
        self.flush_due_osc(now);
        due
    }

    fn flush_due_osc(&mut self, now: Instant) {
        let window = self.config.osc_coalesce_window;
        let due: Vec<u16> = self
            .pending_osc
            .iter()
            .filter(|(_, (t, _))| now.duration_since(*t) >= window)
            .map(|(&n, _)| n)
            .collect();
        for n in due {
            if let Some((_, text)) = self.pending_osc.remove(&n) {
                self.fire_osc(n, text);
            }
        }
    }

    fn fire_osc(&mut self, n: u16, text: String) {
        match n {
            0 | 1 | 2 | 30 | 32 => self.pending_events.push(EmulationEvent::TitleChanged { code: n, text }),
            31 => self.pending_events.push(EmulationEvent::OpenUrl { path: text }),
            10 => {
                if let Ok(index) = text.parse::<u8>() {
                    self.pending_events.push(EmulationEvent::TabTextColor { index });
                }
            }
            11 => {
                if let Some(color) = parse_color_spec(&text) {
                    self.pending_events.push(EmulationEvent::BackgroundColor { color });
                }
            }
            _ => {}
        }
    }

    /// Drain queued replies and session events into the collaborators
    /// (§6.1, §6.3). Call after `on_receive_block`/`tick`.
    pub fn dispatch(&mut self, sink: &mut dyn crate::events::ByteSink, listener: &mut dyn crate::events::SessionAttributeListener) {
        for resp in self.pending_responses.drain(..) {
            sink.send_block(&resp);
        }
        for ev in self.pending_events.drain(..) {
            match ev {
                EmulationEvent::TitleChanged { code, text } => listener.change_title(code, &text),
                EmulationEvent::OpenUrl { path } => listener.open_url_request(&path),
                EmulationEvent::TabTextColor { index } => listener.change_tab_text_color(index),
                EmulationEvent::BackgroundColor { color } => listener.change_background_color(color),
                EmulationEvent::SessionState(state) => listener.notify_session_state(state),
                EmulationEvent::ZmodemDetected => listener.zmodem_detected(),
            }
        }
    }

    // --- mode helpers --------------------------------------------------------

    fn set_screen_mode(&mut self, mode: ScreenMode, enable: bool) {
        let screen = self.active_screen_mut();
        if enable {
            screen.set_mode(mode);
        } else {
            screen.reset_mode(mode);
        }
    }

    fn enter_alt_screen(&mut self, clear: bool) {
        if !self.using_alt {
            self.primary.save_cursor();
            self.using_alt = true;
            if clear {
                self.alternate.clear_entire_screen();
                self.alternate.set_cursor_yx(1, 1);
            }
        }
    }

    fn exit_alt_screen(&mut self) {
        if self.using_alt {
            self.using_alt = false;
            self.primary.restore_cursor();
        }
    }

    fn set_dec_mode(&mut self, params: &[u16], enable: bool) {
        for &p in params {
            match p {
                1 => self.cursor_keys_application = enable,
                2 => self.ansi_mode = enable,
                5 => self.set_screen_mode(ScreenMode::SCREEN, enable),
                6 => self.set_screen_mode(ScreenMode::ORIGIN, enable),
                7 => self.set_screen_mode(ScreenMode::WRAP, enable),
                25 => self.set_screen_mode(ScreenMode::CURSOR, enable),
                47 => {
                    if enable { self.enter_alt_screen(false) } else { self.exit_alt_screen() }
                }
                66 => self.application_keypad = enable,
                1000 => self.mouse.tracking = enable,
                1002 => self.mouse.button_motion = enable,
                1003 => self.mouse.any_motion = enable,
                1004 => self.mouse.focus_events = enable,
                1005 => self.mouse.utf8 = enable,
                1006 => self.mouse.sgr = enable,
                1007 => self.mouse.alternate_scroll = enable,
                1047 => {
                    if enable { self.enter_alt_screen(true) } else { self.exit_alt_screen() }
                }
                1049 => {
                    if enable { self.enter_alt_screen(true) } else { self.exit_alt_screen() }
                }
                2004 => self.mouse.bracketed_paste = enable,
                2026 => self.mouse.synchronized_output = enable,
                _ => {}
            }
        }
    }

    fn set_ansi_mode(&mut self, params: &[u16], enable: bool) {
        for &p in params {
            match p {
                4 => self.set_screen_mode(ScreenMode::INSERT, enable),
                20 => self.set_screen_mode(ScreenMode::NEWLINE, enable),
                _ => {}
            }
        }
    }

    fn dec_mode_state(&self, mode: u16) -> Option<bool> {
        match mode {
            1 => Some(self.cursor_keys_application),
            2 => Some(self.ansi_mode),
            5 => Some(self.active_screen().modes().is_set(ScreenMode::SCREEN)),
            6 => Some(self.active_screen().modes().is_set(ScreenMode::ORIGIN)),
            7 => Some(self.active_screen().modes().is_set(ScreenMode::WRAP)),
            25 => Some(self.active_screen().modes().is_set(ScreenMode::CURSOR)),
            47 | 1047 | 1049 => Some(self.using_alt),
            66 => Some(self.application_keypad),
            1000 => Some(self.mouse.tracking),
            1002 => Some(self.mouse.button_motion),
            1003 => Some(self.mouse.any_motion),
            1004 => Some(self.mouse.focus_events),
            1005 => Some(self.mouse.utf8),
            1006 => Some(self.mouse.sgr),
            1007 => Some(self.mouse.alternate_scroll),
            2004 => Some(self.mouse.bracketed_paste),
            2026 => Some(self.mouse.synchronized_output),
            _ => None,
        }
    }

    fn ansi_mode_state(&self, mode: u16) -> Option<bool> {
        match mode {
            4 => Some(self.active_screen().modes().is_set(ScreenMode::INSERT)),
            20 => Some(self.active_screen().modes().is_set(ScreenMode::NEWLINE)),
            _ => None,
        }
    }

    fn report_mode_state(&mut self, mode: u16, state: Option<bool>, dec_private: bool) {
        let pm = match state {
            Some(true) => 1,
            Some(false) => 2,
            None => 0,
        };
        let prefix = if dec_private { "?" } else { "" };
        self.pending_responses
            .push(format!("\x1b[{}{};{}$y", prefix, mode, pm).into_bytes());
    }

    fn report_dec_modes(&mut self, params: &[u16]) {
        for &m in params {
            let state = self.dec_mode_state(m);
            self.report_mode_state(m, state, true);
        }
    }

    fn report_ansi_modes(&mut self, params: &[u16]) {
        for &m in params {
            let state = self.ansi_mode_state(m);
            self.report_mode_state(m, state, false);
        }
    }

    // --- SGR -----------------------------------------------------------------

    fn handle_sgr(&mut self, params: &[u16]) {
        if params.is_empty() {
            self.active_screen_mut().set_default_rendition();
            return;
        }
        let mut i = 0;
        while i < params.len() {
            let p = params[i];
            match p {
                0 => self.active_screen_mut().set_default_rendition(),
                1 => self.active_screen_mut().set_rendition(Rendition::BOLD),
                4 => self.active_screen_mut().set_rendition(Rendition::UNDERLINE),
                5 => self.active_screen_mut().set_rendition(Rendition::BLINK),
                7 => self.active_screen_mut().set_rendition(Rendition::REVERSE),
                22 => self.active_screen_mut().reset_rendition(Rendition::BOLD),
                24 => self.active_screen_mut().reset_rendition(Rendition::UNDERLINE),
                25 => self.active_screen_mut().reset_rendition(Rendition::BLINK),
                27 => self.active_screen_mut().reset_rendition(Rendition::REVERSE),
                30..=37 => self.active_screen_mut().set_fore_color(Color::Indexed((p - 30) as u8)),
                39 => self.active_screen_mut().set_fore_color(Color::Default),
                40..=47 => self.active_screen_mut().set_back_color(Color::Indexed((p - 40) as u8)),
                49 => self.active_screen_mut().set_back_color(Color::Default),
                90..=97 => self.active_screen_mut().set_fore_color(Color::Indexed((p - 90 + 8) as u8)),
                100..=107 => self.active_screen_mut().set_back_color(Color::Indexed((p - 100 + 8) as u8)),
                38 | 48 => {
                    let (color, consumed) = parse_extended_color(&params[i..]);
                    if let Some(color) = color {
                        if p == 38 {
                            self.active_screen_mut().set_fore_color(color);
                        } else {
                            self.active_screen_mut().set_back_color(color);
                        }
                    }
                    i += consumed.saturating_sub(1);
                }
                _ => {}
            }
            i += 1;
        }
    }

    // --- device attributes / DSR ----------------------------------------------

    fn report_primary_da(&mut self) {
        self.pending_responses.push(b"\x1b[?1;2c".to_vec());
    }

    fn report_secondary_da(&mut self) {
        self.pending_responses.push(b"\x1b[>0;100;0c".to_vec());
    }

    fn report_tertiary_da(&mut self) {
        self.pending_responses.push(b"\x1bP!|7E4B4445\x1b\\".to_vec());
    }

    fn report_dsr(&mut self, code: u16) {
        match code {
            5 => self.pending_responses.push(b"\x1b[0n".to_vec()),
            6 => {
                let screen = self.active_screen();
                let row = screen.cursor_y() + 1;
                let col = screen.cursor_x() + 1;
                self.pending_responses.push(format!("\x1b[{};{}R", row, col).into_bytes());
            }
            _ => {}
        }
    }

    // --- charset designation / DECALN -----------------------------------------

    fn designate_charset(&mut self, slot: usize, byte: u8) {
        let designation = match byte {
            b'0' => CharsetDesignation::DecSpecialGraphics,
            b'A' => CharsetDesignation::UkPound,
            _ => CharsetDesignation::UsAscii,
        };
        self.charset.designate(slot, designation);
    }

    /// DECALN (ESC # 8): fill the screen with 'E', reset margins and home
    /// the cursor -- the classic screen-alignment test pattern.
    fn align_screen(&mut self) {
        let (lines, columns) = {
            let screen = self.active_screen_mut();
            screen.set_default_margins();
            (screen.line_count(), screen.columns())
        };
        for y in 0..lines {
            for x in 0..columns {
                let (screen, ext) = self.active_screen_and_extended();
                screen.set_cursor_position_0based(x, y);
                screen.display_character('E' as u16, ext);
            }
        }
        self.active_screen_mut().set_cursor_yx(1, 1);
    }
}

fn parse_extended_color(params: &[u16]) -> (Option<Color>, usize) {
    match params.get(1) {
        Some(5) => match params.get(2) {
            Some(&n) => (Some(Color::Indexed(n as u8)), 3),
            None => (None, params.len()),
        },
        Some(2) => {
            if params.len() >= 5 {
                (Some(Color::Rgb(params[2] as u8, params[3] as u8, params[4] as u8)), 5)
            } else {
                (None, params.len())
            }
        }
        _ => (None, 1),
    }
}

/// Parses `"rgb:rr/gg/bb"` or a bare `"#rrggbb"` colour spec, the two forms
/// OSC 10/11/4 replies and requests use.
fn parse_color_spec(text: &str) -> Option<Color> {
    if let Some(hex) = text.strip_prefix('#') {
        let r = u8::from_str_radix(hex.get(0..2)?, 16).ok()?;
        let g = u8::from_str_radix(hex.get(2..4)?, 16).ok()?;
        let b = u8::from_str_radix(hex.get(4..6)?, 16).ok()?;
        return Some(Color::Rgb(r, g, b));
    }
    let rest = text.strip_prefix("rgb:")?;
    let mut parts = rest.split('/');
    let r = u8::from_str_radix(parts.next()?.get(0..2)?, 16).ok()?;
    let g = u8::from_str_radix(parts.next()?.get(0..2)?, 16).ok()?;
    let b = u8::from_str_radix(parts.next()?.get(0..2)?, 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

fn extract_params(params: &vte::Params) -> Vec<u16> {
    params.iter().flat_map(|subparams| subparams.iter().copied()).collect()
}

fn param(params: &[u16], idx: usize, default: u16) -> u16 {
    params.get(idx).copied().filter(|&v| v != 0).unwrap_or(default)
}

impl vte::Perform for Emulation {
    fn print(&mut self, c: char) {
        self.last_printed_char = c;
        if (c as u32) > 0xffff {
            let width = unicode_width::UnicodeWidthChar::width(c).unwrap_or(1) as u16;
            let key = self.extended.create_extended_char(&[c]);
            self.active_screen_mut().display_extended_character(key, width);
            return;
        }
        let translated = self.charset.translate(c as u16);
        let (screen, ext) = self.active_screen_and_extended();
        screen.display_character(translated, ext);
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            0x07 => self.pending_events.push(EmulationEvent::SessionState(SessionState::Bell)),
            0x08 => self.active_screen_mut().backspace(),
            0x09 => self.active_screen_mut().tab(1),
            0x0a | 0x0b | 0x0c => {
                let newline_mode = self.active_screen().modes().is_set(ScreenMode::NEWLINE);
                self.active_screen_mut().index();
                if newline_mode {
                    self.active_screen_mut().carriage_return();
                }
            }
            0x0d => self.active_screen_mut().carriage_return(),
            0x0e => self.charset.shift_out(),
            0x0f => self.charset.shift_in(),
            _ => {}
        }
    }

    fn csi_dispatch(&mut self, params: &vte::Params, intermediates: &[u8], _ignore: bool, action: char) {
        let raw = extract_params(params);
        let is_private = intermediates.contains(&b'?');
        let has_gt = intermediates.contains(&b'>');
        let has_eq = intermediates.contains(&b'=');
        let has_dollar = intermediates.contains(&b'$');

        if action == 'p' && has_dollar {
            if is_private {
                self.report_dec_modes(&raw);
            } else {
                self.report_ansi_modes(&raw);
            }
            return;
        }

        if action == 'c' && has_gt {
            self.report_secondary_da();
            return;
        }
        if action == 'c' && has_eq {
            self.report_tertiary_da();
            return;
        }

        match (action, is_private) {
            ('A', false) => self.active_screen_mut().cursor_up(param(&raw, 0, 1)),
            ('B', false) => self.active_screen_mut().cursor_down(param(&raw, 0, 1)),
            ('C', false) => self.active_screen_mut().cursor_right(param(&raw, 0, 1)),
            ('D', false) => self.active_screen_mut().cursor_left(param(&raw, 0, 1)),
            ('E', false) => {
                let n = param(&raw, 0, 1);
                let screen = self.active_screen_mut();
                screen.carriage_return();
                screen.cursor_down(n);
            }
            ('F', false) => {
                let n = param(&raw, 0, 1);
                let screen = self.active_screen_mut();
                screen.carriage_return();
                screen.cursor_up(n);
            }
            ('G', false) | ('`', false) => self.active_screen_mut().set_cursor_x(param(&raw, 0, 1)),
            ('H', false) | ('f', false) => {
                self.active_screen_mut().set_cursor_yx(param(&raw, 0, 1), param(&raw, 1, 1));
            }
            ('d', false) => self.active_screen_mut().set_cursor_y(param(&raw, 0, 1)),
            ('J', false) => match param(&raw, 0, 0) {
                0 => self.active_screen_mut().clear_to_end_of_screen(),
                1 => self.active_screen_mut().clear_to_begin_of_screen(),
                2 => self.active_screen_mut().clear_entire_screen(),
                3 => self.active_screen_mut().clear_scrollback(),
                _ => {}
            },
            ('K', false) => match param(&raw, 0, 0) {
                0 => self.active_screen_mut().clear_to_end_of_line(),
                1 => self.active_screen_mut().clear_to_begin_of_line(),
                2 => self.active_screen_mut().clear_entire_line(),
                _ => {}
            },
            ('L', false) => self.active_screen_mut().insert_lines(param(&raw, 0, 1)),
            ('M', false) => self.active_screen_mut().delete_lines(param(&raw, 0, 1)),
            ('P', false) => self.active_screen_mut().delete_chars(param(&raw, 0, 1)),
            ('@', false) => self.active_screen_mut().insert_chars(param(&raw, 0, 1)),
            ('X', false) => self.active_screen_mut().erase_chars(param(&raw, 0, 1)),
            ('S', false) => self.active_screen_mut().scroll_up(param(&raw, 0, 1)),
            ('T', false) => self.active_screen_mut().scroll_down(param(&raw, 0, 1)),
            ('b', false) => {
                let n = param(&raw, 0, 1);
                let c = self.last_printed_char;
                for _ in 0..n {
                    let translated = self.charset.translate(c as u16);
                    let (screen, ext) = self.active_screen_and_extended();
                    screen.display_character(translated, ext);
                }
            }
            ('g', false) => match param(&raw, 0, 0) {
                0 => self.active_screen_mut().clear_tab_stop_here(),
                3 => self.active_screen_mut().clear_all_tab_stops(),
                _ => {}
            },
            ('m', false) => self.handle_sgr(&raw),
            ('r', false) => {
                let top = param(&raw, 0, 1).saturating_sub(1);
                let default_bottom = self.active_screen().line_count();
                let bottom = param(&raw, 1, default_bottom).saturating_sub(1);
                self.active_screen_mut().set_margins(top, bottom);
                self.active_screen_mut().set_cursor_yx(1, 1);
            }
            ('h', true) => self.set_dec_mode(&raw, true),
            ('l', true) => self.set_dec_mode(&raw, false),
            ('h', false) => self.set_ansi_mode(&raw, true),
            ('l', false) => self.set_ansi_mode(&raw, false),
            ('n', false) => self.report_dsr(param(&raw, 0, 0)),
            ('c', false) => {
                if param(&raw, 0, 0) == 0 {
                    self.report_primary_da();
                }
            }
            ('s', false) => self.active_screen_mut().save_cursor(),
            ('u', false) => self.active_screen_mut().restore_cursor(),
            _ => {}
        }
    }

    fn osc_dispatch(&mut self, params: &[&[u8]], _bell_terminated: bool) {
        let Some(first) = params.first() else { return };
        let Ok(n) = std::str::from_utf8(first).unwrap_or("").parse::<u16>() else { return };
        let text = params.get(1).map(|p| String::from_utf8_lossy(p).to_string()).unwrap_or_default();
        if text == "?" {
            return;
        }
        self.pending_osc.insert(n, (Instant::now(), text));
    }

    fn esc_dispatch(&mut self, intermediates: &[u8], _ignore: bool, byte: u8) {
        match (byte, intermediates) {
            (b'c', []) => self.reset(),
            (b'D', []) => {
                self.active_screen_mut().index();
            }
            (b'E', []) => {
                self.active_screen_mut().next_line();
            }
            (b'H', []) => self.active_screen_mut().set_tab_stop_here(),
            (b'M', []) => self.active_screen_mut().reverse_index(),
            (b'7', []) => {
                self.active_screen_mut().save_cursor();
                self.charset.save();
            }
            (b'8', []) => {
                self.active_screen_mut().restore_cursor();
                self.charset.restore();
            }
            (b'=', []) => self.application_keypad = true,
            (b'>', []) => self.application_keypad = false,
            (b'<', []) => self.ansi_mode = true,
            (b'8', [b'#']) => self.align_screen(),
            (byte, [b'(']) => self.designate_charset(0, byte),
            (byte, [b')']) => self.designate_charset(1, byte),
            (byte, [b'*']) => self.designate_charset(2, byte),
            (byte, [b'+']) => self.designate_charset(3, byte),
            _ => {}
        }
    }

    /// DCS is not in the parser-states this component names (§4.3); any
    /// sequence `vte` routes here is silently discarded, per the unknown-
    /// sequence policy.
    fn hook(&mut self, _params: &vte::Params, _intermediates: &[u8], _ignore: bool, _action: char) {}
    fn put(&mut self, _byte: u8) {}
    fn unhook(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_emulation() -> Emulation {
        Emulation::new(24, 80, EmulationConfig::default()).unwrap()
    }

    #[test]
    fn plain_text_is_written_through_vte() {
        let mut emu = new_emulation();
        emu.on_receive_block(b"hello");
        assert_eq!(emu.active_screen().cell(0, 0).code_point, b'h' as u16);
        assert_eq!(emu.active_screen().cursor_x(), 5);
    }

    #[test]
    fn cup_moves_cursor() {
        let mut emu = new_emulation();
        emu.on_receive_block(b"\x1b[10;5H");
        assert_eq!((emu.active_screen().cursor_x(), emu.active_screen().cursor_y()), (4, 9));
    }

    #[test]
    fn alt_screen_round_trip_preserves_primary() {
        let mut emu = new_emulation();
        emu.on_receive_block(b"ABC");
        emu.on_receive_block(b"\x1b[?1049h");
        assert!(emu.using_alt);
        emu.on_receive_block(b"XYZ");
        emu.on_receive_block(b"\x1b[?1049l");
        assert!(!emu.using_alt);
        assert_eq!(emu.active_screen().cell(0, 0).code_point, b'A' as u16);
        assert_eq!(emu.active_screen().cursor_x(), 3);
    }

    #[test]
    fn cursor_position_report_replies_exactly() {
        let mut emu = new_emulation();
        emu.on_receive_block(b"\x1b[H\x1b[6n");
        assert_eq!(emu.pending_responses, vec![b"\x1b[1;1R".to_vec()]);
    }

    #[test]
    fn primary_da_replies_per_interface_contract() {
        let mut emu = new_emulation();
        emu.on_receive_block(b"\x1b[c");
        assert_eq!(emu.pending_responses, vec![b"\x1b[?1;2c".to_vec()]);
    }

    #[test]
    fn sgr_24bit_colour_persists_on_cell() {
        let mut emu = new_emulation();
        emu.on_receive_block(b"\x1b[38;2;10;20;30mX");
        assert_eq!(emu.active_screen().cell(0, 0).fg, Color::Rgb(10, 20, 30));
    }

    #[test]
    fn vt52_mode_switches_and_moves_cursor() {
        let mut emu = new_emulation();
        emu.on_receive_block(b"\x1b[?2l");
        assert!(!emu.ansi_mode());
        emu.on_receive_block(b"\x1bA");
        assert_eq!(emu.active_screen().cursor_y(), 0);
        emu.on_receive_block(b"\x1b<");
        assert!(emu.ansi_mode());
    }

    #[test]
    fn zmodem_signature_queues_event() {
        let mut emu = new_emulation();
        emu.on_receive_block(b"\x18B00");
        assert_eq!(emu.pending_events.len(), 1);
    }

    #[test]
    fn mouse_event_is_silent_without_a_reporting_mode() {
        let mut emu = new_emulation();
        emu.mouse_event(0, 0, 0, MouseEventKind::Press);
        assert!(emu.pending_responses.is_empty());
    }

    #[test]
    fn mouse_event_encodes_press_under_tracking_mode() {
        let mut emu = new_emulation();
        emu.on_receive_block(b"\x1b[?1000h");
        emu.mouse_event(0, 4, 2, MouseEventKind::Press);
        assert_eq!(emu.pending_responses, vec![vec![0x1b, b'[', b'M', 32, 32 + 5, 32 + 3]]);
    }

    #[test]
    fn mouse_event_drag_requires_motion_mode() {
        let mut emu = new_emulation();
        emu.on_receive_block(b"\x1b[?1000h");
        emu.mouse_event(0, 0, 0, MouseEventKind::Drag);
        assert!(emu.pending_responses.is_empty());

        emu.on_receive_block(b"\x1b[?1002h");
        emu.mouse_event(0, 0, 0, MouseEventKind::Drag);
        assert_eq!(emu.pending_responses, vec![vec![0x1b, b'[', b'M', 32, 33, 33]]);
    }

    #[test]
    fn mouse_event_release_always_reports_button_code_three() {
        let mut emu = new_emulation();
        emu.on_receive_block(b"\x1b[?1000h");
        emu.mouse_event(1, 0, 0, MouseEventKind::Release);
        assert_eq!(emu.pending_responses, vec![vec![0x1b, b'[', b'M', 32 + 3, 33, 33]]);
    }

    #[test]
    fn dec_scnm_swaps_effective_colours_globally() {
        let mut emu = new_emulation();
        emu.on_receive_block(b"\x1b[38;2;10;20;30m");
        let (fg, bg, _) = emu.active_screen().effective_rendition();
        assert_eq!((fg, bg), (Color::Rgb(10, 20, 30), Color::Default));

        emu.on_receive_block(b"\x1b[?5h");
        let (fg, bg, _) = emu.active_screen().effective_rendition();
        assert_eq!((fg, bg), (Color::Default, Color::Rgb(10, 20, 30)));

        emu.on_receive_block(b"\x1b[?5l");
        let (fg, bg, _) = emu.active_screen().effective_rendition();
        assert_eq!((fg, bg), (Color::Rgb(10, 20, 30), Color::Default));
    }
}
