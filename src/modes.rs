//! Screen-owned mode flags (§3.4): ORIGIN, WRAP, INSERT, SCREEN, CURSOR,
//! NEWLINE, each with a current and saved value. Emulation-level modes
//! (application keypad, mouse reporting, ANSI/VT52) live on `Emulation`
//! instead -- they aren't part of a Screen's own state.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ScreenMode: u8 {
        /// DECOM: cursor addressing relative to the scroll region.
        const ORIGIN  = 1 << 0;
        /// DECAWM: auto-wrap at the right margin.
        const WRAP    = 1 << 1;
        /// IRM: insert rather than overwrite.
        const INSERT  = 1 << 2;
        /// DECSCNM: inverse video for the whole screen.
        const SCREEN  = 1 << 3;
        /// DECTCEM: text cursor visible.
        const CURSOR  = 1 << 4;
        /// LNM: linefeed also returns to column 0.
        const NEWLINE = 1 << 5;
    }
}

#[derive(Debug, Clone)]
pub struct ScreenModes {
    current: ScreenMode,
    saved: ScreenMode,
}

impl Default for ScreenModes {
    fn default() -> Self {
        let defaults = ScreenMode::WRAP | ScreenMode::CURSOR;
        Self {
            current: defaults,
            saved: defaults,
        }
    }
}

impl ScreenModes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self, mode: ScreenMode) -> bool {
        self.current.contains(mode)
    }

    pub fn set(&mut self, mode: ScreenMode) {
        self.current.insert(mode);
    }

    pub fn reset(&mut self, mode: ScreenMode) {
        self.current.remove(mode);
    }

    /// Swap the current value of a single mode bit into its saved slot,
    /// leaving every other bit's saved value untouched (Konsole's
    /// `saveMode(int)` takes one mode index, not a bulk snapshot).
    pub fn save(&mut self, mode: ScreenMode) {
        self.saved.set(mode, self.current.contains(mode));
    }

    pub fn restore(&mut self, mode: ScreenMode) {
        self.current.set(mode, self.saved.contains(mode));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_restore_round_trips_single_mode() {
        let mut modes = ScreenModes::new();
        modes.save(ScreenMode::ORIGIN);
        modes.set(ScreenMode::ORIGIN);
        assert!(modes.is_set(ScreenMode::ORIGIN));
        modes.restore(ScreenMode::ORIGIN);
        assert!(!modes.is_set(ScreenMode::ORIGIN));
    }

    #[test]
    fn save_restore_does_not_disturb_other_modes() {
        let mut modes = ScreenModes::new();
        modes.set(ScreenMode::INSERT);
        modes.save(ScreenMode::ORIGIN);
        modes.restore(ScreenMode::ORIGIN);
        assert!(modes.is_set(ScreenMode::INSERT));
    }
}
