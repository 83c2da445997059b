//! CharacterCell (§3.1): the grid's POD value type.

use bitflags::bitflags;

use crate::color::Color;

bitflags! {
    /// Per-cell rendition bits. No DIM/ITALIC/HIDDEN/STRIKETHROUGH cosmetic
    /// hints here -- CURSOR and EXTENDED are structural rather than
    /// cosmetic, so they live in the same bitset as the semantic ones.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Rendition: u8 {
        const BOLD      = 1 << 0;
        const BLINK     = 1 << 1;
        const UNDERLINE = 1 << 2;
        const REVERSE   = 1 << 3;
        /// Transient: set only in a frame copied out by ScreenWindow::get_image,
        /// never stored on a Screen's own line array.
        const CURSOR    = 1 << 4;
        /// The cell's code_point field is a hash key into the extended-char
        /// table (§3.6) rather than a literal code point.
        const EXTENDED  = 1 << 5;
    }
}

/// One grid cell.
///
/// Equality (§3.1) covers exactly the four semantic fields -- code point,
/// fg, bg, rendition -- and explicitly ignores `real` and the transient
/// `CURSOR` bit, so `#[derive(PartialEq)]` is wrong here.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CharacterCell {
    pub code_point: u16,
    pub fg: Color,
    pub bg: Color,
    pub rendition: Rendition,
    /// False for the trailing placeholder cell of a wide (East-Asian-width
    /// 2) character.
    pub real: bool,
}

impl CharacterCell {
    pub const SPACE: u16 = 0x20;

    pub fn new(code_point: u16, fg: Color, bg: Color, rendition: Rendition) -> Self {
        Self {
            code_point,
            fg,
            bg,
            rendition,
            real: true,
        }
    }

    /// The trailing placeholder occupying the second column of a wide
    /// character, per §4.2 "Character display" step 4.
    pub fn wide_placeholder(fg: Color, bg: Color, rendition: Rendition) -> Self {
        Self {
            code_point: 0,
            fg,
            bg,
            rendition,
            real: false,
        }
    }

    /// The blank cell used by erase/clear operations: space character with
    /// the given colours and *default* rendition (§4.2 "Clearing").
    pub fn blank(fg: Color, bg: Color) -> Self {
        Self {
            code_point: Self::SPACE,
            fg,
            bg,
            rendition: Rendition::empty(),
            real: true,
        }
    }

    /// Rendition with the transient CURSOR bit cleared, as required before
    /// the cell is stored in a Screen's own line array.
    pub fn storable(mut self) -> Self {
        self.rendition.remove(Rendition::CURSOR);
        self
    }
}

impl Default for CharacterCell {
    fn default() -> Self {
        Self::blank(Color::Default, Color::Default)
    }
}

impl PartialEq for CharacterCell {
    fn eq(&self, other: &Self) -> bool {
        self.code_point == other.code_point
            && self.fg == other.fg
            && self.bg == other.bg
            && self.rendition.difference(Rendition::CURSOR) == other.rendition.difference(Rendition::CURSOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_real_and_cursor() {
        let mut a = CharacterCell::new(b'x' as u16, Color::Default, Color::Default, Rendition::empty());
        a.real = false;
        let mut b = CharacterCell::new(b'x' as u16, Color::Default, Color::Default, Rendition::CURSOR);
        b.real = true;
        assert_eq!(a, b);
    }

    #[test]
    fn differing_rendition_is_unequal() {
        let a = CharacterCell::new(b'x' as u16, Color::Default, Color::Default, Rendition::empty());
        let b = CharacterCell::new(b'x' as u16, Color::Default, Color::Default, Rendition::BOLD);
        assert_ne!(a, b);
    }

    #[test]
    fn storable_clears_cursor_bit() {
        let cell = CharacterCell::new(b'x' as u16, Color::Default, Color::Default, Rendition::CURSOR | Rendition::BOLD);
        let stored = cell.storable();
        assert!(!stored.rendition.contains(Rendition::CURSOR));
        assert!(stored.rendition.contains(Rendition::BOLD));
    }
}
