//! Line (§3.2): a variable-length row of cells plus a line-property bitset.

use bitflags::bitflags;

use crate::cell::CharacterCell;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct LineFlags: u8 {
        /// Logical line continues on the next row.
        const WRAPPED        = 1 << 0;
        const DOUBLE_WIDTH   = 1 << 1;
        const DOUBLE_HEIGHT  = 1 << 2;
    }
}

/// A row of cells. May hold fewer than `columns` entries -- cells past the
/// stored length are logically the default (blank) cell, per §3.2, so a
/// line that has never been written past column 10 doesn't pay for 80
/// blank cells.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Line {
    cells: Vec<CharacterCell>,
    pub flags: LineFlags,
}

impl Line {
    pub fn new() -> Self {
        Self {
            cells: Vec::new(),
            flags: LineFlags::empty(),
        }
    }

    pub fn with_capacity(columns: usize) -> Self {
        Self {
            cells: Vec::with_capacity(columns),
            flags: LineFlags::empty(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn is_wrapped(&self) -> bool {
        self.flags.contains(LineFlags::WRAPPED)
    }

    /// Read the cell at `col`, synthesizing the default cell past the
    /// stored length instead of requiring every line to be fully padded.
    pub fn cell(&self, col: usize) -> CharacterCell {
        self.cells.get(col).copied().unwrap_or_default()
    }

    /// Write the cell at `col`, growing the backing vector with default
    /// cells if `col` is past the current length.
    pub fn set_cell(&mut self, col: usize, cell: CharacterCell) {
        if col >= self.cells.len() {
            self.cells.resize(col + 1, CharacterCell::default());
        }
        self.cells[col] = cell.storable();
    }

    /// Truncate to `len` cells, or pad with default cells to reach it.
    /// Used by clear operations that want an exact-width blank line; plain
    /// erase/edit operations should prefer `set_cell`/`splice` so that
    /// shrink-then-grow preserves untouched trailing content (§4.2 Resizing).
    pub fn resize_exact(&mut self, len: usize, fill: CharacterCell) {
        self.cells.resize(len, fill);
    }

    pub fn truncate(&mut self, len: usize) {
        self.cells.truncate(len);
    }

    pub fn clear_to(&mut self, fill: CharacterCell) {
        self.cells.clear();
        self.flags = LineFlags::empty();
        let _ = fill;
    }

    pub fn cells(&self) -> &[CharacterCell] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut Vec<CharacterCell> {
        &mut self.cells
    }

    /// Plain text of the line, honoring §4.2 `selected_text`'s rules about
    /// trailing whitespace only when the caller (Screen) asks for it --
    /// this helper always returns the full stored text, untrimmed.
    pub fn text(&self) -> String {
        let mut s = String::with_capacity(self.cells.len());
        for cell in &self.cells {
            if cell.real {
                match char::from_u32(cell.code_point as u32) {
                    Some(c) if cell.code_point >= 0x20 => s.push(c),
                    _ => s.push(' '),
                }
            }
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_past_length_is_default() {
        let line = Line::new();
        assert_eq!(line.cell(5), CharacterCell::default());
    }

    #[test]
    fn set_cell_grows_backing_storage() {
        let mut line = Line::new();
        line.set_cell(3, CharacterCell::new(b'x' as u16, Default::default(), Default::default(), Default::default()));
        assert_eq!(line.len(), 4);
        assert_eq!(line.cell(0), CharacterCell::default());
        assert_eq!(line.cell(3).code_point, b'x' as u16);
    }
}
