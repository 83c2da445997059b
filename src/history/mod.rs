//! History store (§3.7): a sum type over three interchangeable backends.
//!
//! A plain `enum` with match-based dispatch rather than a `dyn Trait` --
//! there are exactly three variants and they are known at compile time.

mod arena;
pub mod bounded;
pub mod file_backed;

use std::path::PathBuf;

use crate::cell::CharacterCell;
use crate::error::HistoryError;

pub use bounded::BoundedHistory;
pub use file_backed::FileHistory;

/// How a Screen's history should be provisioned. Built in code by the
/// embedder -- there is no file format for this, it's a constructor
/// argument (see `EmulationConfig`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryMode {
    None,
    Bounded(usize),
    File(PathBuf),
}

pub enum HistoryStore {
    None,
    Bounded(BoundedHistory),
    File(FileHistory),
}

impl HistoryStore {
    pub fn new(mode: &HistoryMode) -> Result<Self, HistoryError> {
        Ok(match mode {
            HistoryMode::None => HistoryStore::None,
            HistoryMode::Bounded(max) => HistoryStore::Bounded(BoundedHistory::new(*max)),
            HistoryMode::File(dir) => HistoryStore::File(FileHistory::create(dir)?),
        })
    }

    pub fn append_line(&mut self, cells: &[CharacterCell], wrapped: bool) -> Result<(), HistoryError> {
        match self {
            HistoryStore::None => Ok(()),
            HistoryStore::Bounded(store) => {
                store.append_line(cells, wrapped);
                Ok(())
            }
            HistoryStore::File(store) => store.append_line(cells, wrapped),
        }
    }

    pub fn line_count(&mut self) -> usize {
        match self {
            HistoryStore::None => 0,
            HistoryStore::Bounded(store) => store.line_count(),
            HistoryStore::File(store) => store.line_count(),
        }
    }

    pub fn line_length(&mut self, index: usize) -> usize {
        match self {
            HistoryStore::None => 0,
            HistoryStore::Bounded(store) => store.line_length(index),
            HistoryStore::File(store) => store.line_length(index),
        }
    }

    pub fn is_wrapped(&mut self, index: usize) -> bool {
        match self {
            HistoryStore::None => false,
            HistoryStore::Bounded(store) => store.is_wrapped(index),
            HistoryStore::File(store) => store.is_wrapped(index),
        }
    }

    pub fn read_cells(&mut self, index: usize, col: usize, count: usize, out: &mut [CharacterCell]) -> usize {
        match self {
            HistoryStore::None => 0,
            HistoryStore::Bounded(store) => store.read_cells(index, col, count, out),
            HistoryStore::File(store) => store.read_cells(index, col, count, out),
        }
    }

    pub fn dropped_count(&self) -> u64 {
        match self {
            HistoryStore::Bounded(store) => store.dropped_count(),
            _ => 0,
        }
    }

    pub fn is_none_variant(&self) -> bool {
        matches!(self, HistoryStore::None)
    }

    /// Refill this (freshly constructed, empty) store from `other`, line by
    /// line, preserving content across a backend switch (§4.1 "Switching
    /// variants preserves existing content").
    pub fn refill_from(&mut self, other: &mut HistoryStore) -> Result<(), HistoryError> {
        let count = other.line_count();
        let mut buf = Vec::new();
        for i in 0..count {
            let len = other.line_length(i);
            buf.clear();
            buf.resize(len, CharacterCell::default());
            other.read_cells(i, 0, len, &mut buf);
            self.append_line(&buf, other.is_wrapped(i))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Rendition;
    use crate::color::Color;

    fn cell(c: char) -> CharacterCell {
        CharacterCell::new(c as u16, Color::Default, Color::Default, Rendition::empty())
    }

    #[test]
    fn switching_none_to_bounded_to_file_preserves_content() {
        let mut store = HistoryStore::new(&HistoryMode::None).unwrap();
        store.append_line(&"ignored".chars().map(cell).collect::<Vec<_>>(), false).unwrap();
        assert_eq!(store.line_count(), 0);

        let mut bounded = HistoryStore::new(&HistoryMode::Bounded(100)).unwrap();
        bounded.refill_from(&mut store).unwrap();
        bounded.append_line(&"kept".chars().map(cell).collect::<Vec<_>>(), false).unwrap();
        assert_eq!(bounded.line_count(), 1);

        let dir = tempfile::tempdir().unwrap();
        let mut file = HistoryStore::new(&HistoryMode::File(dir.path().to_path_buf())).unwrap();
        file.refill_from(&mut bounded).unwrap();
        assert_eq!(file.line_count(), 1);

        let mut out = vec![CharacterCell::default(); 4];
        let n = file.read_cells(0, 0, 4, &mut out);
        let text: String = out[..n].iter().map(|c| c.code_point as u8 as char).collect();
        assert_eq!(text, "kept");
    }
}
