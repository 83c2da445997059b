//! Extended-character table (§3.6): combining sequences and characters
//! outside the BMP are stored out-of-line, keyed by a 16-bit hash that lives
//! in the cell's code-point field alongside the `EXTENDED` rendition bit.
//!
//! Grounded on Konsole's `ExtendedCharTable`: a fixed-size table probed
//! linearly on hash collision. The table is owned by one `Emulation` and
//! shared by reference across its Screens and ScreenWindows, never by a
//! pointer graph.

const TABLE_SIZE: usize = 1 << 16;

pub struct ExtendedCharTable {
    entries: Vec<Option<Box<[char]>>>,
}

impl ExtendedCharTable {
    pub fn new() -> Self {
        Self {
            entries: vec![None; TABLE_SIZE],
        }
    }

    fn hash(seq: &[char]) -> usize {
        let mut h: u32 = 5381;
        for &c in seq {
            h = h.wrapping_mul(33).wrapping_add(c as u32);
        }
        h as usize % TABLE_SIZE
    }

    /// Intern `seq`, returning the 16-bit key to store in a cell's code-point
    /// field. Re-interning an identical sequence returns the same key.
    pub fn create_extended_char(&mut self, seq: &[char]) -> u16 {
        let start = Self::hash(seq);
        for probe in 0..TABLE_SIZE {
            let idx = (start + probe) % TABLE_SIZE;
            match &self.entries[idx] {
                Some(existing) if existing.as_ref() == seq => return idx as u16,
                None => {
                    self.entries[idx] = Some(seq.to_vec().into_boxed_slice());
                    return idx as u16;
                }
                Some(_) => continue,
            }
        }
        // Table exhausted: every slot collided and holds a different sequence.
        // Overwrite the home slot rather than block the stream (durability,
        // per §7 -- losing one rare combining sequence beats a panic).
        self.entries[start] = Some(seq.to_vec().into_boxed_slice());
        start as u16
    }

    pub fn lookup_extended_char(&self, key: u16) -> &[char] {
        self.entries[key as usize].as_deref().unwrap_or(&[])
    }

    /// Drop all entries. Called on `Emulation::reset`; §5 allows the table
    /// to be freed on reset or explicit GC rather than tracking per-entry
    /// liveness across Screens/ScreenWindows.
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            *entry = None;
        }
    }
}

impl Default for ExtendedCharTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotent_round_trip() {
        let mut table = ExtendedCharTable::new();
        let seq = ['e', '\u{0301}'];
        let key = table.create_extended_char(&seq);
        assert_eq!(table.lookup_extended_char(key), &seq[..]);
    }

    #[test]
    fn reinterning_returns_same_key() {
        let mut table = ExtendedCharTable::new();
        let seq = ['a', '\u{0300}'];
        let k1 = table.create_extended_char(&seq);
        let k2 = table.create_extended_char(&seq);
        assert_eq!(k1, k2);
    }

    #[test]
    fn distinct_sequences_get_distinct_keys() {
        let mut table = ExtendedCharTable::new();
        let a = table.create_extended_char(&['a', '\u{0301}']);
        let b = table.create_extended_char(&['b', '\u{0301}']);
        assert_ne!(a, b);
    }

    #[test]
    fn clear_drops_entries() {
        let mut table = ExtendedCharTable::new();
        let seq = ['x', '\u{0302}'];
        let key = table.create_extended_char(&seq);
        table.clear();
        assert!(table.lookup_extended_char(key).is_empty());
    }
}
