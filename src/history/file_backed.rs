//! File-backed history: three growing blobs on disk (index offsets, cell
//! records, per-line flags), grounded on Konsole's `HistoryScrollFile` /
//! `HistoryFile`. Reads fall back to `mmap` once the read/write ratio
//! crosses a threshold, mirroring `HistoryFile::map()`'s
//! `_readWriteBalance` counter.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::cell::{CharacterCell, Rendition};
use crate::color::Color;
use crate::error::HistoryError;

const RECORD_SIZE: usize = 12;
/// Konsole's `HistoryFile::MAP_THRESHOLD`: consecutive reads without an
/// intervening write before the cells blob is memory-mapped.
const MAP_THRESHOLD: u32 = 1000;

fn encode_cell(cell: &CharacterCell, out: &mut Vec<u8>) {
    out.extend_from_slice(&cell.code_point.to_le_bytes());
    let (fg_tag, fg0, fg1, fg2) = match cell.fg {
        Color::Default => (0u8, 0u8, 0u8, 0u8),
        Color::Indexed(i) => (1, i, 0, 0),
        Color::Rgb(r, g, b) => (2, r, g, b),
    };
    out.push(fg_tag);
    out.extend_from_slice(&[fg0, fg1, fg2]);
    let (bg_tag, bg0, bg1, bg2) = match cell.bg {
        Color::Default => (0u8, 0u8, 0u8, 0u8),
        Color::Indexed(i) => (1, i, 0, 0),
        Color::Rgb(r, g, b) => (2, r, g, b),
    };
    out.push(bg_tag);
    out.extend_from_slice(&[bg0, bg1, bg2]);
    out.push(cell.rendition.bits());
    out.push(cell.real as u8);
}

fn decode_cell(bytes: &[u8]) -> CharacterCell {
    let code_point = u16::from_le_bytes([bytes[0], bytes[1]]);
    let fg = match bytes[2] {
        1 => Color::Indexed(bytes[3]),
        2 => Color::Rgb(bytes[3], bytes[4], bytes[5]),
        _ => Color::Default,
    };
    let bg = match bytes[6] {
        1 => Color::Indexed(bytes[7]),
        2 => Color::Rgb(bytes[7], bytes[8], bytes[9]),
        _ => Color::Default,
    };
    CharacterCell {
        code_point,
        fg,
        bg,
        rendition: Rendition::from_bits_truncate(bytes[10]),
        real: bytes[11] != 0,
    }
}

pub struct FileHistory {
    index_file: File,
    cells_file: File,
    flags_file: File,
    line_count: usize,
    total_cells: u64,
    reads_since_write: u32,
    mapped: Option<Mmap>,
}

impl FileHistory {
    /// Create the three backing files inside `dir` (created if missing).
    pub fn create(dir: &Path) -> Result<Self, HistoryError> {
        std::fs::create_dir_all(dir).map_err(|source| HistoryError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let open = |name: &str| -> Result<File, HistoryError> {
            let path = dir.join(name);
            OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)
                .map_err(|source| HistoryError::Io { path, source })
        };
        Ok(Self {
            index_file: open("index")?,
            cells_file: open("cells")?,
            flags_file: open("lineflags")?,
            line_count: 0,
            total_cells: 0,
            reads_since_write: 0,
            mapped: None,
        })
    }

    fn path_hint(&self) -> PathBuf {
        PathBuf::from("<history>")
    }

    pub fn append_line(&mut self, cells: &[CharacterCell], wrapped: bool) -> Result<(), HistoryError> {
        let mut buf = Vec::with_capacity(cells.len() * RECORD_SIZE);
        for cell in cells {
            encode_cell(cell, &mut buf);
        }
        self.cells_file
            .seek(SeekFrom::Start(self.total_cells * RECORD_SIZE as u64))
            .and_then(|_| self.cells_file.write_all(&buf))
            .map_err(|source| HistoryError::Io {
                path: self.path_hint(),
                source,
            })?;

        self.total_cells += cells.len() as u64;
        let end_offset = self.total_cells as i32;
        self.index_file
            .seek(SeekFrom::Start((self.line_count * 4) as u64))
            .and_then(|_| self.index_file.write_all(&end_offset.to_le_bytes()))
            .map_err(|source| HistoryError::Io {
                path: self.path_hint(),
                source,
            })?;

        self.flags_file
            .seek(SeekFrom::Start(self.line_count as u64))
            .and_then(|_| self.flags_file.write_all(&[wrapped as u8]))
            .map_err(|source| HistoryError::Io {
                path: self.path_hint(),
                source,
            })?;

        self.line_count += 1;
        // A write invalidates any existing mapping (§4.1 "a subsequent
        // write invalidates and removes the mapping").
        self.mapped = None;
        self.reads_since_write = 0;
        Ok(())
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    fn read_index_entry(&mut self, i: usize) -> i32 {
        let mut buf = [0u8; 4];
        if self
            .index_file
            .seek(SeekFrom::Start((i * 4) as u64))
            .and_then(|_| self.index_file.read_exact(&mut buf))
            .is_err()
        {
            return 0;
        }
        i32::from_le_bytes(buf)
    }

    /// Returns `(start_record, end_record)`, clamped to `(0, 0)` for a
    /// corrupt index entry (`offset > length`) per §4.1 failure semantics.
    fn line_bounds(&mut self, index: usize) -> (u64, u64) {
        if index >= self.line_count {
            return (0, 0);
        }
        let end = self.read_index_entry(index);
        let start = if index == 0 {
            0
        } else {
            self.read_index_entry(index - 1)
        };
        if start < 0 || end < 0 || start > end || end as u64 > self.total_cells {
            return (0, 0);
        }
        (start as u64, end as u64)
    }

    pub fn line_length(&mut self, index: usize) -> usize {
        let (start, end) = self.line_bounds(index);
        (end - start) as usize
    }

    pub fn is_wrapped(&mut self, index: usize) -> bool {
        if index >= self.line_count {
            return false;
        }
        let mut buf = [0u8; 1];
        let ok = self
            .flags_file
            .seek(SeekFrom::Start(index as u64))
            .and_then(|_| self.flags_file.read_exact(&mut buf))
            .is_ok();
        ok && buf[0] != 0
    }

    fn ensure_mapping(&mut self) -> Result<(), HistoryError> {
        if self.mapped.is_some() {
            return Ok(());
        }
        // Safety: single-threaded model (§5); no other writer can mutate
        // the file concurrently with this mapping's lifetime.
        let mmap = unsafe { Mmap::map(&self.cells_file) }.map_err(|source| HistoryError::Mmap {
            path: self.path_hint(),
            source,
        })?;
        self.mapped = Some(mmap);
        Ok(())
    }

    pub fn read_cells(
        &mut self,
        index: usize,
        col: usize,
        count: usize,
        out: &mut [CharacterCell],
    ) -> usize {
        let (start, end) = self.line_bounds(index);
        let line_len = (end - start) as usize;
        let n = count.min(out.len()).min(line_len.saturating_sub(col));
        if n == 0 {
            return 0;
        }
        let start_record = start + col as u64;

        self.reads_since_write = self.reads_since_write.saturating_add(1);
        if self.reads_since_write >= MAP_THRESHOLD && self.ensure_mapping().is_ok() {
            // mapped below
        }

        if let Some(mmap) = &self.mapped {
            let byte_start = start_record as usize * RECORD_SIZE;
            for i in 0..n {
                let off = byte_start + i * RECORD_SIZE;
                out[i] = decode_cell(&mmap[off..off + RECORD_SIZE]);
            }
            return n;
        }

        let mut buf = vec![0u8; n * RECORD_SIZE];
        if self
            .cells_file
            .seek(SeekFrom::Start(start_record * RECORD_SIZE as u64))
            .and_then(|_| self.cells_file.read_exact(&mut buf))
            .is_err()
        {
            return 0;
        }
        for i in 0..n {
            out[i] = decode_cell(&buf[i * RECORD_SIZE..(i + 1) * RECORD_SIZE]);
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(c: char) -> CharacterCell {
        CharacterCell::new(c as u16, Color::Default, Color::Default, Rendition::empty())
    }

    #[test]
    fn append_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = FileHistory::create(dir.path()).unwrap();
        let cells: Vec<_> = "hello".chars().map(cell).collect();
        history.append_line(&cells, false).unwrap();
        history.append_line(&"world".chars().map(cell).collect::<Vec<_>>(), true).unwrap();

        assert_eq!(history.line_count(), 2);
        assert_eq!(history.line_length(0), 5);
        assert!(history.is_wrapped(1));
        assert!(!history.is_wrapped(0));

        let mut out = vec![CharacterCell::default(); 5];
        let n = history.read_cells(1, 0, 5, &mut out);
        let text: String = out[..n].iter().map(|c| c.code_point as u8 as char).collect();
        assert_eq!(text, "world");
    }

    #[test]
    fn read_write_across_mmap_threshold_is_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = FileHistory::create(dir.path()).unwrap();
        history.append_line(&"abc".chars().map(cell).collect::<Vec<_>>(), false).unwrap();

        let mut before = vec![CharacterCell::default(); 3];
        history.read_cells(0, 0, 3, &mut before);

        for _ in 0..(MAP_THRESHOLD + 5) {
            let mut scratch = vec![CharacterCell::default(); 3];
            history.read_cells(0, 0, 3, &mut scratch);
        }
        assert!(history.mapped.is_some());

        let mut after = vec![CharacterCell::default(); 3];
        history.read_cells(0, 0, 3, &mut after);
        assert_eq!(before, after);
    }
}
