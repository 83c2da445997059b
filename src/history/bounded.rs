//! Bounded history: a ring of at most N lines backed by the page-block
//! arena (§3.7/§4.1), one `CompactHistoryLine` analog per stored line.

use std::collections::VecDeque;

use crate::cell::{CharacterCell, Rendition};
use crate::color::Color;

use super::arena::{BlockArena, Handle};

#[derive(Clone, Copy)]
struct FormatRun {
    start_col: u16,
    fg: Color,
    bg: Color,
    rendition: Rendition,
    real: bool,
}

fn color_tag(c: Color) -> (u8, u8, u8, u8) {
    match c {
        Color::Default => (0, 0, 0, 0),
        Color::Indexed(i) => (1, i, 0, 0),
        Color::Rgb(r, g, b) => (2, r, g, b),
    }
}

fn color_from_tag(tag: u8, a: u8, b: u8, c: u8) -> Color {
    match tag {
        1 => Color::Indexed(a),
        2 => Color::Rgb(a, b, c),
        _ => Color::Default,
    }
}

const RUN_SIZE: usize = 12;

fn encode_run(run: &FormatRun, out: &mut Vec<u8>) {
    out.extend_from_slice(&run.start_col.to_le_bytes());
    let (fg_tag, fg0, fg1, fg2) = color_tag(run.fg);
    out.push(fg_tag);
    out.extend_from_slice(&[fg0, fg1, fg2]);
    let (bg_tag, bg0, bg1, bg2) = color_tag(run.bg);
    out.push(bg_tag);
    out.extend_from_slice(&[bg0, bg1, bg2]);
    out.push(run.rendition.bits());
    out.push(run.real as u8);
}

fn decode_run(bytes: &[u8]) -> FormatRun {
    let start_col = u16::from_le_bytes([bytes[0], bytes[1]]);
    let fg = color_from_tag(bytes[2], bytes[3], bytes[4], bytes[5]);
    let bg = color_from_tag(bytes[6], bytes[7], bytes[8], bytes[9]);
    let rendition = Rendition::from_bits_truncate(bytes[10]);
    let real = bytes[11] != 0;
    FormatRun {
        start_col,
        fg,
        bg,
        rendition,
        real,
    }
}

fn compress_runs(cells: &[CharacterCell]) -> Vec<FormatRun> {
    let mut runs: Vec<FormatRun> = Vec::new();
    for (i, cell) in cells.iter().enumerate() {
        let continues = matches!(
            runs.last(),
            Some(r) if r.fg == cell.fg && r.bg == cell.bg && r.rendition == cell.rendition && r.real == cell.real
        );
        if !continues {
            runs.push(FormatRun {
                start_col: i as u16,
                fg: cell.fg,
                bg: cell.bg,
                rendition: cell.rendition,
                real: cell.real,
            });
        }
    }
    runs
}

fn run_for_col(runs: &[FormatRun], col: usize) -> FormatRun {
    let mut current = runs.first().copied().unwrap_or(FormatRun {
        start_col: 0,
        fg: Color::Default,
        bg: Color::Default,
        rendition: Rendition::empty(),
        real: true,
    });
    for run in runs {
        if run.start_col as usize <= col {
            current = *run;
        } else {
            break;
        }
    }
    current
}

struct StoredLine {
    text: Handle,
    runs: Handle,
    length: u16,
    wrapped: bool,
}

pub struct BoundedHistory {
    max_lines: usize,
    lines: VecDeque<StoredLine>,
    arena: BlockArena,
    dropped: u64,
}

impl BoundedHistory {
    pub fn new(max_lines: usize) -> Self {
        Self {
            max_lines: max_lines.max(1),
            lines: VecDeque::new(),
            arena: BlockArena::new(),
            dropped: 0,
        }
    }

    pub fn append_line(&mut self, cells: &[CharacterCell], wrapped: bool) {
        let mut text_bytes = Vec::with_capacity(cells.len() * 2);
        for cell in cells {
            text_bytes.extend_from_slice(&cell.code_point.to_le_bytes());
        }
        let runs = compress_runs(cells);
        let mut run_bytes = Vec::with_capacity(runs.len() * RUN_SIZE);
        for run in &runs {
            encode_run(run, &mut run_bytes);
        }

        let text_handle = self.arena.alloc(&text_bytes);
        let runs_handle = self.arena.alloc(&run_bytes);

        self.lines.push_back(StoredLine {
            text: text_handle,
            runs: runs_handle,
            length: cells.len() as u16,
            wrapped,
        });

        while self.lines.len() > self.max_lines {
            let dropped = self.lines.pop_front().unwrap();
            self.arena.release(dropped.text);
            self.arena.release(dropped.runs);
            self.dropped += 1;
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    pub fn line_length(&self, index: usize) -> usize {
        self.lines.get(index).map(|l| l.length as usize).unwrap_or(0)
    }

    pub fn is_wrapped(&self, index: usize) -> bool {
        self.lines.get(index).map(|l| l.wrapped).unwrap_or(false)
    }

    pub fn read_cells(&self, index: usize, col: usize, count: usize, out: &mut [CharacterCell]) -> usize {
        let Some(line) = self.lines.get(index) else {
            return 0;
        };
        let text_bytes = self.arena.read(line.text);
        let run_bytes = self.arena.read(line.runs);
        let runs: Vec<FormatRun> = run_bytes.chunks_exact(RUN_SIZE).map(decode_run).collect();

        let n = count.min(out.len()).min((line.length as usize).saturating_sub(col));
        for i in 0..n {
            let c = col + i;
            let code_point = u16::from_le_bytes([text_bytes[c * 2], text_bytes[c * 2 + 1]]);
            let run = run_for_col(&runs, c);
            out[i] = CharacterCell {
                code_point,
                fg: run.fg,
                bg: run.bg,
                rendition: run.rendition,
                real: run.real,
            };
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
    fn overflow_drops_oldest_lines() {
        let mut history = BoundedHistory::new(3);
        for n in 0..5u16 {
            let text = format!("line{n}");
            let cells: Vec<_> = text.chars().map(cell).collect();
            history.append_line(&cells, false);
        }
        assert_eq!(history.line_count(), 3);
        assert_eq!(history.dropped_count(), 2);

        let mut out = vec![CharacterCell::default(); 5];
        let n = history.read_cells(0, 0, 5, &mut out);
        let text: String = out[..n].iter().map(|c| c.code_point as u8 as char).collect();
        assert_eq!(text, "line2");
    }

    #[test]
    fn format_runs_round_trip() {
        let mut history = BoundedHistory::new(10);
        let mut cells = vec![cell('a'), cell('b')];
        cells[1].rendition = Rendition::BOLD;
        history.append_line(&cells, false);

        let mut out = vec![CharacterCell::default(); 2];
        history.read_cells(0, 0, 2, &mut out);
        assert_eq!(out[0].rendition, Rendition::empty());
        assert_eq!(out[1].rendition, Rendition::BOLD);
    }
}
