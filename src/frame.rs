//! Render-frame types consumed by the display layer (§4.4, §6.2).
//!
//! `get_image` writes raw cells into a caller-provided buffer.
//! `StyledSpan`/`coalesce_spans` is a convenience for consumers that want
//! pre-segmented runs instead of a flat cell array.

use crate::cell::{CharacterCell, Rendition};
use crate::color::Color;
use crate::line::LineFlags;

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorRender {
    pub row: u16,
    pub col: u16,
    pub visible: bool,
}

/// A contiguous run of cells sharing fg/bg/rendition, suitable for a text
/// layout pass without re-walking individual cells.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    pub text: String,
    pub fg: Color,
    pub bg: Color,
    pub bold: bool,
    pub blink: bool,
    pub underline: bool,
}

impl StyledSpan {
    fn from_cell(text: String, cell: &CharacterCell) -> Self {
        Self {
            text,
            fg: cell.fg,
            bg: cell.bg,
            bold: cell.rendition.contains(Rendition::BOLD),
            blink: cell.rendition.contains(Rendition::BLINK),
            underline: cell.rendition.contains(Rendition::UNDERLINE),
        }
    }
}

/// Coalesce a row of cells into style-uniform spans. Cells already carry
/// their *effective* fg/bg (REVERSE is resolved at write time by
/// `Screen::display_character`), so no further swap happens here.
pub fn coalesce_spans(cells: &[CharacterCell]) -> Vec<StyledSpan> {
    let mut spans: Vec<StyledSpan> = Vec::new();
    for cell in cells {
        if !cell.real {
            continue;
        }
        let ch = char::from_u32(cell.code_point as u32).unwrap_or(' ');
        let same_style = spans.last().is_some_and(|s: &StyledSpan| {
            s.fg == cell.fg
                && s.bg == cell.bg
                && s.bold == cell.rendition.contains(Rendition::BOLD)
                && s.blink == cell.rendition.contains(Rendition::BLINK)
                && s.underline == cell.rendition.contains(Rendition::UNDERLINE)
        });
        if same_style {
            spans.last_mut().unwrap().text.push(ch);
        } else {
            spans.push(StyledSpan::from_cell(ch.to_string(), cell));
        }
    }
    spans
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct RenderedLine {
    pub index: u16,
    pub flags: LineFlags,
    pub spans: Vec<StyledSpan>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct RenderFrame {
    pub visible_base_global: u64,
    pub visible_rows: u16,
    pub visible_cols: u16,
    pub lines: Vec<RenderedLine>,
    pub cursor: CursorRender,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(c: char, fg: Color, bg: Color) -> CharacterCell {
        CharacterCell::new(c as u16, fg, bg, Rendition::empty())
    }

    #[test]
    fn coalesces_runs_of_uniform_style() {
        let cells = vec![
            cell('a', Color::Default, Color::Default),
            cell('b', Color::Default, Color::Default),
            cell('c', Color::Indexed(1), Color::Default),
        ];
        let spans = coalesce_spans(&cells);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, "ab");
        assert_eq!(spans[1].text, "c");
    }

    #[test]
    fn placeholder_cells_are_skipped() {
        let mut wide = cell('\u{0}', Color::Default, Color::Default);
        wide.real = false;
        let cells = vec![cell('a', Color::Default, Color::Default), wide];
        let spans = coalesce_spans(&cells);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "a");
    }
}
