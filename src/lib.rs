//! Escape-sequence decoder, screen model, and scrollback store for a
//! terminal emulator core.
//!
//! This crate owns everything between "bytes arrived from a PTY" and "a
//! display layer can read a rectangle of styled cells": VT100/VT52/xterm
//! decoding (`emulation`), the cell grid and its editing/scroll/selection
//! operations (`screen`), a resizable viewport onto that grid (`window`),
//! and pluggable scrollback storage (`history`). It does not open a PTY,
//! spawn a shell, or render to any surface -- those are the embedder's job,
//! reached through the `ByteSink`/`OutputListener`/`SessionAttributeListener`
//! traits in `events`.
//!
//! A minimal embedder loop looks like:
//!
//! ```
//! use vtcore::emulation::{Emulation, EmulationConfig};
//! use vtcore::window::Target;
//!
//! let mut emulation = Emulation::new(24, 80, EmulationConfig::default()).unwrap();
//! emulation.on_receive_block(b"hello, world\r\n");
//! let screen = emulation.screen(Target::Primary);
//! assert_eq!(screen.cell(0, 0).code_point, b'h' as u16);
//! ```

pub mod cell;
pub mod charset;
pub mod color;
pub mod emulation;
pub mod error;
pub mod events;
pub mod extended;
pub mod frame;
pub mod history;
pub mod line;
pub mod modes;
pub mod screen;
pub mod window;
pub mod zmodem;

pub use cell::{CharacterCell, Rendition};
pub use color::Color;
pub use emulation::{Emulation, EmulationConfig, MouseEventKind, MouseModes};
pub use error::HistoryError;
pub use events::{ByteSink, OutputListener, SessionAttributeListener, SessionState};
pub use extended::ExtendedCharTable;
pub use frame::{CursorRender, RenderFrame, RenderedLine, StyledSpan};
pub use history::{BoundedHistory, FileHistory, HistoryMode, HistoryStore};
pub use line::{Line, LineFlags};
pub use modes::{ScreenMode, ScreenModes};
pub use screen::Screen;
pub use window::{ScreenWindow, ScrollMode, Target};
