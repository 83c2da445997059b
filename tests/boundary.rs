//! End-to-end scenarios: feed a byte sequence, read back the observable
//! state through the public API only.

use vtcore::{
    ByteSink, Color, Emulation, EmulationConfig, LineFlags, SessionAttributeListener, Target,
};

#[derive(Default)]
struct RecordingSink {
    sent: Vec<u8>,
}

impl ByteSink for RecordingSink {
    fn send_block(&mut self, bytes: &[u8]) {
        self.sent.extend_from_slice(bytes);
    }
}

struct NullListener;
impl SessionAttributeListener for NullListener {}

fn emulation(lines: u16, columns: u16) -> Emulation {
    Emulation::new(lines, columns, EmulationConfig::default()).unwrap()
}

#[test]
fn line_drawing_charset_maps_q_to_horizontal_line_then_restores_ascii() {
    let mut emu = emulation(24, 80);
    emu.on_receive_block(b"\x1b(0qqq\x1b(BA");
    let screen = emu.screen(Target::Primary);
    for x in 0..3 {
        assert_eq!(screen.cell(x, 0).code_point, 0x2500);
    }
    assert_eq!(screen.cell(3, 0).code_point, b' ' as u16);
    assert_eq!(screen.cell(4, 0).code_point, b'A' as u16);
}

#[test]
fn scroll_region_and_index_shift_only_the_region() {
    let mut emu = emulation(24, 80);
    emu.on_receive_block(b"\x1b[2;4r\x1b[4;1HX\nY");
    let screen = emu.screen(Target::Primary);
    // LNM is off by default, so the bare \n indexes without a carriage
    // return; the cursor sits at column 1 (after printing X) when Y lands.
    assert_eq!(screen.cell(1, 3).code_point, b'Y' as u16);
    assert_eq!(screen.cell(0, 2).code_point, b'X' as u16);
    assert_eq!(screen.cell(0, 0).code_point, b' ' as u16);
    assert_eq!(screen.cell(0, 4).code_point, b' ' as u16);
}

#[test]
fn wrap_at_margin_sets_wrapped_flag_and_continues_on_next_line() {
    let mut emu = emulation(24, 5);
    emu.on_receive_block(b"12345");
    emu.on_receive_block(b"6");
    let screen = emu.screen(Target::Primary);
    assert!(screen.line_flags(0).contains(LineFlags::WRAPPED));
    assert_eq!(screen.cell(0, 1).code_point, b'6' as u16);
    assert_eq!((screen.cursor_x(), screen.cursor_y()), (1, 1));
}

#[test]
fn sgr_24_bit_colour_persists_across_subsequent_cells() {
    let mut emu = emulation(24, 80);
    emu.on_receive_block(b"\x1b[38;2;10;20;30mXY");
    let screen = emu.screen(Target::Primary);
    assert_eq!(screen.cell(0, 0).fg, Color::Rgb(10, 20, 30));
    assert_eq!(screen.cell(1, 0).fg, Color::Rgb(10, 20, 30));
}

#[test]
fn alternate_screen_round_trip_leaves_primary_untouched() {
    let mut emu = emulation(24, 80);
    emu.on_receive_block(b"\x1b[?1049hABC\x1b[?1049l");
    assert_eq!(emu.screen(Target::Primary).cell(0, 0).code_point, b' ' as u16);
    assert_eq!(emu.screen_mut(Target::Primary).history_line_count(), 0);
}

#[test]
fn cursor_position_report_replies_with_exactly_one_r_reply() {
    let mut emu = emulation(24, 80);
    emu.on_receive_block(b"\x1b[H\x1b[6n");
    let mut sink = RecordingSink::default();
    let mut listener = NullListener;
    emu.dispatch(&mut sink, &mut listener);
    assert_eq!(sink.sent, b"\x1b[1;1R".to_vec());
}
