//! §8.4: history-store behaviour exercised through the public API only.

use vtcore::{CharacterCell, Color, HistoryMode, HistoryStore, Rendition};

fn line(text: &str) -> Vec<CharacterCell> {
    text.chars()
        .map(|c| CharacterCell::new(c as u16, Color::Default, Color::Default, Rendition::empty()))
        .collect()
}

fn line_text(store: &mut HistoryStore, index: usize) -> String {
    let len = store.line_length(index);
    let mut buf = vec![CharacterCell::default(); len];
    let n = store.read_cells(index, 0, len, &mut buf);
    buf[..n].iter().map(|c| c.code_point as u8 as char).collect()
}

#[test]
fn bounded_history_drops_oldest_lines_once_past_capacity() {
    let mut store = HistoryStore::new(&HistoryMode::Bounded(10)).unwrap();
    for n in 0..25 {
        store.append_line(&line(&format!("line{n}")), false).unwrap();
    }
    assert_eq!(store.line_count(), 10);
    assert_eq!(line_text(&mut store, 0), "line15");
}

#[test]
fn switching_backend_preserves_all_content() {
    let mut none_store = HistoryStore::new(&HistoryMode::None).unwrap();
    none_store.append_line(&line("discarded"), false).unwrap();
    assert_eq!(none_store.line_count(), 0);

    let mut bounded = HistoryStore::new(&HistoryMode::Bounded(100)).unwrap();
    bounded.refill_from(&mut none_store).unwrap();
    for n in 0..5 {
        bounded.append_line(&line(&format!("row{n}")), n % 2 == 0).unwrap();
    }
    assert_eq!(bounded.line_count(), 5);

    let dir = tempfile::tempdir().unwrap();
    let mut file = HistoryStore::new(&HistoryMode::File(dir.path().to_path_buf())).unwrap();
    file.refill_from(&mut bounded).unwrap();
    assert_eq!(file.line_count(), 5);
    for n in 0..5 {
        assert_eq!(line_text(&mut file, n), format!("row{n}"));
        assert_eq!(file.is_wrapped(n), n % 2 == 0);
    }
}
