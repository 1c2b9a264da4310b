use std::collections::BTreeSet;

use tickets_tui::{
    error::FetchError,
    input::{Action, Command, InputMapper},
    loader::{self, TICKETS_URL},
    net::{Fetch, Request, Response},
    session::{INDEX_KEY, STUDIED_KEY},
    storage::{FileStore, KeyValueStore, MemoryStore},
    ticket::ANSWER_PLACEHOLDER,
};

const DECK: &str = r#"[{"Вопрос":"Q1","Ответ":"A1"},{"question":"Q2"}]"#;

struct Static(&'static str);

impl Fetch for Static {
    fn fetch(&self, _req: &Request) -> Result<Response, FetchError> {
        Ok(Response::new(
            200,
            Some("application/json".into()),
            self.0.as_bytes().to_vec(),
        ))
    }
}

#[test]
fn two_ticket_walkthrough() {
    let mut c = loader::load(&Static(DECK), TICKETS_URL, MemoryStore::new()).unwrap();
    assert_eq!(c.current_index(), 0);
    assert_eq!(c.view().counter, "1 / 2");
    assert_eq!(c.view().label, "Билет № 1");
    assert_eq!(c.view().question, "Q1");
    assert_eq!(c.view().remaining, 2);

    c.flip();
    assert!(c.is_flipped());
    assert_eq!(c.view().answer, "A1");
    assert_eq!(c.state().studied, BTreeSet::from([0]));
    assert_eq!(c.view().studied, 1);
    assert_eq!(c.view().remaining, 1);

    c.advance();
    assert_eq!(c.current_index(), 1);
    assert!(!c.is_flipped());
    // case-insensitive fallback
    assert_eq!(c.view().question, "Q2");
    assert_eq!(c.view().answer, ANSWER_PLACEHOLDER);
    assert!(c.view().answer_empty);
    assert_eq!(c.persistence().store().get(INDEX_KEY).unwrap().as_deref(), Some("1"));

    c.advance();
    assert_eq!(c.current_index(), 0);
    assert_eq!(c.view().counter, "1 / 2");

    // turning the card back never unmarks it
    c.flip();
    c.flip();
    assert!(!c.is_flipped());
    assert_eq!(c.state().studied, BTreeSet::from([0]));
}

#[test]
fn progress_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");

    let mut c = loader::load(&Static(DECK), TICKETS_URL, FileStore::open(&path).unwrap()).unwrap();
    c.flip();
    c.advance();
    drop(c);

    let store = FileStore::open(&path).unwrap();
    assert_eq!(store.get(STUDIED_KEY).unwrap().as_deref(), Some("[0]"));
    let c = loader::load(&Static(DECK), TICKETS_URL, store).unwrap();
    assert_eq!(c.current_index(), 1);
    assert_eq!(c.view().studied, 1);
    assert!(!c.is_flipped());
}

#[test]
fn keyboard_drives_the_deck() {
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    let mut c = loader::load(&Static(DECK), TICKETS_URL, MemoryStore::new()).unwrap();
    let input = InputMapper::default();
    for code in [KeyCode::Enter, KeyCode::Right, KeyCode::Char(' ')] {
        match input.on_key(KeyEvent::new(code, KeyModifiers::NONE)) {
            Some(Action::Card(cmd)) => c.apply(cmd),
            other => panic!("unexpected {other:?}"),
        }
    }
    assert_eq!(c.current_index(), 0);
    assert_eq!(c.view().studied, 1);
    c.apply(Command::Advance);
    assert_eq!(c.view().counter, "2 / 2");
}
