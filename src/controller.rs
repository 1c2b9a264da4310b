//! Display/session controller.
//!
//! Owns the ticket list, the [`SessionState`] and the flip flag, and keeps a
//! [`CardView`] in sync with them. Every transition persists through the
//! injected [`SessionStore`]; storage failures are logged and the transition
//! still completes.

use tracing::{debug, warn};

use crate::{
    input::Command,
    session::{SessionState, SessionStore},
    storage::KeyValueStore,
    ticket::{ResolvedTicket, Ticket},
};

/// Everything the screen shows for the current ticket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardView {
    pub label: String,
    pub question: String,
    pub answer: String,
    /// Set when the answer is missing and a placeholder is shown instead.
    pub answer_empty: bool,
    /// `"{position} / {total}"`.
    pub counter: String,
    /// Position through the deck, 0..=100.
    pub progress: f64,
    pub studied: usize,
    pub remaining: usize,
}

#[derive(Debug)]
pub struct Controller<S> {
    tickets: Vec<Ticket>,
    state: SessionState,
    flipped: bool,
    persistence: SessionStore<S>,
    view: CardView,
}

impl<S: KeyValueStore> Controller<S> {
    /// Builds a controller without drawing anything; call [`Self::render`].
    pub fn new(tickets: Vec<Ticket>, state: SessionState, persistence: SessionStore<S>) -> Self {
        Self {
            tickets,
            state,
            flipped: false,
            persistence,
            view: CardView::default(),
        }
    }

    pub fn total(&self) -> usize {
        self.tickets.len()
    }

    pub fn current_index(&self) -> usize {
        self.state.current_index
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn view(&self) -> &CardView {
        &self.view
    }

    pub fn persistence(&self) -> &SessionStore<S> {
        &self.persistence
    }

    /// Rebuilds the card view for the current ticket and persists the index.
    pub fn render(&mut self, reset_flip: bool) {
        let total = self.total();
        if total == 0 {
            return;
        }
        let idx = self.state.current_index;
        let resolved = ResolvedTicket::from_ticket(&self.tickets[idx], idx);

        self.view.label = resolved.label();
        self.view.question = resolved.question.clone();
        self.view.answer = resolved.answer_text().to_string();
        self.view.answer_empty = resolved.answer.is_none();
        if reset_flip {
            self.flipped = false;
        }
        self.view.counter = format!("{} / {}", idx + 1, total);
        self.view.progress = (idx + 1) as f64 / total as f64 * 100.0;
        self.refresh_counters();

        if let Err(e) = self.persistence.save_index(idx) {
            warn!(error = %e, "failed to persist current index");
        }
    }

    /// Turns the card over. The first time a card shows its answer it is
    /// marked studied; turning it back does not unmark it.
    pub fn flip(&mut self) {
        if self.total() == 0 {
            return;
        }
        self.flipped = !self.flipped;
        if self.flipped {
            let idx = self.state.current_index;
            if self.state.studied.insert(idx) {
                debug!(index = idx, "ticket studied");
            }
            if let Err(e) = self.persistence.save_studied(&self.state.studied) {
                warn!(error = %e, "failed to persist studied tickets");
            }
            // counters only, a full render would turn the card back
            self.refresh_counters();
        }
    }

    /// Moves to the next ticket, wrapping to the first after the last.
    pub fn advance(&mut self) {
        let total = self.total();
        if total == 0 {
            return;
        }
        self.state.current_index = (self.state.current_index + 1) % total;
        self.render(true);
    }

    pub fn apply(&mut self, cmd: Command) {
        match cmd {
            Command::Flip => self.flip(),
            Command::Advance => self.advance(),
        }
    }

    fn refresh_counters(&mut self) {
        let total = self.total();
        self.view.studied = self.state.studied.len();
        self.view.remaining = total.saturating_sub(self.state.studied.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        session::{INDEX_KEY, STUDIED_KEY},
        storage::MemoryStore,
        ticket::ANSWER_PLACEHOLDER,
    };
    use serde_json::{json, Value};

    fn deck(values: Value) -> Vec<Ticket> {
        serde_json::from_value(values).unwrap()
    }

    fn controller(values: Value) -> Controller<MemoryStore> {
        let tickets = deck(values);
        let mut c = Controller::new(
            tickets,
            SessionState::default(),
            SessionStore::new(MemoryStore::new()),
        );
        c.render(true);
        c
    }

    #[test]
    fn render_fills_view() {
        let c = controller(json!([
            {"Номер билета": 4, "Вопрос": "Q1", "Ответ": "A1"},
            {"Вопрос": "Q2"},
            {"Вопрос": "Q3"},
            {"Вопрос": "Q4"}
        ]));
        let v = c.view();
        assert_eq!(v.label, "Билет № 4");
        assert_eq!(v.question, "Q1");
        assert_eq!(v.answer, "A1");
        assert!(!v.answer_empty);
        assert_eq!(v.counter, "1 / 4");
        assert!((v.progress - 25.0).abs() < f64::EPSILON);
        assert_eq!((v.studied, v.remaining), (0, 4));
        let stored = c.persistence().store().get(INDEX_KEY).unwrap();
        assert_eq!(stored.as_deref(), Some("0"));
    }

    #[test]
    fn missing_answer_shows_placeholder() {
        let c = controller(json!([{"Вопрос": "Q", "Ответ": "  "}]));
        assert_eq!(c.view().answer, ANSWER_PLACEHOLDER);
        assert!(c.view().answer_empty);
    }

    #[test]
    fn advance_is_cyclic() {
        let mut c = controller(json!([{"a": 1}, {"a": 2}, {"a": 3}]));
        c.advance();
        let start = c.current_index();
        for _ in 0..c.total() {
            c.advance();
        }
        assert_eq!(c.current_index(), start);
    }

    #[test]
    fn advance_resets_flip() {
        let mut c = controller(json!([{"a": 1}, {"a": 2}]));
        c.flip();
        assert!(c.is_flipped());
        c.advance();
        assert!(!c.is_flipped());
    }

    #[test]
    fn flip_never_unmarks() {
        let mut c = controller(json!([{"a": 1}, {"a": 2}]));
        for _ in 0..5 {
            c.flip();
            assert!(c.state().studied.contains(&0));
        }
        assert_eq!(c.view().studied, 1);
        assert_eq!(c.view().remaining, 1);
        let stored = c.persistence().store().get(STUDIED_KEY).unwrap();
        assert_eq!(stored.as_deref(), Some("[0]"));
    }

    #[test]
    fn flip_keeps_the_rest_of_the_view() {
        let mut c = controller(json!([{"Вопрос": "Q", "Ответ": "A"}]));
        let before = c.view().clone();
        c.flip();
        assert_eq!(c.view().answer, before.answer);
        assert_eq!(c.view().counter, before.counter);
        assert_eq!(c.view().studied, 1);
    }

    #[test]
    fn empty_deck_is_inert() {
        let mut c = Controller::new(
            Vec::new(),
            SessionState::default(),
            SessionStore::new(MemoryStore::new()),
        );
        c.render(true);
        c.flip();
        c.advance();
        assert!(!c.is_flipped());
        assert_eq!(c.current_index(), 0);
        assert_eq!(c.view(), &CardView::default());
        assert_eq!(c.persistence().store().get(INDEX_KEY).unwrap(), None);
    }
}
