//! Tickets and the tolerant field resolver.
//!
//! Ticket files usually come out of spreadsheets, so column names vary in
//! spelling and casing. Every logical field has an ordered list of accepted
//! names; [`resolve`] walks that list and never fails.

use serde_json::{Map, Value};

/// One question/answer record as it appears in the ticket file.
pub type Ticket = Map<String, Value>;

/// Accepted spellings for the ticket number, in priority order.
pub const NUMBER_KEYS: &[&str] = &["Номер билета", "Номер", "Билет"];
/// Accepted spellings for the question text.
pub const QUESTION_KEYS: &[&str] = &["Вопрос", "Question"];
/// Accepted spellings for the answer text.
pub const ANSWER_KEYS: &[&str] = &["Ответ", "Answer"];

/// Shown when no question field is found.
pub const QUESTION_PLACEHOLDER: &str = "Вопрос не найден";
/// Shown when the answer is missing or blank.
pub const ANSWER_PLACEHOLDER: &str = "(Ответ пока не добавлен)";

/// Looks up the first acceptable value among `candidates`.
///
/// Exact key matches are tried first, in candidate order; then the same
/// candidates are compared case-insensitively against the record keys. A
/// value is acceptable when `allow_empty` is set or it is neither `null` nor
/// the empty string. On a miss the result is `None`, or `Some("")` when
/// `allow_empty` is set.
pub fn resolve(record: &Ticket, candidates: &[&str], allow_empty: bool) -> Option<String> {
    let acceptable = |v: &Value| allow_empty || !(v.is_null() || v.as_str() == Some(""));

    for key in candidates {
        if let Some(v) = record.get(*key) {
            if acceptable(v) {
                return Some(value_to_string(v));
            }
        }
    }

    for key in candidates {
        let wanted = key.to_lowercase();
        // only the first key with this spelling is considered
        if let Some((_, v)) = record.iter().find(|(k, _)| k.to_lowercase() == wanted) {
            if acceptable(v) {
                return Some(value_to_string(v));
            }
        }
    }

    allow_empty.then(String::new)
}

fn value_to_string(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => v.to_string(),
    }
}

/// Display-ready fields of one ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTicket {
    pub number: String,
    pub question: String,
    /// `None` when the answer is missing or blank after trimming.
    pub answer: Option<String>,
}

impl ResolvedTicket {
    /// Resolves all fields of `ticket`, which sits at zero-based `position`.
    pub fn from_ticket(ticket: &Ticket, position: usize) -> Self {
        let number =
            resolve(ticket, NUMBER_KEYS, false).unwrap_or_else(|| (position + 1).to_string());
        let question =
            resolve(ticket, QUESTION_KEYS, false).unwrap_or_else(|| QUESTION_PLACEHOLDER.into());
        let answer = resolve(ticket, ANSWER_KEYS, true).filter(|a| !a.trim().is_empty());
        Self {
            number,
            question,
            answer,
        }
    }

    pub fn label(&self) -> String {
        format!("Билет № {}", self.number)
    }

    pub fn answer_text(&self) -> &str {
        self.answer.as_deref().unwrap_or(ANSWER_PLACEHOLDER)
    }
}
