//! Input layer: keys, swipes and button clicks become controller commands.

use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::{Position, Rect};

/// A swipe must travel further than this many logical pixels.
pub const SWIPE_THRESHOLD: f64 = 50.0;
/// Logical pixels per terminal column.
pub const CELL_WIDTH: f64 = 8.0;

/// The two things a user can do to the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Flip,
    Advance,
}

/// What the event loop should do with an input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Card(Command),
    Reload,
    Quit,
}

impl Action {
    pub fn from_name(s: &str) -> Option<Self> {
        Some(match s {
            "flip" => Self::Card(Command::Flip),
            "advance" | "next" | "skip" => Self::Card(Command::Advance),
            "reload" => Self::Reload,
            "quit" => Self::Quit,
            _ => return None,
        })
    }
}

/// Classifies a horizontal drag from `start` to `end` (logical pixels).
///
/// Right-to-left travel advances, left-to-right flips, anything within the
/// threshold is a tap.
pub fn classify_swipe(start: f64, end: f64, threshold: f64) -> Option<Command> {
    let delta = start - end;
    if delta.abs() <= threshold {
        return None;
    }
    if delta > 0.0 {
        Some(Command::Advance)
    } else {
        Some(Command::Flip)
    }
}

/// Screen areas of the clickable buttons, refreshed on every draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonAreas {
    pub flip: Rect,
    pub skip: Rect,
}

/// Stateful translator from terminal events to [`Action`]s.
#[derive(Debug, Clone)]
pub struct InputMapper {
    keymap: HashMap<char, Action>,
    threshold: f64,
    touch_start: Option<f64>,
}

impl Default for InputMapper {
    fn default() -> Self {
        Self::new(HashMap::new(), SWIPE_THRESHOLD)
    }
}

impl InputMapper {
    /// `keymap` adds character bindings on top of the fixed keys.
    pub fn new(keymap: HashMap<char, Action>, threshold: f64) -> Self {
        Self {
            keymap,
            threshold,
            touch_start: None,
        }
    }

    pub fn on_key(&self, key: KeyEvent) -> Option<Action> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        match key.code {
            KeyCode::Right | KeyCode::Char(' ') => Some(Action::Card(Command::Advance)),
            KeyCode::Left | KeyCode::Enter => Some(Action::Card(Command::Flip)),
            KeyCode::Esc | KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Char('r') => Some(Action::Reload),
            KeyCode::Char(c) => self.keymap.get(&c).copied(),
            _ => None,
        }
    }

    pub fn touch_start(&mut self, x: f64) {
        self.touch_start = Some(x);
    }

    /// Ends a touch at `x`. Returns the swipe command, if the travel was long
    /// enough; a release without a matching start is ignored.
    pub fn touch_end(&mut self, x: f64) -> Option<Command> {
        let start = self.touch_start.take()?;
        classify_swipe(start, x, self.threshold)
    }

    /// Left-button drags are swipes; short presses over a button are clicks.
    pub fn on_mouse(&mut self, ev: MouseEvent, buttons: &ButtonAreas) -> Option<Action> {
        let x = f64::from(ev.column) * CELL_WIDTH;
        match ev.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.touch_start(x);
                None
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if self.touch_start.is_none() {
                    return None;
                }
                if let Some(cmd) = self.touch_end(x) {
                    return Some(Action::Card(cmd));
                }
                let at = Position::new(ev.column, ev.row);
                if buttons.flip.contains(at) {
                    Some(Action::Card(Command::Flip))
                } else if buttons.skip.contains(at) {
                    Some(Action::Card(Command::Advance))
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}
