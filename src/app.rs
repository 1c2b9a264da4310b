//! Terminal application state and event loop.

use std::{io, time::Duration};

use anyhow::Result;
use crossterm::event::{self, Event};
use ratatui::{backend::Backend, Terminal};
use tracing::{debug, error, info};

use crate::{
    controller::Controller,
    input::{Action, ButtonAreas, InputMapper},
    loader,
    net::Fetch,
    storage::{self, KeyValueStore},
    ui::{self, Theme},
};

/// What is on screen.
#[derive(Debug)]
pub enum Screen<S> {
    Ready(Controller<S>),
    /// The load failed; holds the diagnostic text.
    Failed(String),
}

type OpenStore<S> = Box<dyn Fn() -> storage::Result<S>>;

/// Everything needed to (re)load the deck.
pub struct DeckSource<S> {
    fetcher: Box<dyn Fetch + Send>,
    url: String,
    open_store: OpenStore<S>,
}

impl<S: KeyValueStore> DeckSource<S> {
    pub fn new(
        fetcher: Box<dyn Fetch + Send>,
        url: impl Into<String>,
        open_store: impl Fn() -> storage::Result<S> + 'static,
    ) -> Self {
        Self {
            fetcher,
            url: url.into(),
            open_store: Box::new(open_store),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn load(&self) -> Screen<S> {
        let store = match (self.open_store)() {
            Ok(store) => store,
            Err(e) => {
                error!(error = %e, "failed to open storage");
                return Screen::Failed(e.to_string());
            }
        };
        match loader::load(&self.fetcher, &self.url, store) {
            Ok(controller) => Screen::Ready(controller),
            Err(e) => {
                error!(error = %e, "failed to load tickets");
                Screen::Failed(e.to_string())
            }
        }
    }
}

pub struct App<S> {
    pub screen: Screen<S>,
    pub theme: Theme,
    pub buttons: ButtonAreas,
    source: DeckSource<S>,
    input: InputMapper,
}

impl<S: KeyValueStore> App<S> {
    /// Performs the initial load.
    pub fn new(source: DeckSource<S>, input: InputMapper, theme: Theme) -> Self {
        let screen = source.load();
        Self {
            screen,
            theme,
            buttons: ButtonAreas::default(),
            source,
            input,
        }
    }

    pub fn source(&self) -> &DeckSource<S> {
        &self.source
    }

    pub fn controller(&self) -> Option<&Controller<S>> {
        match &self.screen {
            Screen::Ready(c) => Some(c),
            Screen::Failed(_) => None,
        }
    }

    /// Applies one action. Returns `true` when the app should exit.
    pub fn apply(&mut self, action: Action) -> bool {
        match action {
            Action::Quit => return true,
            Action::Reload => {
                info!(url = self.source.url(), "reloading tickets");
                self.screen = self.source.load();
            }
            Action::Card(cmd) => {
                if let Screen::Ready(c) = &mut self.screen {
                    c.apply(cmd);
                }
            }
        }
        false
    }

    /// Translates a terminal event. Returns `true` when the app should exit.
    pub fn handle_event(&mut self, ev: Event) -> bool {
        let action = match ev {
            Event::Key(k) => self.input.on_key(k),
            Event::Mouse(m) => self.input.on_mouse(m, &self.buttons),
            _ => None,
        };
        match action {
            Some(a) => {
                debug!(action = ?a, "input");
                self.apply(a)
            }
            None => false,
        }
    }
}

// ---------------- event loop ----------------

pub fn run_app<B: Backend, S: KeyValueStore>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;
        if event::poll(Duration::from_millis(250))? && app.handle_event(event::read()?) {
            break;
        }
    }
    Ok(())
}

/// Sets up the terminal, runs the loop and restores the terminal.
pub fn run<S: KeyValueStore>(app: &mut App<S>) -> Result<()> {
    use crossterm::{
        event::{DisableMouseCapture, EnableMouseCapture},
        execute,
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    };
    use ratatui::backend::CrosstermBackend;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(res?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::FetchError,
        input::Command,
        net::{Request, Response},
        storage::MemoryStore,
        ui::{theme_of, ThemeKind},
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    struct Toggle {
        online: Arc<AtomicBool>,
    }

    impl Fetch for Toggle {
        fn fetch(&self, req: &Request) -> Result<Response, FetchError> {
            if self.online.load(Ordering::SeqCst) {
                Ok(Response::new(200, None, r#"[{"Вопрос":"Q1"}]"#.as_bytes().to_vec()))
            } else {
                Err(FetchError::Network {
                    url: req.url.clone(),
                    reason: "offline".into(),
                })
            }
        }
    }

    fn app(online: bool) -> (App<MemoryStore>, Arc<AtomicBool>) {
        let flag = Arc::new(AtomicBool::new(online));
        let source = DeckSource::new(
            Box::new(Toggle {
                online: flag.clone(),
            }),
            loader::TICKETS_URL,
            || Ok(MemoryStore::new()),
        );
        (
            App::new(source, InputMapper::default(), theme_of(ThemeKind::Dark)),
            flag,
        )
    }

    #[test]
    fn failed_load_then_reload() {
        let (mut app, online) = app(false);
        assert!(matches!(app.screen, Screen::Failed(_)));
        // card commands are ignored without a deck
        assert!(!app.apply(Action::Card(Command::Flip)));
        online.store(true, Ordering::SeqCst);
        let reload = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::NONE);
        assert!(!app.handle_event(Event::Key(reload)));
        assert_eq!(app.controller().unwrap().view().question, "Q1");
    }

    #[test]
    fn keys_drive_the_controller() {
        let (mut app, _) = app(true);
        app.handle_event(Event::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)));
        assert!(app.controller().unwrap().is_flipped());
        app.handle_event(Event::Key(KeyEvent::new(KeyCode::Right, KeyModifiers::NONE)));
        assert!(!app.controller().unwrap().is_flipped());
        assert!(app.handle_event(Event::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE))));
    }
}
