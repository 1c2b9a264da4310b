//! Drawing.

use clap::ValueEnum;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame,
};
use serde::Deserialize;
use unicode_width::UnicodeWidthStr;

use crate::{
    app::{App, Screen},
    controller::CardView,
    input::ButtonAreas,
    storage::KeyValueStore,
};

pub const FLIP_LABEL: &str = "Перевернуть";
pub const SKIP_LABEL: &str = "Пропустить";
pub const LOAD_ERROR_TITLE: &str = "Ошибка загрузки данных";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeKind {
    Dark,
    Light,
}

// ---------------- palette ----------------

/// Colours per card role.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub text: Color,
    pub hint: Color,
    pub title: Color,
    pub bar_bg: Color,
    pub card_bg: Color,
    /// Border of a card showing its answer.
    pub answer_side: Color,
    pub studied: Color,
    pub remaining: Color,
    pub error: Color,
}

pub fn theme_of(kind: ThemeKind) -> Theme {
    match kind {
        ThemeKind::Dark => Theme {
            text: Color::Rgb(226, 224, 218),
            hint: Color::Rgb(132, 136, 144),
            title: Color::Rgb(110, 180, 250),
            bar_bg: Color::Rgb(32, 36, 44),
            card_bg: Color::Rgb(24, 27, 33),
            answer_side: Color::Rgb(120, 196, 150),
            studied: Color::Rgb(120, 196, 150),
            remaining: Color::Rgb(236, 190, 100),
            error: Color::Rgb(236, 104, 104),
        },
        ThemeKind::Light => Theme {
            text: Color::Rgb(36, 38, 42),
            hint: Color::Rgb(112, 116, 124),
            title: Color::Rgb(20, 100, 200),
            bar_bg: Color::Rgb(228, 234, 242),
            card_bg: Color::Rgb(252, 251, 248),
            answer_side: Color::Rgb(40, 150, 90),
            studied: Color::Rgb(40, 150, 90),
            remaining: Color::Rgb(200, 120, 0),
            error: Color::Rgb(190, 40, 40),
        },
    }
}

// ---------------- screen ----------------

pub fn draw<S: KeyValueStore>(f: &mut Frame, app: &mut App<S>) {
    // header, progress, card, stats, buttons, footer
    let v = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_header(f, v[0], app.theme);
    draw_footer(f, v[5], app.theme);

    let th = app.theme;
    let (view, flipped) = match &app.screen {
        Screen::Ready(c) => (c.view().clone(), c.is_flipped()),
        Screen::Failed(msg) => {
            app.buttons = ButtonAreas::default();
            let url = app.source().url().to_string();
            let full = f.area();
            draw_load_error(f, full, th, msg, &url);
            return;
        }
    };

    draw_progress(f, v[1], th, &view);
    draw_card(f, v[2], th, &view, flipped);
    draw_stats(f, v[3], th, &view);
    app.buttons = draw_buttons(f, v[4], th);
}

fn draw_header(f: &mut Frame, area: Rect, th: Theme) {
    let text = Line::from(vec![
        Span::styled(
            " Билеты СПЭ ",
            Style::default().fg(th.title).add_modifier(Modifier::BOLD),
        ),
        Span::styled("| подготовка к экзамену", Style::default().fg(th.hint)),
    ]);
    f.render_widget(
        Paragraph::new(text).style(Style::default().bg(th.bar_bg).fg(th.text)),
        area,
    );
}

fn draw_footer(f: &mut Frame, area: Rect, th: Theme) {
    let tips = " [←/Enter]перевернуть  [→/Space]дальше  [r]обновить  [q]выход  свайп: ← дальше, → перевернуть ";
    let help = Paragraph::new(Line::from(Span::styled(tips, Style::default().fg(th.hint))))
        .style(Style::default().bg(th.bar_bg));
    f.render_widget(help, area);
}

fn draw_progress(f: &mut Frame, area: Rect, th: Theme, view: &CardView) {
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(th.title).bg(th.bar_bg))
        .ratio((view.progress / 100.0).clamp(0.0, 1.0))
        .label(Span::styled(
            view.counter.clone(),
            Style::default().fg(th.text).add_modifier(Modifier::BOLD),
        ));
    f.render_widget(gauge, area);
}

fn draw_card(f: &mut Frame, area: Rect, th: Theme, view: &CardView, flipped: bool) {
    let (side, body, body_style) = if flipped {
        let style = if view.answer_empty {
            Style::default().fg(th.hint).add_modifier(Modifier::ITALIC)
        } else {
            Style::default().fg(th.text)
        };
        ("Ответ", view.answer.as_str(), style)
    } else {
        ("Вопрос", view.question.as_str(), Style::default().fg(th.text))
    };
    let block = Block::default()
        .title(Span::styled(
            format!(" {} ", view.label),
            Style::default().fg(th.title).add_modifier(Modifier::BOLD),
        ))
        .title_bottom(
            Line::from(Span::styled(format!(" {side} "), Style::default().fg(th.hint)))
                .right_aligned(),
        )
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if flipped { th.answer_side } else { th.hint }))
        .style(Style::default().bg(th.card_bg));

    // pad so the text sits in the vertical middle of the card
    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    let pad = inner_height.saturating_sub(wrapped_height(body, inner_width)) / 2;
    let mut lines: Vec<Line> = vec![Line::from(""); usize::from(pad)];
    lines.extend(
        body.lines()
            .map(|l| Line::from(Span::styled(l.to_string(), body_style))),
    );
    let para = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false });
    f.render_widget(para, area);
}

/// Rows `text` needs when wrapped at `width` columns.
fn wrapped_height(text: &str, width: u16) -> u16 {
    if width == 0 {
        return 0;
    }
    let width = usize::from(width);
    let rows: usize = text
        .lines()
        .map(|l| UnicodeWidthStr::width(l).div_ceil(width).max(1))
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

fn draw_stats(f: &mut Frame, area: Rect, th: Theme, view: &CardView) {
    let line = Line::from(vec![
        Span::styled("Изучено: ", Style::default().fg(th.hint)),
        Span::styled(view.studied.to_string(), Style::default().fg(th.studied)),
        Span::styled("  Осталось: ", Style::default().fg(th.hint)),
        Span::styled(view.remaining.to_string(), Style::default().fg(th.remaining)),
    ]);
    f.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

// ---------------- widgets ----------------

/// Draws both buttons and returns where they ended up.
fn draw_buttons(f: &mut Frame, area: Rect, th: Theme) -> ButtonAreas {
    let h = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    for (rect, label) in [(h[0], FLIP_LABEL), (h[1], SKIP_LABEL)] {
        let button = Paragraph::new(Span::styled(label, Style::default().fg(th.text)))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(th.title)),
            );
        f.render_widget(button, rect);
    }
    ButtonAreas {
        flip: h[0],
        skip: h[1],
    }
}

// ---------------- load error ----------------

fn draw_load_error(f: &mut Frame, full: Rect, th: Theme, message: &str, url: &str) {
    let area = dialog_area(full, 70, 10);
    f.render_widget(Clear, area);
    let block = Block::default()
        .title(Span::styled(
            format!(" {LOAD_ERROR_TITLE} "),
            Style::default().fg(th.error).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(th.error));
    let lines = vec![
        Line::from(Span::styled(message.to_string(), Style::default().fg(th.text))),
        Line::from(""),
        Line::from(Span::styled(
            format!("Проверьте, что файл {url} доступен у источника данных."),
            Style::default().fg(th.hint),
        )),
        Line::from(Span::styled(
            "[r] повторить загрузку   [q] выход",
            Style::default().fg(th.hint),
        )),
    ];
    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

/// `width_pct` percent of `screen` wide and `rows` tall (clamped), centred.
fn dialog_area(screen: Rect, width_pct: u16, rows: u16) -> Rect {
    let width = u16::try_from(u32::from(screen.width) * u32::from(width_pct.min(100)) / 100)
        .unwrap_or(screen.width);
    let height = rows.min(screen.height);
    Rect {
        x: screen.x + (screen.width - width) / 2,
        y: screen.y + (screen.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        app::DeckSource,
        error::FetchError,
        input::{Command, InputMapper},
        net::{Fetch, Request, Response},
        storage::MemoryStore,
    };
    use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};

    struct Body(&'static str);

    impl Fetch for Body {
        fn fetch(&self, req: &Request) -> Result<Response, FetchError> {
            if self.0.is_empty() {
                return Err(FetchError::Network {
                    url: req.url.clone(),
                    reason: "offline".into(),
                });
            }
            Ok(Response::new(200, None, self.0.as_bytes().to_vec()))
        }
    }

    fn app(body: &'static str) -> App<MemoryStore> {
        let source = DeckSource::new(Box::new(Body(body)), "./tickets.json", || {
            Ok(MemoryStore::new())
        });
        App::new(source, InputMapper::default(), theme_of(ThemeKind::Dark))
    }

    fn text(buf: &Buffer) -> String {
        let area = buf.area;
        let mut out = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                out.push_str(buf[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    fn render(app: &mut App<MemoryStore>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        text(terminal.backend().buffer())
    }

    #[test]
    fn draws_question_side() {
        let mut app = app(r#"[{"Номер":"7","Вопрос":"Что такое СПЭ?","Ответ":"Ответ"}]"#);
        let screen = render(&mut app);
        assert!(screen.contains("Билет № 7"));
        assert!(screen.contains("Что такое СПЭ?"));
        assert!(screen.contains("1 / 1"));
        assert!(screen.contains("Изучено: 0"));
        assert!(screen.contains("Осталось: 1"));
        assert!(screen.contains(FLIP_LABEL));
        assert!(app.buttons.flip.width > 0 && app.buttons.skip.x > app.buttons.flip.x);
    }

    #[test]
    fn draws_answer_placeholder_when_flipped() {
        let mut app = app(r#"[{"Вопрос":"Q"}]"#);
        app.apply(crate::input::Action::Card(Command::Flip));
        let screen = render(&mut app);
        assert!(screen.contains("(Ответ пока не добавлен)"));
        assert!(screen.contains("Изучено: 1"));
    }

    #[test]
    fn wrapped_rows() {
        assert_eq!(wrapped_height("", 10), 0);
        assert_eq!(wrapped_height("abc\n\nde", 10), 3);
        assert_eq!(wrapped_height("Билет № 12", 4), 3);
        assert_eq!(wrapped_height("abc", 0), 0);
    }

    #[test]
    fn dialog_sits_in_the_middle() {
        let screen = Rect::new(0, 0, 80, 20);
        assert_eq!(dialog_area(screen, 70, 10), Rect::new(12, 5, 56, 10));
        // taller than the screen
        assert_eq!(dialog_area(Rect::new(2, 1, 10, 4), 100, 8), Rect::new(2, 1, 10, 4));
    }

    #[test]
    fn draws_load_error() {
        let mut app = app("");
        let screen = render(&mut app);
        assert!(screen.contains(LOAD_ERROR_TITLE));
        assert_eq!(app.buttons, ButtonAreas::default());
    }
}
