pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Gauge, Paragraph, Widget, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::app::App;
use crate::permission::PermissionGate;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
const MIN_CARD_WIDTH: u16 = 24;
const CARD_HEIGHT: u16 = 5;
const LOW_TIME_SECS: u32 = 10;

pub fn draw(app: &App, f: &mut Frame) {
    screen::current_screen(app.mode()).render(app, f);
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

/// A `width` x `height` rect centred in `area`, shrunk to fit.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn frame_chunks(area: Rect, body: u16) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(body),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area)
}

fn legend(text: &str, area: Rect, buf: &mut Buffer) {
    Paragraph::new(Span::styled(text.to_string(), italic()))
        .alignment(Alignment::Center)
        .render(area, buf);
}

pub(crate) fn render_permission(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = frame_chunks(area, 5);

    let waiting = matches!(app.gate(), PermissionGate::Pending(_));
    let mut lines = vec![
        Line::from(Span::styled(
            "Device Motion Required",
            bold().fg(Color::Yellow),
        )),
        Line::from(""),
        Line::from("Tilt up when your team guesses right, tilt down to skip."),
    ];
    if waiting {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Waiting for the motion feed...",
            italic().fg(Color::Cyan),
        )));
    }

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[1], buf);

    legend(
        "(g)rant motion / (c)ontinue without motion / (esc)ape",
        chunks[3],
        buf,
    );
}

pub(crate) fn render_countdown(app: &App, area: Rect, buf: &mut Buffer) {
    let view = app.view();
    let chunks = frame_chunks(area, 5);

    let lines = vec![
        Line::from(Span::styled("Get ready!", bold().fg(Color::Yellow))),
        Line::from(""),
        Line::from(Span::styled(
            view.countdown.to_string(),
            bold().fg(Color::Magenta),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("deck: {}  |  {} cards", app.deck().name, view.item_count),
            dim_bold(),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    legend("(esc)ape", chunks[3], buf);
}

pub(crate) fn render_playing(app: &App, area: Rect, buf: &mut Buffer) {
    let view = app.view();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // timer
            Constraint::Min(CARD_HEIGHT),
            Constraint::Length(1), // score
            Constraint::Length(1), // padding
            Constraint::Length(1), // legend
        ])
        .split(area);

    let timer_color = if view.time_left <= LOW_TIME_SECS {
        Color::Red
    } else {
        Color::Green
    };
    Gauge::default()
        .gauge_style(Style::default().fg(timer_color))
        .ratio(view.time_ratio())
        .label(Span::styled(format!("{}s", view.time_left), bold()))
        .render(chunks[0], buf);

    let (text, style) = if view.action_in_progress {
        ("CORRECT!".to_string(), bold().fg(Color::Green))
    } else {
        (
            view.current_item.unwrap_or_default().to_string(),
            bold().fg(Color::White),
        )
    };
    let card_width = (text.width() as u16).saturating_add(6).max(MIN_CARD_WIDTH);
    let card = centered(chunks[1], card_width, CARD_HEIGHT);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(if view.action_in_progress {
            Color::Green
        } else {
            Color::Cyan
        }));
    let inner = block.inner(card);
    block.render(card, buf);
    Paragraph::new(Span::styled(text, style))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(centered(inner, inner.width, 1), buf);

    Paragraph::new(Line::from(vec![
        Span::styled(format!("{} correct", view.score.correct), bold().fg(Color::Green)),
        Span::raw("  |  "),
        Span::styled(format!("{} skipped", view.score.skipped), bold().fg(Color::Red)),
    ]))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    let legend_text = if app.motion_enabled() {
        "tilt or ↑ correct / tilt or ↓ skip / (e)nd / (esc)ape"
    } else {
        "↑ correct / ↓ skip / (e)nd / (esc)ape"
    };
    legend(legend_text, chunks[4], buf);
}

pub(crate) fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let view = app.view();
    let score = app.last_result().unwrap_or(view.score);
    let chunks = frame_chunks(area, 6);

    let lines = vec![
        Line::from(Span::styled("Game Over!", bold().fg(Color::Yellow))),
        Line::from(""),
        Line::from(Span::styled(
            format!("{} correct", score.correct),
            bold().fg(Color::Green),
        )),
        Line::from(Span::styled(
            format!("{} skipped", score.skipped),
            bold().fg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(
                "{} of {} cards played from {}",
                score.total(),
                view.item_count,
                app.deck().name
            ),
            dim_bold(),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    legend("(r)eplay / (esc)ape", chunks[3], buf);
}
