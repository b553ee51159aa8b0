use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

use crate::arcade::{ArcadeGame, ArcadePhase, MissReason};
use crate::clock::Clock;
use crate::config::AnswerMode;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let Some(game) = &app.arcade else {
        draw_message(f, app, area, "Press a to play");
        return;
    };

    match game.phase() {
        ArcadePhase::Watch | ArcadePhase::Test | ArcadePhase::Sticky => {
            draw_round(f, app, game, area)
        }
        ArcadePhase::RoundComplete => draw_message(f, app, area, "c Continue   s Stop"),
        ArcadePhase::GameOver | ArcadePhase::Aborted => {
            draw_message(f, app, area, "Press a to play again")
        }
    }
}

fn draw_message(f: &mut Frame, app: &App, area: Rect, hint: &str) {
    let mut text = vec![Line::from("")];
    if let Some(message) = &app.message {
        text.push(Line::from(Span::styled(
            message.clone(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )));
        text.push(Line::from(""));
    }
    text.push(Line::from(Span::styled(
        hint.to_string(),
        Style::default().fg(Color::Cyan),
    )));
    if let Some(game) = &app.arcade {
        if game.earned() > 0 {
            text.push(Line::from(""));
            text.push(Line::from(format!("Earned this run: {} sparks", game.earned())));
        }
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Arcade ")
        .title_style(Style::default().fg(Color::Magenta));
    f.render_widget(
        Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center),
        area,
    );
}

fn draw_round(f: &mut Frame, app: &App, game: &ArcadeGame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Timer bar
            Constraint::Min(0),    // Card
            Constraint::Length(3), // Input
        ])
        .split(area);

    draw_timer(f, app, game, chunks[0]);

    let Some(card) = game.current_card() else {
        return;
    };
    let big = Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD);

    let mut text = vec![Line::from("")];
    match game.phase() {
        ArcadePhase::Watch => {
            text.push(Line::from(Span::styled(card.target_text.clone(), big)));
            text.push(Line::from(Span::styled(
                card.native_text.clone(),
                Style::default().fg(Color::Green),
            )));
        }
        _ => {
            text.push(Line::from(Span::styled(card.target_text.clone(), big)));
            if let Some((expected, reason)) = &app.disclosed {
                let why = match reason {
                    MissReason::Wrong => "Not quite.",
                    MissReason::TimedOut => "Time's up.",
                };
                text.push(Line::from(""));
                text.push(Line::from(Span::styled(
                    format!("{} Type it exactly: {}", why, expected),
                    Style::default().fg(Color::Red),
                )));
                if app.study.settings.arcade.answer_mode == AnswerMode::Fuzzy {
                    text.push(Line::from(Span::styled(
                        "<Tab> I was right",
                        Style::default().fg(Color::DarkGray),
                    )));
                }
            }
        }
    }

    let title = format!(
        " Round {}  {}/{}  Score {} ",
        game.round(),
        game.index() + 1,
        game.working_set().len(),
        game.score()
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().fg(Color::Magenta));
    f.render_widget(
        Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center),
        chunks[1],
    );

    let input = if game.phase() == ArcadePhase::Watch {
        Line::from(Span::styled("Memorise...", Style::default().fg(Color::DarkGray)))
    } else {
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Yellow)),
            Span::raw(app.input.clone()),
            Span::styled("█", Style::default().fg(Color::Yellow)),
        ])
    };
    f.render_widget(
        Paragraph::new(input).block(Block::default().borders(Borders::ALL)),
        chunks[2],
    );
}

fn draw_timer(f: &mut Frame, app: &App, game: &ArcadeGame, area: Rect) {
    let now = app.study.clock.now();
    let total = match game.phase() {
        ArcadePhase::Watch => game.speed_ms(),
        _ => crate::arcade::countdown_ms(&app.study.settings.arcade, game.round()),
    };

    let (ratio, label) = match game.remaining_ms(now) {
        Some(left) if total > 0 => (
            (left as f64 / total as f64).clamp(0.0, 1.0),
            format!("{:.1}s", left as f64 / 1000.0),
        ),
        _ => (0.0, String::new()),
    };

    let color = if ratio < 0.25 { Color::Red } else { Color::Cyan };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .gauge_style(Style::default().fg(color))
        .ratio(ratio)
        .label(label);
    f.render_widget(gauge, area);
}
