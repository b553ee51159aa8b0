use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph},
    Frame,
};

use super::truncate;
use crate::ledger::XP_PER_LEVEL;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(10), // Stats + wallet row
            Constraint::Length(3),  // XP bar
            Constraint::Min(0),     // Due cards
        ])
        .split(area);

    let top_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[0]);

    draw_stats(f, app, top_chunks[0]);
    draw_wallet(f, app, top_chunks[1]);
    draw_xp(f, app, chunks[1]);
    draw_due_cards(f, app, chunks[2]);
}

fn stat_line<'a>(label: &'a str, value: String, color: Color) -> Line<'a> {
    Line::from(vec![
        Span::styled(label, Style::default().fg(Color::Gray)),
        Span::styled(value, Style::default().fg(color)),
    ])
}

fn draw_stats(f: &mut Frame, app: &App, area: Rect) {
    let stats = &app.stats;

    let text = vec![
        Line::from(vec![
            Span::styled("Cards: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", stats.total_cards),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        stat_line(
            "Due today: ",
            format!("{}", stats.due_today),
            if stats.due_today > 0 {
                Color::Yellow
            } else {
                Color::White
            },
        ),
        stat_line("New: ", format!("{}", stats.new_cards), Color::Cyan),
        stat_line("Story only: ", format!("{}", stats.story_only), Color::DarkGray),
        stat_line("Mastered: ", format!("{}", stats.mastered), Color::Green),
        stat_line(
            "Leeches: ",
            format!("{}", stats.leeches),
            if stats.leeches > 0 {
                Color::Red
            } else {
                Color::White
            },
        ),
        stat_line("Reviews: ", format!("{}", stats.total_reviews), Color::White),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Stats ")
        .title_style(Style::default().fg(Color::Cyan));

    f.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_wallet(f: &mut Frame, app: &App, area: Rect) {
    let ledger = &app.study.ledger;
    let settings = &app.study.settings;

    let text = vec![
        Line::from(vec![
            Span::styled("Sparks: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", ledger.balance),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        stat_line("Streak: ", format!("{} days", ledger.streak), Color::Magenta),
        stat_line("Level: ", format!("{}", ledger.level), Color::Cyan),
        stat_line(
            "Today: ",
            format!(
                "{} reviewed, {} learned",
                ledger.daily.reviews, ledger.daily.learned
            ),
            Color::White,
        ),
        Line::from(""),
        stat_line(
            "Cram cost: ",
            format!("{} sparks", settings.cram.cost),
            if ledger.can_afford(settings.cram.cost) {
                Color::White
            } else {
                Color::Red
            },
        ),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Wallet ")
        .title_style(Style::default().fg(Color::Yellow));

    f.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_xp(f: &mut Frame, app: &App, area: Rect) {
    let into_level = app.study.ledger.xp % XP_PER_LEVEL;
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" XP "))
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(into_level as f64 / XP_PER_LEVEL as f64)
        .label(format!("{}/{}", into_level, XP_PER_LEVEL));
    f.render_widget(gauge, area);
}

fn draw_due_cards(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .due_preview
        .iter()
        .enumerate()
        .map(|(i, card)| {
            let style = if card.lapse_count > 0 {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::Yellow)
            };

            ListItem::new(Line::from(vec![
                Span::styled(format!("{}. ", i + 1), Style::default().fg(Color::DarkGray)),
                Span::styled(format!("{:<30}", truncate(&card.target_text, 28)), style),
                Span::styled(
                    truncate(&card.native_text, 30),
                    Style::default().fg(Color::Gray),
                ),
            ]))
        })
        .collect();

    let title = if items.is_empty() {
        " Due Cards (none) "
    } else {
        " Due Cards "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().fg(Color::Yellow));

    f.render_widget(List::new(items).block(block), area);
}
