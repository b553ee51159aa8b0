use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use super::truncate;
use crate::models::{Card, CardStatus};
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    draw_list(f, app, chunks[0]);
    draw_detail(f, app, chunks[1]);
}

fn status_color(card: &Card) -> Color {
    if !card.in_study_queue {
        return Color::DarkGray;
    }
    if card.is_mastered {
        return Color::Green;
    }
    match card.status {
        CardStatus::New => Color::Cyan,
        CardStatus::Active => Color::White,
        CardStatus::Leech => Color::Red,
    }
}

fn draw_list(f: &mut Frame, app: &App, area: Rect) {
    let title = if let Some(tag) = &app.filter_tag {
        format!(" Cards (tag: {}) ", tag)
    } else {
        format!(" Cards ({}) ", app.cards.items.len())
    };

    let items: Vec<ListItem> = app
        .cards
        .items
        .iter()
        .map(|card| {
            let due = match (card.in_study_queue, card.due_date) {
                (false, _) => "story".to_string(),
                (true, Some(date)) => date.format("%b %d").to_string(),
                (true, None) => "-".to_string(),
            };

            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<26}", truncate(&card.target_text, 24)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:<10}", card.status_label()),
                    Style::default().fg(status_color(card)),
                ),
                Span::styled(
                    format!("{:<9}", card.kind.as_str()),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(due, Style::default().fg(Color::Yellow)),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().fg(Color::Cyan));

    let header = Line::from(vec![Span::styled(
        format!("{:<26}{:<10}{:<9}{}", "Target", "Status", "Kind", "Due"),
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )]);

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.cards.selected);

    // Header sits on the first row inside the border
    let header_area = Rect {
        x: area.x + 3,
        y: area.y + 1,
        width: area.width.saturating_sub(4),
        height: 1,
    };
    f.render_widget(Paragraph::new(header), header_area);

    let list_area = Rect {
        x: area.x,
        y: area.y + 1,
        width: area.width,
        height: area.height.saturating_sub(1),
    };
    f.render_stateful_widget(list, list_area, &mut state);
}

fn draw_detail(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Card ")
        .title_style(Style::default().fg(Color::Magenta));

    let Some(card) = app.cards.selected_item() else {
        f.render_widget(Paragraph::new("No cards").block(block), area);
        return;
    };

    let label = |s: &'static str| Span::styled(s, Style::default().fg(Color::Gray));
    let mut text = vec![
        Line::from(Span::styled(
            card.target_text.clone(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(card.native_text.clone()),
        Line::from(""),
        Line::from(vec![label("Tag: "), Span::raw(card.tag.clone().unwrap_or_else(|| "-".into()))]),
        Line::from(vec![label("Interval: "), Span::raw(format!("{}d", card.interval_days))]),
        Line::from(vec![label("Ease: "), Span::raw(format!("{:.2}", card.ease_factor))]),
        Line::from(vec![
            label("Lapses: "),
            Span::styled(
                format!("{}", card.lapse_count),
                Style::default().fg(if card.lapse_count > 0 {
                    Color::Red
                } else {
                    Color::White
                }),
            ),
        ]),
        Line::from(vec![label("Streak: "), Span::raw(format!("{}", card.consecutive_correct))]),
    ];
    if let Some(meta) = &card.meta_info {
        text.push(Line::from(""));
        text.push(Line::from(Span::styled(
            meta.clone(),
            Style::default().fg(Color::DarkGray),
        )));
    }
    if !card.in_study_queue {
        text.push(Line::from(""));
        text.push(Line::from(Span::styled(
            "Story only: press p to study",
            Style::default().fg(Color::Yellow),
        )));
    }

    f.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: true }),
        area,
    );
}
