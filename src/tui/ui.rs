use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use super::widgets::{arcade, cards, dashboard, review};
use crate::config::AnswerMode;
use super::{App, View};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Help bar
        ])
        .split(f.area());

    draw_tabs(f, app, chunks[0]);
    draw_content(f, app, chunks[1]);
    draw_help_bar(f, app, chunks[2]);
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let tab_titles = vec!["Dashboard", "Cards", "Review", "Arcade"];
    let selected = match app.view {
        View::Dashboard => 0,
        View::Cards => 1,
        View::Review => 2,
        View::Arcade => 3,
    };

    let title = format!(
        " clozeflash  {} sparks  {}d streak ",
        app.study.ledger.balance, app.study.ledger.streak
    );
    let tabs = Tabs::new(tab_titles)
        .block(Block::default().borders(Borders::ALL).title(title))
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(tabs, area);
}

fn draw_content(f: &mut Frame, app: &App, area: Rect) {
    match app.view {
        View::Dashboard => dashboard::draw(f, app, area),
        View::Cards => cards::draw(f, app, area),
        View::Review => review::draw(f, app, area),
        View::Arcade => arcade::draw(f, app, area),
    }
}

fn key(k: &'static str) -> Span<'static> {
    Span::styled(k, Style::default().fg(Color::Cyan))
}

fn draw_help_bar(f: &mut Frame, app: &App, area: Rect) {
    let help_text = if app.filter_mode {
        vec![
            Span::styled("/", Style::default().fg(Color::Yellow)),
            Span::raw(app.filter_input.as_str()),
            Span::styled("█", Style::default().fg(Color::Yellow)),
            Span::raw(" | "),
            key("<CR>"),
            Span::raw(" Apply  "),
            key("<Esc>"),
            Span::raw(" Cancel"),
        ]
    } else if app.is_typing() {
        let mut spans = vec![key("<CR>"), Span::raw(" Submit  ")];
        if app.view == View::Arcade
            && app.disclosed.is_some()
            && app.study.settings.arcade.answer_mode == AnswerMode::Fuzzy
        {
            spans.extend(vec![key("<Tab>"), Span::raw(" Override  ")]);
        }
        spans.extend(vec![
            key("<Esc>"),
            Span::raw(" Quit round  "),
            key("^c"),
            Span::raw(" Exit"),
        ]);
        spans
    } else {
        let mut spans = vec![key("<Tab>"), Span::raw(" Views  ")];

        match app.view {
            View::Dashboard => {
                spans.extend(vec![
                    key("d"),
                    Span::raw(" Due  "),
                    key("n"),
                    Span::raw(" New  "),
                    key("c"),
                    Span::raw(" Cram  "),
                    key("a"),
                    Span::raw(" Arcade  "),
                    key("^r"),
                    Span::raw(" Refresh  "),
                ]);
            }
            View::Cards => {
                spans.extend(vec![
                    key("j/k"),
                    Span::raw(" Nav  "),
                    key("g/G"),
                    Span::raw(" Top/Bot  "),
                    key("/"),
                    Span::raw(" Tag  "),
                    key("p"),
                    Span::raw(" Promote  "),
                    key("c"),
                    Span::raw(" Cram tag  "),
                ]);
                if app.filter_tag.is_some() {
                    spans.extend(vec![key("<Esc>"), Span::raw(" Clear  ")]);
                }
            }
            View::Review => {
                spans.extend(vec![key("<Space>"), Span::raw(" Reveal  ")]);
                spans.extend(vec![key("0-3"), Span::raw(" Grade  ")]);
                spans.extend(vec![key("<Esc>"), Span::raw(" End  ")]);
            }
            View::Arcade => {
                spans.extend(vec![
                    key("a"),
                    Span::raw(" Play  "),
                    key("<Esc>"),
                    Span::raw(" Abandon  "),
                ]);
            }
        }

        spans.extend(vec![key("q"), Span::raw(" Quit")]);

        spans
    };

    let help = Paragraph::new(Line::from(help_text)).style(Style::default().bg(Color::DarkGray));

    f.render_widget(help, area);
}
