use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::review::{Phase, Presentation, PresentationMode, ReviewSession};
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let session = match &app.session {
        Some(session) if !session.is_complete() => session,
        _ => {
            draw_idle(f, app, area);
            return;
        }
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Progress
            Constraint::Min(0),    // Card
            Constraint::Length(3), // Answer / grading
        ])
        .split(area);

    draw_progress(f, session, chunks[0]);
    if let Some(presentation) = session.current() {
        draw_card(f, app, session.phase(), presentation, chunks[1]);
        draw_controls(f, app, session.phase(), presentation, chunks[2]);
    }
}

fn draw_idle(f: &mut Frame, app: &App, area: Rect) {
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
    text.push(Line::from(vec![
        Span::styled("d", Style::default().fg(Color::Cyan)),
        Span::raw(" Due   "),
        Span::styled("n", Style::default().fg(Color::Cyan)),
        Span::raw(" New   "),
        Span::styled("c", Style::default().fg(Color::Cyan)),
        Span::raw(format!(" Cram ({} sparks)", app.study.settings.cram.cost)),
    ]));

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Review ")
        .title_style(Style::default().fg(Color::Cyan));
    f.render_widget(
        Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center),
        area,
    );
}

fn draw_progress(f: &mut Frame, session: &ReviewSession, area: Rect) {
    let text = Line::from(vec![
        Span::styled(
            format!("{} ", session.mode().label()),
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("Left: ", Style::default().fg(Color::Gray)),
        Span::raw(format!("{}  ", session.remaining())),
        Span::styled("Reviewed: ", Style::default().fg(Color::Gray)),
        Span::raw(format!("{}  ", session.reviewed())),
        Span::styled("Again: ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("{}", session.failed()),
            Style::default().fg(Color::Red),
        ),
    ]);
    f.render_widget(
        Paragraph::new(text).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn draw_card(f: &mut Frame, app: &App, phase: Phase, presentation: &Presentation, area: Rect) {
    let card = &presentation.card;
    let big = Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD);

    let (prompt, answer) = match &presentation.mode {
        PresentationMode::Recognition => (card.target_text.clone(), card.native_text.clone()),
        PresentationMode::Recall => (card.native_text.clone(), card.target_text.clone()),
        PresentationMode::Cloze(cloze) => (cloze.masked(), cloze.answer().to_string()),
    };

    let mut text = vec![Line::from(""), Line::from(Span::styled(prompt, big))];
    if let PresentationMode::Cloze(_) = presentation.mode {
        text.push(Line::from(Span::styled(
            card.native_text.clone(),
            Style::default().fg(Color::Gray),
        )));
    }

    if phase == Phase::Back {
        text.push(Line::from(""));
        text.push(Line::from(Span::styled(
            answer,
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )));
        if let PresentationMode::Cloze(_) = presentation.mode {
            text.push(Line::from(card.target_text.clone()));
        }
        match app.cloze_result {
            Some(true) => text.push(Line::from(Span::styled(
                "Correct",
                Style::default().fg(Color::Green),
            ))),
            Some(false) => text.push(Line::from(Span::styled(
                format!("You typed: {}", app.input),
                Style::default().fg(Color::Red),
            ))),
            None => {}
        }
        if let Some(meta) = &card.meta_info {
            text.push(Line::from(""));
            text.push(Line::from(Span::styled(
                meta.clone(),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    let kind = match presentation.mode {
        PresentationMode::Recognition => " Recognize ",
        PresentationMode::Recall => " Recall ",
        PresentationMode::Cloze(_) => " Fill the blank ",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(kind)
        .title_style(Style::default().fg(Color::Cyan));
    f.render_widget(
        Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn draw_controls(f: &mut Frame, app: &App, phase: Phase, presentation: &Presentation, area: Rect) {
    let line = match (phase, &presentation.mode) {
        (Phase::Front, PresentationMode::Cloze(_)) => Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Yellow)),
            Span::raw(app.input.clone()),
            Span::styled("█", Style::default().fg(Color::Yellow)),
        ]),
        (Phase::Front, _) => Line::from(vec![
            Span::styled("<Space>", Style::default().fg(Color::Cyan)),
            Span::raw(" Show answer"),
        ]),
        _ => Line::from(vec![
            Span::styled("0", Style::default().fg(Color::Red)),
            Span::raw(" Again  "),
            Span::styled("1", Style::default().fg(Color::Yellow)),
            Span::raw(" Hard  "),
            Span::styled("2", Style::default().fg(Color::Green)),
            Span::raw(" Good  "),
            Span::styled("3", Style::default().fg(Color::Cyan)),
            Span::raw(" Easy"),
        ]),
    };
    f.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::ALL)),
        area,
    );
}
