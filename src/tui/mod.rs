mod ui;
mod widgets;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::arcade::{ArcadeEvent, ArcadeGame, ArcadePhase, MissReason};
use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::db::{Database, Stats};
use crate::error::Result;
use crate::ledger::Ledger;
use crate::models::{Card, Grade};
use crate::repository::{CardQuery, Repository, StudyContext};
use crate::review::{Phase, PresentationMode, ReviewSession, SessionEvent, SessionMode};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const DUE_PREVIEW: usize = 8;

/// Screen to open on startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    Dashboard,
    Study(SessionMode),
    Arcade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Cards,
    Review,
    Arcade,
}

impl View {
    fn next(&self) -> Self {
        match self {
            View::Dashboard => View::Cards,
            View::Cards => View::Review,
            View::Review => View::Arcade,
            View::Arcade => View::Dashboard,
        }
    }

    fn prev(&self) -> Self {
        match self {
            View::Dashboard => View::Arcade,
            View::Cards => View::Dashboard,
            View::Review => View::Cards,
            View::Arcade => View::Review,
        }
    }
}

pub struct StatefulList<T> {
    pub items: Vec<T>,
    pub selected: Option<usize>,
}

impl<T> StatefulList<T> {
    fn with_items(items: Vec<T>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) if i + 1 < self.items.len() => i + 1,
            _ => 0,
        };
        self.selected = Some(i);
    }

    fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.selected = Some(i);
    }

    fn selected_item(&self) -> Option<&T> {
        self.selected.and_then(|i| self.items.get(i))
    }
}

/// State the engines borrow through a `StudyContext`.
pub struct Study {
    pub db: Database,
    pub ledger: Ledger,
    pub settings: Settings,
    pub clock: SystemClock,
    rng: StdRng,
}

impl Study {
    fn ctx(&mut self) -> StudyContext<'_> {
        StudyContext {
            repo: &self.db,
            ledger: &mut self.ledger,
            clock: &self.clock,
            rng: &mut self.rng,
            settings: &self.settings,
        }
    }
}

pub struct App {
    pub study: Study,
    pub view: View,
    pub stats: Stats,
    pub due_preview: Vec<Card>,
    pub cards: StatefulList<Card>,
    pub filter_tag: Option<String>,
    pub filter_input: String,
    pub filter_mode: bool,
    pub session: Option<ReviewSession>,
    /// Outcome of the last typed cloze answer
    pub cloze_result: Option<bool>,
    pub arcade: Option<ArcadeGame>,
    /// Answer shown after an arcade miss
    pub disclosed: Option<(String, MissReason)>,
    /// Text typed for a cloze or arcade answer
    pub input: String,
    pub message: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(db: Database, settings: Settings, ledger: Ledger) -> Result<Self> {
        let study = Study {
            db,
            ledger,
            settings,
            clock: SystemClock,
            rng: StdRng::from_entropy(),
        };
        let today = study.clock.today();
        let stats = study.db.get_stats(today)?;
        let due_preview = study.db.query_cards(&CardQuery {
            limit: Some(DUE_PREVIEW),
            ..CardQuery::due(today, study.settings.scheduling.leech_policy)
        })?;
        let cards = study.db.list_cards(None, None)?;

        Ok(Self {
            study,
            view: View::Dashboard,
            stats,
            due_preview,
            cards: StatefulList::with_items(cards),
            filter_tag: None,
            filter_input: String::new(),
            filter_mode: false,
            session: None,
            cloze_result: None,
            arcade: None,
            disclosed: None,
            input: String::new(),
            message: None,
            should_quit: false,
        })
    }

    pub fn refresh_data(&mut self) -> Result<()> {
        let today = self.study.clock.today();
        self.stats = self.study.db.get_stats(today)?;
        self.due_preview = self.study.db.query_cards(&CardQuery {
            limit: Some(DUE_PREVIEW),
            ..CardQuery::due(today, self.study.settings.scheduling.leech_policy)
        })?;
        self.cards = StatefulList::with_items(
            self.study
                .db
                .list_cards(self.filter_tag.as_deref(), None)?,
        );
        Ok(())
    }

    fn apply_filter(&mut self) -> Result<()> {
        if self.filter_input.is_empty() {
            self.filter_tag = None;
        } else {
            self.filter_tag = Some(self.filter_input.clone());
        }
        self.cards = StatefulList::with_items(
            self.study
                .db
                .list_cards(self.filter_tag.as_deref(), None)?,
        );
        Ok(())
    }

    /// Keep a failed engine call on screen instead of leaving the UI.
    fn report(&mut self, result: Result<()>) {
        if let Err(e) = result {
            if !e.is_non_fatal() {
                log::error!("{}", e);
            }
            self.message = Some(e.to_string());
        }
    }

    /// Typed input goes to the answer field rather than key bindings.
    pub fn is_typing(&self) -> bool {
        match self.view {
            View::Review => self.session.as_ref().is_some_and(|s| {
                s.phase() == Phase::Front
                    && matches!(
                        s.current().map(|p| &p.mode),
                        Some(PresentationMode::Cloze(_))
                    )
            }),
            View::Arcade => self
                .arcade
                .as_ref()
                .is_some_and(|g| matches!(g.phase(), ArcadePhase::Test | ArcadePhase::Sticky)),
            _ => false,
        }
    }

    // Review

    fn start_session(&mut self, mode: SessionMode) {
        if let Some(mut old) = self.session.take() {
            old.abort();
        }
        self.view = View::Review;
        self.cloze_result = None;
        self.input.clear();
        let started = ReviewSession::start(&mut self.study.ctx(), mode);
        match started {
            Ok((session, event)) => {
                self.session = Some(session);
                self.message = None;
                self.on_session_events(vec![event]);
            }
            Err(e) => self.report(Err(e)),
        }
    }

    fn cram_mode(&self) -> SessionMode {
        SessionMode::Cram {
            tag: self.filter_tag.clone(),
            kind: None,
            limit: self.study.settings.cram.limit,
        }
    }

    fn on_session_events(&mut self, events: Vec<SessionEvent>) {
        for event in events {
            match event {
                SessionEvent::CardPresented(_) => {
                    self.cloze_result = None;
                    self.input.clear();
                }
                SessionEvent::AnswerRevealed { correct, .. } => self.cloze_result = correct,
                SessionEvent::CardGraded { level_up, .. } => {
                    if let Some(level) = level_up {
                        self.message = Some(format!("Level up! Now level {}", level));
                    }
                }
                SessionEvent::SessionComplete { reviewed, failed } => {
                    self.message = Some(format!(
                        "Session complete: {} reviewed, {} again",
                        reviewed, failed
                    ));
                }
            }
        }
    }

    fn after_session(&mut self, result: Result<Vec<SessionEvent>>) {
        match result {
            Ok(events) => self.on_session_events(events),
            Err(e) => self.report(Err(e)),
        }
    }

    fn reveal(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let result = session.reveal().map(|e| vec![e]);
        self.after_session(result);
    }

    fn submit_cloze(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let result = session.submit_cloze(&self.input).map(|e| vec![e]);
        self.after_session(result);
    }

    fn grade(&mut self, grade: Grade) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(card_id) = session.current().map(|p| p.card.id) else {
            return;
        };
        let result = session.grade(&mut self.study.ctx(), card_id, grade);
        self.after_session(result);
    }

    fn abort_session(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if !session.is_complete() {
                session.abort();
                self.message = Some("Session ended".to_string());
            }
        }
        self.input.clear();
    }

    // Arcade

    fn start_arcade(&mut self) {
        if let Some(mut old) = self.arcade.take() {
            old.abort();
        }
        self.view = View::Arcade;
        self.disclosed = None;
        self.input.clear();
        let started = ArcadeGame::start(&mut self.study.ctx());
        match started {
            Ok((game, events)) => {
                self.arcade = Some(game);
                self.message = None;
                self.on_arcade_events(events);
            }
            Err(e) => self.report(Err(e)),
        }
    }

    fn on_arcade_events(&mut self, events: Vec<ArcadeEvent>) {
        for event in events {
            match event {
                ArcadeEvent::RoundStarted { round, .. } => {
                    self.message = Some(format!("Round {}: watch closely", round));
                }
                ArcadeEvent::Prompt { .. } => {
                    self.disclosed = None;
                    self.input.clear();
                }
                ArcadeEvent::Correct { .. } => self.input.clear(),
                ArcadeEvent::Disclosed {
                    expected, reason, ..
                } => {
                    self.disclosed = Some((expected, reason));
                    self.input.clear();
                }
                ArcadeEvent::RetypeRejected { .. } => self.input.clear(),
                ArcadeEvent::RoundComplete {
                    round,
                    reward,
                    balance,
                    ..
                } => {
                    self.message = Some(format!(
                        "Round {} perfect! +{} sparks ({} total)",
                        round, reward, balance
                    ));
                }
                ArcadeEvent::GameOver {
                    round,
                    score,
                    total,
                } => {
                    self.disclosed = None;
                    self.message = Some(format!(
                        "Game over in round {}: {}/{} recalled",
                        round, score, total
                    ));
                }
                ArcadeEvent::WatchCard { .. } => {}
            }
        }
    }

    fn after_arcade(&mut self, result: Result<Vec<ArcadeEvent>>) {
        match result {
            Ok(events) => self.on_arcade_events(events),
            Err(e) => self.report(Err(e)),
        }
    }

    fn submit_arcade(&mut self) {
        let Some(game) = self.arcade.as_mut() else {
            return;
        };
        let result = game.submit(&mut self.study.ctx(), &self.input);
        self.after_arcade(result);
    }

    fn continue_arcade(&mut self) {
        let Some(game) = self.arcade.as_mut() else {
            return;
        };
        let result = game.continue_run(&mut self.study.ctx());
        self.after_arcade(result);
    }

    fn stop_arcade(&mut self) {
        let Some(game) = self.arcade.as_mut() else {
            return;
        };
        let result = game.stop().map(|event| vec![event]);
        self.after_arcade(result);
    }

    fn override_arcade(&mut self) {
        let Some(game) = self.arcade.as_mut() else {
            return;
        };
        if game.phase() != ArcadePhase::Sticky {
            return;
        }
        let result = game.override_miss(&mut self.study.ctx());
        self.after_arcade(result);
    }

    fn abort_arcade(&mut self) {
        if let Some(game) = self.arcade.as_mut() {
            if !game.is_over() {
                game.abort();
                self.message = Some("Arcade abandoned".to_string());
            }
        }
        self.disclosed = None;
        self.input.clear();
    }

    /// Drive engine timers.
    pub fn tick(&mut self) {
        let now = self.study.clock.now();
        if let Some(game) = self.arcade.as_mut() {
            let events = game.tick(now);
            if !events.is_empty() {
                self.on_arcade_events(events);
            }
        }
    }

    fn quit(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.abort();
        }
        if let Some(game) = self.arcade.as_mut() {
            game.abort();
        }
        self.should_quit = true;
    }

    fn handle_typing(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => match self.view {
                View::Review => self.abort_session(),
                _ => self.abort_arcade(),
            },
            KeyCode::Enter => match self.view {
                View::Review => self.submit_cloze(),
                _ => self.submit_arcade(),
            },
            KeyCode::Tab if self.view == View::Arcade => self.override_arcade(),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> Result<()> {
        if key == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
            self.quit();
            return Ok(());
        }

        if self.is_typing() {
            self.handle_typing(key);
            return Ok(());
        }

        if self.filter_mode {
            match key {
                KeyCode::Esc => {
                    self.filter_mode = false;
                    self.filter_input.clear();
                }
                KeyCode::Enter => {
                    self.filter_mode = false;
                    self.apply_filter()?;
                }
                KeyCode::Backspace => {
                    self.filter_input.pop();
                }
                KeyCode::Char(c) => self.filter_input.push(c),
                _ => {}
            }
            return Ok(());
        }

        match key {
            KeyCode::Char('q') => self.quit(),

            KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.refresh_data()?;
            }

            KeyCode::Tab => self.view = self.view.next(),
            KeyCode::BackTab => self.view = self.view.prev(),

            _ => match self.view {
                View::Dashboard => self.handle_dashboard_key(key),
                View::Cards => self.handle_cards_key(key)?,
                View::Review => self.handle_review_key(key),
                View::Arcade => self.handle_arcade_key(key),
            },
        }

        if self.view == View::Dashboard
            && self.session.as_ref().map_or(true, |s| s.is_complete())
        {
            self.refresh_data()?;
        }
        Ok(())
    }

    fn handle_dashboard_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('d') => self.start_session(SessionMode::Due),
            KeyCode::Char('n') => self.start_session(SessionMode::New {
                batch_size: self.study.settings.review.new_batch_size,
            }),
            KeyCode::Char('c') => self.start_session(self.cram_mode()),
            KeyCode::Char('a') => self.start_arcade(),
            KeyCode::Char('l') | KeyCode::Right => self.view = self.view.next(),
            KeyCode::Char('h') | KeyCode::Left => self.view = self.view.prev(),
            _ => {}
        }
    }

    fn handle_cards_key(&mut self, key: KeyCode) -> Result<()> {
        match key {
            KeyCode::Char('/') => {
                self.filter_mode = true;
                self.filter_input.clear();
            }
            KeyCode::Esc if self.filter_tag.is_some() => {
                self.filter_tag = None;
                self.filter_input.clear();
                self.apply_filter()?;
            }
            KeyCode::Char('j') | KeyCode::Down => self.cards.next(),
            KeyCode::Char('k') | KeyCode::Up => self.cards.previous(),
            KeyCode::Char('g') if !self.cards.items.is_empty() => self.cards.selected = Some(0),
            KeyCode::Char('G') if !self.cards.items.is_empty() => {
                self.cards.selected = Some(self.cards.items.len() - 1);
            }
            KeyCode::Char('p') => {
                if let Some(card) = self.cards.selected_item() {
                    let (id, story) = (card.id, !card.in_study_queue);
                    if story && self.study.db.promote_card(id)? {
                        self.message = Some(format!("Card {} added to the study queue", id));
                        self.refresh_data()?;
                    }
                }
            }
            KeyCode::Char('c') => self.start_session(self.cram_mode()),
            KeyCode::Char('l') | KeyCode::Right => self.view = self.view.next(),
            KeyCode::Char('h') | KeyCode::Left => self.view = self.view.prev(),
            _ => {}
        }
        Ok(())
    }

    fn handle_review_key(&mut self, key: KeyCode) {
        let phase = self.session.as_ref().map(|s| s.phase());
        match (phase, key) {
            (Some(Phase::Front), KeyCode::Char(' ') | KeyCode::Enter) => self.reveal(),
            (Some(Phase::Back), KeyCode::Char(c @ '0'..='3')) => {
                if let Some(grade) = Grade::from_i32(c as i32 - '0' as i32) {
                    self.grade(grade);
                }
            }
            (Some(Phase::Front | Phase::Back), KeyCode::Esc) => self.abort_session(),
            (None | Some(Phase::Complete), KeyCode::Char('d')) => {
                self.start_session(SessionMode::Due)
            }
            (None | Some(Phase::Complete), KeyCode::Char('n')) => {
                self.start_session(SessionMode::New {
                    batch_size: self.study.settings.review.new_batch_size,
                })
            }
            (None | Some(Phase::Complete), KeyCode::Char('c')) => {
                self.start_session(self.cram_mode())
            }
            (None | Some(Phase::Complete), KeyCode::Char('l') | KeyCode::Right) => {
                self.view = self.view.next()
            }
            (None | Some(Phase::Complete), KeyCode::Char('h') | KeyCode::Left) => {
                self.view = self.view.prev()
            }
            _ => {}
        }
    }

    fn handle_arcade_key(&mut self, key: KeyCode) {
        let phase = self.arcade.as_ref().map(|g| g.phase());
        match (phase, key) {
            (Some(ArcadePhase::Watch), KeyCode::Esc) => self.abort_arcade(),
            (Some(ArcadePhase::RoundComplete), KeyCode::Char('c') | KeyCode::Enter) => {
                self.continue_arcade()
            }
            (Some(ArcadePhase::RoundComplete), KeyCode::Char('s')) => self.stop_arcade(),
            (Some(ArcadePhase::RoundComplete), KeyCode::Esc) => self.abort_arcade(),
            (
                None | Some(ArcadePhase::GameOver | ArcadePhase::Aborted),
                KeyCode::Char('a') | KeyCode::Enter,
            ) => self.start_arcade(),
            (
                None | Some(ArcadePhase::GameOver | ArcadePhase::Aborted),
                KeyCode::Char('l') | KeyCode::Right,
            ) => self.view = self.view.next(),
            (
                None | Some(ArcadePhase::GameOver | ArcadePhase::Aborted),
                KeyCode::Char('h') | KeyCode::Left,
            ) => self.view = self.view.prev(),
            _ => {}
        }
    }
}

pub fn run(db: Database, settings: Settings, ledger: Ledger, launch: Launch) -> Result<()> {
    let mut app = App::new(db, settings, ledger)?;
    match launch {
        Launch::Dashboard => {}
        Launch::Study(mode) => app.start_session(mode),
        Launch::Arcade => app.start_arcade(),
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == event::KeyEventKind::Press {
                    app.handle_key(key.code, key.modifiers)?;
                }
            }
        }
        app.tick();

        if app.should_quit {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{CardKind, NewCard};

    fn app_with_cards(n: usize) -> App {
        let db = Database::open(":memory:").unwrap();
        db.init().unwrap();
        for i in 0..n {
            db.add_card(&NewCard {
                target_text: format!("Wort{}", i),
                native_text: format!("word{}", i),
                meta_info: None,
                tag: Some("basics".into()),
                kind: CardKind::Vocab,
                in_study_queue: true,
            })
            .unwrap();
        }
        App::new(db, Settings::default(), Ledger::new(100)).unwrap()
    }

    mod list_tests {
        use super::*;

        #[test]
        fn navigation_wraps() {
            let mut list = StatefulList::with_items(vec![1, 2, 3]);
            list.previous();
            assert_eq!(list.selected, Some(2));
            list.next();
            assert_eq!(list.selected, Some(0));
        }

        #[test]
        fn empty_list_has_no_selection() {
            let mut list: StatefulList<i32> = StatefulList::with_items(vec![]);
            list.next();
            assert_eq!(list.selected, None);
            assert!(list.selected_item().is_none());
        }
    }

    mod key_tests {
        use super::*;

        fn press(app: &mut App, key: KeyCode) {
            app.handle_key(key, KeyModifiers::NONE).unwrap();
        }

        #[test]
        fn tab_cycles_views() {
            let mut app = app_with_cards(0);
            press(&mut app, KeyCode::Tab);
            assert_eq!(app.view, View::Cards);
            press(&mut app, KeyCode::BackTab);
            press(&mut app, KeyCode::BackTab);
            assert_eq!(app.view, View::Arcade);
        }

        #[test]
        fn empty_due_session_reports_message() {
            let mut app = app_with_cards(0);
            press(&mut app, KeyCode::Char('d'));
            assert_eq!(app.view, View::Review);
            assert!(app.session.is_none());
            assert_eq!(app.message.as_deref(), Some("Nothing to study right now"));
        }

        #[test]
        fn new_session_reveal_and_grade() {
            let mut app = app_with_cards(1);
            press(&mut app, KeyCode::Char('n'));
            let session = app.session.as_ref().unwrap();
            assert_eq!(session.phase(), Phase::Front);

            press(&mut app, KeyCode::Char(' '));
            assert_eq!(app.session.as_ref().unwrap().phase(), Phase::Back);

            press(&mut app, KeyCode::Char('2'));
            assert!(app.session.as_ref().unwrap().is_complete());
            assert!(app.message.as_deref().unwrap().starts_with("Session complete"));
            assert_eq!(app.study.ledger.daily.learned, 1);
        }

        #[test]
        fn arcade_needs_enough_cards() {
            let mut app = app_with_cards(3);
            press(&mut app, KeyCode::Tab);
            press(&mut app, KeyCode::Tab);
            press(&mut app, KeyCode::Tab);
            assert_eq!(app.view, View::Arcade);
            press(&mut app, KeyCode::Char('a'));
            assert!(app.arcade.is_none());
            assert!(matches!(
                app.message.as_deref(),
                Some(m) if m.contains("at least 5")
            ));
        }

        #[test]
        fn typing_goes_to_arcade_input() {
            let mut app = app_with_cards(5);
            app.start_arcade();
            // Skip the watch phase
            let game = app.arcade.as_mut().unwrap();
            let mut at = app.study.clock.now();
            while game.phase() == ArcadePhase::Watch {
                at += chrono::Duration::minutes(1);
                game.tick(at);
            }
            assert!(app.is_typing());

            press(&mut app, KeyCode::Char('q'));
            assert!(!app.should_quit);
            assert_eq!(app.input, "q");

            press(&mut app, KeyCode::Esc);
            assert_eq!(app.arcade.as_ref().unwrap().phase(), ArcadePhase::Aborted);
            assert!(app.input.is_empty());
        }

        #[test]
        fn tab_overrides_disclosed_arcade_miss() {
            let mut app = app_with_cards(5);
            app.start_arcade();
            let game = app.arcade.as_mut().unwrap();
            let mut at = app.study.clock.now();
            while game.phase() == ArcadePhase::Watch {
                at += chrono::Duration::minutes(1);
                game.tick(at);
            }

            // Tab does nothing before a miss
            press(&mut app, KeyCode::Tab);
            assert_eq!(app.arcade.as_ref().unwrap().score(), 0);

            app.input = "zzzzzzz".to_string();
            press(&mut app, KeyCode::Enter);
            assert!(app.disclosed.is_some());
            assert_eq!(app.arcade.as_ref().unwrap().phase(), ArcadePhase::Sticky);

            press(&mut app, KeyCode::Tab);
            let game = app.arcade.as_ref().unwrap();
            assert_eq!(game.phase(), ArcadePhase::Test);
            assert_eq!(game.score(), 1);
            assert_eq!(game.index(), 1);
            assert!(app.disclosed.is_none());
        }

        #[test]
        fn quit_aborts_running_session() {
            let mut app = app_with_cards(2);
            press(&mut app, KeyCode::Char('n'));
            app.handle_key(KeyCode::Char('c'), KeyModifiers::CONTROL)
                .unwrap();
            assert!(app.should_quit);
            assert!(app.session.as_ref().unwrap().is_complete());
        }
    }

    #[test]
    fn filter_limits_cards() {
        let mut app = app_with_cards(2);
        app.study
            .db
            .add_card(&NewCard {
                target_text: "Apfel".into(),
                native_text: "apple".into(),
                meta_info: None,
                tag: Some("food".into()),
                kind: CardKind::Vocab,
                in_study_queue: true,
            })
            .unwrap();
        app.filter_input = "food".into();
        app.apply_filter().unwrap();
        assert_eq!(app.cards.items.len(), 1);
        assert_eq!(app.cards.items[0].target_text, "Apfel");
    }

    #[test]
    fn engine_errors_become_messages() {
        let mut app = app_with_cards(0);
        app.report(Err(AppError::NothingToStudy));
        assert_eq!(app.message.as_deref(), Some("Nothing to study right now"));
    }
}
