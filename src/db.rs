use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::Path;

use crate::error::{AppError, Result};
use crate::ledger::{DailyCounters, Ledger};
use crate::models::{
    Card, CardEdit, CardKind, CardStatus, Collection, Grade, NewCard, ReviewRecord, Segment,
    Tag,
};
use crate::repository::{CardQuery, Repository};
use crate::scheduler::DEFAULT_EASE_FACTOR;

const DATE_FORMAT: &str = "%Y-%m-%d";

const CARD_COLUMNS: &str = r#"
    id, target_text, native_text, meta_info, tag, kind, status, in_study_queue,
    is_mastered, interval_days, ease_factor, due_date, lapse_count,
    consecutive_correct, locked_cloze_index, created_at
"#;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                target_text TEXT NOT NULL UNIQUE,
                native_text TEXT NOT NULL,
                meta_info TEXT,
                tag TEXT,
                kind TEXT NOT NULL DEFAULT 'vocab' CHECK(kind IN ('vocab', 'sentence')),
                status TEXT NOT NULL DEFAULT 'new' CHECK(status IN ('new', 'active', 'leech')),
                in_study_queue INTEGER NOT NULL DEFAULT 1,
                interval_days INTEGER NOT NULL DEFAULT 0,
                ease_factor REAL NOT NULL DEFAULT 2.5,
                due_date TEXT,
                lapse_count INTEGER NOT NULL DEFAULT 0,
                consecutive_correct INTEGER NOT NULL DEFAULT 0,
                is_mastered INTEGER NOT NULL DEFAULT 0,
                locked_cloze_index INTEGER,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- Collections are ordered segments; a segment may not have a card yet
            CREATE TABLE IF NOT EXISTS collections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS collection_segments (
                collection_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                card_id INTEGER,
                PRIMARY KEY (collection_id, position),
                FOREIGN KEY (collection_id) REFERENCES collections(id) ON DELETE CASCADE,
                FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE SET NULL
            );

            CREATE TABLE IF NOT EXISTS review_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                card_id INTEGER NOT NULL,
                grade INTEGER NOT NULL CHECK(grade BETWEEN 0 AND 3),
                reviewed_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE CASCADE
            );

            -- Single row
            CREATE TABLE IF NOT EXISTS ledger (
                id INTEGER PRIMARY KEY CHECK(id = 1),
                balance INTEGER NOT NULL,
                streak INTEGER NOT NULL DEFAULT 0,
                last_active TEXT,
                last_study TEXT,
                xp INTEGER NOT NULL DEFAULT 0,
                level INTEGER NOT NULL DEFAULT 1,
                daily_day TEXT,
                daily_reviews INTEGER NOT NULL DEFAULT 0,
                daily_learned INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_cards_due ON cards(due_date);
            CREATE INDEX IF NOT EXISTS idx_cards_status ON cards(status);
            CREATE INDEX IF NOT EXISTS idx_cards_tag ON cards(tag);
            CREATE INDEX IF NOT EXISTS idx_cards_mastered ON cards(is_mastered);
            CREATE INDEX IF NOT EXISTS idx_history_card ON review_history(card_id);
            "#,
        )?;

        Ok(())
    }

    // Card operations

    /// Insert a card. When a card with the same target text already exists its
    /// id is returned instead, with `false` for "created".
    pub fn add_card(&self, card: &NewCard) -> Result<(i64, bool)> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM cards WHERE target_text = ?1",
                params![card.target_text],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            log::debug!("card {:?} already exists as {}", card.target_text, id);
            return Ok((id, false));
        }

        self.conn.execute(
            r#"
            INSERT INTO cards (target_text, native_text, meta_info, tag, kind, in_study_queue, ease_factor, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                card.target_text,
                card.native_text,
                card.meta_info,
                card.tag,
                card.kind.as_str(),
                card.in_study_queue,
                DEFAULT_EASE_FACTOR,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok((self.conn.last_insert_rowid(), true))
    }

    pub fn list_cards(&self, tag: Option<&str>, kind: Option<CardKind>) -> Result<Vec<Card>> {
        self.query_cards(&CardQuery {
            tag: tag.map(str::to_string),
            kind,
            ..CardQuery::default()
        })
    }

    /// Change a card's content. Review state is kept; the cloze lock is
    /// dropped when the target text or kind changes.
    pub fn edit_card(&self, id: i64, edit: &CardEdit) -> Result<Card> {
        let mut card = self.get_card(id)?.ok_or(AppError::CardNotFound(id))?;

        if let Some(target) = &edit.target_text {
            let target = target.trim();
            if target.is_empty() {
                return Err(AppError::InvalidInput("target text cannot be empty".into()));
            }
            let taken: Option<i64> = self
                .conn
                .query_row(
                    "SELECT id FROM cards WHERE target_text = ?1 AND id != ?2",
                    params![target, id],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(other) = taken {
                return Err(AppError::InvalidInput(format!(
                    "card {} already has target text {:?}",
                    other, target
                )));
            }
            if card.target_text != target {
                card.target_text = target.to_string();
                card.locked_cloze_index = None;
            }
        }
        if let Some(native) = &edit.native_text {
            card.native_text = native.clone();
        }
        if let Some(meta) = &edit.meta_info {
            card.meta_info = Some(meta.clone()).filter(|m| !m.is_empty());
        }
        if let Some(tag) = &edit.tag {
            card.tag = Some(tag.clone()).filter(|t| !t.is_empty());
        }
        if let Some(kind) = edit.kind {
            if card.kind != kind {
                card.kind = kind;
                card.locked_cloze_index = None;
            }
        }

        self.upsert_card(&card)?;
        log::debug!("edited card {}", id);
        Ok(card)
    }

    pub fn delete_card(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM cards WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Move a story-only card into the study queue.
    pub fn promote_card(&self, id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE cards SET in_study_queue = 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(rows > 0)
    }

    pub fn get_history(&self, card_id: i64) -> Result<Vec<ReviewRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT card_id, grade, reviewed_at
            FROM review_history
            WHERE card_id = ?1
            ORDER BY reviewed_at DESC, id DESC
            "#,
        )?;

        let rows = stmt.query_map(params![card_id], |row| {
            let grade: i32 = row.get(1)?;
            Ok(ReviewRecord {
                card_id: row.get(0)?,
                grade: Grade::from_i32(grade).unwrap_or(Grade::Again),
                reviewed_at: row.get(2)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // Collection operations

    /// Create a collection; `None` entries are empty segments.
    pub fn create_collection(&self, name: &str, segments: &[Option<i64>]) -> Result<i64> {
        for card_id in segments.iter().flatten() {
            if self.get_card(*card_id)?.is_none() {
                return Err(AppError::CardNotFound(*card_id));
            }
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO collections (name, created_at) VALUES (?1, ?2)",
            params![name, Utc::now().to_rfc3339()],
        )?;
        let collection_id = tx.last_insert_rowid();

        for (i, card_id) in segments.iter().enumerate() {
            tx.execute(
                "INSERT INTO collection_segments (collection_id, position, card_id) VALUES (?1, ?2, ?3)",
                params![collection_id, i as i64 + 1, card_id],
            )?;
        }
        tx.commit()?;

        Ok(collection_id)
    }

    pub fn get_collection(&self, id: i64) -> Result<Option<Collection>> {
        let collection = self
            .conn
            .query_row(
                "SELECT id, name, created_at FROM collections WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Collection {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: row.get(2)?,
                        segments: vec![],
                    })
                },
            )
            .optional()?;

        match collection {
            Some(mut c) => {
                c.segments = self.get_segments(id)?;
                Ok(Some(c))
            }
            None => Ok(None),
        }
    }

    pub fn list_collections(&self) -> Result<Vec<Collection>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM collections ORDER BY name")?;

        let rows = stmt.query_map([], |row| {
            Ok(Collection {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
                segments: vec![],
            })
        })?;
        let mut collections = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        for collection in &mut collections {
            collection.segments = self.get_segments(collection.id)?;
        }

        Ok(collections)
    }

    fn get_segments(&self, collection_id: i64) -> Result<Vec<Segment>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT position, card_id
            FROM collection_segments
            WHERE collection_id = ?1
            ORDER BY position
            "#,
        )?;

        let rows = stmt.query_map(params![collection_id], |row| {
            Ok(Segment {
                position: row.get(0)?,
                card_id: row.get(1)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT tag, COUNT(*) as card_count
            FROM cards
            WHERE tag IS NOT NULL
            GROUP BY tag
            ORDER BY tag
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(Tag {
                name: row.get(0)?,
                card_count: row.get(1)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_stats(&self, today: NaiveDate) -> Result<Stats> {
        let count = |sql: &str| -> Result<i64> {
            Ok(self.conn.query_row(sql, [], |row| row.get(0))?)
        };

        let due_today = self.count_cards(&CardQuery {
            in_study_queue: Some(true),
            due_on_or_before: Some(today),
            ..CardQuery::default()
        })? as i64;

        Ok(Stats {
            total_cards: count("SELECT COUNT(*) FROM cards")?,
            new_cards: count(
                "SELECT COUNT(*) FROM cards WHERE status = 'new' AND in_study_queue = 1",
            )?,
            story_only: count("SELECT COUNT(*) FROM cards WHERE in_study_queue = 0")?,
            leeches: count("SELECT COUNT(*) FROM cards WHERE status = 'leech'")?,
            mastered: count("SELECT COUNT(*) FROM cards WHERE is_mastered = 1")?,
            due_today,
            total_reviews: count("SELECT COUNT(*) FROM review_history")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub total_cards: i64,
    pub new_cards: i64,
    pub story_only: i64,
    pub leeches: i64,
    pub mastered: i64,
    pub due_today: i64,
    pub total_reviews: i64,
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn parse_date(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok())
}

fn card_from_row(row: &Row) -> rusqlite::Result<Card> {
    let kind: String = row.get(5)?;
    let status: String = row.get(6)?;
    let due: Option<String> = row.get(11)?;
    let locked: Option<i64> = row.get(14)?;
    Ok(Card {
        id: row.get(0)?,
        target_text: row.get(1)?,
        native_text: row.get(2)?,
        meta_info: row.get(3)?,
        tag: row.get(4)?,
        kind: CardKind::from_str(&kind).unwrap_or(CardKind::Vocab),
        status: CardStatus::from_str(&status).unwrap_or(CardStatus::New),
        in_study_queue: row.get(7)?,
        is_mastered: row.get(8)?,
        interval_days: row.get(9)?,
        ease_factor: row.get(10)?,
        due_date: parse_date(due),
        lapse_count: row.get(12)?,
        consecutive_correct: row.get(13)?,
        locked_cloze_index: locked.map(|i| i as usize),
        created_at: row.get(15)?,
    })
}

// Build the WHERE clause and its parameters for a card query
fn card_filter(query: &CardQuery) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(status) = query.status {
        params_vec.push(Box::new(status.as_str()));
        clauses.push(format!("status = ?{}", params_vec.len()));
    }
    if let Some(in_queue) = query.in_study_queue {
        params_vec.push(Box::new(in_queue));
        clauses.push(format!("in_study_queue = ?{}", params_vec.len()));
    }
    if let Some(today) = query.due_on_or_before {
        params_vec.push(Box::new(today.format(DATE_FORMAT).to_string()));
        clauses.push(format!(
            "(due_date <= ?{} OR (due_date IS NULL AND status != 'new'))",
            params_vec.len()
        ));
    }
    if let Some(tag) = &query.tag {
        params_vec.push(Box::new(tag.clone()));
        clauses.push(format!("tag = ?{}", params_vec.len()));
    }
    if let Some(kind) = query.kind {
        params_vec.push(Box::new(kind.as_str()));
        clauses.push(format!("kind = ?{}", params_vec.len()));
    }
    if query.exclude_leech {
        clauses.push("status != 'leech'".to_string());
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    (where_clause, params_vec)
}

impl Repository for Database {
    fn get_card(&self, id: i64) -> Result<Option<Card>> {
        let sql = format!("SELECT {} FROM cards WHERE id = ?1", CARD_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], card_from_row)
            .optional()?)
    }

    fn query_cards(&self, query: &CardQuery) -> Result<Vec<Card>> {
        let (where_clause, params_vec) = card_filter(query);
        // Most overdue first for due selections, oldest first otherwise
        let order = if query.due_on_or_before.is_some() {
            "ORDER BY due_date IS NULL, due_date, id"
        } else {
            "ORDER BY id"
        };
        let limit = match query.limit {
            Some(n) => format!("LIMIT {}", n),
            None => String::new(),
        };
        let sql = format!(
            "SELECT {} FROM cards {} {} {}",
            CARD_COLUMNS, where_clause, order, limit
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|b| b.as_ref()).collect();
        let rows = stmt.query_map(params_refs.as_slice(), card_from_row)?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn upsert_card(&self, card: &Card) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO cards (id, target_text, native_text, meta_info, tag, kind, status,
                               in_study_queue, is_mastered, interval_days, ease_factor, due_date,
                               lapse_count, consecutive_correct, locked_cloze_index, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            ON CONFLICT(id) DO UPDATE SET
                target_text = excluded.target_text,
                native_text = excluded.native_text,
                meta_info = excluded.meta_info,
                tag = excluded.tag,
                kind = excluded.kind,
                status = excluded.status,
                in_study_queue = excluded.in_study_queue,
                is_mastered = excluded.is_mastered,
                interval_days = excluded.interval_days,
                ease_factor = excluded.ease_factor,
                due_date = excluded.due_date,
                lapse_count = excluded.lapse_count,
                consecutive_correct = excluded.consecutive_correct,
                locked_cloze_index = excluded.locked_cloze_index
            "#,
            params![
                card.id,
                card.target_text,
                card.native_text,
                card.meta_info,
                card.tag,
                card.kind.as_str(),
                card.status.as_str(),
                card.in_study_queue,
                card.is_mastered,
                card.interval_days,
                card.ease_factor,
                format_date(card.due_date),
                card.lapse_count,
                card.consecutive_correct,
                card.locked_cloze_index.map(|i| i as i64),
                card.created_at
            ],
        )?;
        Ok(())
    }

    fn count_cards(&self, query: &CardQuery) -> Result<usize> {
        let (where_clause, params_vec) = card_filter(query);
        let sql = format!("SELECT COUNT(*) FROM cards {}", where_clause);
        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|b| b.as_ref()).collect();
        let count: i64 = self
            .conn
            .query_row(&sql, params_refs.as_slice(), |row| row.get(0))?;
        Ok(count as usize)
    }

    fn collection_card_ids(&self, collection_id: i64) -> Result<Option<Vec<i64>>> {
        Ok(self.get_collection(collection_id)?.map(|c| c.card_ids()))
    }

    fn record_history(
        &self,
        card_id: i64,
        grade: Grade,
        reviewed_at: DateTime<Utc>,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO review_history (card_id, grade, reviewed_at) VALUES (?1, ?2, ?3)",
            params![card_id, grade.as_i32(), reviewed_at.to_rfc3339()],
        )?;
        Ok(())
    }

    fn load_ledger(&self) -> Result<Option<Ledger>> {
        let ledger = self
            .conn
            .query_row(
                r#"
                SELECT balance, streak, last_active, last_study, xp, level,
                       daily_day, daily_reviews, daily_learned
                FROM ledger
                WHERE id = 1
                "#,
                [],
                |row| {
                    Ok(Ledger {
                        balance: row.get(0)?,
                        streak: row.get(1)?,
                        last_active: parse_date(row.get(2)?),
                        last_study: parse_date(row.get(3)?),
                        xp: row.get(4)?,
                        level: row.get(5)?,
                        daily: DailyCounters {
                            day: parse_date(row.get(6)?),
                            reviews: row.get(7)?,
                            learned: row.get(8)?,
                        },
                    })
                },
            )
            .optional()?;
        Ok(ledger)
    }

    fn save_ledger(&self, ledger: &Ledger) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO ledger (id, balance, streak, last_active, last_study, xp, level,
                                daily_day, daily_reviews, daily_learned)
            VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                balance = excluded.balance,
                streak = excluded.streak,
                last_active = excluded.last_active,
                last_study = excluded.last_study,
                xp = excluded.xp,
                level = excluded.level,
                daily_day = excluded.daily_day,
                daily_reviews = excluded.daily_reviews,
                daily_learned = excluded.daily_learned
            "#,
            params![
                ledger.balance,
                ledger.streak,
                format_date(ledger.last_active),
                format_date(ledger.last_study),
                ledger.xp,
                ledger.level,
                format_date(ledger.daily.day),
                ledger.daily.reviews,
                ledger.daily.learned
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LeechPolicy;
    use crate::repository::load_or_init_ledger;

    fn setup_db() -> Database {
        let db = Database::open(":memory:").expect("Failed to create in-memory database");
        db.init().expect("Failed to initialize database");
        db
    }

    fn new_card(target: &str, native: &str) -> NewCard {
        NewCard {
            target_text: target.to_string(),
            native_text: native.to_string(),
            meta_info: None,
            tag: None,
            kind: CardKind::detect(target),
            in_study_queue: true,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    // Set review state directly, bypassing the scheduler
    fn schedule(db: &Database, id: i64, status: CardStatus, due: Option<NaiveDate>) {
        let mut card = db.get_card(id).unwrap().unwrap();
        card.status = status;
        card.due_date = due;
        db.upsert_card(&card).unwrap();
    }

    mod init_tests {
        use super::*;

        #[test]
        fn init_creates_tables() {
            let db = setup_db();
            for table in [
                "cards",
                "collections",
                "collection_segments",
                "review_history",
                "ledger",
            ] {
                let count: i64 = db
                    .conn
                    .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                        row.get(0)
                    })
                    .expect("table should exist");
                assert_eq!(count, 0, "{} should start empty", table);
            }
        }

        #[test]
        fn init_is_idempotent() {
            let db = setup_db();
            db.add_card(&new_card("Hund", "dog")).unwrap();

            db.init().expect("Re-init should succeed");

            let cards = db.list_cards(None, None).unwrap();
            assert_eq!(cards.len(), 1);
        }

        #[test]
        fn fresh_cards_start_unmastered() {
            let db = setup_db();
            let (id, _) = db.add_card(&new_card("Katze", "cat")).unwrap();

            let card = db.get_card(id).unwrap().unwrap();
            assert_eq!(card.consecutive_correct, 0);
            assert!(!card.is_mastered);
        }
    }

    mod card_tests {
        use super::*;

        #[test]
        fn add_card_defaults() {
            let db = setup_db();
            let (id, created) = db.add_card(&new_card("Hund", "dog")).unwrap();
            assert!(created);

            let card = db.get_card(id).unwrap().unwrap();
            assert_eq!(card.target_text, "Hund");
            assert_eq!(card.native_text, "dog");
            assert_eq!(card.kind, CardKind::Vocab);
            assert_eq!(card.status, CardStatus::New);
            assert!(card.in_study_queue);
            assert!(card.due_date.is_none());
            assert_eq!(card.interval_days, 0);
            assert_eq!(card.ease_factor, DEFAULT_EASE_FACTOR);
            assert!(card.locked_cloze_index.is_none());
        }

        #[test]
        fn add_card_duplicate_returns_existing_id() {
            let db = setup_db();
            let (first, _) = db.add_card(&new_card("Hund", "dog")).unwrap();
            let (second, created) = db.add_card(&new_card("Hund", "hound")).unwrap();
            assert_eq!(first, second);
            assert!(!created);

            let card = db.get_card(first).unwrap().unwrap();
            assert_eq!(card.native_text, "dog");
        }

        #[test]
        fn get_card_not_found() {
            let db = setup_db();
            assert!(db.get_card(999).unwrap().is_none());
        }

        #[test]
        fn upsert_round_trips_review_state() {
            let db = setup_db();
            let (id, _) = db
                .add_card(&new_card("Ich trinke gern grünen Tee", "I like green tea"))
                .unwrap();

            let mut card = db.get_card(id).unwrap().unwrap();
            card.status = CardStatus::Leech;
            card.interval_days = 5;
            card.ease_factor = 1.7;
            card.due_date = Some(day(12));
            card.lapse_count = 6;
            card.consecutive_correct = 2;
            card.locked_cloze_index = Some(3);
            card.is_mastered = true;
            db.upsert_card(&card).unwrap();

            let stored = db.get_card(id).unwrap().unwrap();
            assert_eq!(stored, card);
        }

        #[test]
        fn list_cards_filters_by_tag_and_kind() {
            let db = setup_db();
            let mut a = new_card("Hund", "dog");
            a.tag = Some("animals".into());
            let mut b = new_card("Der Hund schläft im Garten", "The dog sleeps in the garden");
            b.tag = Some("animals".into());
            db.add_card(&a).unwrap();
            db.add_card(&b).unwrap();
            db.add_card(&new_card("Brot", "bread")).unwrap();

            assert_eq!(db.list_cards(None, None).unwrap().len(), 3);
            assert_eq!(db.list_cards(Some("animals"), None).unwrap().len(), 2);
            let sentences = db
                .list_cards(Some("animals"), Some(CardKind::Sentence))
                .unwrap();
            assert_eq!(sentences.len(), 1);
            assert_eq!(sentences[0].native_text, "The dog sleeps in the garden");
        }

        #[test]
        fn edit_card_keeps_review_state() {
            let db = setup_db();
            let (id, _) = db
                .add_card(&new_card("Der Hund schläft", "The dog sleeps"))
                .unwrap();
            let mut card = db.get_card(id).unwrap().unwrap();
            card.status = CardStatus::Active;
            card.interval_days = 12;
            card.ease_factor = 2.1;
            card.due_date = Some(day(20));
            card.lapse_count = 2;
            card.consecutive_correct = 3;
            card.locked_cloze_index = Some(1);
            db.upsert_card(&card).unwrap();
            db.record_history(id, Grade::Good, Utc::now()).unwrap();

            let edited = db
                .edit_card(
                    id,
                    &CardEdit {
                        native_text: Some("The dog is sleeping".into()),
                        tag: Some("animals".into()),
                        ..CardEdit::default()
                    },
                )
                .unwrap();

            let stored = db.get_card(id).unwrap().unwrap();
            assert_eq!(stored, edited);
            assert_eq!(stored.native_text, "The dog is sleeping");
            assert_eq!(stored.tag.as_deref(), Some("animals"));
            assert_eq!(stored.status, CardStatus::Active);
            assert_eq!(stored.interval_days, 12);
            assert_eq!(stored.ease_factor, 2.1);
            assert_eq!(stored.due_date, Some(day(20)));
            assert_eq!(stored.lapse_count, 2);
            assert_eq!(stored.consecutive_correct, 3);
            assert_eq!(stored.locked_cloze_index, Some(1));
            assert_eq!(db.get_history(id).unwrap().len(), 1);
        }

        #[test]
        fn edit_target_drops_cloze_lock() {
            let db = setup_db();
            let (id, _) = db
                .add_card(&new_card("Der Hund schläft", "The dog sleeps"))
                .unwrap();
            let mut card = db.get_card(id).unwrap().unwrap();
            card.locked_cloze_index = Some(2);
            card.meta_info = Some("schlafen".into());
            db.upsert_card(&card).unwrap();

            let edited = db
                .edit_card(
                    id,
                    &CardEdit {
                        target_text: Some("Der Hund schläft tief".into()),
                        meta_info: Some(String::new()),
                        ..CardEdit::default()
                    },
                )
                .unwrap();
            assert_eq!(edited.target_text, "Der Hund schläft tief");
            assert!(edited.locked_cloze_index.is_none());
            assert!(edited.meta_info.is_none());
        }

        #[test]
        fn edit_card_rejects_taken_target_and_missing_id() {
            let db = setup_db();
            db.add_card(&new_card("Hund", "dog")).unwrap();
            let (id, _) = db.add_card(&new_card("Katze", "cat")).unwrap();

            let clash = CardEdit {
                target_text: Some("Hund".into()),
                ..CardEdit::default()
            };
            assert!(matches!(
                db.edit_card(id, &clash),
                Err(AppError::InvalidInput(_))
            ));
            assert_eq!(db.get_card(id).unwrap().unwrap().target_text, "Katze");

            assert!(matches!(
                db.edit_card(999, &CardEdit::default()),
                Err(AppError::CardNotFound(999))
            ));
        }

        #[test]
        fn delete_card_success_and_missing() {
            let db = setup_db();
            let (id, _) = db.add_card(&new_card("Hund", "dog")).unwrap();
            assert!(db.delete_card(id).unwrap());
            assert!(db.get_card(id).unwrap().is_none());
            assert!(!db.delete_card(id).unwrap());
        }

        #[test]
        fn promote_moves_story_card_into_queue() {
            let db = setup_db();
            let mut story = new_card("Fuchs", "fox");
            story.in_study_queue = false;
            let (id, _) = db.add_card(&story).unwrap();
            assert!(!db.get_card(id).unwrap().unwrap().in_study_queue);

            assert!(db.promote_card(id).unwrap());
            assert!(db.get_card(id).unwrap().unwrap().in_study_queue);
            assert!(!db.promote_card(999).unwrap());
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn due_query_respects_date_and_queue() {
            let db = setup_db();
            let (due, _) = db.add_card(&new_card("eins", "one")).unwrap();
            let (future, _) = db.add_card(&new_card("zwei", "two")).unwrap();
            db.add_card(&new_card("drei", "three")).unwrap();
            let mut story = new_card("vier", "four");
            story.in_study_queue = false;
            let (outside, _) = db.add_card(&story).unwrap();

            schedule(&db, due, CardStatus::Active, Some(day(10)));
            schedule(&db, future, CardStatus::Active, Some(day(11)));
            schedule(&db, outside, CardStatus::Active, Some(day(1)));

            let cards = db
                .query_cards(&CardQuery::due(day(10), LeechPolicy::Include))
                .unwrap();
            let ids: Vec<i64> = cards.iter().map(|c| c.id).collect();
            assert_eq!(ids, vec![due]);
        }

        #[test]
        fn activated_but_unscheduled_cards_are_due() {
            let db = setup_db();
            let (id, _) = db.add_card(&new_card("eins", "one")).unwrap();
            schedule(&db, id, CardStatus::Active, None);

            let cards = db
                .query_cards(&CardQuery::due(day(10), LeechPolicy::Include))
                .unwrap();
            assert_eq!(cards.len(), 1);
        }

        #[test]
        fn due_query_orders_most_overdue_first() {
            let db = setup_db();
            let (a, _) = db.add_card(&new_card("eins", "one")).unwrap();
            let (b, _) = db.add_card(&new_card("zwei", "two")).unwrap();
            schedule(&db, a, CardStatus::Active, Some(day(9)));
            schedule(&db, b, CardStatus::Active, Some(day(3)));

            let cards = db
                .query_cards(&CardQuery::due(day(10), LeechPolicy::Include))
                .unwrap();
            assert_eq!(cards[0].id, b);
            assert_eq!(cards[1].id, a);
        }

        #[test]
        fn leech_exclusion() {
            let db = setup_db();
            let (a, _) = db.add_card(&new_card("eins", "one")).unwrap();
            let (b, _) = db.add_card(&new_card("zwei", "two")).unwrap();
            schedule(&db, a, CardStatus::Leech, Some(day(1)));
            schedule(&db, b, CardStatus::Active, Some(day(1)));

            let include = CardQuery::due(day(10), LeechPolicy::Include);
            let exclude = CardQuery::due(day(10), LeechPolicy::Exclude);
            assert_eq!(db.count_cards(&include).unwrap(), 2);
            assert_eq!(db.count_cards(&exclude).unwrap(), 1);
        }

        #[test]
        fn new_cards_query_is_oldest_first_and_limited() {
            let db = setup_db();
            let (a, _) = db.add_card(&new_card("eins", "one")).unwrap();
            let (b, _) = db.add_card(&new_card("zwei", "two")).unwrap();
            db.add_card(&new_card("drei", "three")).unwrap();

            let cards = db.query_cards(&CardQuery::new_cards(2)).unwrap();
            let ids: Vec<i64> = cards.iter().map(|c| c.id).collect();
            assert_eq!(ids, vec![a, b]);
        }
    }

    mod collection_tests {
        use super::*;

        #[test]
        fn create_and_get_collection() {
            let db = setup_db();
            let (a, _) = db.add_card(&new_card("eins", "one")).unwrap();
            let (b, _) = db.add_card(&new_card("zwei", "two")).unwrap();

            let id = db
                .create_collection("Chapter 1", &[Some(b), None, Some(a)])
                .unwrap();
            let collection = db.get_collection(id).unwrap().unwrap();
            assert_eq!(collection.name, "Chapter 1");
            assert_eq!(collection.segments.len(), 3);
            assert_eq!(collection.card_ids(), vec![b, a]);
            assert_eq!(db.collection_card_ids(id).unwrap(), Some(vec![b, a]));
        }

        #[test]
        fn unknown_card_is_rejected() {
            let db = setup_db();
            let err = db.create_collection("Bad", &[Some(42)]).unwrap_err();
            assert!(matches!(err, AppError::CardNotFound(42)));
            assert!(db.list_collections().unwrap().is_empty());
        }

        #[test]
        fn missing_collection_is_none() {
            let db = setup_db();
            assert!(db.get_collection(7).unwrap().is_none());
            assert!(db.collection_card_ids(7).unwrap().is_none());
        }

        #[test]
        fn deleting_card_empties_its_segment() {
            let db = setup_db();
            let (a, _) = db.add_card(&new_card("eins", "one")).unwrap();
            let id = db.create_collection("C", &[Some(a)]).unwrap();

            db.delete_card(a).unwrap();

            let collection = db.get_collection(id).unwrap().unwrap();
            assert_eq!(collection.segments.len(), 1);
            assert!(collection.segments[0].card_id.is_none());
        }
    }

    mod tag_tests {
        use super::*;

        #[test]
        fn list_tags_with_counts() {
            let db = setup_db();
            for (target, tag) in [("eins", "numbers"), ("zwei", "numbers"), ("Hund", "animals")] {
                let mut card = new_card(target, "x");
                card.tag = Some(tag.into());
                db.add_card(&card).unwrap();
            }
            db.add_card(&new_card("untagged", "x")).unwrap();

            let tags = db.list_tags().unwrap();
            assert_eq!(tags.len(), 2);
            assert_eq!(tags[0].name, "animals");
            assert_eq!(tags[0].card_count, 1);
            assert_eq!(tags[1].card_count, 2);
        }
    }

    mod history_tests {
        use super::*;

        #[test]
        fn record_history_and_read_back() {
            let db = setup_db();
            let (id, _) = db.add_card(&new_card("eins", "one")).unwrap();
            db.record_history(id, Grade::Again, Utc::now()).unwrap();
            db.record_history(id, Grade::Good, Utc::now()).unwrap();

            let history = db.get_history(id).unwrap();
            assert_eq!(history.len(), 2);
            assert_eq!(history[0].grade, Grade::Good);
        }

        #[test]
        fn history_goes_with_the_card() {
            let db = setup_db();
            let (id, _) = db.add_card(&new_card("eins", "one")).unwrap();
            db.record_history(id, Grade::Good, Utc::now()).unwrap();
            db.delete_card(id).unwrap();
            assert!(db.get_history(id).unwrap().is_empty());
        }
    }

    mod ledger_tests {
        use super::*;

        #[test]
        fn empty_db_has_no_ledger() {
            let db = setup_db();
            assert!(db.load_ledger().unwrap().is_none());
        }

        #[test]
        fn save_and_load_round_trip() {
            let db = setup_db();
            let mut ledger = Ledger::new(100);
            ledger.daily_check(day(3), 50);
            ledger.record_learn(day(3), 20);
            db.save_ledger(&ledger).unwrap();

            ledger.spend(30).unwrap();
            db.save_ledger(&ledger).unwrap();

            assert_eq!(db.load_ledger().unwrap(), Some(ledger));
        }

        #[test]
        fn load_or_init_creates_once() {
            let db = setup_db();
            let ledger = load_or_init_ledger(&db, 100).unwrap();
            assert_eq!(ledger.balance, 100);

            let mut changed = ledger.clone();
            changed.add_currency(5);
            db.save_ledger(&changed).unwrap();

            let again = load_or_init_ledger(&db, 100).unwrap();
            assert_eq!(again.balance, 105);
        }
    }

    mod stats_tests {
        use super::*;

        #[test]
        fn stats_empty_db() {
            let db = setup_db();
            let stats = db.get_stats(day(1)).unwrap();
            assert_eq!(stats.total_cards, 0);
            assert_eq!(stats.due_today, 0);
            assert_eq!(stats.total_reviews, 0);
        }

        #[test]
        fn stats_counts_by_state() {
            let db = setup_db();
            let (a, _) = db.add_card(&new_card("eins", "one")).unwrap();
            let (b, _) = db.add_card(&new_card("zwei", "two")).unwrap();
            db.add_card(&new_card("drei", "three")).unwrap();
            let mut story = new_card("vier", "four");
            story.in_study_queue = false;
            db.add_card(&story).unwrap();

            schedule(&db, a, CardStatus::Leech, Some(day(2)));
            schedule(&db, b, CardStatus::Active, Some(day(20)));
            db.record_history(a, Grade::Again, Utc::now()).unwrap();

            let stats = db.get_stats(day(5)).unwrap();
            assert_eq!(stats.total_cards, 4);
            assert_eq!(stats.new_cards, 1);
            assert_eq!(stats.story_only, 1);
            assert_eq!(stats.leeches, 1);
            assert_eq!(stats.due_today, 1);
            assert_eq!(stats.total_reviews, 1);
        }
    }
}
