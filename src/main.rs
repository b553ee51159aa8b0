mod arcade;
mod clock;
mod config;
mod db;
mod error;
mod ledger;
mod models;
mod repository;
mod review;
mod scheduler;
mod text;
mod timer;
mod tui;

use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;

use clock::{Clock, SystemClock};
use config::Settings;
use db::Database;
use error::{AppError, Result};
use ledger::Ledger;
use models::{CardEdit, CardKind, Grade, JsonOutput, NewCard};
use repository::{load_or_init_ledger, CardQuery, Repository, StudyContext};
use review::SessionMode;
use tui::Launch;

#[derive(Parser)]
#[command(name = "clozeflash")]
#[command(about = "Spaced-repetition flashcards with cloze review, cram sessions and an arcade")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Manage cards
    #[command(subcommand)]
    Card(CardCommands),

    /// Manage collections
    #[command(subcommand)]
    Collection(CollectionCommands),

    /// List all tags
    Tags,

    /// Show study statistics
    Stats,

    /// Show sparks, streak and level
    Wallet,

    /// List cards due today
    Due,

    /// Grade a single card outside a session
    Grade {
        /// Card ID
        id: i64,

        /// Rating: again/hard/good/easy or 0-3
        rating: String,
    },

    /// Start a review session in the terminal UI
    Study {
        #[arg(long, short, value_enum, default_value_t = StudyMode::Due)]
        mode: StudyMode,

        /// Number of new cards to introduce
        #[arg(long, short)]
        batch: Option<usize>,

        /// Cram filter: tag
        #[arg(long, short)]
        tag: Option<String>,

        /// Cram filter: vocab or sentence
        #[arg(long, short)]
        kind: Option<String>,

        /// Cram card limit
        #[arg(long, short)]
        limit: Option<usize>,

        /// Collection ID for collection mode
        #[arg(long, short)]
        collection: Option<i64>,
    },

    /// Play the arcade recall game in the terminal UI
    Arcade,

    /// Launch interactive terminal UI
    Tui,
}

#[derive(Subcommand)]
enum CardCommands {
    /// Add a new card
    Add {
        /// Text in the language being learned
        target: String,

        /// Translation
        #[arg(long, short)]
        native: String,

        /// Notes shown on the back side
        #[arg(long, short)]
        meta: Option<String>,

        #[arg(long, short)]
        tag: Option<String>,

        /// vocab or sentence; detected from the text when omitted
        #[arg(long, short)]
        kind: Option<String>,

        /// Keep the card out of the study queue
        #[arg(long)]
        story: bool,
    },

    /// List cards
    List {
        /// Filter by tag
        #[arg(long, short)]
        tag: Option<String>,

        /// Filter by kind
        #[arg(long, short)]
        kind: Option<String>,
    },

    /// Show card details and review history
    Show {
        /// Card ID
        id: i64,
    },

    /// Change a card's text, notes, tag or kind; its review state is kept
    Edit {
        /// Card ID
        id: i64,

        #[arg(long)]
        target: Option<String>,

        #[arg(long, short)]
        native: Option<String>,

        /// Notes shown on the back side; an empty value clears them
        #[arg(long, short)]
        meta: Option<String>,

        /// An empty value clears the tag
        #[arg(long, short)]
        tag: Option<String>,

        #[arg(long, short)]
        kind: Option<String>,
    },

    /// Delete a card
    Delete {
        /// Card ID
        id: i64,
    },

    /// Move a story-only card into the study queue
    Promote {
        /// Card ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum CollectionCommands {
    /// Create a collection from card IDs; use '-' for an empty segment
    Create {
        name: String,

        /// Comma-separated card IDs in order
        #[arg(long, short)]
        cards: String,
    },

    /// List collections
    List,

    /// Show a collection's segments
    Show {
        /// Collection ID
        id: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StudyMode {
    Due,
    New,
    Cram,
    Collection,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli) {
        if json {
            match serde_json::to_string(&JsonOutput::<()>::err(e.to_string())) {
                Ok(out) => println!("{}", out),
                Err(_) => eprintln!("Error: {}", e),
            }
        } else if e.is_non_fatal() {
            println!("{}", e);
        } else {
            eprintln!("Error: {}", e);
        }
        if !e.is_non_fatal() {
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load()?;
    let db_path = settings.db_path();
    let db = Database::open(&db_path)?;
    db.init()?;

    let clock = SystemClock;
    let mut ledger = load_or_init_ledger(&db, settings.ledger.starting_balance)?;
    if let Some(bonus) = ledger.daily_check(clock.today(), settings.ledger.daily_bonus) {
        log::info!("daily bonus: +{} sparks", bonus);
        db.save_ledger(&ledger)?;
    }

    match cli.command {
        Commands::Init => {
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else {
                println!("Database initialized at: {}", db_path.display());
            }
        }

        Commands::Card(card_cmd) => match card_cmd {
            CardCommands::Add {
                target,
                native,
                meta,
                tag,
                kind,
                story,
            } => {
                let kind = match kind {
                    Some(k) => parse_kind(&k)?,
                    None => CardKind::detect(&target),
                };
                let (id, created) = db.add_card(&NewCard {
                    target_text: target.clone(),
                    native_text: native,
                    meta_info: meta,
                    tag,
                    kind,
                    in_study_queue: !story,
                })?;

                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                            "id": id,
                            "created": created,
                            "kind": kind.as_str()
                        })))?
                    );
                } else if created {
                    println!("Added {} card '{}' with ID: {}", kind.as_str(), target, id);
                } else {
                    println!("Card '{}' already exists with ID: {}", target, id);
                }
            }

            CardCommands::List { tag, kind } => {
                let kind = kind.as_deref().map(parse_kind).transpose()?;
                let cards = db.list_cards(tag.as_deref(), kind)?;
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&cards))?);
                } else if cards.is_empty() {
                    println!("No cards found.");
                } else {
                    println!(
                        "{:<5} {:<30} {:<25} {:<9} {:<10} DUE",
                        "ID", "TARGET", "NATIVE", "KIND", "STATUS"
                    );
                    println!("{}", "-".repeat(92));
                    for card in cards {
                        let due = if !card.in_study_queue {
                            "story".to_string()
                        } else {
                            format_due(&card)
                        };
                        println!(
                            "{:<5} {:<30} {:<25} {:<9} {:<10} {}",
                            card.id,
                            truncate(&card.target_text, 28),
                            truncate(&card.native_text, 23),
                            card.kind.as_str(),
                            card.status_label(),
                            due
                        );
                    }
                }
            }

            CardCommands::Show { id } => {
                let card = db.get_card(id)?.ok_or(AppError::CardNotFound(id))?;
                let history = db.get_history(id)?;

                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                            "card": card,
                            "history": history
                        })))?
                    );
                } else {
                    println!("Card: {}", card.target_text);
                    println!("ID: {}", card.id);
                    println!("Native: {}", card.native_text);
                    if let Some(meta) = &card.meta_info {
                        println!("Notes: {}", meta);
                    }
                    println!("Tag: {}", card.tag.as_deref().unwrap_or("-"));
                    println!("Kind: {}", card.kind.as_str());
                    println!("Created: {}", card.created_at);

                    println!();
                    println!("--- Schedule ---");
                    println!(
                        "Status: {}{}",
                        card.status_label(),
                        if card.in_study_queue { "" } else { " (story only)" }
                    );
                    println!("Interval: {} days", card.interval_days);
                    println!("Ease: {:.2}", card.ease_factor);
                    println!("Due: {}", format_due(&card));
                    println!(
                        "Lapses: {} (streak {})",
                        card.lapse_count, card.consecutive_correct
                    );

                    if !history.is_empty() {
                        println!();
                        println!("--- History ---");
                        for record in history.iter().take(10) {
                            println!("{}  {}", record.reviewed_at, record.grade.label());
                        }
                    }
                }
            }

            CardCommands::Edit {
                id,
                target,
                native,
                meta,
                tag,
                kind,
            } => {
                let edit = CardEdit {
                    target_text: target,
                    native_text: native,
                    meta_info: meta,
                    tag,
                    kind: kind.as_deref().map(parse_kind).transpose()?,
                };
                if edit.is_empty() {
                    return Err(AppError::InvalidInput(
                        "nothing to change. Use --target, --native, --meta, --tag or --kind".into(),
                    ));
                }
                let card = db.edit_card(id, &edit)?;

                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&card))?);
                } else {
                    println!("Card {} updated: {} / {}", card.id, card.target_text, card.native_text);
                }
            }

            CardCommands::Delete { id } => {
                if !db.delete_card(id)? {
                    return Err(AppError::CardNotFound(id));
                }
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
                } else {
                    println!("Card {} deleted.", id);
                }
            }

            CardCommands::Promote { id } => {
                if !db.promote_card(id)? {
                    return Err(AppError::CardNotFound(id));
                }
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
                } else {
                    println!("Card {} added to the study queue.", id);
                }
            }
        },

        Commands::Collection(collection_cmd) => match collection_cmd {
            CollectionCommands::Create { name, cards } => {
                let segments = parse_segments(&cards)?;
                let id = db.create_collection(&name, &segments)?;

                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                            "id": id,
                            "name": name
                        })))?
                    );
                } else {
                    println!(
                        "Created collection '{}' with ID: {} ({} segments)",
                        name,
                        id,
                        segments.len()
                    );
                }
            }

            CollectionCommands::List => {
                let collections = db.list_collections()?;
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&collections))?);
                } else if collections.is_empty() {
                    println!("No collections found.");
                } else {
                    println!("{:<5} {:<40} CARDS", "ID", "NAME");
                    println!("{}", "-".repeat(55));
                    for c in collections {
                        println!(
                            "{:<5} {:<40} {}/{}",
                            c.id,
                            truncate(&c.name, 38),
                            c.card_ids().len(),
                            c.segments.len()
                        );
                    }
                }
            }

            CollectionCommands::Show { id } => {
                let collection = db
                    .get_collection(id)?
                    .ok_or(AppError::CollectionNotFound(id))?;

                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&collection))?);
                } else {
                    println!("Collection: {}", collection.name);
                    println!("ID: {}", collection.id);
                    println!();
                    for segment in &collection.segments {
                        match segment.card_id {
                            Some(card_id) => {
                                let text = db
                                    .get_card(card_id)?
                                    .map(|c| c.target_text)
                                    .unwrap_or_default();
                                println!("{:>3}. [{}] {}", segment.position, card_id, text);
                            }
                            None => println!("{:>3}. -", segment.position),
                        }
                    }
                }
            }
        },

        Commands::Tags => {
            let tags = db.list_tags()?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&tags))?);
            } else if tags.is_empty() {
                println!("No tags found.");
            } else {
                println!("{:<30} CARDS", "TAG");
                println!("{}", "-".repeat(40));
                for tag in tags {
                    println!("{:<30} {}", tag.name, tag.card_count);
                }
            }
        }

        Commands::Stats => {
            let stats = db.get_stats(clock.today())?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&stats))?);
            } else {
                println!("=== Study Statistics ===");
                println!("Total cards: {}", stats.total_cards);
                println!("New: {}", stats.new_cards);
                println!("Story only: {}", stats.story_only);
                println!("Leeches: {}", stats.leeches);
                println!("Mastered: {}", stats.mastered);
                println!("Due today: {}", stats.due_today);
                println!("Total reviews: {}", stats.total_reviews);
            }
        }

        Commands::Wallet => {
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&ledger))?);
            } else {
                print_wallet(&ledger);
            }
        }

        Commands::Due => {
            let cards = db.query_cards(&CardQuery::due(
                clock.today(),
                settings.scheduling.leech_policy,
            ))?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&cards))?);
            } else if cards.is_empty() {
                println!("Nothing due. Add cards or study new ones with: clozeflash study --mode new");
            } else {
                println!("{:<5} {:<30} {:<10} DUE", "ID", "TARGET", "STATUS");
                println!("{}", "-".repeat(60));
                for card in cards {
                    println!(
                        "{:<5} {:<30} {:<10} {}",
                        card.id,
                        truncate(&card.target_text, 28),
                        card.status_label(),
                        format_due(&card)
                    );
                }
            }
        }

        Commands::Grade { id, rating } => {
            let grade = Grade::from_str(&rating).ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "invalid rating '{}'. Use: again, hard, good, easy or 0-3",
                    rating
                ))
            })?;
            let card = db.get_card(id)?.ok_or(AppError::CardNotFound(id))?;

            let mut rng = StdRng::from_entropy();
            let mut ctx = StudyContext {
                repo: &db,
                ledger: &mut ledger,
                clock: &clock,
                rng: &mut rng,
                settings: &settings,
            };
            let (updated, level_up) =
                review::apply_grade(&mut ctx, &card, grade, card.locked_cloze_index)?;

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&updated))?);
            } else {
                println!("Graded card {} as {}.", id, grade.label());
                println!(
                    "Next review: {} ({} days)",
                    format_due(&updated),
                    updated.interval_days
                );
                if updated.is_mastered && !card.is_mastered {
                    println!("Card mastered!");
                }
                if let Some(level) = level_up {
                    println!("Level up! You are now level {}.", level);
                }
            }
        }

        Commands::Study {
            mode,
            batch,
            tag,
            kind,
            limit,
            collection,
        } => {
            let mode = match mode {
                StudyMode::Due => SessionMode::Due,
                StudyMode::New => SessionMode::New {
                    batch_size: batch.unwrap_or(settings.review.new_batch_size),
                },
                StudyMode::Cram => SessionMode::Cram {
                    tag,
                    kind: kind.as_deref().map(parse_kind).transpose()?,
                    limit: limit.unwrap_or(settings.cram.limit),
                },
                StudyMode::Collection => SessionMode::Collection {
                    id: collection.ok_or_else(|| {
                        AppError::InvalidInput("collection mode needs --collection <id>".into())
                    })?,
                },
            };
            tui::run(db, settings, ledger, Launch::Study(mode))?;
        }

        Commands::Arcade => {
            tui::run(db, settings, ledger, Launch::Arcade)?;
        }

        Commands::Tui => {
            tui::run(db, settings, ledger, Launch::Dashboard)?;
        }
    }

    Ok(())
}

fn parse_kind(s: &str) -> Result<CardKind> {
    CardKind::from_str(s).ok_or_else(|| {
        AppError::InvalidInput(format!("invalid kind '{}'. Use: vocab or sentence", s))
    })
}

/// Parse "1,2,-,4" into segments; '-' or an empty item is an empty segment.
fn parse_segments(s: &str) -> Result<Vec<Option<i64>>> {
    s.split(',')
        .map(|item| {
            let item = item.trim();
            if item.is_empty() || item == "-" {
                return Ok(None);
            }
            item.parse::<i64>()
                .map(Some)
                .map_err(|_| AppError::InvalidInput(format!("invalid card id '{}'", item)))
        })
        .collect()
}

fn format_due(card: &models::Card) -> String {
    match card.due_date {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None if card.status == models::CardStatus::New => "new".to_string(),
        None => "now".to_string(),
    }
}

fn print_wallet(ledger: &Ledger) {
    println!("=== Wallet ===");
    println!("Sparks: {}", ledger.balance);
    println!("Streak: {} days", ledger.streak);
    println!(
        "Level: {} ({}/{} XP)",
        ledger.level,
        ledger.xp % ledger::XP_PER_LEVEL,
        ledger::XP_PER_LEVEL
    );
    println!(
        "Today: {} reviewed, {} learned",
        ledger.daily.reviews, ledger.daily.learned
    );
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
