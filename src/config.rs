use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

const APP_DIR: &str = "clozeflash";
const DEFAULT_DB_NAME: &str = "clozeflash.db";
const DEFAULT_CONFIG_NAME: &str = "config.toml";

/// Which spaced-repetition formula drives interval growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingModel {
    /// Four-bucket linear multipliers (1.2 / 2.5 / 4.0)
    #[default]
    Multiplier,
    /// SM-2 style ease factor growth
    EaseFactor,
}

/// Whether leech cards stay in due and arcade pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeechPolicy {
    #[default]
    Include,
    Exclude,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMode {
    /// Edit-distance tolerant matching
    #[default]
    Fuzzy,
    /// Exact answers against a per-card countdown
    Strict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingSettings {
    pub model: SchedulingModel,
    pub leech_policy: LeechPolicy,
}

impl Default for SchedulingSettings {
    fn default() -> Self {
        Self {
            model: SchedulingModel::Multiplier,
            leech_policy: LeechPolicy::Include,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewSettings {
    pub new_batch_size: usize,
    /// Chance that a vocab card shows the target side first
    pub recognition_probability: f64,
}

const DEFAULT_RECOGNITION_PROBABILITY: f64 = 0.7;

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            new_batch_size: 10,
            recognition_probability: DEFAULT_RECOGNITION_PROBABILITY,
        }
    }
}

impl ReviewSettings {
    /// `recognition_probability` as a usable chance in `[0, 1]`.
    pub fn recognition_chance(&self) -> f64 {
        if self.recognition_probability.is_finite() {
            self.recognition_probability.clamp(0.0, 1.0)
        } else {
            DEFAULT_RECOGNITION_PROBABILITY
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CramSettings {
    pub cost: u32,
    pub limit: usize,
}

impl Default for CramSettings {
    fn default() -> Self {
        Self { cost: 50, limit: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArcadeSettings {
    pub min_cards: usize,
    pub working_set: usize,
    pub answer_mode: AnswerMode,
    pub watch_base_ms: u64,
    pub watch_decay: f64,
    pub watch_floor_ms: u64,
    pub countdown_base_ms: u64,
    pub countdown_decay: f64,
    pub reward_per_round: u32,
}

impl Default for ArcadeSettings {
    fn default() -> Self {
        Self {
            min_cards: 5,
            working_set: 10,
            answer_mode: AnswerMode::Fuzzy,
            watch_base_ms: 3000,
            watch_decay: 0.8,
            watch_floor_ms: 250,
            countdown_base_ms: 10_000,
            countdown_decay: 0.95,
            reward_per_round: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    pub starting_balance: u32,
    pub daily_bonus: u32,
    pub xp_review: u32,
    pub xp_learn: u32,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            starting_balance: 100,
            daily_bonus: 50,
            xp_review: 10,
            xp_learn: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: Option<PathBuf>,
    pub scheduling: SchedulingSettings,
    pub review: ReviewSettings,
    pub cram: CramSettings,
    pub arcade: ArcadeSettings,
    pub ledger: LedgerSettings,
}

impl Settings {
    /// Load from `CLOZEFLASH_CONFIG` or the default config location. A missing
    /// file yields defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let mut settings: Settings = toml::from_str(&raw)?;
        if !settings.review.recognition_probability.is_finite() {
            log::warn!(
                "review.recognition_probability = {} in {}, using {}",
                settings.review.recognition_probability,
                path.display(),
                DEFAULT_RECOGNITION_PROBABILITY
            );
            settings.review.recognition_probability = DEFAULT_RECOGNITION_PROBABILITY;
        }
        log::debug!("loaded config from {}", path.display());
        Ok(settings)
    }

    /// `CLOZEFLASH_DB` wins over the config file, which wins over the default.
    pub fn db_path(&self) -> PathBuf {
        if let Ok(path) = std::env::var("CLOZEFLASH_DB") {
            return PathBuf::from(path);
        }
        if let Some(path) = &self.database {
            return path.clone();
        }

        let dir = app_dir();
        std::fs::create_dir_all(&dir).ok();
        dir.join(DEFAULT_DB_NAME)
    }
}

fn app_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("CLOZEFLASH_CONFIG") {
        return PathBuf::from(path);
    }
    app_dir().join(DEFAULT_CONFIG_NAME)
}
