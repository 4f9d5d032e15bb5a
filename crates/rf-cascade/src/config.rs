//! Engine configuration
//!
//! Every tunable table and constant lives here so the engine can be driven
//! with alternative maths. `EngineConfig::standard()` is the shipped game.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paytable::{Paytable, round_cents};
use crate::symbols::{Level, Symbol, SymbolKind};

/// Weights and paytable for one level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub level: Level,
    /// Relative sampling weight per symbol (need not sum to 1)
    pub weights: BTreeMap<Symbol, f64>,
    pub paytable: Paytable,
}

impl LevelConfig {
    pub fn standard(level: Level) -> Self {
        let mut weights = BTreeMap::new();
        for symbol in [
            Symbol::Purple,
            Symbol::Green,
            Symbol::Yellow,
            Symbol::Blue,
            Symbol::Red,
        ] {
            weights.insert(symbol, 0.15);
        }
        let (clover, stage_clear) = match level {
            Level::One => (0.15, 0.002),
            Level::Two => (0.30, 0.05),
            Level::Three => (0.35, 0.05),
        };
        weights.insert(Symbol::Clover, clover);
        weights.insert(level.stage_clear_symbol(), stage_clear);
        weights.insert(Symbol::RainbowEgg, 0.01);

        Self {
            level,
            weights,
            paytable: Paytable::standard(level),
        }
    }

    /// Weights as an ordered list, optionally without the trigger symbol
    pub fn weight_list(&self, allow_trigger: bool) -> Vec<(Symbol, f64)> {
        self.weights
            .iter()
            .filter(|(s, _)| allow_trigger || !s.is_trigger())
            .map(|(s, w)| (*s, *w))
            .collect()
    }
}

/// Accepted bet amount and its integer multiplier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetOption {
    pub amount: f64,
    pub multiplier: u32,
}

/// Stage progression and free-round settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionConfig {
    /// Stage-clear symbols needed to advance a level
    pub stage_target: u32,
    /// Free rounds awarded by a trigger
    pub free_rounds: u32,
    /// Drop carried-over progress when advancing from the top level
    pub reset_progress_on_wrap: bool,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            stage_target: 15,
            free_rounds: 10,
            reset_progress_on_wrap: true,
        }
    }
}

/// Biased generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Random draws before falling back to a forced grid
    pub max_attempts: usize,
    /// Chance a forced winning run uses the bonus symbol
    pub force_win_bonus_chance: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            force_win_bonus_chance: 0.4,
        }
    }
}

/// Chance that a refilled cell is the bonus symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefillConfig {
    pub stage_clear_bonus_chance: f64,
    pub cascade_bonus_chance: f64,
}

impl Default for RefillConfig {
    fn default() -> Self {
        Self {
            stage_clear_bonus_chance: 0.3,
            cascade_bonus_chance: 0.5,
        }
    }
}

/// Attempt budget for restricted loss enforcement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcementEffort {
    pub max_attempts: usize,
    /// Cells resampled per attempt
    pub mutations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnforcementConfig {
    pub stage_clear: EnforcementEffort,
    pub cascade: EnforcementEffort,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            stage_clear: EnforcementEffort {
                max_attempts: 50,
                mutations: 3,
            },
            cascade: EnforcementEffort {
                max_attempts: 50,
                mutations: 4,
            },
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub levels: Vec<LevelConfig>,
    /// Value of one paytable unit at bet multiplier 1
    pub denomination: f64,
    pub bet_table: Vec<BetOption>,
    /// Cascade multiplier ladder; step 0 must be 1×
    pub multiplier_ladder: Vec<f64>,
    #[serde(default)]
    pub progression: ProgressionConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub refill: RefillConfig,
    #[serde(default)]
    pub enforcement: EnforcementConfig,
}

impl EngineConfig {
    /// The shipped game maths
    pub fn standard() -> Self {
        Self {
            levels: Level::ALL.iter().map(|l| LevelConfig::standard(*l)).collect(),
            denomination: 0.01,
            bet_table: vec![
                BetOption { amount: 0.1, multiplier: 1 },
                BetOption { amount: 0.2, multiplier: 2 },
                BetOption { amount: 0.3, multiplier: 3 },
                BetOption { amount: 0.5, multiplier: 5 },
                BetOption { amount: 1.0, multiplier: 10 },
            ],
            multiplier_ladder: vec![1.0, 2.0, 3.0, 4.0, 5.0, 10.0],
            progression: ProgressionConfig::default(),
            generation: GenerationConfig::default(),
            refill: RefillConfig::default(),
            enforcement: EnforcementConfig::default(),
        }
    }

    /// Parse from JSON and validate
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from YAML and validate
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Configuration for a level
    ///
    /// Validated configs hold every level; on an unvalidated config a missing
    /// level falls back to the standard table.
    pub fn level(&self, level: Level) -> std::borrow::Cow<'_, LevelConfig> {
        match self.levels.iter().find(|l| l.level == level) {
            Some(cfg) => std::borrow::Cow::Borrowed(cfg),
            None => std::borrow::Cow::Owned(LevelConfig::standard(level)),
        }
    }

    /// Integer multiplier for a bet amount, compared at cent precision
    pub fn bet_multiplier(&self, amount: f64) -> Option<u32> {
        let cents = round_cents(amount);
        self.bet_table
            .iter()
            .find(|b| (round_cents(b.amount) - cents).abs() < 1e-9)
            .map(|b| b.multiplier)
    }

    /// Cascade multiplier at a ladder step (clamped to the top step)
    pub fn ladder_multiplier(&self, step: usize) -> f64 {
        self.multiplier_ladder
            .get(step.min(self.max_ladder_step()))
            .copied()
            .unwrap_or(1.0)
    }

    /// Highest ladder index
    pub fn max_ladder_step(&self) -> usize {
        self.multiplier_ladder.len().saturating_sub(1)
    }

    /// Price a cluster: base × denomination × bet multiplier, rounded to cents
    pub fn payout(&self, symbol: Symbol, size: usize, level: Level, bet_multiplier: u32) -> f64 {
        self.level(level)
            .paytable
            .payout(symbol, size, bet_multiplier, self.denomination)
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        for level in Level::ALL {
            let count = self.levels.iter().filter(|l| l.level == level).count();
            match count {
                0 => return Err(ConfigError::MissingLevel(level.as_u8())),
                1 => {}
                _ => {
                    return Err(ConfigError::Validation(format!(
                        "level {} configured {} times",
                        level, count
                    )));
                }
            }
        }

        for cfg in &self.levels {
            self.validate_level(cfg)?;
        }

        if !(self.denomination > 0.0) {
            return Err(ConfigError::Validation(
                "denomination must be positive".into(),
            ));
        }
        if self.bet_table.is_empty() {
            return Err(ConfigError::Validation("bet table is empty".into()));
        }
        if let Some(bet) = self
            .bet_table
            .iter()
            .find(|b| !(b.amount > 0.0) || b.multiplier == 0)
        {
            return Err(ConfigError::Validation(format!(
                "bet option {} → {} must be positive",
                bet.amount, bet.multiplier
            )));
        }

        match self.multiplier_ladder.first() {
            None => {
                return Err(ConfigError::Validation(
                    "multiplier ladder is empty".into(),
                ));
            }
            Some(first) if (*first - 1.0).abs() > f64::EPSILON => {
                return Err(ConfigError::Validation(format!(
                    "multiplier ladder must start at 1x, found {}x",
                    first
                )));
            }
            Some(_) => {}
        }

        if self.progression.stage_target == 0 {
            return Err(ConfigError::Validation(
                "stage target must be at least 1".into(),
            ));
        }

        for (name, p) in [
            ("force_win_bonus_chance", self.generation.force_win_bonus_chance),
            ("stage_clear_bonus_chance", self.refill.stage_clear_bonus_chance),
            ("cascade_bonus_chance", self.refill.cascade_bonus_chance),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::Validation(format!(
                    "{} must be within [0, 1], found {}",
                    name, p
                )));
            }
        }

        Ok(())
    }

    fn validate_level(&self, cfg: &LevelConfig) -> Result<(), ConfigError> {
        let level = cfg.level;
        for (symbol, weight) in &cfg.weights {
            if !(*weight > 0.0) || !weight.is_finite() {
                return Err(ConfigError::Validation(format!(
                    "level {}: weight for {} must be positive",
                    level, symbol
                )));
            }
            if symbol.kind() == SymbolKind::StageClear && *symbol != level.stage_clear_symbol() {
                return Err(ConfigError::Validation(format!(
                    "level {}: {} belongs to another level",
                    level, symbol
                )));
            }
        }

        let forming = cfg
            .weights
            .keys()
            .filter(|s| s.forms_connections())
            .count();
        if forming < 3 {
            return Err(ConfigError::Validation(format!(
                "level {}: needs at least three connection-forming symbols",
                level
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::standard()
    }
}
