//! Phase requests, responses and input validation

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::connections::{Connection, StageClearSymbol};
use crate::error::{CascadeError, CascadeResult};
use crate::state::GameState;
use crate::symbols::Level;

/// Who is playing which bet
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoundIdentity {
    pub client_id: String,
    pub game_id: String,
    pub player_id: String,
    pub bet_id: String,
}

impl RoundIdentity {
    pub fn new(
        client_id: impl Into<String>,
        game_id: impl Into<String>,
        player_id: impl Into<String>,
        bet_id: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            game_id: game_id.into(),
            player_id: player_id.into(),
            bet_id: bet_id.into(),
        }
    }

    /// Every id must be non-empty
    pub fn validate(&self) -> CascadeResult<()> {
        for (name, value) in [
            ("client_id", &self.client_id),
            ("game_id", &self.game_id),
            ("player_id", &self.player_id),
            ("bet_id", &self.bet_id),
        ] {
            if value.trim().is_empty() {
                return Err(CascadeError::MissingField(name));
            }
        }
        Ok(())
    }
}

/// Caller network details forwarded to the oracle
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientContext {
    pub ip: String,
    pub user_agent: String,
}

/// Input to every phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRequest {
    pub state: GameState,
    pub identity: RoundIdentity,
    #[serde(default)]
    pub context: ClientContext,
}

impl RoundRequest {
    pub fn new(state: GameState, identity: RoundIdentity) -> Self {
        Self {
            state,
            identity,
            context: ClientContext::default(),
        }
    }

    pub fn with_context(mut self, context: ClientContext) -> Self {
        self.context = context;
        self
    }

    /// Ids and bet; returns the bet multiplier
    pub fn validate(&self, config: &EngineConfig) -> CascadeResult<u32> {
        self.identity.validate()?;
        config
            .bet_multiplier(self.state.bet.amount)
            .ok_or(CascadeError::InvalidBet(self.state.bet.amount))
    }

    /// Checks for a continuation phase: ids, bet, and a complete grid of the
    /// level's size
    pub fn validate_continuation(&self, config: &EngineConfig) -> CascadeResult<u32> {
        let multiplier = self.validate(config)?;
        let grid = &self.state.grid;
        grid.validate_dimensions(self.state.level.grid_size())?;
        grid.validate_complete()?;
        Ok(multiplier)
    }
}

/// How the oracle's verdict was applied to a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeResolution {
    /// No priced connection, so the oracle was not asked
    #[default]
    NotConsulted,
    /// The oracle allowed the win
    Win,
    /// The oracle refused and a fresh losing grid replaced the win
    LossRegenerated,
    /// The oracle refused and refilled cells were mutated into a loss
    LossEnforced,
    /// The oracle refused but no loss was reachable; the win stands
    LossBypassed,
}

impl OutcomeResolution {
    pub fn is_bypass(self) -> bool {
        self == OutcomeResolution::LossBypassed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinResponse {
    pub state: GameState,
    pub stage_clear_symbols: Vec<StageClearSymbol>,
    pub has_stage_clear: bool,
    pub total_cost: f64,
    pub resolution: OutcomeResolution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageClearResponse {
    pub state: GameState,
    pub stage_clear_count: usize,
    pub level_advanced: bool,
    pub old_level: Level,
    pub new_level: Level,
    pub connections: Vec<Connection>,
    pub total_cost: f64,
    pub resolution: OutcomeResolution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeResponse {
    pub state: GameState,
    pub connections: Vec<Connection>,
    pub stage_clear_symbols: Vec<StageClearSymbol>,
    pub has_stage_clear: bool,
    pub total_cost: f64,
    pub resolution: OutcomeResolution,
}
