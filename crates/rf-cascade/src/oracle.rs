//! External collaborators: outcome oracle and settings provider
//!
//! The resolver never decides on its own whether a priced win may stand. It
//! asks the settings provider for the player's target RTP, then asks the
//! oracle for a verdict. Both are traits so transports (HTTP, in-process
//! simulators, test doubles) can be swapped freely.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::request::{ClientContext, RoundIdentity};

/// Oracle verdict for a priced win
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Loss,
}

/// Everything the oracle is told about a pending win
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeQuery {
    pub identity: RoundIdentity,
    pub target_rtp: f64,
    /// Phase win divided by bet amount
    pub payout_multiplier: f64,
    pub bet_amount: f64,
    pub context: ClientContext,
}

/// Decides whether a priced win is allowed
pub trait OutcomeOracle {
    fn decide(&self, query: &OutcomeQuery) -> Result<Outcome, ServiceError>;
}

/// Supplies the per-player target RTP
pub trait SettingsProvider {
    fn target_rtp(&self, client_id: &str, game_id: &str, player_id: &str)
    -> Result<f64, ServiceError>;
}

impl<T: OutcomeOracle + ?Sized> OutcomeOracle for &T {
    fn decide(&self, query: &OutcomeQuery) -> Result<Outcome, ServiceError> {
        (**self).decide(query)
    }
}

impl<T: OutcomeOracle + ?Sized> OutcomeOracle for Arc<T> {
    fn decide(&self, query: &OutcomeQuery) -> Result<Outcome, ServiceError> {
        (**self).decide(query)
    }
}

impl<T: SettingsProvider + ?Sized> SettingsProvider for &T {
    fn target_rtp(
        &self,
        client_id: &str,
        game_id: &str,
        player_id: &str,
    ) -> Result<f64, ServiceError> {
        (**self).target_rtp(client_id, game_id, player_id)
    }
}

impl<T: SettingsProvider + ?Sized> SettingsProvider for Arc<T> {
    fn target_rtp(
        &self,
        client_id: &str,
        game_id: &str,
        player_id: &str,
    ) -> Result<f64, ServiceError> {
        (**self).target_rtp(client_id, game_id, player_id)
    }
}

/// Oracle that always returns the same verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedOutcome(pub Outcome);

impl FixedOutcome {
    pub fn win() -> Self {
        Self(Outcome::Win)
    }

    pub fn loss() -> Self {
        Self(Outcome::Loss)
    }
}

impl OutcomeOracle for FixedOutcome {
    fn decide(&self, _query: &OutcomeQuery) -> Result<Outcome, ServiceError> {
        Ok(self.0)
    }
}

/// Settings provider with one RTP for every player
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedRtp(pub f64);

impl Default for FixedRtp {
    fn default() -> Self {
        Self(0.96)
    }
}

impl SettingsProvider for FixedRtp {
    fn target_rtp(&self, _client: &str, _game: &str, _player: &str) -> Result<f64, ServiceError> {
        Ok(self.0)
    }
}
