//! Round resolver — orchestrates the three round phases
//!
//! ```text
//! resolve_spin ──> (stage-clear symbols?) ──> resolve_stage_clear
//!      │                                            │
//!      └──────> (cascading?) ──> resolve_cascade_step ┘ (repeat until no
//!                                                       connections remain)
//! ```
//!
//! Every phase works on a clone of the request state and only hands back a
//! new state when it completes. Validation and collaborator failures return
//! an error and leave the caller's state as it was.

use std::sync::Arc;

use rand::prelude::*;

use crate::cascade::{RefillContext, clear_and_refill};
use crate::config::{EnforcementEffort, EngineConfig};
use crate::connections::{
    Connection, StageClearSymbol, connection_positions, find_connections, find_stage_clear_symbols,
};
use crate::enforcer::{LossEnforcement, force_loss_restricted};
use crate::error::{CascadeError, CascadeResult};
use crate::generator::GridGenerator;
use crate::grid::Position;
use crate::oracle::{Outcome, OutcomeOracle, OutcomeQuery, SettingsProvider};
use crate::progression::{
    accumulate_stage_progress, check_free_round_trigger, consume_free_round, price_connections,
    reset_multiplier,
};
use crate::request::{
    CascadeResponse, OutcomeResolution, RoundRequest, SpinResponse, StageClearResponse,
};
use crate::state::GameState;

/// Round resolution engine
///
/// Holds immutable configuration plus the two external collaborators; it is
/// `Send + Sync` whenever they are and can serve concurrent requests.
pub struct RoundResolver<O, S> {
    config: Arc<EngineConfig>,
    oracle: O,
    settings: S,
}

impl<O: OutcomeOracle, S: SettingsProvider> RoundResolver<O, S> {
    /// Resolver with the standard game configuration
    pub fn new(oracle: O, settings: S) -> Self {
        Self::with_config(Arc::new(EngineConfig::standard()), oracle, settings)
    }

    /// Resolver with a specific configuration
    pub fn with_config(config: Arc<EngineConfig>, oracle: O, settings: S) -> Self {
        Self {
            config,
            oracle,
            settings,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SPIN
    // ═══════════════════════════════════════════════════════════════════════════

    /// Fresh spin with an OS-seeded generator
    pub fn resolve_spin(&self, request: &RoundRequest) -> CascadeResult<SpinResponse> {
        let mut rng = StdRng::from_os_rng();
        self.resolve_spin_with(request, &mut rng)
    }

    /// Fresh spin: new win-biased grid, priced and checked with the oracle
    ///
    /// A refused win is replaced by a freshly generated losing grid. Spins
    /// played in free rounds, including the one that triggers them, cost
    /// nothing and use up one free round.
    pub fn resolve_spin_with<R: Rng + ?Sized>(
        &self,
        request: &RoundRequest,
        rng: &mut R,
    ) -> CascadeResult<SpinResponse> {
        let bet_multiplier = reject_logged("spin", request.validate(&self.config))?;

        let mut state = request.state.clone();
        state.bet.multiplier = bet_multiplier;
        let level = state.level;
        let started_in_free_rounds = state.in_free_rounds();
        let generator = GridGenerator::new(&self.config);

        reset_multiplier(&mut state.multiplier);
        state.grid = generator.generate_with_win(level, rng).grid;
        let mut stage_clears = find_stage_clear_symbols(&state.grid, level);
        let mut connections = find_connections(&state.grid, level);
        let mut win = price_connections(&mut connections, &mut state, &self.config);

        let mut resolution = OutcomeResolution::NotConsulted;
        if !connections.is_empty() {
            resolution = match self.consult(request, win)? {
                Outcome::Win => OutcomeResolution::Win,
                Outcome::Loss => {
                    state.grid = generator.generate_with_loss(level, rng).grid;
                    stage_clears = find_stage_clear_symbols(&state.grid, level);
                    connections.clear();
                    win = 0.0;
                    reset_multiplier(&mut state.multiplier);
                    OutcomeResolution::LossRegenerated
                }
            };
        }

        state.cascade_count = 0;
        state.total_win = win;
        state.cascading = !connections.is_empty();
        state.last_connections = connections;
        state.pending_stage_clears = stage_clears.clone();

        check_free_round_trigger(&mut state, &self.config);
        let free_spin = started_in_free_rounds || state.in_free_rounds();
        consume_free_round(&mut state);
        let total_cost = if free_spin { 0.0 } else { state.bet.amount };

        log::info!(
            "Spin resolved: level={} win={:.2} connections={} stage_clears={} cascading={} multiplier={}x mode={:?} resolution={:?}",
            level,
            state.total_win,
            state.last_connections.len(),
            stage_clears.len(),
            state.cascading,
            state.multiplier.multiplier,
            state.mode,
            resolution
        );

        Ok(SpinResponse {
            has_stage_clear: !stage_clears.is_empty(),
            stage_clear_symbols: stage_clears,
            state,
            total_cost,
            resolution,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STAGE CLEAR
    // ═══════════════════════════════════════════════════════════════════════════

    /// Collect stage-clear symbols with an OS-seeded generator
    pub fn resolve_stage_clear(&self, request: &RoundRequest) -> CascadeResult<StageClearResponse> {
        let mut rng = StdRng::from_os_rng();
        self.resolve_stage_clear_with(request, &mut rng)
    }

    /// Collect stage-clear symbols, refill, and either advance the level or
    /// price what the refill produced
    pub fn resolve_stage_clear_with<R: Rng + ?Sized>(
        &self,
        request: &RoundRequest,
        rng: &mut R,
    ) -> CascadeResult<StageClearResponse> {
        let bet_multiplier =
            reject_logged("stage-clear", request.validate_continuation(&self.config))?;
        let occurrences = reject_logged("stage-clear", self.stage_clear_occurrences(&request.state))?;

        let mut state = request.state.clone();
        state.bet.multiplier = bet_multiplier;
        let old_level = state.level;
        let stage_clear_count = occurrences.len();

        let removed: Vec<Position> = occurrences.iter().map(|o| o.position).collect();
        let refilled = clear_and_refill(
            &self.config,
            &mut state.grid,
            &removed,
            old_level,
            rng,
            RefillContext::StageClear,
        );
        let advance = accumulate_stage_progress(&mut state, stage_clear_count as u32, &self.config);

        let (connections, resolution) = if advance.advanced {
            self.enter_level(request, &mut state, rng)?
        } else {
            let effort = self.config.enforcement.stage_clear;
            let (connections, resolution) =
                self.settle_continuation(request, &mut state, &refilled, effort, rng)?;
            state.cascade_count = u32::from(!connections.is_empty());
            (connections, resolution)
        };

        log::info!(
            "Stage clear resolved: collected={} progress={}/{} level {}→{} win={:.2} connections={} cascading={} multiplier={}x resolution={:?}",
            stage_clear_count,
            state.stage_progress,
            self.config.progression.stage_target,
            advance.old_level,
            advance.new_level,
            state.total_win,
            connections.len(),
            state.cascading,
            state.multiplier.multiplier,
            resolution
        );

        Ok(StageClearResponse {
            state,
            stage_clear_count,
            level_advanced: advance.advanced,
            old_level: advance.old_level,
            new_level: advance.new_level,
            connections,
            total_cost: 0.0,
            resolution,
        })
    }

    /// Pending occurrences (checked against the grid) or a fresh scan
    fn stage_clear_occurrences(&self, state: &GameState) -> CascadeResult<Vec<StageClearSymbol>> {
        if state.pending_stage_clears.is_empty() {
            return Ok(find_stage_clear_symbols(&state.grid, state.level));
        }

        let expected = state.level.stage_clear_symbol();
        let mut seen = Vec::with_capacity(state.pending_stage_clears.len());
        for occurrence in &state.pending_stage_clears {
            let position = occurrence.position;
            if !state.grid.contains(position) {
                return Err(CascadeError::InvalidPosition {
                    position,
                    size: state.grid.size(),
                });
            }
            if occurrence.symbol != expected {
                return Err(CascadeError::InvalidStageClear {
                    position,
                    reason: format!("{} is not the level {} symbol", occurrence.symbol, state.level),
                });
            }
            if state.grid.get(position) != Some(expected) {
                return Err(CascadeError::InvalidStageClear {
                    position,
                    reason: format!("grid holds {:?}, not {}", state.grid.get(position), expected),
                });
            }
            if !seen.iter().any(|s: &StageClearSymbol| s.position == position) {
                seen.push(*occurrence);
            }
        }
        Ok(seen)
    }

    /// Fresh grid for a newly entered level, settled like a spin
    fn enter_level<R: Rng + ?Sized>(
        &self,
        request: &RoundRequest,
        state: &mut GameState,
        rng: &mut R,
    ) -> CascadeResult<(Vec<Connection>, OutcomeResolution)> {
        let level = state.level;
        let generator = GridGenerator::new(&self.config);
        state.grid = generator.generate(level, rng);

        let mut connections = find_connections(&state.grid, level);
        let mut win = price_connections(&mut connections, state, &self.config);
        let mut resolution = OutcomeResolution::NotConsulted;

        if !connections.is_empty() {
            resolution = match self.consult(request, win)? {
                Outcome::Win => OutcomeResolution::Win,
                Outcome::Loss => {
                    state.grid = generator.generate_with_loss(level, rng).grid;
                    connections.clear();
                    win = 0.0;
                    OutcomeResolution::LossRegenerated
                }
            };
        }

        state.pending_stage_clears = find_stage_clear_symbols(&state.grid, level);
        check_free_round_trigger(state, &self.config);
        if connections.is_empty() {
            reset_multiplier(&mut state.multiplier);
        }
        state.cascade_count = 0;
        state.total_win = win;
        state.cascading = !connections.is_empty();
        state.last_connections = connections.clone();

        Ok((connections, resolution))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CASCADE
    // ═══════════════════════════════════════════════════════════════════════════

    /// One cascade step with an OS-seeded generator
    pub fn resolve_cascade_step(&self, request: &RoundRequest) -> CascadeResult<CascadeResponse> {
        let mut rng = StdRng::from_os_rng();
        self.resolve_cascade_step_with(request, &mut rng)
    }

    /// Remove the last connections, drop and refill, then price the result
    pub fn resolve_cascade_step_with<R: Rng + ?Sized>(
        &self,
        request: &RoundRequest,
        rng: &mut R,
    ) -> CascadeResult<CascadeResponse> {
        let bet_multiplier = reject_logged("cascade", request.validate_continuation(&self.config))?;

        let grid = &request.state.grid;
        if let Some(position) = request
            .state
            .last_connections
            .iter()
            .flat_map(|c| c.positions.iter().copied())
            .find(|p| !grid.contains(*p))
        {
            return reject_logged(
                "cascade",
                Err(CascadeError::InvalidPosition {
                    position,
                    size: grid.size(),
                }),
            );
        }

        let mut state = request.state.clone();
        state.bet.multiplier = bet_multiplier;
        state.cascade_count += 1;
        let level = state.level;

        let removed = if state.last_connections.is_empty() {
            connection_positions(&find_connections(&state.grid, level))
        } else {
            connection_positions(&state.last_connections)
        };
        let refilled = clear_and_refill(
            &self.config,
            &mut state.grid,
            &removed,
            level,
            rng,
            RefillContext::Cascade,
        );

        let effort = self.config.enforcement.cascade;
        let (connections, resolution) =
            self.settle_continuation(request, &mut state, &refilled, effort, rng)?;
        let stage_clears = state.pending_stage_clears.clone();

        log::info!(
            "Cascade step {} resolved: level={} removed={} win={:.2} connections={} stage_clears={} cascading={} multiplier={}x resolution={:?}",
            state.cascade_count,
            level,
            removed.len(),
            state.total_win,
            connections.len(),
            stage_clears.len(),
            state.cascading,
            state.multiplier.multiplier,
            resolution
        );

        Ok(CascadeResponse {
            state,
            connections,
            has_stage_clear: !stage_clears.is_empty(),
            stage_clear_symbols: stage_clears,
            total_cost: 0.0,
            resolution,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SHARED
    // ═══════════════════════════════════════════════════════════════════════════

    /// Price the grid after a refill and apply the oracle's verdict by
    /// mutating only `refilled` cells
    ///
    /// When no connection remains the cascade sequence ends: free rounds may
    /// trigger and the multiplier resets. A bypassed loss keeps its
    /// connections, so the sequence continues.
    fn settle_continuation<R: Rng + ?Sized>(
        &self,
        request: &RoundRequest,
        state: &mut GameState,
        refilled: &[Position],
        effort: EnforcementEffort,
        rng: &mut R,
    ) -> CascadeResult<(Vec<Connection>, OutcomeResolution)> {
        let level = state.level;
        let mut connections = find_connections(&state.grid, level);
        let mut win = price_connections(&mut connections, state, &self.config);
        let mut resolution = OutcomeResolution::NotConsulted;

        if !connections.is_empty() {
            resolution = match self.consult(request, win)? {
                Outcome::Win => OutcomeResolution::Win,
                Outcome::Loss => {
                    match force_loss_restricted(
                        &self.config,
                        &mut state.grid,
                        level,
                        rng,
                        refilled,
                        effort,
                    ) {
                        LossEnforcement::Impossible { attempts } => {
                            log::warn!(
                                "Loss could not be enforced through {} refilled cell(s) after {} attempts; keeping win of {:.2}",
                                refilled.len(),
                                attempts,
                                win
                            );
                            OutcomeResolution::LossBypassed
                        }
                        LossEnforcement::AlreadyLosing | LossEnforcement::Enforced { .. } => {
                            connections.clear();
                            win = 0.0;
                            OutcomeResolution::LossEnforced
                        }
                    }
                }
            };
        }

        state.pending_stage_clears = find_stage_clear_symbols(&state.grid, level);
        if connections.is_empty() {
            check_free_round_trigger(state, &self.config);
            reset_multiplier(&mut state.multiplier);
        }
        state.total_win = win;
        state.cascading = !connections.is_empty();
        state.last_connections = connections.clone();

        Ok((connections, resolution))
    }

    /// Ask settings for the target RTP, then the oracle for a verdict
    fn consult(&self, request: &RoundRequest, win: f64) -> CascadeResult<Outcome> {
        let identity = &request.identity;
        let target_rtp = self
            .settings
            .target_rtp(&identity.client_id, &identity.game_id, &identity.player_id)
            .map_err(|e| {
                log::warn!("Settings lookup failed for player {}: {}", identity.player_id, e);
                CascadeError::Settings(e)
            })?;

        let bet_amount = request.state.bet.amount;
        let query = OutcomeQuery {
            identity: identity.clone(),
            target_rtp,
            payout_multiplier: win / bet_amount,
            bet_amount,
            context: request.context.clone(),
        };

        let outcome = self.oracle.decide(&query).map_err(|e| {
            log::warn!("Outcome oracle failed for bet {}: {}", identity.bet_id, e);
            CascadeError::Oracle(e)
        })?;
        log::debug!(
            "Oracle verdict {:?} for {:.2}x at target RTP {}",
            outcome,
            query.payout_multiplier,
            target_rtp
        );
        Ok(outcome)
    }
}

/// Log a rejected request at warn and pass the result through
fn reject_logged<T>(phase: &str, result: CascadeResult<T>) -> CascadeResult<T> {
    if let Err(err) = &result {
        log::warn!("Rejected {} request: {}", phase, err);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ServiceError};
    use crate::grid::Grid;
    use crate::oracle::{FixedOutcome, FixedRtp};
    use crate::request::RoundIdentity;
    use crate::state::{GameMode, MultiplierState};
    use crate::symbols::{Level, Symbol};
    use std::collections::BTreeMap;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use Symbol::*;

    fn request(state: GameState) -> RoundRequest {
        RoundRequest::new(state, RoundIdentity::new("client", "game", "player", "bet-1"))
    }

    fn winning_resolver() -> RoundResolver<FixedOutcome, FixedRtp> {
        RoundResolver::new(FixedOutcome::win(), FixedRtp::default())
    }

    fn losing_resolver() -> RoundResolver<FixedOutcome, FixedRtp> {
        RoundResolver::new(FixedOutcome::loss(), FixedRtp::default())
    }

    struct BrokenOracle;

    impl OutcomeOracle for BrokenOracle {
        fn decide(&self, _query: &OutcomeQuery) -> Result<Outcome, crate::error::ServiceError> {
            Err(ServiceError::new("oracle", "connection refused"))
        }
    }

    /// Level-1 grid with one purple run in row 2 and nothing else connected
    fn purple_row_grid() -> Grid {
        Grid::from_symbols(&[
            vec![Red, Green, Red, Green],
            vec![Green, Red, Green, Red],
            vec![Purple, Purple, Purple, Purple],
            vec![Green, Red, Green, Red],
        ])
        .unwrap()
    }

    fn losing_grid() -> Grid {
        Grid::from_symbols(&[
            vec![Red, Green, Red, Green],
            vec![Green, Red, Green, Red],
            vec![Red, Green, Red, Green],
            vec![Green, Red, Green, Red],
        ])
        .unwrap()
    }

    #[test]
    fn test_spin_win_prices_and_cascades() {
        let resolver = winning_resolver();
        let mut rng = StdRng::seed_from_u64(42);
        let response = resolver
            .resolve_spin_with(&request(GameState::new().with_bet(1.0)), &mut rng)
            .unwrap();

        let state = &response.state;
        assert_eq!(state.grid.size(), 4);
        assert_eq!(state.bet.multiplier, 10);
        assert!(state.cascading);
        assert!(!state.last_connections.is_empty());
        assert!(state.total_win > 0.0);
        assert_eq!(response.resolution, OutcomeResolution::Win);
        let expected_cost = if state.in_free_rounds() { 0.0 } else { 1.0 };
        assert_relative_eq!(response.total_cost, expected_cost);
        assert_eq!(
            response.has_stage_clear,
            !response.stage_clear_symbols.is_empty()
        );
    }

    #[test]
    fn test_spin_loss_regenerates() {
        let resolver = losing_resolver();
        let mut rng = StdRng::seed_from_u64(7);
        let response = resolver
            .resolve_spin_with(&request(GameState::new().with_bet(0.5)), &mut rng)
            .unwrap();

        let state = &response.state;
        assert_eq!(response.resolution, OutcomeResolution::LossRegenerated);
        assert!(find_connections(&state.grid, Level::One).is_empty());
        assert!(!state.cascading);
        assert_eq!(state.total_win, 0.0);
        assert_eq!(state.multiplier.multiplier, 1.0);
        assert_eq!(state.multiplier.step, 0);
    }

    #[test]
    fn test_spin_rejects_bad_input() {
        let resolver = winning_resolver();
        let mut rng = StdRng::seed_from_u64(1);

        let err = resolver
            .resolve_spin_with(&request(GameState::new().with_bet(0.25)), &mut rng)
            .unwrap_err();
        assert_eq!(err, CascadeError::InvalidBet(0.25));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let mut req = request(GameState::new().with_bet(0.1));
        req.identity.bet_id.clear();
        assert_eq!(
            resolver.resolve_spin_with(&req, &mut rng).unwrap_err(),
            CascadeError::MissingField("bet_id")
        );
    }

    #[test]
    fn test_oracle_failure_aborts() {
        let resolver = RoundResolver::new(BrokenOracle, FixedRtp::default());
        let mut rng = StdRng::seed_from_u64(3);
        let err = resolver
            .resolve_spin_with(&request(GameState::new().with_bet(1.0)), &mut rng)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServiceFailure);
        assert!(matches!(err, CascadeError::Oracle(_)));
    }

    #[test]
    fn test_free_round_spin_costs_nothing() {
        let resolver = winning_resolver();
        let mut rng = StdRng::seed_from_u64(9);
        let mut state = GameState::new().with_bet(0.2);
        state.mode = GameMode::FreeRounds;
        state.free_rounds.remaining = 3;
        state.free_rounds.awarded = 10;

        let response = resolver.resolve_spin_with(&request(state), &mut rng).unwrap();
        assert_eq!(response.total_cost, 0.0);
        assert_eq!(response.state.free_rounds.remaining, 2);
        assert_eq!(response.state.mode, GameMode::FreeRounds);
    }

    #[test]
    fn test_last_free_round_returns_to_base() {
        let resolver = winning_resolver();
        let mut rng = StdRng::seed_from_u64(10);
        let mut state = GameState::new().with_bet(0.2);
        state.mode = GameMode::FreeRounds;
        state.free_rounds.remaining = 1;
        state.free_rounds.awarded = 10;

        let response = resolver.resolve_spin_with(&request(state), &mut rng).unwrap();
        assert_eq!(response.total_cost, 0.0);
        assert_eq!(response.state.mode, GameMode::Base);
        assert_eq!(response.state.free_rounds.remaining, 0);
        assert_eq!(response.state.free_rounds.awarded, 0);
    }

    #[test]
    fn test_cascade_removes_last_connections() {
        let resolver = winning_resolver();
        let mut rng = StdRng::seed_from_u64(11);
        let grid = purple_row_grid();
        let mut state = GameState::new().with_bet(1.0).with_grid(grid.clone());
        state.last_connections = find_connections(&grid, Level::One);
        state.cascading = true;

        let response = resolver
            .resolve_cascade_step_with(&request(state), &mut rng)
            .unwrap();

        let after = &response.state;
        assert_eq!(after.cascade_count, 1);
        // Rows 0 and 1 fell one row; row 3 is untouched
        for x in 0..4 {
            assert_eq!(after.grid.get(Position::new(x, 3)), grid.get(Position::new(x, 3)));
            assert_eq!(after.grid.get(Position::new(x, 2)), grid.get(Position::new(x, 1)));
            assert_eq!(after.grid.get(Position::new(x, 1)), grid.get(Position::new(x, 0)));
        }
        assert_eq!(after.cascading, !response.connections.is_empty());
        assert_eq!(response.total_cost, 0.0);
    }

    #[test]
    fn test_cascade_without_last_connections_detects() {
        let resolver = losing_resolver();
        let mut rng = StdRng::seed_from_u64(12);
        let grid = purple_row_grid();
        let state = GameState::new().with_bet(1.0).with_grid(grid.clone());

        let response = resolver
            .resolve_cascade_step_with(&request(state), &mut rng)
            .unwrap();
        // The purple run was removed
        assert!(
            (0..4).any(|x| response.state.grid.get(Position::new(x, 2)) != Some(Purple))
        );
        if response.resolution != OutcomeResolution::LossBypassed {
            assert!(!response.state.cascading);
            assert_eq!(response.state.multiplier.multiplier, 1.0);
        }
    }

    #[test]
    fn test_cascade_rejects_out_of_bounds_connection() {
        let resolver = winning_resolver();
        let mut rng = StdRng::seed_from_u64(13);
        let mut state = GameState::new().with_bet(1.0).with_grid(losing_grid());
        state.last_connections = vec![Connection::new(Purple, vec![Position::new(4, 0)])];

        let err = resolver
            .resolve_cascade_step_with(&request(state), &mut rng)
            .unwrap_err();
        assert!(matches!(err, CascadeError::InvalidPosition { .. }));
    }

    #[test]
    fn test_cascade_rejects_wrong_grid() {
        let resolver = winning_resolver();
        let mut rng = StdRng::seed_from_u64(14);
        let state = GameState::new()
            .with_bet(1.0)
            .with_level(Level::Two)
            .with_grid(losing_grid());
        let err = resolver
            .resolve_cascade_step_with(&request(state), &mut rng)
            .unwrap_err();
        assert_eq!(
            err,
            CascadeError::GridDimensions {
                expected: 5,
                actual: 4
            }
        );
    }

    #[test]
    fn test_stage_clear_collects_and_refills() {
        let resolver = winning_resolver();
        let mut rng = StdRng::seed_from_u64(15);
        let mut grid = losing_grid();
        grid.set(Position::new(0, 0), Some(OrangeSlice));
        grid.set(Position::new(3, 3), Some(OrangeSlice));
        let state = GameState::new().with_bet(0.1).with_grid(grid);

        let response = resolver
            .resolve_stage_clear_with(&request(state), &mut rng)
            .unwrap();
        assert_eq!(response.stage_clear_count, 2);
        assert!(!response.level_advanced);
        assert_eq!(response.old_level, Level::One);
        assert_eq!(response.new_level, Level::One);
        assert_eq!(response.state.stage_progress, 2);
        assert!(response.state.grid.is_complete());
        assert_eq!(response.total_cost, 0.0);
        assert_eq!(
            response.state.cascade_count,
            u32::from(!response.connections.is_empty())
        );
    }

    #[test]
    fn test_stage_clear_advances_level() {
        let resolver = winning_resolver();
        let mut rng = StdRng::seed_from_u64(16);
        let mut grid = losing_grid();
        for x in 0..4 {
            grid.set(Position::new(x, 0), Some(OrangeSlice));
        }
        let mut state = GameState::new().with_bet(1.0).with_grid(grid);
        state.stage_progress = 13;

        let response = resolver
            .resolve_stage_clear_with(&request(state), &mut rng)
            .unwrap();
        assert!(response.level_advanced);
        assert_eq!(response.new_level, Level::Two);
        assert_eq!(response.state.level, Level::Two);
        assert_eq!(response.state.stage_progress, 2);
        assert_eq!(response.state.grid.size(), 5);
        assert_eq!(response.state.cascade_count, 0);
        assert_eq!(response.connections, response.state.last_connections);
    }

    #[test]
    fn test_stage_clear_rejects_bad_pending() {
        let resolver = winning_resolver();
        let mut rng = StdRng::seed_from_u64(17);
        let mut state = GameState::new().with_bet(1.0).with_grid(losing_grid());
        state.pending_stage_clears = vec![StageClearSymbol {
            symbol: OrangeSlice,
            position: Position::new(1, 1),
        }];

        let err = resolver
            .resolve_stage_clear_with(&request(state), &mut rng)
            .unwrap_err();
        assert!(matches!(err, CascadeError::InvalidStageClear { .. }));

        let mut state = GameState::new().with_bet(1.0).with_grid(losing_grid());
        state.pending_stage_clears = vec![StageClearSymbol {
            symbol: OrangeSlice,
            position: Position::new(7, 1),
        }];
        let err = resolver
            .resolve_stage_clear_with(&request(state), &mut rng)
            .unwrap_err();
        assert!(matches!(err, CascadeError::InvalidPosition { .. }));
    }

    /// Level-1 weights restricted to the given symbols
    fn config_with_level_one_weights(weights: &[(Symbol, f64)]) -> Arc<EngineConfig> {
        let mut config = EngineConfig::standard();
        config.levels[0].weights = weights.iter().copied().collect::<BTreeMap<_, _>>();
        Arc::new(config)
    }

    #[test]
    fn test_triggering_spin_uses_first_free_round() {
        // Trigger lands on the first cell, every other cell is purple
        let config = config_with_level_one_weights(&[(Purple, 1.0), (RainbowEgg, 1e9)]);
        let resolver = RoundResolver::with_config(config, FixedOutcome::win(), FixedRtp::default());
        let mut rng = StdRng::seed_from_u64(18);

        let response = resolver
            .resolve_spin_with(&request(GameState::new().with_bet(1.0)), &mut rng)
            .unwrap();
        let state = &response.state;
        assert_eq!(state.grid.count_symbol(RainbowEgg), 1);
        assert_eq!(state.mode, GameMode::FreeRounds);
        assert_eq!(state.free_rounds.awarded, 10);
        assert_eq!(state.free_rounds.remaining, 9);
        assert_eq!(response.total_cost, 0.0);
    }

    #[test]
    fn test_unbreakable_loss_is_bypassed() {
        let resolver = losing_resolver();
        let mut rng = StdRng::seed_from_u64(19);
        let mut grid = Grid::from_symbols(&[
            vec![Red, Green, Red, Green],
            vec![Green, Red, Green, Red],
            vec![Red, Green, Red, Green],
            vec![Purple, Purple, Purple, Purple],
        ])
        .unwrap();
        grid.set(Position::new(3, 0), Some(OrangeSlice));
        let state = GameState::new().with_bet(1.0).with_grid(grid.clone());

        // Only (3, 0) is refilled, which cannot touch the purple run
        let response = resolver
            .resolve_stage_clear_with(&request(state), &mut rng)
            .unwrap();
        let after = &response.state;
        assert_eq!(response.resolution, OutcomeResolution::LossBypassed);
        assert!(response.resolution.is_bypass());
        assert!(after.total_win > 0.0);
        assert!(after.cascading);
        assert_eq!(after.cascade_count, 1);
        assert_eq!(after.stage_progress, 1);
        for x in 0..4 {
            assert_eq!(after.grid.get(Position::new(x, 3)), Some(Purple));
        }
        for y in 0..3 {
            for x in 0..3 {
                assert_eq!(after.grid.get(Position::new(x, y)), grid.get(Position::new(x, y)));
            }
        }
    }

    #[test]
    fn test_spin_starts_new_multiplier_sequence() {
        let resolver = winning_resolver();
        let mut rng = StdRng::seed_from_u64(20);

        for _ in 0..10 {
            let mut state = GameState::new().with_bet(1.0);
            state.multiplier = MultiplierState {
                step: 5,
                multiplier: 10.0,
                bonus_matches: 3,
            };
            let response = resolver.resolve_spin_with(&request(state), &mut rng).unwrap();
            let after = &response.state;
            let bonus = after.last_connections.iter().filter(|c| c.is_bonus()).count();

            assert!(after.multiplier.step <= bonus);
            assert_eq!(after.multiplier.bonus_matches as usize, bonus);
            assert_relative_eq!(
                after.multiplier.multiplier,
                resolver.config().ladder_multiplier(after.multiplier.step)
            );
            if bonus == 0 {
                assert_eq!(after.multiplier, MultiplierState::new());
            }
        }
    }

    #[test]
    fn test_cascade_sequence_end_resets_multiplier() {
        // Refills are stage-clear symbols only, so nothing can connect
        let mut config = EngineConfig::standard();
        config.levels[0].weights = [(OrangeSlice, 1.0)].into_iter().collect();
        config.refill.cascade_bonus_chance = 0.0;
        let resolver =
            RoundResolver::with_config(Arc::new(config), FixedOutcome::win(), FixedRtp::default());
        let mut rng = StdRng::seed_from_u64(21);

        let grid = purple_row_grid();
        let mut state = GameState::new().with_bet(1.0).with_grid(grid.clone());
        state.last_connections = find_connections(&grid, Level::One);
        state.cascading = true;
        state.multiplier = MultiplierState {
            step: 4,
            multiplier: 5.0,
            bonus_matches: 4,
        };

        let response = resolver
            .resolve_cascade_step_with(&request(state), &mut rng)
            .unwrap();
        let after = &response.state;
        assert!(response.connections.is_empty());
        assert_eq!(response.resolution, OutcomeResolution::NotConsulted);
        assert!(!after.cascading);
        assert_eq!(after.multiplier, MultiplierState::new());
        assert_eq!(after.pending_stage_clears.len(), 4);
    }
}
