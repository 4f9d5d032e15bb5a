//! Parallel batch simulation
//!
//! Rounds are split across a rayon pool. Each worker owns a ChaCha8 stream
//! derived from the session seed and its own `GameState`, so level,
//! progress, free rounds and multiplier carry from one round to the next
//! exactly as they would for a single player.

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use rf_cascade::{
    CascadeError, ClientContext, ConfigError, EngineConfig, FixedRtp, GameMode, GameState,
    RoundIdentity, RoundRequest, RoundResolver,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::{OraclePolicy, SimOracle};
use crate::stats::SessionStats;

/// Phases after which a round is abandoned
pub const MAX_PHASES_PER_ROUND: usize = 500;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Engine error: {0}")]
    Engine(#[from] CascadeError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

/// Batch parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub rounds: u64,
    pub threads: usize,
    pub seed: u64,
    pub bet: f64,
    pub policy: OraclePolicy,
    pub target_rtp: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rounds: 10_000,
            threads: num_cpus::get(),
            seed: 0,
            bet: 1.0,
            policy: OraclePolicy::default(),
            target_rtp: 0.96,
        }
    }
}

pub struct Simulator {
    resolver: RoundResolver<Arc<SimOracle>, FixedRtp>,
    oracle: Arc<SimOracle>,
    config: SimConfig,
}

impl Simulator {
    /// Validates the engine config and the bet before anything runs
    pub fn new(engine: EngineConfig, config: SimConfig) -> Result<Self, SimError> {
        engine.validate()?;
        if engine.bet_multiplier(config.bet).is_none() {
            return Err(CascadeError::InvalidBet(config.bet).into());
        }
        let oracle = Arc::new(SimOracle::from_policy(config.policy));
        let resolver = RoundResolver::with_config(
            Arc::new(engine),
            oracle.clone(),
            FixedRtp(config.target_rtp),
        );
        Ok(Self {
            resolver,
            oracle,
            config,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Play every round and merge the per-worker stats
    pub fn run(&self) -> Result<SessionStats, SimError> {
        let threads = self.config.threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| SimError::ThreadPool(e.to_string()))?;

        let per_worker = self.config.rounds / threads as u64;
        let remainder = self.config.rounds % threads as u64;
        log::info!(
            "Simulating {} rounds on {} worker(s), policy {:?}",
            self.config.rounds,
            threads,
            self.config.policy
        );

        let results: Vec<SessionStats> = pool.install(|| {
            (0..threads)
                .into_par_iter()
                .map(|worker| {
                    let rounds = per_worker + u64::from((worker as u64) < remainder);
                    self.run_worker(worker, rounds)
                })
                .collect::<Result<Vec<_>, SimError>>()
        })?;

        let mut total = SessionStats::default();
        for stats in &results {
            total.merge(stats);
        }
        Ok(total)
    }

    fn run_worker(&self, worker: usize, rounds: u64) -> Result<SessionStats, SimError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        rng.set_stream(worker as u64);

        let identity = RoundIdentity::new(
            "simulator",
            "cascade",
            format!("worker-{}", worker),
            "batch",
        );
        let mut stats = SessionStats::default();
        let mut state = GameState::new().with_bet(self.config.bet);

        for _ in 0..rounds {
            state = self.play_round(state, &identity, &mut rng, &mut stats)?;
        }
        log::debug!("Worker {} finished {} rounds", worker, rounds);
        Ok(stats)
    }

    /// One spin plus every stage-clear and cascade phase it leads to
    fn play_round(
        &self,
        state: GameState,
        identity: &RoundIdentity,
        rng: &mut ChaCha8Rng,
        stats: &mut SessionStats,
    ) -> Result<GameState, SimError> {
        let request = |state: GameState| {
            RoundRequest::new(state, identity.clone()).with_context(ClientContext::default())
        };

        let charged = if state.in_free_rounds() {
            0.0
        } else {
            state.bet.amount
        };
        self.oracle.record_wager(charged);

        let before_mode = state.mode;
        let spin = self.resolver.resolve_spin_with(&request(state), rng)?;
        let cost = spin.total_cost;
        if cost != charged {
            // The spin triggered free rounds and was not charged
            self.oracle.record_wager(cost - charged);
        }
        if cost == 0.0 {
            stats.free_rounds_played += 1;
        }
        let mut win = spin.state.total_win;
        stats.phases += 1;
        stats.record_resolution(spin.resolution);
        count_trigger(stats, before_mode, spin.state.mode);
        let mut state = spin.state;

        for _ in 0..MAX_PHASES_PER_ROUND {
            let before_mode = state.mode;
            if state.has_pending_stage_clears() {
                let response = self.resolver.resolve_stage_clear_with(&request(state), rng)?;
                stats.stage_clears += response.stage_clear_count as u64;
                stats.level_advances += u64::from(response.level_advanced);
                stats.record_resolution(response.resolution);
                state = response.state;
            } else if state.cascading {
                let response = self.resolver.resolve_cascade_step_with(&request(state), rng)?;
                stats.record_resolution(response.resolution);
                state = response.state;
            } else {
                break;
            }
            stats.phases += 1;
            win += state.total_win;
            count_trigger(stats, before_mode, state.mode);
            stats.max_cascade_depth = stats.max_cascade_depth.max(state.cascade_count);
        }

        if state.cascading || state.has_pending_stage_clears() {
            log::warn!("Round abandoned after {} phases", MAX_PHASES_PER_ROUND);
            state.cascading = false;
            state.pending_stage_clears.clear();
        }

        stats.record_round(cost, win, state.bet.amount);
        Ok(state)
    }
}

fn count_trigger(stats: &mut SessionStats, before: GameMode, after: GameMode) {
    if before == GameMode::Base && after == GameMode::FreeRounds {
        stats.free_round_triggers += 1;
    }
}
