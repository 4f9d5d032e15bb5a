//! Property tests for the grid kernel
//!
//! Generated seeds drive the generator, refill and enforcer; the properties
//! must hold for every draw.
//!
//! Invariants covered:
//! - Every detected connection is a disjoint, same-symbol, forming cluster of
//!   at least the level's minimum size
//! - Payouts never shrink as a cluster grows and scale with the bet multiplier
//! - Gravity keeps the relative order of surviving cells in a column
//! - Forced wins contain a connection of exactly the minimum size
//! - Restricted enforcement touches eligible cells only and either leaves no
//!   connection or leaves the grid untouched
//! - The cascade multiplier never decreases while escalating

use std::collections::BTreeSet;

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rf_cascade::{
    EngineConfig, EnforcementEffort, Grid, GridGenerator, Level, MultiplierState, Position,
    RefillContext, Symbol, clear_and_refill, escalate_multiplier, find_connections,
    force_loss_restricted,
};

fn level_strategy() -> impl Strategy<Value = Level> {
    prop::sample::select(Level::ALL.to_vec())
}

fn random_grid(level: Level, seed: u64) -> Grid {
    let config = EngineConfig::standard();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    GridGenerator::new(&config).generate(level, &mut rng)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn connections_are_disjoint_forming_clusters(level in level_strategy(), seed in any::<u64>()) {
        let grid = random_grid(level, seed);
        let connections = find_connections(&grid, level);

        let mut seen = BTreeSet::new();
        for connection in &connections {
            prop_assert!(connection.symbol.forms_connections());
            prop_assert!(connection.count >= level.min_connection());
            prop_assert_eq!(connection.count, connection.positions.len());
            for pos in &connection.positions {
                prop_assert_eq!(grid.get(*pos), Some(connection.symbol));
                prop_assert!(seen.insert(*pos));
            }
        }
    }

    #[test]
    fn payout_grows_with_size_and_bet(
        level in level_strategy(),
        symbol in prop::sample::select(Symbol::CONNECTION_FORMING.to_vec()),
        size in 1usize..40,
        bet in 1u32..=10,
    ) {
        let config = EngineConfig::standard();
        let smaller = config.payout(symbol, size, level, bet);
        let larger = config.payout(symbol, size + 1, level, bet);
        prop_assert!(larger >= smaller);

        let unit = config.payout(symbol, size, level, 1);
        prop_assert!((smaller - unit * f64::from(bet)).abs() <= 0.01 * f64::from(bet));
    }

    #[test]
    fn gravity_keeps_column_order(
        level in level_strategy(),
        seed in any::<u64>(),
        picks in prop::collection::vec((0usize..8, 0usize..8), 1..12),
    ) {
        let config = EngineConfig::standard();
        let mut grid = random_grid(level, seed);
        let size = grid.size();
        let removed: BTreeSet<Position> = picks
            .into_iter()
            .map(|(x, y)| Position::new(x % size, y % size))
            .collect();
        let before = grid.clone();
        let positions: Vec<Position> = removed.iter().copied().collect();

        let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x5eed);
        let filled = clear_and_refill(
            &config,
            &mut grid,
            &positions,
            level,
            &mut rng,
            RefillContext::Cascade,
        );

        prop_assert_eq!(filled.len(), removed.len());
        prop_assert!(grid.is_complete());
        for x in 0..size {
            let survivors: Vec<Option<Symbol>> = (0..size)
                .map(|y| Position::new(x, y))
                .filter(|p| !removed.contains(p))
                .map(|p| before.get(p))
                .collect();
            let column = grid.column(x);
            prop_assert_eq!(&column[size - survivors.len()..], &survivors[..]);
        }
    }

    #[test]
    fn forced_win_has_minimum_connection(level in level_strategy(), seed in any::<u64>()) {
        let config = EngineConfig::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let grid = GridGenerator::new(&config).force_win(level, &mut rng);

        let connections = find_connections(&grid, level);
        prop_assert!(connections.iter().any(|c| c.count == level.min_connection()));
        prop_assert!(grid.count_symbol(Symbol::TRIGGER) <= 1);
    }

    #[test]
    fn enforcement_is_restricted(
        level in level_strategy(),
        seed in any::<u64>(),
        row in 0usize..8,
    ) {
        let config = EngineConfig::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut grid = GridGenerator::new(&config).force_win(level, &mut rng);
        let size = grid.size();
        let eligible: Vec<Position> = (0..size).map(|x| Position::new(x, row % size)).collect();
        let before = grid.clone();

        let result = force_loss_restricted(
            &config,
            &mut grid,
            level,
            &mut rng,
            &eligible,
            EnforcementEffort { max_attempts: 20, mutations: 3 },
        );

        for pos in grid.positions() {
            if !eligible.contains(&pos) {
                prop_assert_eq!(grid.get(pos), before.get(pos));
            }
        }
        if result.is_success() {
            prop_assert!(find_connections(&grid, level).is_empty());
        } else {
            prop_assert_eq!(&grid, &before);
        }
    }

    #[test]
    fn multiplier_never_decreases(steps in 1usize..30) {
        let config = EngineConfig::standard();
        let mut state = MultiplierState::new();
        let mut last = state.multiplier;
        for _ in 0..steps {
            let next = escalate_multiplier(&mut state, &config);
            prop_assert!(next >= last);
            prop_assert!(state.step <= config.max_ladder_step());
            last = next;
        }
        prop_assert_eq!(state.bonus_matches as usize, steps);
    }
}
