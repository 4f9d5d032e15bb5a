//! Cluster paytables and payout calculation

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::symbols::{Level, Symbol};

/// Round half away from zero to whole cents
#[inline]
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Per-symbol cluster-size → base value table for one level
///
/// Values are in denomination units. A size above the largest listed tier
/// pays the largest tier; a size below the smallest tier (or an unlisted
/// symbol) pays nothing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Paytable {
    rows: BTreeMap<Symbol, BTreeMap<u32, f64>>,
}

impl Paytable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row whose tiers start at `min_size` and step by one
    pub fn with_row(mut self, symbol: Symbol, min_size: u32, values: &[f64]) -> Self {
        let tiers = values
            .iter()
            .enumerate()
            .map(|(i, v)| (min_size + i as u32, *v))
            .collect();
        self.rows.insert(symbol, tiers);
        self
    }

    /// Shipped tables for each level
    pub fn standard(level: Level) -> Self {
        let min = level.min_connection() as u32;
        let (purple, green, yellow, blue, red) = match level {
            Level::One => (400.0, 800.0, 6000.0, 60000.0, [60000.0, 80000.0]),
            Level::Two => (450.0, 1000.0, 7000.0, 70000.0, [80000.0, 100000.0]),
            Level::Three => (500.0, 1200.0, 8000.0, 80000.0, [100000.0, 100000.0]),
        };

        let purple_row = [2.0, 4.0, 5.0, 8.0, 10.0, 20.0, 30.0, 50.0, 100.0, 200.0, purple];

        Self::new()
            .with_row(Symbol::Purple, min, &purple_row)
            .with_row(
                Symbol::Green,
                min,
                &[4.0, 5.0, 10.0, 20.0, 30.0, 50.0, 100.0, 250.0, 500.0, 750.0, green],
            )
            .with_row(
                Symbol::Yellow,
                min,
                &[5.0, 10.0, 20.0, 40.0, 80.0, 160.0, 500.0, 1000.0, 2000.0, 5000.0, yellow],
            )
            .with_row(
                Symbol::Blue,
                min,
                &[
                    10.0, 30.0, 50.0, 60.0, 100.0, 750.0, 1000.0, 10000.0, 20000.0, 50000.0, blue,
                ],
            )
            .with_row(
                Symbol::Red,
                min,
                &[
                    20.0, 50.0, 100.0, 500.0, 1000.0, 2000.0, 5000.0, 20000.0, 50000.0, red[0],
                    red[1],
                ],
            )
            // Clover pays like the lowest base symbol
            .with_row(Symbol::Clover, min, &purple_row)
    }

    /// Base value for a cluster of `size` symbols
    pub fn base_value(&self, symbol: Symbol, size: usize) -> f64 {
        let Some(tiers) = self.rows.get(&symbol) else {
            return 0.0;
        };
        let size = size as u32;
        match tiers.get(&size) {
            Some(value) => *value,
            None => match tiers.last_key_value() {
                Some((max, value)) if size > *max => *value,
                _ => tiers.range(..=size).next_back().map(|(_, v)| *v).unwrap_or(0.0),
            },
        }
    }

    /// Amount won: base × denomination × bet multiplier, rounded to cents
    pub fn payout(&self, symbol: Symbol, size: usize, bet_multiplier: u32, denomination: f64) -> f64 {
        let value = self.base_value(symbol, size);
        if value == 0.0 {
            return 0.0;
        }
        round_cents(value * denomination * f64::from(bet_multiplier))
    }

    pub fn symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.rows.keys().copied()
    }

    /// Smallest listed size for a symbol
    pub fn min_tier(&self, symbol: Symbol) -> Option<u32> {
        self.rows.get(&symbol).and_then(|t| t.keys().next().copied())
    }

    /// Is every row non-decreasing in cluster size?
    pub fn is_monotone(&self) -> bool {
        self.rows.values().all(|tiers| {
            tiers
                .values()
                .zip(tiers.values().skip(1))
                .all(|(a, b)| a <= b)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
