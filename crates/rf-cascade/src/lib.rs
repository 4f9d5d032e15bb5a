//! # rf-cascade — Cascading Cluster-Grid Round Resolution
//!
//! Resolves rounds of a cascading matching game: square grids of weighted
//! symbols, 4-connected cluster wins, column gravity with refill, a
//! three-level stage progression and an escalating cascade multiplier.
//!
//! Win/loss is mandated by an external outcome oracle. Fresh grids that must
//! lose are regenerated; continuation grids (after a stage-clear or a cascade
//! step) are mutated surgically, touching only cells that were just refilled.
//!
//! ## Architecture
//!
//! ```text
//! RoundResolver<OutcomeOracle, SettingsProvider>
//!     │
//!     ├── GridGenerator   (weighted draws, biased retries, forcing)
//!     ├── connections     (flood-fill cluster detection)
//!     ├── Paytable        (size tiers × denomination × bet)
//!     ├── cascade         (surgical removal, gravity, refill)
//!     ├── enforcer        (restricted loss mutation)
//!     └── progression     (levels, free rounds, multiplier ladder)
//!           │
//!           v
//!     GameState → Spin / StageClear / Cascade responses
//! ```

pub mod cascade;
pub mod config;
pub mod connections;
pub mod enforcer;
pub mod error;
pub mod generator;
pub mod grid;
pub mod oracle;
pub mod paytable;
pub mod progression;
pub mod request;
pub mod resolver;
pub mod retry;
pub mod state;
pub mod symbols;

pub use cascade::*;
pub use config::*;
pub use connections::*;
pub use enforcer::*;
pub use error::*;
pub use generator::*;
pub use grid::*;
pub use oracle::*;
pub use paytable::*;
pub use progression::*;
pub use request::*;
pub use resolver::*;
pub use retry::*;
pub use state::*;
pub use symbols::*;
