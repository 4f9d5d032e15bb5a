//! In-process oracle policies for batch simulation
//!
//! `AlwaysWin` and `AlwaysLoss` replay a fixed verdict. `Rtp` keeps a shared
//! ledger of wagered and paid amounts and only allows a win while the
//! session stays at or below the target return.

use clap::ValueEnum;
use parking_lot::Mutex;
use rf_cascade::{FixedOutcome, Outcome, OutcomeOracle, OutcomeQuery, ServiceError};
use serde::{Deserialize, Serialize};

/// Which oracle drives the simulated rounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OraclePolicy {
    AlwaysWin,
    AlwaysLoss,
    #[default]
    Rtp,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Ledger {
    wagered: f64,
    paid: f64,
}

/// Oracle that caps the running return at the queried target RTP
#[derive(Debug, Default)]
pub struct RtpLedgerOracle {
    ledger: Mutex<Ledger>,
}

impl RtpLedgerOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_wager(&self, amount: f64) {
        self.ledger.lock().wagered += amount;
    }

    /// Paid over wagered so far
    pub fn current_rtp(&self) -> f64 {
        let ledger = self.ledger.lock();
        if ledger.wagered > 0.0 {
            ledger.paid / ledger.wagered
        } else {
            0.0
        }
    }
}

impl OutcomeOracle for RtpLedgerOracle {
    fn decide(&self, query: &OutcomeQuery) -> Result<Outcome, ServiceError> {
        let win = query.payout_multiplier * query.bet_amount;
        let mut ledger = self.ledger.lock();
        if ledger.wagered <= 0.0 || (ledger.paid + win) / ledger.wagered > query.target_rtp {
            return Ok(Outcome::Loss);
        }
        ledger.paid += win;
        Ok(Outcome::Win)
    }
}

/// Oracle selected by an [`OraclePolicy`]
#[derive(Debug)]
pub enum SimOracle {
    Fixed(FixedOutcome),
    Ledger(RtpLedgerOracle),
}

impl SimOracle {
    pub fn from_policy(policy: OraclePolicy) -> Self {
        match policy {
            OraclePolicy::AlwaysWin => SimOracle::Fixed(FixedOutcome::win()),
            OraclePolicy::AlwaysLoss => SimOracle::Fixed(FixedOutcome::loss()),
            OraclePolicy::Rtp => SimOracle::Ledger(RtpLedgerOracle::new()),
        }
    }

    /// Charge a paid spin to the ledger, if there is one
    pub fn record_wager(&self, amount: f64) {
        if let SimOracle::Ledger(ledger) = self {
            ledger.record_wager(amount);
        }
    }
}

impl OutcomeOracle for SimOracle {
    fn decide(&self, query: &OutcomeQuery) -> Result<Outcome, ServiceError> {
        match self {
            SimOracle::Fixed(fixed) => fixed.decide(query),
            SimOracle::Ledger(ledger) => ledger.decide(query),
        }
    }
}
