//! Expense Settlement Engine
//!
//! Settles shared-expense debts inside a group: converts every obligation into
//! a single reporting currency, nets it into one balance per participant, and
//! emits the point-to-point payments that zero those balances.
//!
//! # Architecture
//!
//! 1. **Aggregation**: Convert obligations to reporting currency and net them
//!    per participant, reconciling rounding residuals per transaction
//! 2. **Optimization**: Greedy two-heap matching of debtors and creditors
//! 3. **Assembly**: Resolve payment parties against the group roster
//!
//! # Invariants
//!
//! - Money conservation: Σ(net balances) == 0 after aggregation
//! - Deterministic output: same obligations → same settlements
//! - No partial results: invalid input fails the whole computation
//!
//! # Example
//!
//! ```
//! use expense_settlement::{compute_settlements, Obligation, ParticipantId, Transaction};
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//!
//! fn main() -> expense_settlement::Result<()> {
//!     let alice = ParticipantId::new("alice")?;
//!     let bob = ParticipantId::new("bob")?;
//!
//!     // Alice paid 10000 at 148.7 per reporting unit, Bob owes all of it
//!     let dinner = Arc::new(Transaction::loan(alice.clone(), 10000, Decimal::new(1487, 1)));
//!     let obligations = vec![Obligation::new(bob.clone(), 10000, dinner)];
//!
//!     let settlements = compute_settlements(&obligations)?;
//!     assert_eq!(settlements.len(), 1);
//!     assert_eq!(settlements[0].from, bob);
//!     assert_eq!(settlements[0].to, alice);
//!     assert_eq!(settlements[0].amount, 67);
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod conversion;
pub mod aggregator;
pub mod optimizer;
pub mod report;
pub mod error;
pub mod config;
pub mod engine;

// Re-exports
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use aggregator::BalanceAggregator;
pub use optimizer::{MatchOrder, SettlementOptimizer};
pub use report::{ParticipantInfo, ResolvedSettlement, Roster, SettlementReport};
pub use engine::SettlementEngine;

/// Compute settlements with the default configuration
pub fn compute_settlements(obligations: &[Obligation]) -> Result<Vec<Settlement>> {
    SettlementEngine::default().compute_settlements(obligations)
}
