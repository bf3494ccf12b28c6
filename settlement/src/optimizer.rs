//! Settlement optimizer
//!
//! Greedy two-heap matching of net debtors against net creditors.
//!
//! # Algorithm
//!
//! 1. Split balances into debtors (positive) and creditors (negative, stored
//!    as the positive amount owed to them); zero balances are dropped
//! 2. Pop one debtor and one creditor, settle `min` of the two
//! 3. Re-insert whichever side still has a remainder
//! 4. Stop when either heap is empty; the other must be empty too
//!
//! # Example
//!
//! ```text
//! Net balances:
//!   A: -200 (creditor)
//!   B:  -50 (creditor)
//!   C: +250 (debtor)
//!
//! Smallest first:
//!   C pays B: 50
//!   C pays A: 200
//! ```
//!
//! The default order pops the smallest amounts first. Equal amounts are
//! ordered by participant id so the output is reproducible.

use crate::{
    conversion,
    types::*,
    Error, Result,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Priority used when popping debtors and creditors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOrder {
    /// Smallest outstanding amount first
    #[default]
    SmallestFirst,
    /// Largest outstanding amount first
    LargestFirst,
}

impl std::str::FromStr for MatchOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smallest_first" | "smallest-first" => Ok(MatchOrder::SmallestFirst),
            "largest_first" | "largest-first" => Ok(MatchOrder::LargestFirst),
            other => Err(Error::Config(format!("Unknown match order: {}", other))),
        }
    }
}

/// Outstanding amount of one participant inside a heap
#[derive(Debug, Clone, PartialEq, Eq)]
struct Position {
    order: MatchOrder,
    participant: ParticipantId,
    amount: Decimal,
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap pops the greatest element
        let by_amount = match self.order {
            MatchOrder::SmallestFirst => other.amount.cmp(&self.amount),
            MatchOrder::LargestFirst => self.amount.cmp(&other.amount),
        };
        by_amount.then_with(|| other.participant.cmp(&self.participant))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Settlement optimizer
#[derive(Debug, Clone, Default)]
pub struct SettlementOptimizer {
    order: MatchOrder,
}

impl SettlementOptimizer {
    /// Create new optimizer
    pub fn new(order: MatchOrder) -> Self {
        Self { order }
    }

    /// Configured match order
    pub fn order(&self) -> MatchOrder {
        self.order
    }

    /// Produce payments that zero every balance
    pub fn optimize(&self, balances: &NetBalances) -> Result<Vec<Settlement>> {
        let (mut debtors, mut creditors) = self.partition(balances);
        let mut settlements = Vec::new();

        while !debtors.is_empty() && !creditors.is_empty() {
            let (Some(mut debtor), Some(mut creditor)) = (debtors.pop(), creditors.pop()) else {
                break;
            };
            let settle_amount = debtor.amount.min(creditor.amount);

            let rounded = conversion::round_minor_units(settle_amount)?;
            if rounded != 0 {
                tracing::debug!(
                    "{} pays {} {} ({} before rounding)",
                    debtor.participant,
                    creditor.participant,
                    rounded,
                    settle_amount
                );
                settlements.push(Settlement {
                    from: debtor.participant.clone(),
                    to: creditor.participant.clone(),
                    amount: rounded,
                });
            }

            debtor.amount -= settle_amount;
            creditor.amount -= settle_amount;

            if debtor.amount > Decimal::ZERO {
                debtors.push(debtor);
            }
            if creditor.amount > Decimal::ZERO {
                creditors.push(creditor);
            }
        }

        check_drained(&debtors, BalanceSide::Debtor)?;
        check_drained(&creditors, BalanceSide::Creditor)?;

        Ok(settlements)
    }

    /// Split balances into debtor and creditor heaps
    fn partition(&self, balances: &NetBalances) -> (BinaryHeap<Position>, BinaryHeap<Position>) {
        let mut debtors = BinaryHeap::new();
        let mut creditors = BinaryHeap::new();

        for (participant, &balance) in balances.iter() {
            let position = Position {
                order: self.order,
                participant: participant.clone(),
                amount: balance.abs(),
            };
            if balance > Decimal::ZERO {
                debtors.push(position);
            } else if balance < Decimal::ZERO {
                creditors.push(position);
            }
        }

        (debtors, creditors)
    }
}

/// A heap left non-empty means the balances did not sum to zero
fn check_drained(heap: &BinaryHeap<Position>, side: BalanceSide) -> Result<()> {
    if heap.is_empty() {
        return Ok(());
    }

    let outstanding = heap
        .iter()
        .fold(Decimal::ZERO, |sum, p| sum.saturating_add(p.amount));
    tracing::error!(
        "Conservation violation: {} {} participant(s) left with {} outstanding",
        heap.len(),
        side,
        outstanding
    );
    Err(Error::ConservationViolation {
        side,
        outstanding,
        participants: heap.len(),
    })
}
