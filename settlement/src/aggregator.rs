//! Balance aggregation
//!
//! Turns a snapshot of obligations into one net balance per participant in
//! reporting-currency minor units.
//!
//! # Algorithm
//!
//! 1. Group obligations by parent transaction (first-seen order)
//! 2. Debit the payer with the converted transaction total
//! 3. Credit every obligor with its converted share
//! 4. Push the rounding residual onto the transaction's largest obligor
//!
//! # Example
//!
//! ```text
//! Transaction: 100 at rate 3, split 33 / 33 / 34
//!   total   = 33.3333333
//!   shares  = 11.0000000 + 11.0000000 + 11.3333333 = 33.3333333
//!   residual = 0
//!
//! Transaction: 3 at rate 3, split 1 / 1 / 1
//!   total   = 1.0000000
//!   shares  = 0.3333333 * 3 = 0.9999999
//!   residual = 0.0000001 -> first obligor
//! ```

use crate::{
    conversion::{self, DEFAULT_CONVERSION_SCALE},
    types::*,
    Error, Result,
};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Balance aggregator
#[derive(Debug, Clone)]
pub struct BalanceAggregator {
    /// Fractional digits for conversions
    scale: u32,
}

impl Default for BalanceAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERSION_SCALE)
    }
}

/// Obligations of one transaction
struct TransactionGroup<'a> {
    transaction: &'a Transaction,
    obligations: Vec<&'a Obligation>,
}

impl BalanceAggregator {
    /// Create new aggregator
    pub fn new(scale: u32) -> Self {
        Self { scale }
    }

    /// Aggregate obligations into net balances
    pub fn aggregate(&self, obligations: &[Obligation]) -> Result<NetBalances> {
        self.aggregate_into(NetBalances::new(), obligations)
    }

    /// Aggregate on top of existing balances (e.g. roster-seeded zeros)
    pub fn aggregate_into(
        &self,
        mut balances: NetBalances,
        obligations: &[Obligation],
    ) -> Result<NetBalances> {
        let groups = group_by_transaction(obligations);

        // Reject the whole snapshot before touching any balance
        for group in &groups {
            let rate = group.transaction.exchange_rate;
            if rate <= Decimal::ZERO {
                return Err(Error::InvalidExchangeRate {
                    transaction_id: group.transaction.id,
                    rate,
                });
            }
        }

        for group in &groups {
            self.apply_transaction(&mut balances, group)?;
        }

        Ok(balances)
    }

    fn apply_transaction(
        &self,
        balances: &mut NetBalances,
        group: &TransactionGroup<'_>,
    ) -> Result<()> {
        let transaction = group.transaction;
        let rate = transaction.exchange_rate;

        let total_converted =
            conversion::to_reporting(transaction.total_amount, rate, self.scale)?;
        balances.add(&transaction.payer, -total_converted)?;

        let mut individual_sum = Decimal::ZERO;
        let mut max_debtor: Option<(&ParticipantId, Decimal)> = None;

        for obligation in &group.obligations {
            let converted = conversion::to_reporting(obligation.amount, rate, self.scale)?;
            balances.add(&obligation.obligor, converted)?;
            individual_sum = individual_sum.checked_add(converted).ok_or_else(|| {
                Error::AmountOverflow(format!("shares of transaction {}", transaction.id))
            })?;

            // Strictly greater keeps the first-seen obligor on ties
            let is_larger = match max_debtor {
                Some((_, largest)) => converted > largest,
                None => true,
            };
            if is_larger {
                max_debtor = Some((&obligation.obligor, converted));
            }
        }

        let difference = total_converted - individual_sum;
        if !difference.is_zero() {
            if let Some((obligor, _)) = max_debtor {
                balances.add(obligor, difference)?;
                tracing::debug!(
                    "Adjusted rounding error {} for transaction {} to {}",
                    difference,
                    transaction.id,
                    obligor
                );
            }
        }

        Ok(())
    }
}

/// Group obligations by parent transaction, keeping first-seen order
fn group_by_transaction(obligations: &[Obligation]) -> Vec<TransactionGroup<'_>> {
    let mut index: HashMap<TransactionId, usize> = HashMap::new();
    let mut groups: Vec<TransactionGroup<'_>> = Vec::new();

    for obligation in obligations {
        let transaction = obligation.transaction.as_ref();
        let slot = *index.entry(transaction.id).or_insert_with(|| {
            groups.push(TransactionGroup {
                transaction,
                obligations: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].obligations.push(obligation);
    }

    groups
}

/// Number of distinct transactions per kind: (loans, repayments)
pub(crate) fn count_transactions(obligations: &[Obligation]) -> (usize, usize) {
    group_by_transaction(obligations)
        .iter()
        .fold((0, 0), |(loans, repayments), group| match group.transaction.kind {
            TransactionKind::Loan => (loans + 1, repayments),
            TransactionKind::Repayment => (loans, repayments + 1),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::new(id).unwrap()
    }

    fn split(
        payer: &str,
        total: u64,
        rate: Decimal,
        shares: &[(&str, u64)],
    ) -> Vec<Obligation> {
        let txn = Arc::new(Transaction::loan(pid(payer), total, rate));
        shares
            .iter()
            .map(|(obligor, amount)| Obligation::new(pid(obligor), *amount, txn.clone()))
            .collect()
    }

    #[test]
    fn test_single_obligation() {
        let aggregator = BalanceAggregator::default();
        let obligations = split("alice", 10000, Decimal::new(1487, 1), &[("bob", 10000)]);

        let balances = aggregator.aggregate(&obligations).unwrap();

        assert_eq!(balances.get(&pid("alice")), Some(Decimal::new(-672494956, 7)));
        assert_eq!(balances.get(&pid("bob")), Some(Decimal::new(672494956, 7)));
        assert!(balances.is_conserved());
    }

    #[test]
    fn test_residual_goes_to_largest_obligor() {
        let aggregator = BalanceAggregator::default();
        // 3000 / 148.7 = 20.1748487, 4000 / 148.7 = 26.8997983
        // 2 * 20.1748487 + 26.8997983 = 67.2494957, total 67.2494956
        let obligations = split(
            "alice",
            10000,
            Decimal::new(1487, 1),
            &[("bob", 3000), ("carol", 4000), ("dave", 3000)],
        );

        let balances = aggregator.aggregate(&obligations).unwrap();

        assert_eq!(balances.get(&pid("bob")), Some(Decimal::new(201748487, 7)));
        assert_eq!(balances.get(&pid("dave")), Some(Decimal::new(201748487, 7)));
        assert_eq!(balances.get(&pid("carol")), Some(Decimal::new(268997982, 7)));
        assert!(balances.is_conserved());
    }

    #[test]
    fn test_residual_tie_goes_to_first_seen() {
        let aggregator = BalanceAggregator::default();
        let obligations = split(
            "alice",
            3,
            Decimal::from(3),
            &[("bob", 1), ("carol", 1), ("dave", 1)],
        );

        let balances = aggregator.aggregate(&obligations).unwrap();

        assert_eq!(balances.get(&pid("alice")), Some(Decimal::from(-1)));
        assert_eq!(balances.get(&pid("bob")), Some(Decimal::new(3333334, 7)));
        assert_eq!(balances.get(&pid("carol")), Some(Decimal::new(3333333, 7)));
        assert_eq!(balances.get(&pid("dave")), Some(Decimal::new(3333333, 7)));
        assert!(balances.is_conserved());
    }

    #[test]
    fn test_payer_among_obligors() {
        let aggregator = BalanceAggregator::default();
        let obligations = split(
            "alice",
            300,
            Decimal::ONE,
            &[("alice", 100), ("bob", 100), ("carol", 100)],
        );

        let balances = aggregator.aggregate(&obligations).unwrap();

        assert_eq!(balances.get(&pid("alice")), Some(Decimal::from(-200)));
        assert_eq!(balances.get(&pid("bob")), Some(Decimal::from(100)));
        assert!(balances.is_conserved());
    }

    #[test]
    fn test_shares_not_matching_total_still_conserve() {
        let aggregator = BalanceAggregator::default();
        // Shares sum to 290, total is 300: residual 10 lands on bob
        let obligations = split(
            "alice",
            300,
            Decimal::ONE,
            &[("bob", 150), ("carol", 140)],
        );

        let balances = aggregator.aggregate(&obligations).unwrap();

        assert_eq!(balances.get(&pid("bob")), Some(Decimal::from(160)));
        assert_eq!(balances.get(&pid("carol")), Some(Decimal::from(140)));
        assert!(balances.is_conserved());
    }

    #[test]
    fn test_invalid_rate_rejected() {
        let aggregator = BalanceAggregator::default();
        let mut obligations = split("alice", 100, Decimal::ONE, &[("bob", 100)]);
        obligations.extend(split("bob", 100, Decimal::ZERO, &[("alice", 100)]));

        let result = aggregator.aggregate(&obligations);
        assert!(matches!(result, Err(Error::InvalidExchangeRate { .. })));

        let negative = split("alice", 100, Decimal::new(-15, 1), &[("bob", 100)]);
        assert!(aggregator.aggregate(&negative).is_err());
    }

    #[test]
    fn test_overflowing_balance_rejected() {
        let aggregator = BalanceAggregator::default();
        // Each transaction converts to 10^28; eight of them exceed Decimal::MAX
        let amount = 10_000_000_000_000_000_000;
        let obligations: Vec<Obligation> = (0..10)
            .flat_map(|_| split("alice", amount, Decimal::new(1, 9), &[("bob", amount)]))
            .collect();

        let result = aggregator.aggregate(&obligations);
        assert!(matches!(result, Err(Error::AmountOverflow(_))));
    }

    #[test]
    fn test_empty_input() {
        let balances = BalanceAggregator::default().aggregate(&[]).unwrap();
        assert!(balances.is_empty());
    }

    #[test]
    fn test_seeded_members_kept() {
        let aggregator = BalanceAggregator::default();
        let erin = pid("erin");
        let obligations = split("alice", 100, Decimal::ONE, &[("bob", 100)]);

        let balances = aggregator
            .aggregate_into(NetBalances::seeded([&erin]), &obligations)
            .unwrap();

        assert_eq!(balances.len(), 3);
        assert_eq!(balances.get(&erin), Some(Decimal::ZERO));
    }

    #[test]
    fn test_count_transactions() {
        let mut obligations = split("alice", 100, Decimal::ONE, &[("bob", 50), ("carol", 50)]);
        let repayment = Arc::new(Transaction::repayment(pid("bob"), 50, Decimal::ONE));
        obligations.push(Obligation::new(pid("alice"), 50, repayment));

        assert_eq!(count_transactions(&obligations), (1, 1));
    }
}
