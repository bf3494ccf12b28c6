//! Main settlement engine
//!
//! Orchestrates aggregation, optimization, and result assembly.

use crate::{
    aggregator::{self, BalanceAggregator},
    config::Config,
    optimizer::SettlementOptimizer,
    report::{Roster, SettlementReport},
    types::*,
    Error, Result,
};

/// Settlement engine
#[derive(Debug, Clone)]
pub struct SettlementEngine {
    /// Balance aggregator
    aggregator: BalanceAggregator,

    /// Settlement optimizer
    optimizer: SettlementOptimizer,

    /// Configuration
    config: Config,
}

impl Default for SettlementEngine {
    fn default() -> Self {
        let config = Config::default();
        Self {
            aggregator: BalanceAggregator::new(config.conversion.scale),
            optimizer: SettlementOptimizer::new(config.optimizer.match_order),
            config,
        }
    }
}

impl SettlementEngine {
    /// Create new settlement engine
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let aggregator = BalanceAggregator::new(config.conversion.scale);
        let optimizer = SettlementOptimizer::new(config.optimizer.match_order);

        Ok(Self {
            aggregator,
            optimizer,
            config,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Net balances for diagnostics
    pub fn aggregate(&self, obligations: &[Obligation]) -> Result<NetBalances> {
        self.aggregator.aggregate(obligations)
    }

    /// Payment instructions for a snapshot of obligations
    pub fn compute_settlements(&self, obligations: &[Obligation]) -> Result<Vec<Settlement>> {
        Ok(self.settle(obligations)?.settlements)
    }

    /// Balances, settlements and statistics for a snapshot of obligations
    pub fn settle(&self, obligations: &[Obligation]) -> Result<SettlementOutcome> {
        let balances = self.aggregator.aggregate(obligations)?;
        self.finish(obligations, balances)
    }

    /// Settle a group and resolve the payment parties against its roster
    ///
    /// Every roster member gets a balance entry, zero if uninvolved.
    pub fn settle_group(
        &self,
        obligations: &[Obligation],
        roster: &Roster,
    ) -> Result<(SettlementOutcome, SettlementReport)> {
        let seeded = NetBalances::seeded(roster.ids());
        let balances = self.aggregator.aggregate_into(seeded, obligations)?;
        let outcome = self.finish(obligations, balances)?;

        let report = SettlementReport::assemble(
            self.config.reporting_currency.clone(),
            &outcome.settlements,
            roster,
        )?;

        Ok((outcome, report))
    }

    fn finish(
        &self,
        obligations: &[Obligation],
        balances: NetBalances,
    ) -> Result<SettlementOutcome> {
        let settlements = self.optimizer.optimize(&balances)?;
        let total_settled = settlements
            .iter()
            .try_fold(0u64, |sum, s| sum.checked_add(s.amount))
            .ok_or_else(|| Error::AmountOverflow("total of settlement amounts".to_string()))?;

        let (loan_count, repayment_count) = aggregator::count_transactions(obligations);
        let stats = SettlementStats {
            transaction_count: loan_count + repayment_count,
            loan_count,
            repayment_count,
            obligation_count: obligations.len(),
            participant_count: balances.len(),
            debtor_count: balances.count(BalanceSide::Debtor),
            creditor_count: balances.count(BalanceSide::Creditor),
            settlement_count: settlements.len(),
            total_settled,
        };

        tracing::info!(
            "Settlement complete: {} obligations, {} participants -> {} payments, {} {} settled",
            stats.obligation_count,
            stats.participant_count,
            stats.settlement_count,
            stats.total_settled,
            self.config.reporting_currency
        );

        Ok(SettlementOutcome {
            balances,
            settlements,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::MatchOrder;
    use crate::report::ParticipantInfo;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::new(id).unwrap()
    }

    fn obligations() -> Vec<Obligation> {
        let dinner = Arc::new(Transaction::loan(pid("alice"), 300, Decimal::ONE));
        let repay = Arc::new(Transaction::repayment(pid("bob"), 50, Decimal::ONE));
        vec![
            Obligation::new(pid("bob"), 150, dinner.clone()),
            Obligation::new(pid("carol"), 150, dinner),
            Obligation::new(pid("alice"), 50, repay),
        ]
    }

    #[test]
    fn test_engine_creation() {
        let mut config = Config::default();
        config.optimizer.match_order = MatchOrder::LargestFirst;

        let engine = SettlementEngine::new(config).unwrap();
        assert_eq!(engine.config().optimizer.match_order, MatchOrder::LargestFirst);

        let mut bad = Config::default();
        bad.conversion.scale = 29;
        assert!(matches!(SettlementEngine::new(bad), Err(Error::Config(_))));
    }

    #[test]
    fn test_settle_stats() {
        let engine = SettlementEngine::default();

        let outcome = engine.settle(&obligations()).unwrap();

        // alice -300 + 50, bob +150 - 50, carol +150
        assert_eq!(outcome.balances.get(&pid("alice")), Some(Decimal::from(-250)));
        assert_eq!(outcome.balances.get(&pid("bob")), Some(Decimal::from(100)));
        assert_eq!(outcome.stats.transaction_count, 2);
        assert_eq!(outcome.stats.loan_count, 1);
        assert_eq!(outcome.stats.repayment_count, 1);
        assert_eq!(outcome.stats.obligation_count, 3);
        assert_eq!(outcome.stats.participant_count, 3);
        assert_eq!(outcome.stats.debtor_count, 2);
        assert_eq!(outcome.stats.creditor_count, 1);
        assert_eq!(outcome.stats.settlement_count, 2);
        assert_eq!(outcome.stats.total_settled, 250);
    }

    #[test]
    fn test_settle_group() {
        let engine = SettlementEngine::default();
        let roster: Roster = [
            ("alice", "Alice"),
            ("bob", "Bob"),
            ("carol", "Carol"),
            ("dan", "Dan"),
        ]
        .into_iter()
        .map(|(id, name)| ParticipantInfo::new(pid(id), name))
        .collect();

        let (outcome, report) = engine.settle_group(&obligations(), &roster).unwrap();

        assert_eq!(outcome.balances.get(&pid("dan")), Some(Decimal::ZERO));
        assert_eq!(outcome.stats.participant_count, 4);
        assert_eq!(report.reporting_currency, "JPY");
        assert_eq!(report.settlements.len(), 2);
        assert_eq!(report.settlements[0].from.name, "Bob");
        assert_eq!(report.settlements[0].to.name, "Alice");
        assert_eq!(report.settlements[0].amount, 100);
        assert_eq!(report.total_amount().unwrap(), 250);
    }

    #[test]
    fn test_settle_group_roster_order_irrelevant() {
        let engine = SettlementEngine::default();
        let members = [("alice", "Alice"), ("bob", "Bob"), ("carol", "Carol"), ("dan", "Dan")];
        let forward: Roster = members
            .iter()
            .map(|(id, name)| ParticipantInfo::new(pid(id), *name))
            .collect();
        let backward: Roster = members
            .iter()
            .rev()
            .map(|(id, name)| ParticipantInfo::new(pid(id), *name))
            .collect();

        let first = engine.settle_group(&obligations(), &forward).unwrap();
        let second = engine.settle_group(&obligations(), &backward).unwrap();

        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
        let ids: Vec<&str> = backward.ids().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["alice", "bob", "carol", "dan"]);
    }

    #[test]
    fn test_total_settled_overflow() {
        let engine = SettlementEngine::default();
        let amount = u64::MAX / 2 + 1;
        let mut obligations = Vec::new();
        for payer in ["alice", "bob"] {
            let txn = Arc::new(Transaction::loan(pid(payer), amount, Decimal::ONE));
            obligations.push(Obligation::new(pid("carol"), amount, txn));
        }

        let result = engine.settle(&obligations);
        assert!(matches!(result, Err(Error::AmountOverflow(_))));
    }

    #[test]
    fn test_settle_group_missing_member() {
        let engine = SettlementEngine::default();
        let roster: Roster = [ParticipantInfo::new(pid("alice"), "Alice")]
            .into_iter()
            .collect();

        let result = engine.settle_group(&obligations(), &roster);
        assert!(matches!(result, Err(Error::UnknownParticipant(_))));
    }
}
