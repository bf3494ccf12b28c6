//! Core types for settlement engine

use crate::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Opaque group member identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Create new participant ID, rejecting blank identifiers
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidParticipantId(id));
        }
        Ok(Self(id))
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ParticipantId> for String {
    fn from(id: ParticipantId) -> Self {
        id.0
    }
}

impl std::str::FromStr for ParticipantId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of expense event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// Payer covered a shared expense
    Loan,
    /// Payer paid back an earlier debt
    Repayment,
}

/// A single expense event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction ID
    pub id: TransactionId,

    /// Loan or repayment
    pub kind: TransactionKind,

    /// Participant who paid
    pub payer: ParticipantId,

    /// Total in original-currency minor units
    pub total_amount: u64,

    /// Original-currency units per one reporting-currency unit
    pub exchange_rate: Decimal,
}

impl Transaction {
    /// Create a loan with a fresh identifier
    pub fn loan(payer: ParticipantId, total_amount: u64, exchange_rate: Decimal) -> Self {
        Self {
            id: TransactionId::new(),
            kind: TransactionKind::Loan,
            payer,
            total_amount,
            exchange_rate,
        }
    }

    /// Create a repayment with a fresh identifier
    pub fn repayment(payer: ParticipantId, total_amount: u64, exchange_rate: Decimal) -> Self {
        Self {
            kind: TransactionKind::Repayment,
            ..Self::loan(payer, total_amount, exchange_rate)
        }
    }
}

/// One participant's share of a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obligation {
    /// Participant who owes the share
    pub obligor: ParticipantId,

    /// Share in original-currency minor units
    pub amount: u64,

    /// Parent transaction
    pub transaction: Arc<Transaction>,
}

impl Obligation {
    /// Create new obligation
    pub fn new(obligor: ParticipantId, amount: u64, transaction: Arc<Transaction>) -> Self {
        Self {
            obligor,
            amount,
            transaction,
        }
    }
}

/// Which heap a participant lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceSide {
    /// Owes money
    Debtor,
    /// Is owed money
    Creditor,
}

impl std::fmt::Display for BalanceSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BalanceSide::Debtor => write!(f, "debtor"),
            BalanceSide::Creditor => write!(f, "creditor"),
        }
    }
}

/// Signed net balance per participant, in reporting-currency minor units
///
/// Positive = net debtor, negative = net creditor. Ordered by participant
/// so iteration is reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetBalances(BTreeMap<ParticipantId, Decimal>);

impl NetBalances {
    /// Create empty balances
    pub fn new() -> Self {
        Self::default()
    }

    /// Balances with a zero entry for every given participant
    ///
    /// Input order does not matter: entries are kept sorted by participant.
    pub fn seeded<'a>(participants: impl IntoIterator<Item = &'a ParticipantId>) -> Self {
        Self(
            participants
                .into_iter()
                .map(|id| (id.clone(), Decimal::ZERO))
                .collect(),
        )
    }

    /// Balances summed per participant from `(participant, amount)` pairs
    pub fn from_entries(
        entries: impl IntoIterator<Item = (ParticipantId, Decimal)>,
    ) -> Result<Self> {
        let mut balances = Self::new();
        for (participant, amount) in entries {
            balances.add(&participant, amount)?;
        }
        Ok(balances)
    }

    /// Add a signed amount to a participant's balance
    pub fn add(&mut self, participant: &ParticipantId, amount: Decimal) -> Result<()> {
        let balance = self.0.entry(participant.clone()).or_insert(Decimal::ZERO);
        *balance = balance.checked_add(amount).ok_or_else(|| {
            Error::AmountOverflow(format!("balance of {} plus {}", participant, amount))
        })?;
        Ok(())
    }

    /// Balance of a participant, if present
    pub fn get(&self, participant: &ParticipantId) -> Option<Decimal> {
        self.0.get(participant).copied()
    }

    /// Iterate in participant order
    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, &Decimal)> {
        self.0.iter()
    }

    /// Number of participants
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no participant is present
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all balances
    pub fn total(&self) -> Result<Decimal> {
        self.0.values().try_fold(Decimal::ZERO, |sum, balance| {
            sum.checked_add(*balance)
                .ok_or_else(|| Error::AmountOverflow(format!("sum of balances plus {}", balance)))
        })
    }

    /// Money conservation: balances sum to exactly zero
    pub fn is_conserved(&self) -> bool {
        matches!(self.total(), Ok(total) if total.is_zero())
    }

    /// Count of participants on one side (zero balances excluded)
    pub fn count(&self, side: BalanceSide) -> usize {
        self.0
            .values()
            .filter(|b| match side {
                BalanceSide::Debtor => b.is_sign_positive() && !b.is_zero(),
                BalanceSide::Creditor => b.is_sign_negative() && !b.is_zero(),
            })
            .count()
    }
}

/// One payment instruction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Settlement {
    /// Debtor (pays)
    pub from: ParticipantId,

    /// Creditor (receives)
    pub to: ParticipantId,

    /// Amount in reporting-currency minor units
    pub amount: u64,
}

/// Settlement statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementStats {
    /// Distinct transactions seen
    pub transaction_count: usize,

    /// Loans among them
    pub loan_count: usize,

    /// Repayments among them
    pub repayment_count: usize,

    /// Obligations processed
    pub obligation_count: usize,

    /// Participants with a balance entry
    pub participant_count: usize,

    /// Net debtors
    pub debtor_count: usize,

    /// Net creditors
    pub creditor_count: usize,

    /// Payment instructions emitted
    pub settlement_count: usize,

    /// Sum of all settlement amounts
    pub total_settled: u64,
}

/// Balances, settlements and statistics of one computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementOutcome {
    /// Reconciled net balances
    pub balances: NetBalances,

    /// Payment instructions
    pub settlements: Vec<Settlement>,

    /// Summary numbers
    pub stats: SettlementStats,
}
