//! Error types for settlement engine

use crate::types::{BalanceSide, ParticipantId, TransactionId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Settlement errors
#[derive(Error, Debug)]
pub enum Error {
    /// Exchange rate of a transaction is zero or negative
    #[error("Invalid exchange rate {rate} for transaction {transaction_id}")]
    InvalidExchangeRate {
        /// Offending transaction
        transaction_id: TransactionId,
        /// Rate as supplied
        rate: Decimal,
    },

    /// Balances did not sum to zero before matching
    #[error(
        "Conservation violation: {side} side left {outstanding} unmatched \
         across {participants} participant(s)"
    )]
    ConservationViolation {
        /// Heap that still held entries
        side: BalanceSide,
        /// Sum of the unmatched amounts
        outstanding: Decimal,
        /// Number of unmatched participants
        participants: usize,
    },

    /// Participant identifier was empty
    #[error("Invalid participant id: {0:?}")]
    InvalidParticipantId(String),

    /// Settlement refers to a participant the roster does not know
    #[error("Unknown participant: {0}")]
    UnknownParticipant(ParticipantId),

    /// Decimal conversion left the representable range
    #[error("Amount overflow: {0}")]
    AmountOverflow(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
