//! Result assembly
//!
//! Joins settlements with caller-supplied participant metadata.

use crate::{types::*, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Display metadata for a participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    /// Participant ID
    pub id: ParticipantId,

    /// Display name
    pub name: String,
}

impl ParticipantInfo {
    /// Create new participant info
    pub fn new(id: ParticipantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Group members known to the caller, ordered by participant ID
#[derive(Debug, Clone, Default)]
pub struct Roster {
    members: BTreeMap<ParticipantId, ParticipantInfo>,
}

impl Roster {
    /// Create empty roster
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a member
    pub fn insert(&mut self, info: ParticipantInfo) {
        self.members.insert(info.id.clone(), info);
    }

    /// Look up a member
    pub fn get(&self, id: &ParticipantId) -> Option<&ParticipantInfo> {
        self.members.get(id)
    }

    /// Member IDs in ascending order
    pub fn ids(&self) -> impl Iterator<Item = &ParticipantId> {
        self.members.keys()
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True when the roster has no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn resolve(&self, id: &ParticipantId) -> Result<ParticipantInfo> {
        self.get(id)
            .cloned()
            .ok_or_else(|| Error::UnknownParticipant(id.clone()))
    }
}

impl FromIterator<ParticipantInfo> for Roster {
    fn from_iter<I: IntoIterator<Item = ParticipantInfo>>(iter: I) -> Self {
        let mut roster = Roster::new();
        for info in iter {
            roster.insert(info);
        }
        roster
    }
}

/// Settlement with both parties resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSettlement {
    /// Payer
    pub from: ParticipantInfo,

    /// Payee
    pub to: ParticipantInfo,

    /// Amount in reporting-currency minor units
    pub amount: u64,
}

/// Final settlement response for a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReport {
    /// Reporting currency (ISO 4217)
    pub reporting_currency: String,

    /// Payment instructions
    #[serde(rename = "transactions_settlement")]
    pub settlements: Vec<ResolvedSettlement>,
}

impl SettlementReport {
    /// Resolve every settlement party against the roster
    pub fn assemble(
        reporting_currency: impl Into<String>,
        settlements: &[Settlement],
        roster: &Roster,
    ) -> Result<Self> {
        let settlements = settlements
            .iter()
            .map(|s| {
                Ok(ResolvedSettlement {
                    from: roster.resolve(&s.from)?,
                    to: roster.resolve(&s.to)?,
                    amount: s.amount,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            reporting_currency: reporting_currency.into(),
            settlements,
        })
    }

    /// Sum of all amounts
    pub fn total_amount(&self) -> Result<u64> {
        self.settlements
            .iter()
            .try_fold(0u64, |sum, s| sum.checked_add(s.amount))
            .ok_or_else(|| Error::AmountOverflow("total of report amounts".to_string()))
    }

    /// Serialize as JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
