use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::event::{deserialize_id, Split, SplitType};

/// A proportion transaction to be created in the ledger
///
/// Direction is already inverted relative to the source split, and the
/// accounts are always the configured income/owed pair.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedTransaction {
    pub title: String,
    pub tx_type: SplitType,
    pub amount: Decimal,
    pub description: String,
    pub source_id: u64,
    pub destination_id: u64,
    pub currency_code: String,
    pub notes: String,
}

/// One split in a whole-group update
///
/// The ledger's update endpoint replaces the whole group: every journal id
/// must be resubmitted, and only the fields present on a patch are changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitPatch {
    pub transaction_journal_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
}

impl SplitPatch {
    /// A patch that resubmits a split unchanged
    pub fn bare(journal_id: u64) -> Self {
        Self {
            transaction_journal_id: journal_id.to_string(),
            notes: None,
            amount: None,
        }
    }
}

/// A transaction group as returned by the ledger REST API
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRecord {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: u64,
    pub attributes: TransactionAttributes,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionAttributes {
    #[serde(default)]
    pub group_title: Option<String>,
    pub transactions: Vec<Split>,
}
