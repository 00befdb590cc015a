use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which webhook fired for a transaction group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Created,
    Updated,
}

/// Direction of a transaction split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitType {
    Withdrawal,
    Deposit,
    Transfer,
}

/// Webhook payload envelope; everything the relay reads lives under `content`
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionEvent {
    pub content: TransactionGroup,
}

/// A transaction group as delivered by the webhook
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionGroup {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: u64,
    #[serde(default)]
    pub group_title: Option<String>,
    pub transactions: Vec<Split>,
}

/// One leg of a transaction group, keyed by its journal id across updates
#[derive(Debug, Clone, Deserialize)]
pub struct Split {
    #[serde(deserialize_with = "deserialize_id")]
    pub transaction_journal_id: u64,
    #[serde(rename = "type")]
    pub split_type: SplitType,
    pub amount: Decimal,
    pub description: String,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub source_id: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub destination_id: Option<u64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
}

/// The ledger emits ids as integers in webhook payloads but as strings in
/// REST responses; accept both
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => text.parse().map_err(de::Error::custom),
    }
}

pub(crate) fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    match Option::<RawId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawId::Number(id)) => Ok(Some(id)),
        Some(RawId::Text(text)) => text.parse().map(Some).map_err(de::Error::custom),
    }
}

/// Splits without tags arrive as `"tags": null`; treat that as empty
fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
