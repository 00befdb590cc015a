use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use prop_relay::config::RelayConfig;
use prop_relay::dedup::{DedupGuard, MemoryClaimJournal};
use prop_relay::engine::RelayEngine;
use prop_relay::error::{RelayError, Result};
use prop_relay::links::derived_from_note;
use prop_relay::models::{
    DerivedTransaction, Split, SplitPatch, SplitType, TransactionAttributes, TransactionEvent,
    TransactionGroup, TransactionRecord,
};
use prop_relay::LedgerApi;
use rust_decimal::Decimal;

pub const BASE_URL: &str = "https://ledger.example.com";
pub const DEFAULT_SOURCE_ID: u64 = 40;
pub const DEFAULT_DEST_ID: u64 = 20;

/// Mock ledger ids start here
pub const FIRST_DERIVED_ID: u64 = 9000;

pub fn test_config() -> RelayConfig {
    RelayConfig {
        base_url: BASE_URL.to_string(),
        token: "test-token".to_string(),
        income_account_id: DEFAULT_SOURCE_ID,
        owed_account_id: DEFAULT_DEST_ID,
        currency_code: "USD".to_string(),
    }
}

/// Helper to create a withdrawal split with the given tags
pub fn make_split(journal_id: u64, amount: Decimal, tags: &[&str]) -> Split {
    Split {
        transaction_journal_id: journal_id,
        split_type: SplitType::Withdrawal,
        amount,
        description: "Test purchase".to_string(),
        source_id: Some(DEFAULT_SOURCE_ID),
        destination_id: Some(DEFAULT_DEST_ID),
        notes: None,
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
    }
}

/// Helper to create a webhook event for a transaction group
pub fn make_event(group_id: u64, splits: Vec<Split>) -> TransactionEvent {
    TransactionEvent {
        content: TransactionGroup {
            id: group_id,
            group_title: None,
            transactions: splits,
        },
    }
}

/// A derived transaction as the ledger would return it on fetch, with its
/// notes pointing back at `source_group`
pub fn make_derived_record(
    id: u64,
    journal_id: u64,
    amount: Decimal,
    source_group: u64,
) -> TransactionRecord {
    TransactionRecord {
        id,
        attributes: TransactionAttributes {
            group_title: Some("Prop - Test purchase".to_string()),
            transactions: vec![Split {
                transaction_journal_id: journal_id,
                split_type: SplitType::Deposit,
                amount,
                description: "Test purchase".to_string(),
                source_id: Some(DEFAULT_SOURCE_ID),
                destination_id: Some(DEFAULT_DEST_ID),
                notes: Some(derived_from_note(BASE_URL, source_group)),
                tags: Vec::new(),
            }],
        },
    }
}

/// Every call the engine makes against the ledger, in order
#[derive(Debug, Clone)]
pub enum LedgerCall {
    Create(DerivedTransaction),
    Get(u64),
    Update {
        id: u64,
        group_title: Option<String>,
        splits: Vec<SplitPatch>,
    },
}

/// Recording mock for the ledger REST API
///
/// Creates hand out sequential ids from `FIRST_DERIVED_ID`; fetches are
/// served from records seeded with `insert_record`.
#[derive(Default)]
pub struct MockLedger {
    calls: Mutex<Vec<LedgerCall>>,
    next_id: AtomicU64,
    records: Mutex<HashMap<u64, TransactionRecord>>,
    fail_creates: AtomicBool,
}

impl MockLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(FIRST_DERIVED_ID),
            ..Self::default()
        })
    }

    pub fn insert_record(&self, record: TransactionRecord) {
        self.records.lock().unwrap().insert(record.id, record);
    }

    /// Make every subsequent create fail with a 500
    pub fn fail_creates(&self) {
        self.fail_creates.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls that mutate ledger state
    pub fn mutation_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| !matches!(call, LedgerCall::Get(_)))
            .count()
    }
}

#[async_trait]
impl LedgerApi for MockLedger {
    async fn create_transaction(&self, draft: &DerivedTransaction) -> Result<u64> {
        self.calls
            .lock()
            .unwrap()
            .push(LedgerCall::Create(draft.clone()));
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(RelayError::Api {
                status: 500,
                body: "create refused".to_string(),
            });
        }
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn get_transaction(&self, id: u64) -> Result<TransactionRecord> {
        self.calls.lock().unwrap().push(LedgerCall::Get(id));
        self.records
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(RelayError::Api {
                status: 404,
                body: "not found".to_string(),
            })
    }

    async fn update_transaction(
        &self,
        id: u64,
        group_title: Option<&str>,
        splits: &[SplitPatch],
    ) -> Result<()> {
        self.calls.lock().unwrap().push(LedgerCall::Update {
            id,
            group_title: group_title.map(str::to_string),
            splits: splits.to_vec(),
        });
        Ok(())
    }
}

/// An engine wired to the given mock with a fresh in-memory dedup guard
pub fn make_engine(ledger: Arc<MockLedger>) -> RelayEngine {
    RelayEngine::new(
        test_config(),
        ledger,
        DedupGuard::new(Box::new(MemoryClaimJournal::new())),
    )
}
