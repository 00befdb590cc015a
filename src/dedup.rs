use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::EventKind;

/// A recorded admission: this process owns the handling of `tx_id` for the
/// given event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub kind: EventKind,
    pub tx_id: u64,
}

/// Durable store for admission claims
///
/// The claim is written BEFORE any derivation. Webhook delivery is
/// at-least-once, so a crash between the claim and the ledger mutation loses
/// that derivation rather than duplicating it on redelivery.
///
/// On startup, `replay` returns every claim ever written so the admission
/// sets survive restarts.
pub trait ClaimJournal: Send {
    /// Append a claim to durable storage
    fn append(&mut self, claim: &Claim) -> Result<()>;

    /// Read back all claims, in write order
    fn replay(&self) -> Result<Vec<Claim>>;
}

/// Append-only journal of JSON lines, fsync'd per claim
pub struct FileClaimJournal {
    path: PathBuf,
    file: File,
}

impl FileClaimJournal {
    /// Open (or create) the journal at `path`
    ///
    /// # Example
    ///
    /// ```no_run
    /// use prop_relay::dedup::FileClaimJournal;
    ///
    /// let journal = FileClaimJournal::open("relay-claims.jsonl").unwrap();
    /// ```
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }
}

impl ClaimJournal for FileClaimJournal {
    fn append(&mut self, claim: &Claim) -> Result<()> {
        let line = serde_json::to_string(claim)?;
        writeln!(self.file, "{line}")?;
        // A claim only counts once it is on disk
        self.file.sync_all()?;
        Ok(())
    }

    fn replay(&self) -> Result<Vec<Claim>> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut claims = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            claims.push(serde_json::from_str(&line)?);
        }
        Ok(claims)
    }
}

/// In-memory journal for tests and volatile deployments
#[derive(Default)]
pub struct MemoryClaimJournal {
    claims: Vec<Claim>,
}

impl MemoryClaimJournal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClaimJournal for MemoryClaimJournal {
    fn append(&mut self, claim: &Claim) -> Result<()> {
        self.claims.push(*claim);
        Ok(())
    }

    fn replay(&self) -> Result<Vec<Claim>> {
        Ok(self.claims.clone())
    }
}

struct GuardState {
    new_txs: HashSet<u64>,
    updated_txs: HashSet<u64>,
    journal: Box<dyn ClaimJournal>,
}

/// Process-wide at-most-once admission per `(event kind, transaction group)`
///
/// Created and Updated events are tracked independently: a group passes the
/// Created check once and the Updated check once, but a redelivery of either
/// is rejected. Entries are never removed.
///
/// The check-and-insert sequence runs under one lock, so two concurrent
/// deliveries of the same group cannot both observe "not present".
pub struct DedupGuard {
    state: Mutex<GuardState>,
}

impl DedupGuard {
    /// A guard with empty admission sets
    pub fn new(journal: Box<dyn ClaimJournal>) -> Self {
        Self {
            state: Mutex::new(GuardState {
                new_txs: HashSet::new(),
                updated_txs: HashSet::new(),
                journal,
            }),
        }
    }

    /// Rebuild admission state by replaying the journal
    ///
    /// # Example
    ///
    /// ```
    /// use prop_relay::dedup::{DedupGuard, MemoryClaimJournal};
    /// use prop_relay::models::EventKind;
    ///
    /// let guard = DedupGuard::recover(Box::new(MemoryClaimJournal::new())).unwrap();
    /// assert!(guard.admit(EventKind::Created, 200).unwrap());
    /// assert!(!guard.admit(EventKind::Created, 200).unwrap());
    /// ```
    pub fn recover(journal: Box<dyn ClaimJournal>) -> Result<Self> {
        let claims = journal.replay()?;
        let guard = Self::new(journal);
        {
            let mut state = guard.state.lock().expect("dedup guard mutex poisoned");
            for claim in claims {
                match claim.kind {
                    EventKind::Created => state.new_txs.insert(claim.tx_id),
                    EventKind::Updated => state.updated_txs.insert(claim.tx_id),
                };
            }
        }
        Ok(guard)
    }

    /// Admit a delivery, or reject it as already handled
    ///
    /// On first sight the claim is journaled, then the id is inserted; a
    /// journal failure leaves the sets unchanged and surfaces as an error.
    pub fn admit(&self, kind: EventKind, tx_id: u64) -> Result<bool> {
        let mut state = self.state.lock().expect("dedup guard mutex poisoned");

        let seen = match kind {
            EventKind::Created => &state.new_txs,
            EventKind::Updated => &state.updated_txs,
        };
        if seen.contains(&tx_id) {
            return Ok(false);
        }

        state.journal.append(&Claim { kind, tx_id })?;
        match kind {
            EventKind::Created => state.new_txs.insert(tx_id),
            EventKind::Updated => state.updated_txs.insert(tx_id),
        };
        Ok(true)
    }
}
