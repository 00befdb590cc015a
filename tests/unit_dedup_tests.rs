use prop_relay::dedup::{Claim, ClaimJournal, DedupGuard, FileClaimJournal, MemoryClaimJournal};
use prop_relay::error::{RelayError, Result};
use prop_relay::models::EventKind;

#[test]
fn test_admit_then_reject() {
    let guard = DedupGuard::new(Box::new(MemoryClaimJournal::new()));

    assert!(guard.admit(EventKind::Created, 200).unwrap());
    assert!(!guard.admit(EventKind::Created, 200).unwrap());
}

#[test]
fn test_event_kinds_tracked_independently() {
    let guard = DedupGuard::new(Box::new(MemoryClaimJournal::new()));

    // A group that was created and later updated passes each check once
    assert!(guard.admit(EventKind::Created, 200).unwrap());
    assert!(guard.admit(EventKind::Updated, 200).unwrap());
    assert!(!guard.admit(EventKind::Created, 200).unwrap());
    assert!(!guard.admit(EventKind::Updated, 200).unwrap());
}

#[test]
fn test_distinct_groups_all_admitted() {
    let guard = DedupGuard::new(Box::new(MemoryClaimJournal::new()));

    for tx_id in 1..=20 {
        assert!(guard.admit(EventKind::Created, tx_id).unwrap());
    }
}

#[test]
fn test_recover_from_memory_journal() {
    let mut journal = MemoryClaimJournal::new();
    journal
        .append(&Claim {
            kind: EventKind::Created,
            tx_id: 200,
        })
        .unwrap();
    journal
        .append(&Claim {
            kind: EventKind::Updated,
            tx_id: 300,
        })
        .unwrap();

    let guard = DedupGuard::recover(Box::new(journal)).unwrap();
    assert!(!guard.admit(EventKind::Created, 200).unwrap());
    assert!(!guard.admit(EventKind::Updated, 300).unwrap());
    // The replayed claims do not leak across kinds
    assert!(guard.admit(EventKind::Updated, 200).unwrap());
    assert!(guard.admit(EventKind::Created, 300).unwrap());
}

#[test]
fn test_file_journal_replay_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("claims.jsonl");

    let mut journal = FileClaimJournal::open(&path).unwrap();
    let claims = [
        Claim {
            kind: EventKind::Created,
            tx_id: 200,
        },
        Claim {
            kind: EventKind::Created,
            tx_id: 201,
        },
        Claim {
            kind: EventKind::Updated,
            tx_id: 200,
        },
    ];
    for claim in &claims {
        journal.append(claim).unwrap();
    }

    assert_eq!(journal.replay().unwrap(), claims);
}

#[test]
fn test_admissions_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("claims.jsonl");

    {
        let journal = FileClaimJournal::open(&path).unwrap();
        let guard = DedupGuard::recover(Box::new(journal)).unwrap();
        assert!(guard.admit(EventKind::Created, 200).unwrap());
        assert!(guard.admit(EventKind::Updated, 300).unwrap());
    }

    // Simulated restart: a fresh guard replays the same file
    let journal = FileClaimJournal::open(&path).unwrap();
    let guard = DedupGuard::recover(Box::new(journal)).unwrap();
    assert!(!guard.admit(EventKind::Created, 200).unwrap());
    assert!(!guard.admit(EventKind::Updated, 300).unwrap());
    assert!(guard.admit(EventKind::Created, 400).unwrap());
}

/// Journal that refuses the first append, then recovers
struct FlakyJournal {
    failed_once: bool,
    inner: MemoryClaimJournal,
}

impl ClaimJournal for FlakyJournal {
    fn append(&mut self, claim: &Claim) -> Result<()> {
        if !self.failed_once {
            self.failed_once = true;
            return Err(RelayError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.inner.append(claim)
    }

    fn replay(&self) -> Result<Vec<Claim>> {
        self.inner.replay()
    }
}

#[test]
fn test_journal_failure_does_not_admit() {
    let guard = DedupGuard::new(Box::new(FlakyJournal {
        failed_once: false,
        inner: MemoryClaimJournal::new(),
    }));

    // The failed claim must not count as an admission
    assert!(guard.admit(EventKind::Created, 200).is_err());
    assert!(guard.admit(EventKind::Created, 200).unwrap());
}
