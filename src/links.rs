use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use regex::Regex;

/// Direction of a backlink found in a notes field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BacklinkKind {
    /// `From tx:` — the transaction carrying the note was derived from the
    /// referenced group
    DerivedFrom,
    /// `Proportion tx:` — the referenced transaction was derived from the
    /// split carrying the note
    Proportion,
}

impl BacklinkKind {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "From" => Some(Self::DerivedFrom),
            "Proportion" => Some(Self::Proportion),
            _ => None,
        }
    }
}

/// A cross-reference recovered from backlink text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backlink {
    pub kind: BacklinkKind,
    pub id: u64,
}

fn backlink_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\w+)\s+tx:\s+https?://\S*/show/(\d+)").expect("hard-coded pattern")
    })
}

/// The note written onto a derived transaction, pointing at its source group
pub fn derived_from_note(base_url: &str, group_id: u64) -> String {
    format!("From tx: {base_url}/transactions/show/{group_id}")
}

/// The note line appended to a source split for one derived transaction
pub fn proportion_note(base_url: &str, derived_id: u64) -> String {
    format!("Proportion tx: {base_url}/transactions/show/{derived_id}")
}

/// Append a proportion backlink to a split's notes
///
/// Empty or absent notes become just the backlink line, with no leading
/// newline.
pub fn append_backlink(existing_notes: Option<&str>, derived_id: u64, base_url: &str) -> String {
    let line = proportion_note(base_url, derived_id);
    match existing_notes {
        Some(notes) if !notes.is_empty() => format!("{notes}\n{line}"),
        _ => line,
    }
}

/// Recover every backlink embedded in a notes field, in order
///
/// Lines with an unrecognized label word are ignored.
pub fn scan_backlinks(notes: &str) -> Vec<Backlink> {
    backlink_pattern()
        .captures_iter(notes)
        .filter_map(|caps| {
            let kind = BacklinkKind::from_label(&caps[1])?;
            let id = caps[2].parse().ok()?;
            Some(Backlink { kind, id })
        })
        .collect()
}

/// Associations between source splits and the transactions derived from them
///
/// The map is authoritative for update reconciliation. The backlink text in
/// the ledger's notes fields is still written for operators, and scanning it
/// (`scan_backlinks`) remains only as the import path for links created
/// before this process started.
#[derive(Default)]
pub struct LinkStore {
    links: Mutex<HashMap<(u64, u64), u64>>,
}

impl LinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `derived_id` was derived from the given source split
    pub fn record(&self, group_id: u64, journal_id: u64, derived_id: u64) {
        let mut links = self.links.lock().expect("link store mutex poisoned");
        links.insert((group_id, journal_id), derived_id);
    }

    /// Look up the transaction derived from the given source split
    pub fn lookup(&self, group_id: u64, journal_id: u64) -> Option<u64> {
        let links = self.links.lock().expect("link store mutex poisoned");
        links.get(&(group_id, journal_id)).copied()
    }
}
