use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::client::LedgerApi;
use crate::config::RelayConfig;
use crate::dedup::DedupGuard;
use crate::derive::{build_derived, proportion_amount};
use crate::error::{RelayError, Result};
use crate::links::{append_backlink, scan_backlinks, BacklinkKind, LinkStore};
use crate::models::{EventKind, Split, SplitPatch, TransactionEvent, TransactionGroup};
use crate::rules::{proportion_rules, ProportionRule};

/// Terminal disposition of one webhook delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Duplicate delivery; nothing was done
    Rejected,
    /// No split carried a proportion marker
    NoMatch,
    /// Every (split, rule) pair was processed
    Completed {
        created: usize,
        updated: usize,
        unchanged: usize,
        skipped: usize,
    },
}

/// Orchestrates derivation and reconciliation for incoming webhook events
///
/// For each admitted event: extract proportion rules, then per (split, rule)
/// pair either create a proportion transaction and backlink it, or reconcile
/// the amount of the one created earlier. Ledger failures propagate to the
/// caller; admission has already been recorded by then, so a redelivery
/// after a failure is rejected rather than retried into a duplicate.
pub struct RelayEngine {
    config: RelayConfig,
    ledger: Arc<dyn LedgerApi>,
    guard: DedupGuard,
    links: LinkStore,
}

impl RelayEngine {
    pub fn new(config: RelayConfig, ledger: Arc<dyn LedgerApi>, guard: DedupGuard) -> Self {
        Self {
            config,
            ledger,
            guard,
            links: LinkStore::new(),
        }
    }

    /// Handle one webhook delivery
    pub async fn handle_event(
        &self,
        kind: EventKind,
        event: &TransactionEvent,
    ) -> Result<Outcome> {
        let group = &event.content;
        info!(
            group_id = group.id,
            ?kind,
            splits = group.transactions.len(),
            "received transaction event"
        );

        // Admission must precede every mutation
        if !self.guard.admit(kind, group.id)? {
            info!(group_id = group.id, "group already handled, skipping");
            return Ok(Outcome::Rejected);
        }

        let mut matches: Vec<(usize, ProportionRule)> = Vec::new();
        for (index, split) in group.transactions.iter().enumerate() {
            for rule in proportion_rules(&split.tags) {
                matches.push((index, rule));
            }
        }
        if matches.is_empty() {
            debug!(group_id = group.id, "no proportion markers found");
            return Ok(Outcome::NoMatch);
        }
        info!(
            group_id = group.id,
            matches = matches.len(),
            "proportion markers found"
        );

        let mut created = 0;
        let mut updated = 0;
        let mut unchanged = 0;
        let mut skipped = 0;

        for (index, rule) in matches {
            let split = &group.transactions[index];

            let derived_id = match kind {
                EventKind::Created => None,
                EventKind::Updated => self.find_derived(group.id, split),
            };

            if let Some(derived_id) = derived_id {
                if self
                    .reconcile_amount(group.id, split, rule, derived_id)
                    .await?
                {
                    updated += 1;
                } else {
                    unchanged += 1;
                }
                continue;
            }

            // Created event, or a marker added after creation
            match self.derive_new(group, split, rule).await {
                Ok(()) => created += 1,
                Err(RelayError::AmbiguousSplitType {
                    journal_id,
                    split_type,
                }) => {
                    warn!(journal_id, split_type = %split_type, "split cannot be mirrored, skipping");
                    skipped += 1;
                }
                Err(other) => return Err(other),
            }
        }

        Ok(Outcome::Completed {
            created,
            updated,
            unchanged,
            skipped,
        })
    }

    /// Find the transaction previously derived from this split, if any
    ///
    /// The association map is authoritative; the notes scan only imports
    /// links created before this process started, and repopulates the map on
    /// a hit.
    fn find_derived(&self, group_id: u64, split: &Split) -> Option<u64> {
        let journal_id = split.transaction_journal_id;
        if let Some(derived_id) = self.links.lookup(group_id, journal_id) {
            return Some(derived_id);
        }

        let notes = split.notes.as_deref().unwrap_or("");
        let imported = scan_backlinks(notes)
            .into_iter()
            .find(|link| link.kind == BacklinkKind::Proportion)
            .map(|link| link.id);
        if let Some(derived_id) = imported {
            info!(
                group_id,
                journal_id, derived_id, "imported existing backlink from notes"
            );
            self.links.record(group_id, journal_id, derived_id);
        }
        imported
    }

    /// Create a proportion transaction and backlink the source split
    async fn derive_new(
        &self,
        group: &TransactionGroup,
        split: &Split,
        rule: ProportionRule,
    ) -> Result<()> {
        let draft = build_derived(
            split,
            group.id,
            group.group_title.as_deref(),
            rule,
            &self.config,
        )?;
        info!(
            group_id = group.id,
            journal_id = split.transaction_journal_id,
            percentage = rule.percentage,
            amount = %draft.amount,
            "creating proportion transaction"
        );
        let derived_id = self.ledger.create_transaction(&draft).await?;

        // The create fires no webhooks, but an echo must not derive again
        self.guard.admit(EventKind::Created, derived_id)?;
        self.links
            .record(group.id, split.transaction_journal_id, derived_id);

        let notes = append_backlink(split.notes.as_deref(), derived_id, &self.config.base_url);
        debug!(group_id = group.id, notes = %notes, "writing backlink to source split");

        // Whole-group update: every split resubmitted by journal id, only
        // the affected one carrying new notes
        let patches: Vec<SplitPatch> = group
            .transactions
            .iter()
            .map(|other| {
                let mut patch = SplitPatch::bare(other.transaction_journal_id);
                if other.transaction_journal_id == split.transaction_journal_id {
                    patch.notes = Some(notes.clone());
                }
                patch
            })
            .collect();
        self.ledger
            .update_transaction(group.id, group.group_title.as_deref(), &patches)
            .await?;
        Ok(())
    }

    /// Bring a previously derived transaction's amount in line with the
    /// current split amount; returns whether an update was issued
    async fn reconcile_amount(
        &self,
        group_id: u64,
        split: &Split,
        rule: ProportionRule,
        derived_id: u64,
    ) -> Result<bool> {
        let record = self.ledger.get_transaction(derived_id).await?;
        let expected = proportion_amount(split.amount, rule.percentage);

        let mut changed = false;
        let mut patches = Vec::new();
        for derived_split in &record.attributes.transactions {
            let mut patch = SplitPatch::bare(derived_split.transaction_journal_id);
            let notes = derived_split.notes.as_deref().unwrap_or("");
            let points_here = scan_backlinks(notes)
                .iter()
                .any(|link| link.kind == BacklinkKind::DerivedFrom && link.id == group_id);
            if points_here {
                if derived_split.amount == expected {
                    info!(derived_id, group_id, "proportion amount unchanged");
                    return Ok(false);
                }
                debug!(
                    derived_id,
                    old = %derived_split.amount,
                    new = %expected,
                    "proportion amount changed"
                );
                patch.amount = Some(expected);
                changed = true;
            }
            patches.push(patch);
        }

        if !changed {
            warn!(
                derived_id,
                group_id, "no derived split links back to this group"
            );
            return Ok(false);
        }

        // Our own amount update may echo back as an Updated webhook
        self.guard.admit(EventKind::Updated, derived_id)?;
        info!(derived_id, "updating proportion transaction amount");
        self.ledger
            .update_transaction(derived_id, record.attributes.group_title.as_deref(), &patches)
            .await?;
        Ok(true)
    }
}
