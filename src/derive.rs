use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::links::derived_from_note;
use crate::models::{DerivedTransaction, Split, SplitType};
use crate::rules::ProportionRule;

/// Build the proportion transaction for one (split, rule) pair
///
/// The derived transaction always flows from the configured income account
/// to the configured owed account; the source split's direction is captured
/// by inverting the type. Transfers have no meaningful inversion and are
/// rejected per split.
pub fn build_derived(
    split: &Split,
    group_id: u64,
    group_title: Option<&str>,
    rule: ProportionRule,
    config: &RelayConfig,
) -> Result<DerivedTransaction> {
    let tx_type = match split.split_type {
        SplitType::Withdrawal => SplitType::Deposit,
        SplitType::Deposit => SplitType::Withdrawal,
        SplitType::Transfer => {
            return Err(RelayError::AmbiguousSplitType {
                journal_id: split.transaction_journal_id,
                split_type: "transfer".to_string(),
            })
        }
    };

    let title = match group_title {
        Some(title) if !title.is_empty() => format!("Prop - {title}"),
        _ => format!("Prop - {}", split.description),
    };

    Ok(DerivedTransaction {
        title,
        tx_type,
        amount: proportion_amount(split.amount, rule.percentage),
        description: split.description.clone(),
        source_id: config.income_account_id,
        destination_id: config.owed_account_id,
        currency_code: config.currency_code.clone(),
        notes: derived_from_note(&config.base_url, group_id),
    })
}

/// Compute `amount * percentage / 100` at fixed 2-decimal currency scale
///
/// Midpoints round away from zero; the result always carries exactly two
/// decimal places so it serializes to the ledger's native string form.
pub fn proportion_amount(amount: Decimal, percentage: u32) -> Decimal {
    let mut scaled = (amount * Decimal::from(percentage) / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    scaled.rescale(2);
    scaled
}
