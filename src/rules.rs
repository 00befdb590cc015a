use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

/// A proportion marker parsed from a split tag, e.g. `rent-p50`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProportionRule {
    /// Percentage of the source amount to mirror
    pub percentage: u32,
}

fn marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\w+-p(\d+)$").expect("hard-coded pattern"))
}

/// Extract every proportion rule carried by a split's tags
///
/// A tag matches only when the whole tag conforms to `<word>-p<digits>`,
/// case-sensitively. A split may carry several markers; each yields its own
/// rule, in tag order. Tags whose digit group does not fit a u32 are skipped.
pub fn proportion_rules(tags: &[String]) -> Vec<ProportionRule> {
    let mut rules = Vec::new();
    for tag in tags {
        if let Some(caps) = marker_pattern().captures(tag) {
            match caps[1].parse::<u32>() {
                Ok(percentage) => rules.push(ProportionRule { percentage }),
                Err(_) => {
                    warn!(tag = %tag, "proportion marker has an unusable percentage, skipping");
                }
            }
        }
    }
    rules
}
