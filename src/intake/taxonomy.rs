//! Status taxonomy: the one table that maps each lifecycle stage to its
//! conversion probability and display color.

use std::str::FromStr;
use std::sync::LazyLock;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::db::EnquiryStatus;
use crate::error::IntakeError;

#[derive(Debug, Clone, PartialEq)]
pub struct StatusEntry {
    pub status: EnquiryStatus,
    pub probability: Decimal,
    pub color: String,
    pub terminal: bool,
}

#[derive(Debug, Deserialize)]
struct TaxonomyConfig {
    statuses: Vec<RawStatusEntry>,
}

#[derive(Debug, Deserialize)]
struct RawStatusEntry {
    status: String,
    probability: String,
    color: String,
    #[serde(default)]
    terminal: bool,
}

static TAXONOMY: LazyLock<Result<Vec<StatusEntry>, String>> =
    LazyLock::new(|| parse_taxonomy(include_str!("status_taxonomy.toml")));

fn parse_taxonomy(raw: &str) -> Result<Vec<StatusEntry>, String> {
    let parsed: TaxonomyConfig =
        toml::from_str(raw).map_err(|e| format!("invalid status taxonomy TOML: {}", e))?;
    if parsed.statuses.len() != EnquiryStatus::ALL.len() {
        return Err(format!(
            "status taxonomy lists {} statuses, expected {}",
            parsed.statuses.len(),
            EnquiryStatus::ALL.len()
        ));
    }

    let mut out = Vec::with_capacity(parsed.statuses.len());
    for (raw_entry, expected) in parsed.statuses.into_iter().zip(EnquiryStatus::ALL) {
        let status = EnquiryStatus::from_db_value(&raw_entry.status)
            .ok_or_else(|| format!("invalid status '{}' in taxonomy", raw_entry.status))?;
        if status != expected {
            return Err(format!(
                "taxonomy out of funnel order: found '{}' where '{}' belongs",
                status, expected
            ));
        }
        let probability = Decimal::from_str(raw_entry.probability.trim()).map_err(|e| {
            format!(
                "invalid probability '{}' for '{}': {}",
                raw_entry.probability, status, e
            )
        })?;
        if probability < Decimal::ZERO || probability > Decimal::ONE {
            return Err(format!(
                "probability {} for '{}' is outside [0, 1]",
                probability, status
            ));
        }
        if status.is_loss() && (!probability.is_zero() || !raw_entry.terminal) {
            return Err(format!(
                "loss status '{}' must be terminal with probability 0",
                status
            ));
        }
        let closes_enquiry = status.is_loss() || status == EnquiryStatus::Converted;
        if raw_entry.terminal != closes_enquiry {
            return Err(format!(
                "status '{}' must {}be terminal",
                status,
                if closes_enquiry { "" } else { "not " }
            ));
        }
        out.push(StatusEntry {
            status,
            probability,
            color: raw_entry.color,
            terminal: raw_entry.terminal,
        });
    }
    Ok(out)
}

/// All taxonomy entries in funnel order.
pub fn all_statuses() -> Result<&'static [StatusEntry], IntakeError> {
    match &*TAXONOMY {
        Ok(entries) => Ok(entries.as_slice()),
        Err(err) => Err(IntakeError::TaxonomyUnavailable(err.clone())),
    }
}

pub fn entry_for(status: EnquiryStatus) -> Result<&'static StatusEntry, IntakeError> {
    let entries = all_statuses()?;
    entries
        .get(status.funnel_index())
        .ok_or_else(|| IntakeError::UnknownStatus(status.as_str().to_string()))
}

/// Parse a status label. Anything outside the fixed vocabulary is a
/// data-integrity error, never a default.
pub fn parse_status(raw: &str) -> Result<EnquiryStatus, IntakeError> {
    EnquiryStatus::from_db_value(raw.trim())
        .ok_or_else(|| IntakeError::UnknownStatus(raw.to_string()))
}

/// Conversion probability for a status label.
pub fn probability_of(status: &str) -> Result<Decimal, IntakeError> {
    probability_for(parse_status(status)?)
}

pub fn probability_for(status: EnquiryStatus) -> Result<Decimal, IntakeError> {
    entry_for(status).map(|entry| entry.probability)
}

pub fn color_of(status: EnquiryStatus) -> Result<&'static str, IntakeError> {
    entry_for(status).map(|entry| entry.color.as_str())
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::{all_statuses, color_of, parse_taxonomy, probability_for, probability_of};
    use crate::db::EnquiryStatus;
    use crate::error::IntakeError;

    #[test]
    fn bundled_taxonomy_covers_every_status_in_funnel_order() {
        let entries = all_statuses().expect("taxonomy should parse");
        let statuses: Vec<_> = entries.iter().map(|entry| entry.status).collect();
        assert_eq!(statuses, EnquiryStatus::ALL.to_vec());
    }

    #[test]
    fn pipeline_probabilities_match_stage_weights() {
        assert_eq!(probability_of("Pending").unwrap(), dec!(0.10));
        assert_eq!(probability_of("Contacted").unwrap(), dec!(0.20));
        assert_eq!(probability_of("Meeting Scheduled").unwrap(), dec!(0.40));
        assert_eq!(probability_of("Proposal Sent").unwrap(), dec!(0.60));
        assert_eq!(probability_of("Converted").unwrap(), dec!(1.00));
    }

    #[test]
    fn loss_statuses_carry_no_weight() {
        for status in [
            EnquiryStatus::Declined,
            EnquiryStatus::Conflict,
            EnquiryStatus::NotPursued,
        ] {
            assert!(probability_for(status).unwrap().is_zero(), "{status}");
        }
    }

    #[test]
    fn unknown_status_is_an_error_not_a_default() {
        let err = probability_of("Won").expect_err("unknown must fail");
        assert_eq!(err, IntakeError::UnknownStatus("Won".to_string()));
        assert!(probability_of("pending").is_err());
    }

    #[test]
    fn colors_come_from_the_same_table() {
        assert_eq!(color_of(EnquiryStatus::Converted).unwrap(), "green");
        assert_eq!(color_of(EnquiryStatus::Declined).unwrap(), "red");
    }

    #[test]
    fn out_of_range_probability_is_rejected() {
        let raw = EnquiryStatus::ALL
            .iter()
            .map(|status| {
                let probability = if *status == EnquiryStatus::Pending {
                    "1.5"
                } else {
                    "0"
                };
                let terminal = status.is_loss();
                format!(
                    "[[statuses]]\nstatus = \"{}\"\nprobability = \"{}\"\ncolor = \"gray\"\nterminal = {}\n",
                    status, probability, terminal
                )
            })
            .collect::<String>();
        let err = parse_taxonomy(&raw).expect_err("1.5 is out of range");
        assert!(err.contains("outside [0, 1]"), "unexpected error: {err}");
    }

    #[test]
    fn misordered_taxonomy_is_rejected() {
        let mut statuses = EnquiryStatus::ALL.to_vec();
        statuses.swap(0, 1);
        let raw = statuses
            .iter()
            .map(|status| {
                format!(
                    "[[statuses]]\nstatus = \"{}\"\nprobability = \"0\"\ncolor = \"gray\"\nterminal = true\n",
                    status
                )
            })
            .collect::<String>();
        let err = parse_taxonomy(&raw).expect_err("order matters");
        assert!(err.contains("funnel order"), "unexpected error: {err}");
    }

    #[test]
    fn open_stage_marked_terminal_is_rejected() {
        let raw = EnquiryStatus::ALL
            .iter()
            .map(|status| {
                let (probability, terminal) = match status {
                    s if s.is_loss() => ("0", true),
                    EnquiryStatus::Converted => ("1", true),
                    EnquiryStatus::Contacted => ("0.2", true),
                    _ => ("0.5", false),
                };
                format!(
                    "[[statuses]]\nstatus = \"{}\"\nprobability = \"{}\"\ncolor = \"gray\"\nterminal = {}\n",
                    status, probability, terminal
                )
            })
            .collect::<String>();
        let err = parse_taxonomy(&raw).expect_err("contacted is still open");
        assert!(err.contains("'Contacted' must not be terminal"), "unexpected error: {err}");
    }
}
