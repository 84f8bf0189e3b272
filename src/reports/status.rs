use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::{EnquiryRecord, EnquiryStatus};
use crate::error::IntakeError;
use crate::intake::taxonomy;
use crate::reports::kpi::percentage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: EnquiryStatus,
    pub count: u64,
    /// Percentage of all enquiries; 0 for an empty collection.
    pub share: Decimal,
    /// Display color from the status taxonomy.
    pub color: &'static str,
}

/// Open, won and lost totals across the collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusRollup {
    pub total: u64,
    /// Enquiries in a non-terminal stage.
    pub active: u64,
    pub converted: u64,
    pub lost: u64,
}

/// Count enquiries per status present in the collection.
///
/// The result is unordered; presentation code sorts it (for example with
/// [`sort_by_funnel`]).
pub fn status_summary(enquiries: &[EnquiryRecord]) -> Result<Vec<StatusCount>, IntakeError> {
    let mut counts: HashMap<EnquiryStatus, u64> = HashMap::new();
    for enquiry in enquiries {
        *counts.entry(enquiry.current_status).or_default() += 1;
    }
    let total = enquiries.len() as u64;
    counts
        .into_iter()
        .map(|(status, count)| {
            Ok(StatusCount {
                status,
                count,
                share: percentage(count, total),
                color: taxonomy::color_of(status)?,
            })
        })
        .collect()
}

pub fn status_rollup(summary: &[StatusCount]) -> Result<StatusRollup, IntakeError> {
    let mut rollup = StatusRollup::default();
    for item in summary {
        rollup.total += item.count;
        let entry = taxonomy::entry_for(item.status)?;
        if !entry.terminal {
            rollup.active += item.count;
        } else if item.status.is_loss() {
            rollup.lost += item.count;
        } else {
            rollup.converted += item.count;
        }
    }
    Ok(rollup)
}

pub fn sort_by_funnel(summary: &mut [StatusCount]) {
    summary.sort_by_key(|item| item.status.funnel_index());
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::{StatusCount, StatusRollup, sort_by_funnel, status_rollup, status_summary};
    use crate::db::EnquiryStatus;
    use crate::reports::test_support::enquiry;

    fn collection(statuses: &[EnquiryStatus]) -> Vec<crate::db::EnquiryRecord> {
        statuses
            .iter()
            .map(|status| enquiry(*status, None, (2026, 3, 3)))
            .collect()
    }

    #[test]
    fn counts_sum_to_total() {
        let enquiries = collection(&[
            EnquiryStatus::Pending,
            EnquiryStatus::Pending,
            EnquiryStatus::Converted,
            EnquiryStatus::NotPursued,
            EnquiryStatus::Pending,
            EnquiryStatus::ProposalSent,
        ]);

        let summary = status_summary(&enquiries).expect("summary");
        let total: u64 = summary.iter().map(|item| item.count).sum();
        assert_eq!(total, enquiries.len() as u64);
        assert_eq!(summary.len(), 4);
    }

    #[test]
    fn only_present_statuses_are_reported() {
        let enquiries = collection(&[EnquiryStatus::Conflict]);
        assert_eq!(
            status_summary(&enquiries).expect("summary"),
            vec![StatusCount {
                status: EnquiryStatus::Conflict,
                count: 1,
                share: dec!(100),
                color: "orange",
            }]
        );
        assert!(status_summary(&[]).expect("empty summary").is_empty());
    }

    #[test]
    fn shares_are_percentages_of_the_whole() {
        let enquiries = collection(&[
            EnquiryStatus::Pending,
            EnquiryStatus::Pending,
            EnquiryStatus::Pending,
            EnquiryStatus::Converted,
        ]);
        let mut summary = status_summary(&enquiries).expect("summary");
        sort_by_funnel(&mut summary);
        let shares: Vec<_> = summary.iter().map(|item| item.share).collect();
        assert_eq!(shares, vec![dec!(75), dec!(25)]);
        assert_eq!(summary[1].color, "green");
    }

    #[test]
    fn rollup_splits_active_converted_and_lost() {
        let enquiries = collection(&[
            EnquiryStatus::Pending,
            EnquiryStatus::Contacted,
            EnquiryStatus::MeetingScheduled,
            EnquiryStatus::ProposalSent,
            EnquiryStatus::Converted,
            EnquiryStatus::Converted,
            EnquiryStatus::Declined,
            EnquiryStatus::Conflict,
            EnquiryStatus::NotPursued,
        ]);
        let summary = status_summary(&enquiries).expect("summary");
        assert_eq!(
            status_rollup(&summary).expect("rollup"),
            StatusRollup {
                total: 9,
                active: 4,
                converted: 2,
                lost: 3,
            }
        );
    }

    #[test]
    fn empty_collection_rolls_up_to_zero() {
        let summary = status_summary(&[]).expect("summary");
        assert_eq!(status_rollup(&summary).expect("rollup"), StatusRollup::default());
        assert_eq!(super::percentage(0, 0), Decimal::ZERO);
    }

    #[test]
    fn funnel_sort_is_left_to_the_caller() {
        let enquiries = collection(&[
            EnquiryStatus::Declined,
            EnquiryStatus::Pending,
            EnquiryStatus::MeetingScheduled,
        ]);
        let mut summary = status_summary(&enquiries).expect("summary");
        sort_by_funnel(&mut summary);
        let order: Vec<_> = summary.iter().map(|item| item.status).collect();
        assert_eq!(
            order,
            vec![
                EnquiryStatus::Pending,
                EnquiryStatus::MeetingScheduled,
                EnquiryStatus::Declined
            ]
        );
    }
}
