//! Probability-weighted pipeline forecast.
//!
//! Rows come out in funnel order (Pending through Converted, then the loss
//! statuses) and only for statuses that have at least one enquiry. Loss
//! rows count toward the raw pipeline value but weigh nothing.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::{EnquiryRecord, EnquiryStatus};
use crate::error::IntakeError;
use crate::intake::taxonomy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForecastRow {
    pub status: EnquiryStatus,
    pub count: u64,
    pub total_value: Decimal,
    pub probability: Decimal,
    pub weighted_value: Decimal,
    pub color: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineForecast {
    pub rows: Vec<ForecastRow>,
    pub total_value: Decimal,
    pub total_weighted_value: Decimal,
}

impl PipelineForecast {
    /// Weighted value as a percentage of raw value; 0 for an empty pipeline.
    pub fn probability_factor(&self) -> Decimal {
        if self.total_value.is_zero() {
            return Decimal::ZERO;
        }
        self.total_weighted_value / self.total_value * Decimal::ONE_HUNDRED
    }

    pub fn row(&self, status: EnquiryStatus) -> Option<&ForecastRow> {
        self.rows.iter().find(|row| row.status == status)
    }
}

pub fn pipeline_forecast(enquiries: &[EnquiryRecord]) -> Result<PipelineForecast, IntakeError> {
    let mut buckets = [(0u64, Decimal::ZERO); EnquiryStatus::ALL.len()];
    for enquiry in enquiries {
        let bucket = &mut buckets[enquiry.current_status.funnel_index()];
        bucket.0 += 1;
        bucket.1 += enquiry.proposal_value.unwrap_or(Decimal::ZERO);
    }

    let mut forecast = PipelineForecast::default();
    for (status, (count, total_value)) in EnquiryStatus::ALL.into_iter().zip(buckets) {
        if count == 0 {
            continue;
        }
        let entry = taxonomy::entry_for(status)?;
        let probability = entry.probability;
        let weighted_value = total_value * probability;
        forecast.total_value += total_value;
        forecast.total_weighted_value += weighted_value;
        forecast.rows.push(ForecastRow {
            status,
            count,
            total_value,
            probability,
            weighted_value,
            color: entry.color.as_str(),
        });
    }
    Ok(forecast)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::pipeline_forecast;
    use crate::db::EnquiryStatus;
    use crate::reports::test_support::enquiry;

    #[test]
    fn weighted_forecast_scenario() {
        let enquiries = vec![
            enquiry(EnquiryStatus::Pending, Some(dec!(100000)), (2026, 1, 1)),
            enquiry(EnquiryStatus::ProposalSent, Some(dec!(200000)), (2026, 1, 2)),
            enquiry(EnquiryStatus::Converted, Some(dec!(50000)), (2026, 1, 3)),
        ];
        let forecast = pipeline_forecast(&enquiries).expect("forecast");

        let weighted: Vec<_> = forecast
            .rows
            .iter()
            .map(|row| (row.status, row.weighted_value))
            .collect();
        assert_eq!(
            weighted,
            vec![
                (EnquiryStatus::Pending, dec!(10000)),
                (EnquiryStatus::ProposalSent, dec!(120000)),
                (EnquiryStatus::Converted, dec!(50000)),
            ]
        );
        assert_eq!(forecast.total_value, dec!(350000));
        assert_eq!(forecast.total_weighted_value, dec!(180000));
    }

    #[test]
    fn rows_follow_funnel_order_not_insertion_order() {
        let enquiries = vec![
            enquiry(EnquiryStatus::Declined, Some(dec!(5)), (2026, 1, 1)),
            enquiry(EnquiryStatus::Converted, Some(dec!(1)), (2026, 1, 1)),
            enquiry(EnquiryStatus::Contacted, Some(dec!(2)), (2026, 1, 1)),
            enquiry(EnquiryStatus::Contacted, None, (2026, 1, 1)),
        ];
        let forecast = pipeline_forecast(&enquiries).expect("forecast");
        let statuses: Vec<_> = forecast.rows.iter().map(|row| row.status).collect();
        assert_eq!(
            statuses,
            vec![
                EnquiryStatus::Contacted,
                EnquiryStatus::Converted,
                EnquiryStatus::Declined
            ]
        );
        let contacted = forecast.row(EnquiryStatus::Contacted).expect("row");
        assert_eq!(contacted.color, "blue");
        assert_eq!(contacted.count, 2);
        assert_eq!(contacted.total_value, dec!(2));
    }

    #[test]
    fn loss_statuses_count_in_raw_value_only() {
        let enquiries = vec![
            enquiry(EnquiryStatus::Conflict, Some(dec!(30000)), (2026, 1, 1)),
            enquiry(EnquiryStatus::MeetingScheduled, Some(dec!(10000)), (2026, 1, 1)),
        ];
        let forecast = pipeline_forecast(&enquiries).expect("forecast");
        assert_eq!(forecast.total_value, dec!(40000));
        assert_eq!(forecast.total_weighted_value, dec!(4000));
        let conflict = forecast.row(EnquiryStatus::Conflict).expect("row");
        assert_eq!(conflict.weighted_value, Decimal::ZERO);
        assert_eq!(forecast.probability_factor(), dec!(10));
    }

    #[test]
    fn weighted_never_exceeds_raw_value() {
        let enquiries: Vec<_> = EnquiryStatus::ALL
            .iter()
            .enumerate()
            .map(|(i, status)| {
                enquiry(
                    *status,
                    Some(Decimal::from(1000 * (i as u64 + 1)) + dec!(0.35)),
                    (2026, 2, 1),
                )
            })
            .collect();
        let forecast = pipeline_forecast(&enquiries).expect("forecast");
        assert_eq!(forecast.rows.len(), EnquiryStatus::ALL.len());
        for row in &forecast.rows {
            assert!(row.weighted_value <= row.total_value, "{:?}", row);
        }
        assert!(forecast.total_weighted_value <= forecast.total_value);
    }

    #[test]
    fn empty_pipeline_has_no_rows() {
        let forecast = pipeline_forecast(&[]).expect("forecast");
        assert!(forecast.rows.is_empty());
        assert_eq!(forecast.total_value, Decimal::ZERO);
        assert_eq!(forecast.probability_factor(), Decimal::ZERO);
    }
}
