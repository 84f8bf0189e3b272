use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::{EnquiryRecord, EnquiryStatus};

/// Headline pipeline metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KpiMetrics {
    pub total_enquiries: u64,
    pub this_month_enquiries: u64,
    pub converted_enquiries: u64,
    /// Percentage in [0, 100]; 0 for an empty collection.
    pub conversion_rate: Decimal,
    /// Sum of proposal values over converted enquiries.
    pub total_revenue: Decimal,
}

impl KpiMetrics {
    /// Revenue per conversion; 0 when nothing has converted.
    pub fn average_conversion_value(&self) -> Decimal {
        if self.converted_enquiries == 0 {
            return Decimal::ZERO;
        }
        self.total_revenue / Decimal::from(self.converted_enquiries)
    }

    /// Unconverted enquiries worth following up, reported only while the
    /// conversion rate is below [`GROWTH_THRESHOLD`] percent.
    pub fn growth_opportunity(&self) -> Option<u64> {
        if self.total_enquiries == 0 || self.conversion_rate >= GROWTH_THRESHOLD {
            return None;
        }
        Some(self.total_enquiries - self.converted_enquiries)
    }
}

pub const GROWTH_THRESHOLD: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Percentage of `part` in `whole`, defined as 0 when `whole` is 0.
pub(crate) fn percentage(part: u64, whole: u64) -> Decimal {
    if whole == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(whole)
}

/// Single pass over `enquiries`. `now` picks the calendar month counted as
/// "this month"; the aggregator never reads the clock itself.
pub fn kpi_metrics(enquiries: &[EnquiryRecord], now: DateTime<Utc>) -> KpiMetrics {
    let today = now.date_naive();
    let mut this_month = 0u64;
    let mut converted = 0u64;
    let mut revenue = Decimal::ZERO;

    for enquiry in enquiries {
        let date = enquiry.date_of_enquiry;
        if date.year() == today.year() && date.month() == today.month() {
            this_month += 1;
        }
        if enquiry.current_status == EnquiryStatus::Converted {
            converted += 1;
            revenue += enquiry.proposal_value.unwrap_or(Decimal::ZERO);
        }
    }

    let total = enquiries.len() as u64;
    KpiMetrics {
        total_enquiries: total,
        this_month_enquiries: this_month,
        converted_enquiries: converted,
        conversion_rate: percentage(converted, total),
        total_revenue: revenue,
    }
}
