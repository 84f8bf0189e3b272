//! Read-side reports over an enquiry/payment snapshot.
//!
//! Each report is a pure single pass over immutable slices, so any of them
//! can run on its own worker with no coordination.

pub mod forecast;
pub mod kpi;
pub mod payments;
pub mod status;

use serde::Serialize;

pub use forecast::{ForecastRow, PipelineForecast, pipeline_forecast};
pub use kpi::{KpiMetrics, kpi_metrics};
pub use payments::{PaymentLine, PaymentPortfolio, payment_lines, payment_portfolio};
pub use status::{StatusCount, StatusRollup, sort_by_funnel, status_rollup, status_summary};

/// Every report computed from one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub kpi: KpiMetrics,
    pub forecast: PipelineForecast,
    pub status_summary: Vec<StatusCount>,
    pub status_rollup: StatusRollup,
    pub payments: PaymentPortfolio,
}
