//! Runtime configuration resolved from [`crate::settings::Settings`] plus
//! `ENQUIRY_*` environment overrides.

mod analytics;
pub(crate) mod helpers;

pub use analytics::{AnalyticsConfig, LogFormat};
