//! Enquiry pipeline analytics and payment ledger.
//!
//! Records live behind the [`db::Database`] trait. The rules in [`intake`]
//! and the reports in [`reports`] are pure functions over those records;
//! [`service::IntakeService`] is the boundary that loads, validates and logs.

pub mod config;
pub mod db;
pub mod error;
pub mod intake;
pub mod reports;
pub mod service;
pub mod settings;

pub use error::{Error, Result};
pub use service::IntakeService;
