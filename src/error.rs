//! Error types for the enquiry ledger.
//!
//! Each layer owns one enum. The pure intake/report code only ever returns
//! [`IntakeError`]; the store returns [`DatabaseError`]; configuration
//! returns [`ConfigError`]. [`Error`] joins them at the service boundary.

use chrono::NaiveDate;

use crate::db::PaymentStatus;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("failed to parse settings: {0}")]
    ParseError(String),

    #[error("failed to read settings file {path}: {reason}")]
    Io { path: String, reason: String },
}

/// Record store errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("{0} was modified concurrently; re-read and retry")]
    Conflict(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(String),
}

/// Domain rejections raised by enquiry validation, the payment ledger and
/// the reports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    #[error("unknown enquiry status '{0}'")]
    UnknownStatus(String),

    #[error("enquiry {enquiry_id} has no matter code; convert it before tracking payments")]
    MissingMatterCode { enquiry_id: String },

    #[error("payment status '{status}' contradicts the entered amounts: {reason}")]
    InconsistentPaymentStatus {
        status: PaymentStatus,
        reason: String,
    },

    #[error("{field} must not be negative")]
    NegativeAmount { field: &'static str },

    #[error("{field} ({date}) is earlier than the date of enquiry ({date_of_enquiry})")]
    MilestoneBeforeEnquiry {
        field: &'static str,
        date: NaiveDate,
        date_of_enquiry: NaiveDate,
    },

    #[error("matter code can only be assigned when the enquiry is converted")]
    MatterCodeWithoutConversion,

    #[error("matter code '{existing}' is already assigned and cannot be changed")]
    MatterCodeImmutable { existing: String },

    #[error("client name is required")]
    MissingClientName,

    #[error("enquiry {enquiry_id} already has a payment record")]
    PaymentAlreadyExists { enquiry_id: String },

    #[error("no payment record for enquiry {enquiry_id}")]
    PaymentNotFound { enquiry_id: String },

    #[error("enquiry not found: {0}")]
    EnquiryNotFound(String),

    #[error("status taxonomy unavailable: {0}")]
    TaxonomyUnavailable(String),
}

/// Top-level error returned across the service boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Intake(#[from] IntakeError),
}

impl Error {
    /// The domain rejection, if this error is one.
    pub fn as_intake(&self) -> Option<&IntakeError> {
        match self {
            Self::Intake(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
