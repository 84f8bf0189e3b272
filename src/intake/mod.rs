//! Enquiry intake rules: the status taxonomy, enquiry lifecycle checks, and
//! the payment ledger. Everything here is pure.

pub mod enquiry;
pub mod ledger;
pub mod taxonomy;

pub use ledger::{LedgerView, validate_payment_write};
pub use taxonomy::{StatusEntry, probability_of};
