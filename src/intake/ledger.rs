//! Payment ledger: derived outstanding amount and the status/amount
//! consistency rule applied to every payment write.
//!
//! A write whose status contradicts its amounts is rejected rather than
//! coerced. `Overdue` is operator-asserted, so recomputation never
//! overrides it, but it can never sit on a fully settled payment.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::{EnquiryRecord, PaymentAmounts, PaymentDraft, PaymentRecord, PaymentStatus};
use crate::error::IntakeError;

/// Derived view of a payment's amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerView {
    /// `max(total - paid, 0)`; `None` when no total is set.
    pub amount_outstanding: Option<Decimal>,
    /// Paid strictly more than the total.
    pub overpaid: bool,
    pub normalized_status: PaymentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settlement {
    Nothing,
    Partial,
    Settled,
}

fn paid(amounts: &PaymentAmounts) -> Decimal {
    amounts.amount_paid.unwrap_or(Decimal::ZERO)
}

fn settlement(amounts: &PaymentAmounts) -> Settlement {
    let paid = paid(amounts);
    match amounts.total_amount {
        // A zero total with nothing paid is still "nothing has happened".
        Some(total) if paid >= total && !(total.is_zero() && paid.is_zero()) => {
            Settlement::Settled
        }
        _ if paid.is_zero() => Settlement::Nothing,
        _ => Settlement::Partial,
    }
}

pub fn amount_outstanding(amounts: &PaymentAmounts) -> Option<Decimal> {
    amounts
        .total_amount
        .map(|total| (total - paid(amounts)).max(Decimal::ZERO))
}

pub fn is_overpaid(amounts: &PaymentAmounts) -> bool {
    amounts
        .total_amount
        .is_some_and(|total| paid(amounts) > total)
}

/// Every entered amount must be nonnegative.
pub fn check_amounts(amounts: &PaymentAmounts) -> Result<(), IntakeError> {
    let fields = [
        ("total_amount", amounts.total_amount),
        ("amount_paid", amounts.amount_paid),
        ("retainer_amount", amounts.retainer_amount),
        ("mid_payment_amount", amounts.mid_payment_amount),
        ("final_payment_amount", amounts.final_payment_amount),
    ];
    for (field, value) in fields {
        if value.is_some_and(|v| v < Decimal::ZERO) {
            return Err(IntakeError::NegativeAmount { field });
        }
    }
    Ok(())
}

/// Check that `status` agrees with the paid/outstanding relationship.
pub fn check_status(status: PaymentStatus, amounts: &PaymentAmounts) -> Result<(), IntakeError> {
    let inconsistent = |reason: &str| -> Result<(), IntakeError> {
        Err(IntakeError::InconsistentPaymentStatus {
            status,
            reason: reason.to_string(),
        })
    };

    match settlement(amounts) {
        Settlement::Settled => match status {
            PaymentStatus::FullyPaid => Ok(()),
            PaymentStatus::Overdue => inconsistent("a fully paid payment cannot be overdue"),
            _ => inconsistent("amount paid covers the total; status must be Fully Paid"),
        },
        Settlement::Nothing => match status {
            PaymentStatus::NotStarted | PaymentStatus::Overdue => Ok(()),
            _ => inconsistent("nothing has been paid; status must be Not Started or Overdue"),
        },
        Settlement::Partial => match status {
            PaymentStatus::PartiallyPaid | PaymentStatus::RetainerPaid | PaymentStatus::Overdue => {
                Ok(())
            }
            PaymentStatus::FullyPaid if amounts.total_amount.is_none() => {
                inconsistent("total amount is not set, so full payment cannot be established")
            }
            PaymentStatus::FullyPaid => inconsistent("amount paid is below the total"),
            PaymentStatus::NotStarted => inconsistent("a payment has been received"),
        },
    }
}

/// A status consistent with the amounts, for callers re-deriving after a
/// rejection. Never suggests `Overdue`.
pub fn suggest_status(amounts: &PaymentAmounts) -> PaymentStatus {
    match settlement(amounts) {
        Settlement::Nothing => PaymentStatus::NotStarted,
        Settlement::Settled => PaymentStatus::FullyPaid,
        Settlement::Partial if amounts.retainer_amount == Some(paid(amounts)) => {
            PaymentStatus::RetainerPaid
        }
        Settlement::Partial => PaymentStatus::PartiallyPaid,
    }
}

/// Validate a draft and derive its ledger view.
pub fn derive(draft: &PaymentDraft) -> Result<LedgerView, IntakeError> {
    check_amounts(&draft.amounts)?;
    check_status(draft.payment_status, &draft.amounts)?;
    Ok(LedgerView {
        amount_outstanding: amount_outstanding(&draft.amounts),
        overpaid: is_overpaid(&draft.amounts),
        normalized_status: draft.payment_status,
    })
}

/// Validate a payment create (`existing = None`) or update for `enquiry`.
///
/// Pure: nothing is written, so a rejection leaves stored state untouched.
pub fn validate_payment_write(
    enquiry: &EnquiryRecord,
    existing: Option<&PaymentRecord>,
    proposed: &PaymentDraft,
) -> Result<LedgerView, IntakeError> {
    if enquiry.matter_code().is_none() {
        return Err(IntakeError::MissingMatterCode {
            enquiry_id: enquiry.enquiry_id.clone(),
        });
    }
    if let Some(existing) = existing
        && existing.enquiry_ref != enquiry.id
    {
        return Err(IntakeError::PaymentNotFound {
            enquiry_id: enquiry.enquiry_id.clone(),
        });
    }
    derive(proposed)
}

impl PaymentRecord {
    /// Ledger view recomputed from the stored amounts.
    pub fn ledger(&self) -> LedgerView {
        LedgerView {
            amount_outstanding: amount_outstanding(&self.amounts),
            overpaid: is_overpaid(&self.amounts),
            normalized_status: self.payment_status,
        }
    }
}
