//! Payment portfolio across converted clients.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::db::{EnquiryRecord, EnquiryStatus, PaymentRecord, PaymentStatus};
use crate::intake::LedgerView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaymentStatusCount {
    pub status: PaymentStatus,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaymentPortfolio {
    /// Converted enquiries carrying a matter code.
    pub converted_clients: u64,
    pub total_received: Decimal,
    pub total_outstanding: Decimal,
    /// Converted clients with no payment record yet.
    pub pending_setup: u64,
    pub overpaid_count: u64,
    /// Non-zero payment status counts, in status order.
    pub by_status: Vec<PaymentStatusCount>,
}

/// One converted client and its ledger, if payment tracking is set up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentLine {
    pub enquiry_ref: Uuid,
    pub enquiry_id: String,
    pub client_name: String,
    pub matter_code: String,
    pub conversion_date: Option<NaiveDate>,
    pub total_amount: Option<Decimal>,
    pub amount_paid: Option<Decimal>,
    pub ledger: Option<LedgerView>,
}

fn is_tracked_client(enquiry: &EnquiryRecord) -> bool {
    enquiry.current_status == EnquiryStatus::Converted && enquiry.matter_code().is_some()
}

pub fn payment_portfolio(
    enquiries: &[EnquiryRecord],
    payments: &[PaymentRecord],
) -> PaymentPortfolio {
    let mut portfolio = PaymentPortfolio::default();
    let mut status_counts = [0u64; PaymentStatus::ALL.len()];
    let mut by_enquiry: HashMap<Uuid, &PaymentRecord> = HashMap::with_capacity(payments.len());

    for payment in payments {
        by_enquiry.insert(payment.enquiry_ref, payment);
        let ledger = payment.ledger();
        portfolio.total_received += payment.amounts.amount_paid.unwrap_or(Decimal::ZERO);
        portfolio.total_outstanding += ledger.amount_outstanding.unwrap_or(Decimal::ZERO);
        if ledger.overpaid {
            portfolio.overpaid_count += 1;
        }
        if let Some(slot) = PaymentStatus::ALL
            .iter()
            .position(|status| *status == payment.payment_status)
        {
            status_counts[slot] += 1;
        }
    }

    for enquiry in enquiries.iter().filter(|e| is_tracked_client(e)) {
        portfolio.converted_clients += 1;
        if !by_enquiry.contains_key(&enquiry.id) {
            portfolio.pending_setup += 1;
        }
    }

    portfolio.by_status = PaymentStatus::ALL
        .into_iter()
        .zip(status_counts)
        .filter(|(_, count)| *count > 0)
        .map(|(status, count)| PaymentStatusCount { status, count })
        .collect();
    portfolio
}

/// Ledger lines for every converted client, in enquiry order.
pub fn payment_lines(enquiries: &[EnquiryRecord], payments: &[PaymentRecord]) -> Vec<PaymentLine> {
    let by_enquiry: HashMap<Uuid, &PaymentRecord> = payments
        .iter()
        .map(|payment| (payment.enquiry_ref, payment))
        .collect();

    enquiries
        .iter()
        .filter_map(|enquiry| {
            let matter_code = enquiry.matter_code()?;
            if enquiry.current_status != EnquiryStatus::Converted {
                return None;
            }
            let payment = by_enquiry.get(&enquiry.id);
            Some(PaymentLine {
                enquiry_ref: enquiry.id,
                enquiry_id: enquiry.enquiry_id.clone(),
                client_name: enquiry.client_name.clone(),
                matter_code: matter_code.to_string(),
                conversion_date: enquiry.milestones.conversion_date,
                total_amount: payment.and_then(|p| p.amounts.total_amount),
                amount_paid: payment.and_then(|p| p.amounts.amount_paid),
                ledger: payment.map(|p| p.ledger()),
            })
        })
        .collect()
}
