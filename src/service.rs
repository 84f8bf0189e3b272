//! Typed request boundary over the record store.
//!
//! Reads take one snapshot and hand it to the pure reports. Writes are
//! validated in full before the store is touched, so a rejected write leaves
//! the stored record exactly as it was.
//!
//! Updates read, validate, then write under separate store calls. The store
//! refuses the write with `DatabaseError::Conflict` when the record changed
//! in between, so a concurrent writer is never silently overwritten.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::{
    CreateEnquiryParams, Database, EnquiryRecord, PaymentDraft, PaymentRecord,
    UpdateEnquiryParams,
};
use crate::error::{IntakeError, Result};
use crate::intake::{LedgerView, enquiry, validate_payment_write};
use crate::reports::{
    self, Dashboard, KpiMetrics, PaymentLine, PaymentPortfolio, PipelineForecast, StatusCount,
};

pub struct IntakeService {
    db: Arc<dyn Database>,
}

impl IntakeService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Arc<dyn Database> {
        &self.db
    }

    // ==================== Enquiries ====================

    pub async fn create_enquiry(&self, params: &CreateEnquiryParams) -> Result<EnquiryRecord> {
        enquiry::validate_new_enquiry(params)?;
        let record = self.db.insert_enquiry(params).await?;
        tracing::info!(
            enquiry_id = %record.enquiry_id,
            status = %record.current_status,
            "Enquiry created"
        );
        Ok(record)
    }

    pub async fn update_enquiry(
        &self,
        id: Uuid,
        update: &UpdateEnquiryParams,
    ) -> Result<EnquiryRecord> {
        let existing = self.get_enquiry(id).await?;
        let next = enquiry::apply_update(&existing, update).inspect_err(|err| {
            tracing::warn!(enquiry_id = %existing.enquiry_id, error = %err, "Rejected enquiry update");
        })?;
        let saved = self
            .db
            .update_enquiry(&next)
            .await?
            .ok_or_else(|| IntakeError::EnquiryNotFound(id.to_string()))?;
        if saved.current_status != existing.current_status {
            tracing::info!(
                enquiry_id = %saved.enquiry_id,
                from = %existing.current_status,
                to = %saved.current_status,
                "Enquiry status changed"
            );
        }
        Ok(saved)
    }

    pub async fn get_enquiry(&self, id: Uuid) -> Result<EnquiryRecord> {
        Ok(self
            .db
            .get_enquiry(id)
            .await?
            .ok_or_else(|| IntakeError::EnquiryNotFound(id.to_string()))?)
    }

    /// Look up by the human-facing reference (e.g. `ENQ-00012`).
    pub async fn find_enquiry(&self, enquiry_id: &str) -> Result<EnquiryRecord> {
        Ok(self
            .db
            .get_enquiry_by_reference(enquiry_id)
            .await?
            .ok_or_else(|| IntakeError::EnquiryNotFound(enquiry_id.to_string()))?)
    }

    pub async fn list_enquiries(&self) -> Result<Vec<EnquiryRecord>> {
        Ok(self.db.list_enquiries().await?)
    }

    // ==================== Reports ====================

    pub async fn kpi_metrics(&self, now: DateTime<Utc>) -> Result<KpiMetrics> {
        let enquiries = self.db.list_enquiries().await?;
        Ok(reports::kpi_metrics(&enquiries, now))
    }

    pub async fn pipeline_forecast(&self) -> Result<PipelineForecast> {
        let enquiries = self.db.list_enquiries().await?;
        Ok(reports::pipeline_forecast(&enquiries)?)
    }

    pub async fn status_summary(&self) -> Result<Vec<StatusCount>> {
        let enquiries = self.db.list_enquiries().await?;
        Ok(reports::status_summary(&enquiries)?)
    }

    pub async fn payment_portfolio(&self) -> Result<PaymentPortfolio> {
        let snapshot = self.db.snapshot().await?;
        Ok(reports::payment_portfolio(
            &snapshot.enquiries,
            &snapshot.payments,
        ))
    }

    pub async fn payment_lines(&self) -> Result<Vec<PaymentLine>> {
        let snapshot = self.db.snapshot().await?;
        Ok(reports::payment_lines(&snapshot.enquiries, &snapshot.payments))
    }

    /// All reports from a single snapshot.
    pub async fn dashboard(&self, now: DateTime<Utc>) -> Result<Dashboard> {
        let snapshot = self.db.snapshot().await?;
        tracing::debug!(
            enquiries = snapshot.enquiries.len(),
            payments = snapshot.payments.len(),
            "Computing dashboard"
        );
        let status_summary = reports::status_summary(&snapshot.enquiries)?;
        Ok(Dashboard {
            kpi: reports::kpi_metrics(&snapshot.enquiries, now),
            forecast: reports::pipeline_forecast(&snapshot.enquiries)?,
            status_rollup: reports::status_rollup(&status_summary)?,
            status_summary,
            payments: reports::payment_portfolio(&snapshot.enquiries, &snapshot.payments),
        })
    }

    // ==================== Payments ====================

    pub async fn payment_for(&self, enquiry_ref: Uuid) -> Result<Option<PaymentRecord>> {
        Ok(self.db.get_payment_for_enquiry(enquiry_ref).await?)
    }

    /// Validate a payment write without persisting it.
    pub async fn check_payment(
        &self,
        enquiry_ref: Uuid,
        draft: &PaymentDraft,
    ) -> Result<LedgerView> {
        let enquiry = self.get_enquiry(enquiry_ref).await?;
        let existing = self.db.get_payment_for_enquiry(enquiry_ref).await?;
        Ok(validate_payment_write(&enquiry, existing.as_ref(), draft)?)
    }

    pub async fn create_payment(
        &self,
        enquiry_ref: Uuid,
        draft: &PaymentDraft,
    ) -> Result<(PaymentRecord, LedgerView)> {
        let enquiry = self.get_enquiry(enquiry_ref).await?;
        if self.db.get_payment_for_enquiry(enquiry_ref).await?.is_some() {
            return Err(IntakeError::PaymentAlreadyExists {
                enquiry_id: enquiry.enquiry_id,
            }
            .into());
        }
        let ledger = self.validated(&enquiry, None, draft)?;
        let matter_code = enquiry.matter_code().unwrap_or_default();
        let record = self
            .db
            .insert_payment(enquiry.id, matter_code, draft)
            .await?;
        tracing::info!(
            enquiry_id = %enquiry.enquiry_id,
            matter_code = %record.matter_code,
            status = %record.payment_status,
            "Payment tracking created"
        );
        Ok((record, ledger))
    }

    pub async fn update_payment(
        &self,
        enquiry_ref: Uuid,
        draft: &PaymentDraft,
    ) -> Result<(PaymentRecord, LedgerView)> {
        let enquiry = self.get_enquiry(enquiry_ref).await?;
        let existing = self
            .db
            .get_payment_for_enquiry(enquiry_ref)
            .await?
            .ok_or_else(|| IntakeError::PaymentNotFound {
                enquiry_id: enquiry.enquiry_id.clone(),
            })?;
        let ledger = self.validated(&enquiry, Some(&existing), draft)?;
        let record = self
            .db
            .update_payment(enquiry_ref, draft, existing.updated_at)
            .await?
            .ok_or_else(|| IntakeError::PaymentNotFound {
                enquiry_id: enquiry.enquiry_id.clone(),
            })?;
        tracing::info!(
            enquiry_id = %enquiry.enquiry_id,
            from = %existing.payment_status,
            to = %record.payment_status,
            "Payment updated"
        );
        Ok((record, ledger))
    }

    fn validated(
        &self,
        enquiry: &EnquiryRecord,
        existing: Option<&PaymentRecord>,
        draft: &PaymentDraft,
    ) -> std::result::Result<LedgerView, IntakeError> {
        validate_payment_write(enquiry, existing, draft).inspect_err(|err| {
            tracing::warn!(
                enquiry_id = %enquiry.enquiry_id,
                error = %err,
                "Rejected payment write"
            );
        })
    }
}
