//! In-memory record store.
//!
//! One `RwLock` guards both collections so [`Database::snapshot`] sees a
//! single consistent state and every write is all-or-nothing per record.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::{
    CreateEnquiryParams, Database, EnquiryRecord, EnquiryStore, PaymentDraft, PaymentRecord,
    PaymentStore, Snapshot,
};
use crate::error::DatabaseError;
use crate::intake::enquiry::validate_record;
use crate::intake::validate_payment_write;

pub const DEFAULT_ENQUIRY_PREFIX: &str = "ENQ";

/// A write timestamp strictly after `previous`, so every write is visible
/// to the `updated_at` staleness check even within one clock tick.
fn next_stamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(previous + TimeDelta::nanoseconds(1))
}

#[derive(Debug, Default)]
struct MemoryState {
    enquiries: Vec<EnquiryRecord>,
    index: HashMap<Uuid, usize>,
    payments: HashMap<Uuid, PaymentRecord>,
    next_seq: u64,
}

impl MemoryState {
    fn matter_code_taken(&self, code: &str, except: Option<Uuid>) -> bool {
        self.enquiries.iter().any(|enquiry| {
            Some(enquiry.id) != except && enquiry.matter_code() == Some(code.trim())
        })
    }
}

#[derive(Debug)]
pub struct MemoryBackend {
    enquiry_prefix: String,
    state: RwLock<MemoryState>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(DEFAULT_ENQUIRY_PREFIX)
    }
}

impl MemoryBackend {
    pub fn new(enquiry_prefix: &str) -> Self {
        Self {
            enquiry_prefix: enquiry_prefix.trim().to_string(),
            state: RwLock::new(MemoryState {
                next_seq: 1,
                ..MemoryState::default()
            }),
        }
    }

    /// Seed a backend from an exported snapshot.
    ///
    /// Every record passes the same checks the write paths apply (uniqueness,
    /// enquiry lifecycle rules, payment ledger consistency), so the reports
    /// never see a record a validated write would have refused.
    pub fn from_snapshot(enquiry_prefix: &str, snapshot: Snapshot) -> Result<Self, DatabaseError> {
        let backend = Self::new(enquiry_prefix);
        let mut state = MemoryState::default();
        let mut references = HashSet::new();
        let mut matter_codes = HashSet::new();
        let mut max_seq = 0u64;

        for enquiry in snapshot.enquiries {
            if state.index.contains_key(&enquiry.id) {
                return Err(DatabaseError::Constraint(format!(
                    "duplicate enquiry id {}",
                    enquiry.id
                )));
            }
            if !references.insert(enquiry.enquiry_id.trim().to_ascii_uppercase()) {
                return Err(DatabaseError::Constraint(format!(
                    "duplicate enquiry reference '{}'",
                    enquiry.enquiry_id
                )));
            }
            if let Some(code) = enquiry.matter_code()
                && !matter_codes.insert(code.to_string())
            {
                return Err(DatabaseError::Constraint(format!(
                    "duplicate matter code '{code}'"
                )));
            }
            validate_record(&enquiry).map_err(|e| {
                DatabaseError::Constraint(format!("enquiry {}: {}", enquiry.enquiry_id, e))
            })?;
            if let Some(seq) = backend.parse_sequence(&enquiry.enquiry_id) {
                max_seq = max_seq.max(seq);
            }
            state.index.insert(enquiry.id, state.enquiries.len());
            state.enquiries.push(enquiry);
        }

        for payment in snapshot.payments {
            let Some(&position) = state.index.get(&payment.enquiry_ref) else {
                return Err(DatabaseError::Constraint(format!(
                    "payment {} references unknown enquiry {}",
                    payment.id, payment.enquiry_ref
                )));
            };
            if state.payments.contains_key(&payment.enquiry_ref) {
                return Err(DatabaseError::Constraint(format!(
                    "enquiry {} has more than one payment record",
                    payment.enquiry_ref
                )));
            }
            let owner = &state.enquiries[position];
            validate_payment_write(owner, None, &payment.to_draft()).map_err(|e| {
                DatabaseError::Constraint(format!("payment {}: {}", payment.id, e))
            })?;
            if owner.matter_code() != Some(payment.matter_code.trim()) {
                return Err(DatabaseError::Constraint(format!(
                    "payment {} carries matter code '{}' but enquiry {} has '{}'",
                    payment.id,
                    payment.matter_code,
                    owner.enquiry_id,
                    owner.matter_code().unwrap_or_default()
                )));
            }
            state.payments.insert(payment.enquiry_ref, payment);
        }

        state.next_seq = max_seq.max(state.enquiries.len() as u64) + 1;
        tracing::debug!(
            enquiries = state.enquiries.len(),
            payments = state.payments.len(),
            "Seeded in-memory store from snapshot"
        );
        Ok(Self {
            enquiry_prefix: backend.enquiry_prefix,
            state: RwLock::new(state),
        })
    }

    /// Load a JSON snapshot (`{"enquiries": [...], "payments": [...]}`).
    pub async fn from_snapshot_file(
        enquiry_prefix: &str,
        path: &Path,
    ) -> Result<Self, DatabaseError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DatabaseError::Io(format!("{}: {}", path.display(), e)))?;
        let snapshot: Snapshot = serde_json::from_str(&raw).map_err(|e| {
            DatabaseError::Serialization(format!("invalid snapshot {}: {}", path.display(), e))
        })?;
        Self::from_snapshot(enquiry_prefix, snapshot)
    }

    fn format_reference(&self, seq: u64) -> String {
        format!("{}-{:05}", self.enquiry_prefix, seq)
    }

    /// Sequence number of a reference under this prefix. Case-insensitive,
    /// matching [`EnquiryStore::get_enquiry_by_reference`].
    fn parse_sequence(&self, reference: &str) -> Option<u64> {
        let reference = reference.trim();
        let prefix_len = self.enquiry_prefix.len();
        let head = reference.get(..prefix_len)?;
        if !head.eq_ignore_ascii_case(&self.enquiry_prefix) {
            return None;
        }
        reference[prefix_len..].strip_prefix('-')?.parse().ok()
    }
}

#[async_trait]
impl EnquiryStore for MemoryBackend {
    async fn insert_enquiry(
        &self,
        input: &CreateEnquiryParams,
    ) -> Result<EnquiryRecord, DatabaseError> {
        let mut state = self.state.write().await;
        let matter_code = input
            .matter_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string);
        if let Some(code) = matter_code.as_deref()
            && state.matter_code_taken(code, None)
        {
            return Err(DatabaseError::Constraint(format!(
                "matter code '{code}' is already assigned"
            )));
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        let now = Utc::now();
        let record = EnquiryRecord {
            id: Uuid::new_v4(),
            enquiry_id: self.format_reference(seq),
            date_of_enquiry: input.date_of_enquiry,
            client_name: input.client_name.trim().to_string(),
            communication_channel: input.communication_channel.clone(),
            client_type: input.client_type.clone(),
            email: input.email.clone(),
            phone_number: input.phone_number.clone(),
            service_requested: input.service_requested.clone(),
            short_description: input.short_description.clone(),
            urgency_level: input.urgency_level,
            client_budget: input.client_budget,
            proposal_value: input.proposal_value,
            assigned_department: input.assigned_department.clone(),
            suggested_lead_lawyer: input.suggested_lead_lawyer.clone(),
            current_status: input.current_status,
            next_action: input.next_action.clone(),
            milestones: input.milestones,
            follow_up_count: 0,
            matter_code,
            lost_reason: None,
            internal_notes: input.internal_notes.clone(),
            created_at: now,
            updated_at: now,
        };

        let position = state.enquiries.len();
        state.index.insert(record.id, position);
        state.enquiries.push(record.clone());
        tracing::debug!(enquiry_id = %record.enquiry_id, "Inserted enquiry");
        Ok(record)
    }

    async fn get_enquiry(&self, id: Uuid) -> Result<Option<EnquiryRecord>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state
            .index
            .get(&id)
            .map(|&position| state.enquiries[position].clone()))
    }

    async fn get_enquiry_by_reference(
        &self,
        enquiry_id: &str,
    ) -> Result<Option<EnquiryRecord>, DatabaseError> {
        let state = self.state.read().await;
        let wanted = enquiry_id.trim();
        Ok(state
            .enquiries
            .iter()
            .find(|enquiry| enquiry.enquiry_id.eq_ignore_ascii_case(wanted))
            .cloned())
    }

    async fn list_enquiries(&self) -> Result<Vec<EnquiryRecord>, DatabaseError> {
        Ok(self.state.read().await.enquiries.clone())
    }

    async fn update_enquiry(
        &self,
        record: &EnquiryRecord,
    ) -> Result<Option<EnquiryRecord>, DatabaseError> {
        let mut state = self.state.write().await;
        let Some(&position) = state.index.get(&record.id) else {
            return Ok(None);
        };
        if state.enquiries[position].enquiry_id != record.enquiry_id {
            return Err(DatabaseError::Constraint(format!(
                "enquiry reference '{}' is immutable",
                state.enquiries[position].enquiry_id
            )));
        }
        let previous = state.enquiries[position].updated_at;
        if previous != record.updated_at {
            return Err(DatabaseError::Conflict(format!(
                "enquiry {}",
                record.enquiry_id
            )));
        }
        if let Some(code) = record.matter_code()
            && state.matter_code_taken(code, Some(record.id))
        {
            return Err(DatabaseError::Constraint(format!(
                "matter code '{code}' is already assigned"
            )));
        }

        let mut updated = record.clone();
        updated.updated_at = next_stamp(previous);
        state.enquiries[position] = updated.clone();
        tracing::debug!(enquiry_id = %updated.enquiry_id, "Updated enquiry");
        Ok(Some(updated))
    }
}

#[async_trait]
impl PaymentStore for MemoryBackend {
    async fn insert_payment(
        &self,
        enquiry_ref: Uuid,
        matter_code: &str,
        draft: &PaymentDraft,
    ) -> Result<PaymentRecord, DatabaseError> {
        let mut state = self.state.write().await;
        if !state.index.contains_key(&enquiry_ref) {
            return Err(DatabaseError::NotFound {
                entity: "enquiry".to_string(),
                id: enquiry_ref.to_string(),
            });
        }
        if state.payments.contains_key(&enquiry_ref) {
            return Err(DatabaseError::Constraint(format!(
                "enquiry {enquiry_ref} already has a payment record"
            )));
        }

        let now = Utc::now();
        let mut record = PaymentRecord {
            id: Uuid::new_v4(),
            enquiry_ref,
            matter_code: matter_code.trim().to_string(),
            payment_status: draft.payment_status,
            amounts: draft.amounts,
            retainer_paid_date: None,
            mid_payment_date: None,
            final_payment_date: None,
            payment_terms: None,
            payment_notes: None,
            created_at: now,
            updated_at: now,
        };
        record.apply_draft(draft, now);
        state.payments.insert(enquiry_ref, record.clone());
        tracing::debug!(matter_code = %record.matter_code, "Inserted payment record");
        Ok(record)
    }

    async fn get_payment_for_enquiry(
        &self,
        enquiry_ref: Uuid,
    ) -> Result<Option<PaymentRecord>, DatabaseError> {
        Ok(self.state.read().await.payments.get(&enquiry_ref).cloned())
    }

    async fn list_payments(&self) -> Result<Vec<PaymentRecord>, DatabaseError> {
        let state = self.state.read().await;
        // Enquiry order keeps listings stable across calls.
        Ok(state
            .enquiries
            .iter()
            .filter_map(|enquiry| state.payments.get(&enquiry.id).cloned())
            .collect())
    }

    async fn update_payment(
        &self,
        enquiry_ref: Uuid,
        draft: &PaymentDraft,
        read_at: DateTime<Utc>,
    ) -> Result<Option<PaymentRecord>, DatabaseError> {
        let mut state = self.state.write().await;
        let Some(existing) = state.payments.get_mut(&enquiry_ref) else {
            return Ok(None);
        };
        if existing.updated_at != read_at {
            return Err(DatabaseError::Conflict(format!("payment {}", existing.matter_code)));
        }
        let stamp = next_stamp(existing.updated_at);
        existing.apply_draft(draft, stamp);
        Ok(Some(existing.clone()))
    }
}

#[async_trait]
impl Database for MemoryBackend {
    async fn snapshot(&self) -> Result<Snapshot, DatabaseError> {
        let state = self.state.read().await;
        Ok(Snapshot {
            enquiries: state.enquiries.clone(),
            payments: state
                .enquiries
                .iter()
                .filter_map(|enquiry| state.payments.get(&enquiry.id).cloned())
                .collect(),
        })
    }
}
