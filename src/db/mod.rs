//! Record model and store abstraction.
//!
//! Enquiry and payment persistence sits behind two small async traits,
//! [`EnquiryStore`] and [`PaymentStore`], combined by the [`Database`]
//! supertrait. Analytics code never talks to a store directly: the service
//! layer takes a [`Snapshot`] and hands immutable slices to the reports.
//!
//! [`memory::MemoryBackend`] is the bundled implementation, used by the CLI
//! (seeded from a JSON snapshot file) and by the tests.

pub mod memory;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DatabaseError;

/// Lifecycle stage of an enquiry, in funnel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnquiryStatus {
    Pending,
    Contacted,
    #[serde(rename = "Meeting Scheduled")]
    MeetingScheduled,
    #[serde(rename = "Proposal Sent")]
    ProposalSent,
    Converted,
    Declined,
    Conflict,
    #[serde(rename = "Not Pursued")]
    NotPursued,
}

impl EnquiryStatus {
    /// Every status, pipeline stages first, then loss reasons.
    pub const ALL: [EnquiryStatus; 8] = [
        Self::Pending,
        Self::Contacted,
        Self::MeetingScheduled,
        Self::ProposalSent,
        Self::Converted,
        Self::Declined,
        Self::Conflict,
        Self::NotPursued,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Contacted => "Contacted",
            Self::MeetingScheduled => "Meeting Scheduled",
            Self::ProposalSent => "Proposal Sent",
            Self::Converted => "Converted",
            Self::Declined => "Declined",
            Self::Conflict => "Conflict",
            Self::NotPursued => "Not Pursued",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "Pending" => Some(Self::Pending),
            "Contacted" => Some(Self::Contacted),
            "Meeting Scheduled" => Some(Self::MeetingScheduled),
            "Proposal Sent" => Some(Self::ProposalSent),
            "Converted" => Some(Self::Converted),
            "Declined" => Some(Self::Declined),
            "Conflict" => Some(Self::Conflict),
            "Not Pursued" => Some(Self::NotPursued),
            _ => None,
        }
    }

    /// Position in [`EnquiryStatus::ALL`].
    pub fn funnel_index(self) -> usize {
        self as usize
    }

    /// Terminal loss (declined, conflicted out, or dropped).
    pub fn is_loss(self) -> bool {
        matches!(self, Self::Declined | Self::Conflict | Self::NotPursued)
    }
}

impl fmt::Display for EnquiryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UrgencyLevel {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl UrgencyLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

/// Payment annotation. `Overdue` is operator-asserted; the other four must
/// agree with the paid/outstanding relationship.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[default]
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "Retainer Paid")]
    RetainerPaid,
    #[serde(rename = "Partially Paid")]
    PartiallyPaid,
    #[serde(rename = "Fully Paid")]
    FullyPaid,
    Overdue,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 5] = [
        Self::NotStarted,
        Self::RetainerPaid,
        Self::PartiallyPaid,
        Self::FullyPaid,
        Self::Overdue,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::RetainerPaid => "Retainer Paid",
            Self::PartiallyPaid => "Partially Paid",
            Self::FullyPaid => "Fully Paid",
            Self::Overdue => "Overdue",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One client contact, from first enquiry through conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnquiryRecord {
    pub id: Uuid,
    pub enquiry_id: String,
    pub date_of_enquiry: NaiveDate,
    pub client_name: String,
    #[serde(default)]
    pub communication_channel: Option<String>,
    #[serde(default)]
    pub client_type: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub service_requested: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub urgency_level: UrgencyLevel,
    #[serde(default)]
    pub client_budget: Option<Decimal>,
    #[serde(default)]
    pub proposal_value: Option<Decimal>,
    #[serde(default)]
    pub assigned_department: Option<String>,
    #[serde(default)]
    pub suggested_lead_lawyer: Option<String>,
    pub current_status: EnquiryStatus,
    #[serde(default)]
    pub next_action: Option<String>,
    #[serde(default)]
    pub milestones: EnquiryMilestones,
    #[serde(default)]
    pub follow_up_count: u32,
    #[serde(default)]
    pub matter_code: Option<String>,
    #[serde(default)]
    pub lost_reason: Option<String>,
    #[serde(default)]
    pub internal_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EnquiryRecord {
    /// Matter code, treating blank strings as absent.
    pub fn matter_code(&self) -> Option<&str> {
        self.matter_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

/// Optional milestone dates. Each one, when present, is on or after the
/// date of enquiry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnquiryMilestones {
    #[serde(default)]
    pub first_response_date: Option<NaiveDate>,
    #[serde(default)]
    pub meeting_date: Option<NaiveDate>,
    #[serde(default)]
    pub proposal_sent_date: Option<NaiveDate>,
    #[serde(default)]
    pub conversion_date: Option<NaiveDate>,
    #[serde(default)]
    pub engagement_letter_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_contact_date: Option<NaiveDate>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
}

impl EnquiryMilestones {
    /// Named view over the set dates.
    pub fn entries(&self) -> [(&'static str, Option<NaiveDate>); 7] {
        [
            ("first_response_date", self.first_response_date),
            ("meeting_date", self.meeting_date),
            ("proposal_sent_date", self.proposal_sent_date),
            ("conversion_date", self.conversion_date),
            ("engagement_letter_date", self.engagement_letter_date),
            ("last_contact_date", self.last_contact_date),
            ("deadline", self.deadline),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct CreateEnquiryParams {
    pub date_of_enquiry: NaiveDate,
    pub client_name: String,
    pub communication_channel: Option<String>,
    pub client_type: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub service_requested: Option<String>,
    pub short_description: Option<String>,
    pub urgency_level: UrgencyLevel,
    pub client_budget: Option<Decimal>,
    pub proposal_value: Option<Decimal>,
    pub assigned_department: Option<String>,
    pub suggested_lead_lawyer: Option<String>,
    pub current_status: EnquiryStatus,
    pub next_action: Option<String>,
    pub milestones: EnquiryMilestones,
    pub matter_code: Option<String>,
    pub internal_notes: Option<String>,
}

impl CreateEnquiryParams {
    /// A Pending, Medium-urgency enquiry with nothing else filled in.
    pub fn new(client_name: impl Into<String>, date_of_enquiry: NaiveDate) -> Self {
        Self {
            date_of_enquiry,
            client_name: client_name.into(),
            communication_channel: None,
            client_type: None,
            email: None,
            phone_number: None,
            service_requested: None,
            short_description: None,
            urgency_level: UrgencyLevel::default(),
            client_budget: None,
            proposal_value: None,
            assigned_department: None,
            suggested_lead_lawyer: None,
            current_status: EnquiryStatus::Pending,
            next_action: None,
            milestones: EnquiryMilestones::default(),
            matter_code: None,
            internal_notes: None,
        }
    }
}

/// Partial enquiry update. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct UpdateEnquiryParams {
    pub client_name: Option<String>,
    pub email: Option<Option<String>>,
    pub phone_number: Option<Option<String>>,
    pub service_requested: Option<Option<String>>,
    pub short_description: Option<Option<String>>,
    pub urgency_level: Option<UrgencyLevel>,
    pub client_budget: Option<Option<Decimal>>,
    pub proposal_value: Option<Option<Decimal>>,
    pub assigned_department: Option<Option<String>>,
    pub suggested_lead_lawyer: Option<Option<String>>,
    pub current_status: Option<EnquiryStatus>,
    pub next_action: Option<Option<String>>,
    pub first_response_date: Option<Option<NaiveDate>>,
    pub meeting_date: Option<Option<NaiveDate>>,
    pub proposal_sent_date: Option<Option<NaiveDate>>,
    pub conversion_date: Option<Option<NaiveDate>>,
    pub engagement_letter_date: Option<Option<NaiveDate>>,
    pub last_contact_date: Option<Option<NaiveDate>>,
    pub deadline: Option<Option<NaiveDate>>,
    pub follow_up_count: Option<u32>,
    pub matter_code: Option<String>,
    pub lost_reason: Option<Option<String>>,
    pub internal_notes: Option<Option<String>>,
}

/// Amount fields of a payment. All independently optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAmounts {
    #[serde(default)]
    pub total_amount: Option<Decimal>,
    #[serde(default)]
    pub amount_paid: Option<Decimal>,
    #[serde(default)]
    pub retainer_amount: Option<Decimal>,
    #[serde(default)]
    pub mid_payment_amount: Option<Decimal>,
    #[serde(default)]
    pub final_payment_amount: Option<Decimal>,
}

/// Caller-supplied payment contents for a create or update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentDraft {
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub amounts: PaymentAmounts,
    #[serde(default)]
    pub retainer_paid_date: Option<NaiveDate>,
    #[serde(default)]
    pub mid_payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub final_payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_terms: Option<String>,
    #[serde(default)]
    pub payment_notes: Option<String>,
}

/// Payment tracking for a converted enquiry. At most one per enquiry,
/// keyed by the enquiry's surrogate id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub enquiry_ref: Uuid,
    pub matter_code: String,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub amounts: PaymentAmounts,
    #[serde(default)]
    pub retainer_paid_date: Option<NaiveDate>,
    #[serde(default)]
    pub mid_payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub final_payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_terms: Option<String>,
    #[serde(default)]
    pub payment_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// The stored contents as a draft, e.g. to edit and resubmit.
    pub fn to_draft(&self) -> PaymentDraft {
        PaymentDraft {
            payment_status: self.payment_status,
            amounts: self.amounts,
            retainer_paid_date: self.retainer_paid_date,
            mid_payment_date: self.mid_payment_date,
            final_payment_date: self.final_payment_date,
            payment_terms: self.payment_terms.clone(),
            payment_notes: self.payment_notes.clone(),
        }
    }

    pub(crate) fn apply_draft(&mut self, draft: &PaymentDraft, now: DateTime<Utc>) {
        self.payment_status = draft.payment_status;
        self.amounts = draft.amounts;
        self.retainer_paid_date = draft.retainer_paid_date;
        self.mid_payment_date = draft.mid_payment_date;
        self.final_payment_date = draft.final_payment_date;
        self.payment_terms = draft.payment_terms.clone();
        self.payment_notes = draft.payment_notes.clone();
        self.updated_at = now;
    }
}

/// Immutable copy of both collections, taken at one point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub enquiries: Vec<EnquiryRecord>,
    #[serde(default)]
    pub payments: Vec<PaymentRecord>,
}

#[async_trait]
pub trait EnquiryStore: Send + Sync {
    /// Insert a new enquiry; the store assigns `id` and `enquiry_id`.
    async fn insert_enquiry(
        &self,
        input: &CreateEnquiryParams,
    ) -> Result<EnquiryRecord, DatabaseError>;
    async fn get_enquiry(&self, id: Uuid) -> Result<Option<EnquiryRecord>, DatabaseError>;
    async fn get_enquiry_by_reference(
        &self,
        enquiry_id: &str,
    ) -> Result<Option<EnquiryRecord>, DatabaseError>;
    async fn list_enquiries(&self) -> Result<Vec<EnquiryRecord>, DatabaseError>;
    /// Replace the stored enquiry with the same `id`. `None` if absent.
    ///
    /// `record.updated_at` must still match the stored value; otherwise the
    /// record changed since it was read and the write fails with
    /// [`DatabaseError::Conflict`].
    async fn update_enquiry(
        &self,
        record: &EnquiryRecord,
    ) -> Result<Option<EnquiryRecord>, DatabaseError>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert_payment(
        &self,
        enquiry_ref: Uuid,
        matter_code: &str,
        draft: &PaymentDraft,
    ) -> Result<PaymentRecord, DatabaseError>;
    async fn get_payment_for_enquiry(
        &self,
        enquiry_ref: Uuid,
    ) -> Result<Option<PaymentRecord>, DatabaseError>;
    async fn list_payments(&self) -> Result<Vec<PaymentRecord>, DatabaseError>;
    /// Apply `draft` to the enquiry's payment if it is unchanged since
    /// `read_at` (its `updated_at` when the caller read it).
    async fn update_payment(
        &self,
        enquiry_ref: Uuid,
        draft: &PaymentDraft,
        read_at: DateTime<Utc>,
    ) -> Result<Option<PaymentRecord>, DatabaseError>;
}

/// Backend-agnostic store supertrait.
#[async_trait]
pub trait Database: EnquiryStore + PaymentStore + Send + Sync {
    /// Both collections as one consistent snapshot.
    async fn snapshot(&self) -> Result<Snapshot, DatabaseError> {
        let enquiries = self.list_enquiries().await?;
        let payments = self.list_payments().await?;
        Ok(Snapshot {
            enquiries,
            payments,
        })
    }
}
