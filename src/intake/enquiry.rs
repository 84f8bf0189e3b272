//! Enquiry lifecycle rules: milestone ordering, nonnegative amounts, and the
//! matter-code invariant (present iff the enquiry has ever converted, never
//! cleared or changed once assigned).

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::db::{
    CreateEnquiryParams, EnquiryMilestones, EnquiryRecord, EnquiryStatus, UpdateEnquiryParams,
};
use crate::error::IntakeError;

const UNSAVED_ENQUIRY: &str = "(new enquiry)";

fn check_milestones(
    date_of_enquiry: NaiveDate,
    milestones: &EnquiryMilestones,
) -> Result<(), IntakeError> {
    for (field, date) in milestones.entries() {
        if let Some(date) = date
            && date < date_of_enquiry
        {
            return Err(IntakeError::MilestoneBeforeEnquiry {
                field,
                date,
                date_of_enquiry,
            });
        }
    }
    Ok(())
}

fn check_money(field: &'static str, value: Option<Decimal>) -> Result<(), IntakeError> {
    match value {
        Some(v) if v < Decimal::ZERO => Err(IntakeError::NegativeAmount { field }),
        _ => Ok(()),
    }
}

fn normalize_code(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
}

/// Validate a new enquiry before it reaches the store.
pub fn validate_new_enquiry(params: &CreateEnquiryParams) -> Result<(), IntakeError> {
    if params.client_name.trim().is_empty() {
        return Err(IntakeError::MissingClientName);
    }
    check_money("client_budget", params.client_budget)?;
    check_money("proposal_value", params.proposal_value)?;
    check_milestones(params.date_of_enquiry, &params.milestones)?;

    let converted = params.current_status == EnquiryStatus::Converted;
    match normalize_code(params.matter_code.as_deref()) {
        Some(_) if !converted => Err(IntakeError::MatterCodeWithoutConversion),
        None if converted => Err(IntakeError::MissingMatterCode {
            enquiry_id: UNSAVED_ENQUIRY.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Check a record that bypassed the write paths, e.g. one read back from an
/// exported snapshot. A non-converted record may still carry the matter code
/// it was given when it converted earlier.
pub fn validate_record(record: &EnquiryRecord) -> Result<(), IntakeError> {
    if record.client_name.trim().is_empty() {
        return Err(IntakeError::MissingClientName);
    }
    check_money("client_budget", record.client_budget)?;
    check_money("proposal_value", record.proposal_value)?;
    check_milestones(record.date_of_enquiry, &record.milestones)?;
    if record.current_status == EnquiryStatus::Converted && record.matter_code().is_none() {
        return Err(IntakeError::MissingMatterCode {
            enquiry_id: record.enquiry_id.clone(),
        });
    }
    Ok(())
}

fn resolve_matter_code(
    existing: &EnquiryRecord,
    supplied: Option<&str>,
    next_status: EnquiryStatus,
) -> Result<Option<String>, IntakeError> {
    let current = existing.matter_code().map(str::to_string);

    let resolved = match (current, supplied) {
        (Some(current), None) => Some(current),
        (Some(current), Some(supplied)) => {
            if supplied.trim() != current {
                return Err(IntakeError::MatterCodeImmutable { existing: current });
            }
            Some(current)
        }
        (None, supplied) => {
            let supplied = normalize_code(supplied);
            if supplied.is_some() && next_status != EnquiryStatus::Converted {
                return Err(IntakeError::MatterCodeWithoutConversion);
            }
            supplied
        }
    };

    if next_status == EnquiryStatus::Converted && resolved.is_none() {
        return Err(IntakeError::MissingMatterCode {
            enquiry_id: existing.enquiry_id.clone(),
        });
    }
    Ok(resolved)
}

/// Merge `update` into `existing` and check the result.
///
/// The returned record is what the store should persist; `existing` is left
/// as-is so a rejected update has no effect.
pub fn apply_update(
    existing: &EnquiryRecord,
    update: &UpdateEnquiryParams,
) -> Result<EnquiryRecord, IntakeError> {
    let mut next = existing.clone();
    let next_status = update.current_status.unwrap_or(existing.current_status);
    next.matter_code = resolve_matter_code(existing, update.matter_code.as_deref(), next_status)?;
    next.current_status = next_status;

    if let Some(name) = &update.client_name {
        if name.trim().is_empty() {
            return Err(IntakeError::MissingClientName);
        }
        next.client_name = name.trim().to_string();
    }
    if let Some(v) = &update.email {
        next.email = v.clone();
    }
    if let Some(v) = &update.phone_number {
        next.phone_number = v.clone();
    }
    if let Some(v) = &update.service_requested {
        next.service_requested = v.clone();
    }
    if let Some(v) = &update.short_description {
        next.short_description = v.clone();
    }
    if let Some(v) = update.urgency_level {
        next.urgency_level = v;
    }
    if let Some(v) = update.client_budget {
        next.client_budget = v;
    }
    if let Some(v) = update.proposal_value {
        next.proposal_value = v;
    }
    if let Some(v) = &update.assigned_department {
        next.assigned_department = v.clone();
    }
    if let Some(v) = &update.suggested_lead_lawyer {
        next.suggested_lead_lawyer = v.clone();
    }
    if let Some(v) = &update.next_action {
        next.next_action = v.clone();
    }
    if let Some(v) = update.follow_up_count {
        next.follow_up_count = v;
    }
    if let Some(v) = &update.lost_reason {
        next.lost_reason = v.clone();
    }
    if let Some(v) = &update.internal_notes {
        next.internal_notes = v.clone();
    }

    let m = &mut next.milestones;
    let dates = [
        (&mut m.first_response_date, update.first_response_date),
        (&mut m.meeting_date, update.meeting_date),
        (&mut m.proposal_sent_date, update.proposal_sent_date),
        (&mut m.conversion_date, update.conversion_date),
        (&mut m.engagement_letter_date, update.engagement_letter_date),
        (&mut m.last_contact_date, update.last_contact_date),
        (&mut m.deadline, update.deadline),
    ];
    for (slot, value) in dates {
        if let Some(value) = value {
            *slot = value;
        }
    }

    check_money("client_budget", next.client_budget)?;
    check_money("proposal_value", next.proposal_value)?;
    check_milestones(next.date_of_enquiry, &next.milestones)?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use super::{apply_update, validate_new_enquiry, validate_record};
    use crate::db::{
        CreateEnquiryParams, EnquiryMilestones, EnquiryRecord, EnquiryStatus,
        UpdateEnquiryParams, UrgencyLevel,
    };
    use crate::error::IntakeError;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn record(status: EnquiryStatus, matter_code: Option<&str>) -> EnquiryRecord {
        let ts = Utc
            .with_ymd_and_hms(2026, 4, 1, 8, 30, 0)
            .single()
            .expect("valid ts");
        EnquiryRecord {
            id: Uuid::new_v4(),
            enquiry_id: "ENQ-00042".to_string(),
            date_of_enquiry: date(2026, 4, 1),
            client_name: "Initech".to_string(),
            communication_channel: Some("Email".to_string()),
            client_type: None,
            email: None,
            phone_number: None,
            service_requested: Some("Employment".to_string()),
            short_description: None,
            urgency_level: UrgencyLevel::High,
            client_budget: None,
            proposal_value: Some(dec!(40000)),
            assigned_department: None,
            suggested_lead_lawyer: None,
            current_status: status,
            next_action: None,
            milestones: EnquiryMilestones::default(),
            follow_up_count: 1,
            matter_code: matter_code.map(str::to_string),
            lost_reason: None,
            internal_notes: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn new_enquiry_defaults_pass() {
        validate_new_enquiry(&CreateEnquiryParams::new("Acme", date(2026, 1, 1))).expect("valid");
    }

    #[test]
    fn new_enquiry_requires_client_name() {
        let err = validate_new_enquiry(&CreateEnquiryParams::new("  ", date(2026, 1, 1)))
            .expect_err("blank name");
        assert_eq!(err, IntakeError::MissingClientName);
    }

    #[test]
    fn milestone_before_enquiry_date_is_rejected() {
        let mut params = CreateEnquiryParams::new("Acme", date(2026, 1, 10));
        params.milestones.meeting_date = Some(date(2026, 1, 9));
        let err = validate_new_enquiry(&params).expect_err("meeting predates enquiry");
        assert_eq!(
            err,
            IntakeError::MilestoneBeforeEnquiry {
                field: "meeting_date",
                date: date(2026, 1, 9),
                date_of_enquiry: date(2026, 1, 10),
            }
        );

        params.milestones.meeting_date = Some(date(2026, 1, 10));
        validate_new_enquiry(&params).expect("same day is fine");
    }

    #[test]
    fn matter_code_on_unconverted_create_is_rejected() {
        let mut params = CreateEnquiryParams::new("Acme", date(2026, 1, 10));
        params.matter_code = Some("M-1".to_string());
        assert_eq!(
            validate_new_enquiry(&params).expect_err("not converted"),
            IntakeError::MatterCodeWithoutConversion
        );
    }

    #[test]
    fn converting_requires_a_matter_code() {
        let existing = record(EnquiryStatus::ProposalSent, None);
        let update = UpdateEnquiryParams {
            current_status: Some(EnquiryStatus::Converted),
            ..UpdateEnquiryParams::default()
        };
        let err = apply_update(&existing, &update).expect_err("no code");
        assert_eq!(
            err,
            IntakeError::MissingMatterCode {
                enquiry_id: "ENQ-00042".to_string()
            }
        );

        let update = UpdateEnquiryParams {
            current_status: Some(EnquiryStatus::Converted),
            matter_code: Some(" M-2026-014 ".to_string()),
            conversion_date: Some(Some(date(2026, 4, 20))),
            ..UpdateEnquiryParams::default()
        };
        let converted = apply_update(&existing, &update).expect("converted");
        assert_eq!(converted.matter_code.as_deref(), Some("M-2026-014"));
        assert_eq!(converted.milestones.conversion_date, Some(date(2026, 4, 20)));
    }

    #[test]
    fn matter_code_survives_status_change() {
        let existing = record(EnquiryStatus::Converted, Some("M-7"));
        let update = UpdateEnquiryParams {
            current_status: Some(EnquiryStatus::NotPursued),
            lost_reason: Some(Some("Client withdrew".to_string())),
            ..UpdateEnquiryParams::default()
        };
        let next = apply_update(&existing, &update).expect("status change allowed");
        assert_eq!(next.current_status, EnquiryStatus::NotPursued);
        assert_eq!(next.matter_code.as_deref(), Some("M-7"));
    }

    #[test]
    fn assigned_matter_code_cannot_change() {
        let existing = record(EnquiryStatus::Converted, Some("M-7"));
        let update = UpdateEnquiryParams {
            matter_code: Some("M-8".to_string()),
            ..UpdateEnquiryParams::default()
        };
        assert_eq!(
            apply_update(&existing, &update).expect_err("immutable"),
            IntakeError::MatterCodeImmutable {
                existing: "M-7".to_string()
            }
        );
    }

    #[test]
    fn rejected_update_leaves_existing_untouched() {
        let existing = record(EnquiryStatus::Contacted, None);
        let before = existing.clone();
        let update = UpdateEnquiryParams {
            proposal_value: Some(Some(dec!(-5))),
            ..UpdateEnquiryParams::default()
        };
        assert!(apply_update(&existing, &update).is_err());
        assert_eq!(existing, before);
    }

    #[test]
    fn update_can_clear_optional_fields() {
        let existing = record(EnquiryStatus::Contacted, None);
        let update = UpdateEnquiryParams {
            proposal_value: Some(None),
            deadline: Some(Some(date(2026, 5, 1))),
            ..UpdateEnquiryParams::default()
        };
        let next = apply_update(&existing, &update).expect("valid");
        assert_eq!(next.proposal_value, None);
        assert_eq!(next.milestones.deadline, Some(date(2026, 5, 1)));
    }

    #[test]
    fn stored_record_checks_money_dates_and_matter_code() {
        validate_record(&record(EnquiryStatus::Declined, Some("M-7"))).expect("former client");

        let mut negative = record(EnquiryStatus::Pending, None);
        negative.proposal_value = Some(dec!(-100000));
        assert_eq!(
            validate_record(&negative).expect_err("negative value"),
            IntakeError::NegativeAmount {
                field: "proposal_value"
            }
        );

        let mut early = record(EnquiryStatus::Contacted, None);
        early.milestones.meeting_date = Some(date(2020, 1, 1));
        assert!(matches!(
            validate_record(&early).expect_err("meeting predates enquiry"),
            IntakeError::MilestoneBeforeEnquiry {
                field: "meeting_date",
                ..
            }
        ));

        assert_eq!(
            validate_record(&record(EnquiryStatus::Converted, Some("  ")))
                .expect_err("blank code"),
            IntakeError::MissingMatterCode {
                enquiry_id: "ENQ-00042".to_string()
            }
        );
    }
}
