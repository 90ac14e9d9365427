//! Vacation request lifecycle.
//!
//! ```text
//! pending --approve--> approved --(time)--> in_progress --(time)--> completed
//! pending --reject---> rejected
//! pending --cancel---> cancelled
//! approved --cancel--> cancelled
//! ```
//!
//! Every operation takes the current instant explicitly. `in_progress` and
//! `completed` are never written by the engine; read paths derive them with
//! [`derive_effective_status`].

use time::{Date, OffsetDateTime};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use super::days::{business_day_span, total_day_span};
use crate::{
    auth::AuthContext,
    error::{AppError, Result},
    models::vacation::{
        CreateVacationRequest, RejectVacationRequest, UpdateVacationRequest, VacationBalance,
        VacationPatch, VacationQuery, VacationRecord, VacationStatus,
    },
    store::{EmployeeDirectory, VacationStore},
};

/// Longest leave, in calendar days, a single request may cover.
const MAX_SPAN_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, Default)]
pub struct VacationEngine {
    /// Recompute day counts when an edit moves the dates. Off by default:
    /// edits keep the counts captured at creation unless the caller sends new ones.
    pub recompute_days_on_update: bool,
}

impl VacationEngine {
    pub fn new(recompute_days_on_update: bool) -> Self {
        Self {
            recompute_days_on_update,
        }
    }

    pub async fn create(
        &self,
        request: CreateVacationRequest,
        requester: &AuthContext,
        store: &dyn VacationStore,
        directory: &dyn EmployeeDirectory,
        now: OffsetDateTime,
    ) -> Result<VacationRecord> {
        request.validate()?;

        if request.end_date <= request.start_date {
            return Err(AppError::InvalidDateRange);
        }
        let span = total_day_span(request.start_date, request.end_date);
        if span > MAX_SPAN_DAYS {
            return Err(span_too_long());
        }

        let employee_id = match request.employee_id {
            Some(id) if requester.is_elevated() => id,
            _ => requester.requester_id,
        };

        if !directory.exists(employee_id).await? {
            return Err(AppError::EmployeeNotFound(employee_id));
        }
        if let Some(replacement) = request.replacement_employee_id {
            if !directory.exists(replacement).await? {
                return Err(AppError::ReplacementNotFound(replacement));
            }
        }

        let requested_days = request.requested_days.unwrap_or(span as f64);
        let business_days = match request.business_days {
            Some(days) => days,
            None => business_day_span(request.start_date, request.end_date) as i32,
        };

        self.ensure_no_overlap(store, employee_id, request.start_date, request.end_date, None)
            .await?;

        let record = VacationRecord {
            id: Uuid::new_v4(),
            employee_id,
            start_date: request.start_date,
            end_date: request.end_date,
            leave_type: request.leave_type,
            status: VacationStatus::Pending,
            reason: request.reason,
            notes: request.notes,
            replacement_employee_id: request.replacement_employee_id,
            replacement_instructions: request.replacement_instructions,
            urgent: request.urgent,
            requested_days,
            business_days,
            vacation_year: request
                .vacation_year
                .unwrap_or_else(|| request.start_date.year()),
            approved_by: None,
            decision_date: None,
            rejection_reason: None,
            affects_salary: request.affects_salary,
            created_by: requester.requester_id,
            updated_by: None,
            created_at: now,
            updated_at: now,
        };

        let record = store.insert(record).await?;
        tracing::info!(
            vacation_id = %record.id,
            employee_id = %record.employee_id,
            actor = %requester.requester_id,
            business_days = record.business_days,
            "vacation request created"
        );
        Ok(record)
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateVacationRequest,
        requester: &AuthContext,
        store: &dyn VacationStore,
        directory: &dyn EmployeeDirectory,
        now: OffsetDateTime,
    ) -> Result<VacationRecord> {
        request.validate()?;

        let current = find(store, id).await?;
        if !requester.can_act_for(current.employee_id) {
            return Err(AppError::Forbidden);
        }
        if current.status != VacationStatus::Pending {
            return Err(AppError::ImmutableState(current.status));
        }

        let start = request.start_date.unwrap_or(current.start_date);
        let end = request.end_date.unwrap_or(current.end_date);
        if end <= start {
            return Err(AppError::InvalidDateRange);
        }
        let span = total_day_span(start, end);
        if span > MAX_SPAN_DAYS {
            return Err(span_too_long());
        }

        if let Some(replacement) = request.replacement_employee_id {
            if current.replacement_employee_id != Some(replacement)
                && !directory.exists(replacement).await?
            {
                return Err(AppError::ReplacementNotFound(replacement));
            }
        }

        let dates_changed = start != current.start_date || end != current.end_date;
        if dates_changed {
            self.ensure_no_overlap(store, current.employee_id, start, end, Some(id))
                .await?;
        }

        let mut patch = VacationPatch {
            start_date: request.start_date,
            end_date: request.end_date,
            leave_type: request.leave_type,
            reason: request.reason,
            notes: request.notes,
            replacement_employee_id: request.replacement_employee_id,
            replacement_instructions: request.replacement_instructions,
            urgent: request.urgent,
            requested_days: request.requested_days,
            business_days: request.business_days,
            vacation_year: request.vacation_year,
            affects_salary: request.affects_salary,
            updated_by: Some(requester.requester_id),
            updated_at: Some(now),
            ..Default::default()
        };

        if dates_changed && self.recompute_days_on_update {
            if patch.requested_days.is_none() {
                patch.requested_days = Some(span as f64);
            }
            if patch.business_days.is_none() {
                patch.business_days = Some(business_day_span(start, end) as i32);
            }
        }

        let updated = match store.update(id, &[VacationStatus::Pending], patch).await? {
            Some(record) => record,
            None => return Err(stale(store, id, AppError::ImmutableState).await),
        };

        tracing::info!(
            vacation_id = %id,
            actor = %requester.requester_id,
            dates_changed,
            "vacation request updated"
        );
        Ok(updated)
    }

    pub async fn approve(
        &self,
        id: Uuid,
        approver: &AuthContext,
        store: &dyn VacationStore,
        now: OffsetDateTime,
    ) -> Result<VacationRecord> {
        if !approver.is_elevated() {
            return Err(AppError::Forbidden);
        }

        let current = find(store, id).await?;
        if current.status != VacationStatus::Pending {
            return Err(invalid_transition("approve")(current.status));
        }

        let patch = VacationPatch {
            status: Some(VacationStatus::Approved),
            approved_by: Some(approver.requester_id),
            decision_date: Some(now),
            updated_by: Some(approver.requester_id),
            updated_at: Some(now),
            ..Default::default()
        };

        let approved = match store.update(id, &[VacationStatus::Pending], patch).await? {
            Some(record) => record,
            None => return Err(stale(store, id, invalid_transition("approve")).await),
        };

        tracing::info!(
            vacation_id = %id,
            employee_id = %approved.employee_id,
            approver = %approver.requester_id,
            "vacation request approved"
        );
        Ok(approved)
    }

    pub async fn reject(
        &self,
        id: Uuid,
        approver: &AuthContext,
        rejection_reason: &str,
        store: &dyn VacationStore,
        now: OffsetDateTime,
    ) -> Result<VacationRecord> {
        if !approver.is_elevated() {
            return Err(AppError::Forbidden);
        }

        let payload = RejectVacationRequest {
            rejection_reason: rejection_reason.trim().to_string(),
        };
        payload.validate()?;

        let current = find(store, id).await?;
        if current.status != VacationStatus::Pending {
            return Err(invalid_transition("reject")(current.status));
        }

        let patch = VacationPatch {
            status: Some(VacationStatus::Rejected),
            approved_by: Some(approver.requester_id),
            decision_date: Some(now),
            rejection_reason: Some(payload.rejection_reason),
            updated_by: Some(approver.requester_id),
            updated_at: Some(now),
            ..Default::default()
        };

        let rejected = match store.update(id, &[VacationStatus::Pending], patch).await? {
            Some(record) => record,
            None => return Err(stale(store, id, invalid_transition("reject")).await),
        };

        tracing::info!(
            vacation_id = %id,
            employee_id = %rejected.employee_id,
            approver = %approver.requester_id,
            "vacation request rejected"
        );
        Ok(rejected)
    }

    pub async fn cancel(
        &self,
        id: Uuid,
        requester: &AuthContext,
        store: &dyn VacationStore,
        now: OffsetDateTime,
    ) -> Result<VacationRecord> {
        const CANCELLABLE: [VacationStatus; 2] = [VacationStatus::Pending, VacationStatus::Approved];

        let current = find(store, id).await?;
        if !requester.can_act_for(current.employee_id) {
            return Err(AppError::Forbidden);
        }
        if !CANCELLABLE.contains(&current.status) {
            return Err(invalid_transition("cancel")(current.status));
        }

        let patch = VacationPatch {
            status: Some(VacationStatus::Cancelled),
            updated_by: Some(requester.requester_id),
            updated_at: Some(now),
            ..Default::default()
        };

        let cancelled = match store.update(id, &CANCELLABLE, patch).await? {
            Some(record) => record,
            None => return Err(stale(store, id, invalid_transition("cancel")).await),
        };

        tracing::info!(
            vacation_id = %id,
            employee_id = %cancelled.employee_id,
            actor = %requester.requester_id,
            previous = %current.status,
            "vacation request cancelled"
        );
        Ok(cancelled)
    }

    /// Business days consumed in `year` against an allocation supplied by
    /// the caller (normally the employee's contract).
    pub async fn balance(
        &self,
        employee_id: Uuid,
        year: i32,
        allocated_days: f64,
        store: &dyn VacationStore,
    ) -> Result<VacationBalance> {
        let used: i64 = store
            .find_by_employee_and_year(employee_id, year, &VacationStatus::CONSUMING)
            .await?
            .iter()
            .map(|r| i64::from(r.business_days))
            .sum();
        let pending: i64 = store
            .find_by_employee_and_year(employee_id, year, &[VacationStatus::Pending])
            .await?
            .iter()
            .map(|r| i64::from(r.business_days))
            .sum();

        Ok(VacationBalance {
            employee_id,
            year,
            allocated_days,
            used_days: used as f64,
            pending_days: pending as f64,
            remaining_days: allocated_days - used as f64,
        })
    }

    pub async fn get(
        &self,
        id: Uuid,
        requester: &AuthContext,
        store: &dyn VacationStore,
    ) -> Result<VacationRecord> {
        let record = find(store, id).await?;
        if !requester.can_act_for(record.employee_id) {
            return Err(AppError::Forbidden);
        }
        Ok(record)
    }

    /// Non-elevated requesters only ever see their own records.
    pub async fn list(
        &self,
        mut query: VacationQuery,
        requester: &AuthContext,
        store: &dyn VacationStore,
    ) -> Result<Vec<VacationRecord>> {
        if !requester.is_elevated() {
            query.employee_id = Some(requester.requester_id);
        }
        store.list(&query).await
    }

    async fn ensure_no_overlap(
        &self,
        store: &dyn VacationStore,
        employee_id: Uuid,
        start: Date,
        end: Date,
        exclude_id: Option<Uuid>,
    ) -> Result<()> {
        let conflict = store
            .find_conflicting(employee_id, start, end, &VacationStatus::BLOCKING, exclude_id)
            .await?;
        if let Some(existing) = conflict {
            tracing::warn!(
                employee_id = %employee_id,
                conflicting_id = %existing.id,
                %start,
                %end,
                "vacation request overlaps an existing one"
            );
            return Err(AppError::OverlappingRequest {
                conflicting_id: Some(existing.id),
            });
        }
        Ok(())
    }
}

/// Status implied by `today` for a stored record. Approved leave is in
/// progress from its first day through its last and completed afterwards.
/// Never writes anything.
pub fn derive_effective_status(record: &VacationRecord, today: Date) -> VacationStatus {
    match record.status {
        VacationStatus::Approved | VacationStatus::InProgress => {
            if today > record.end_date {
                VacationStatus::Completed
            } else if today >= record.start_date {
                VacationStatus::InProgress
            } else {
                record.status
            }
        }
        other => other,
    }
}

async fn find(store: &dyn VacationStore, id: Uuid) -> Result<VacationRecord> {
    store
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Vacation request {} not found", id)))
}

fn invalid_transition(action: &'static str) -> impl Fn(VacationStatus) -> AppError {
    move |from| AppError::InvalidTransition { from, action }
}

/// A guarded write found the record gone or moved on; report what it is now.
async fn stale(
    store: &dyn VacationStore,
    id: Uuid,
    on_status: impl Fn(VacationStatus) -> AppError,
) -> AppError {
    match find(store, id).await {
        Ok(record) => on_status(record.status),
        Err(e) => e,
    }
}

fn span_too_long() -> AppError {
    let mut error = ValidationError::new("range");
    error.message = Some("a request may not cover more than 365 days".into());
    let mut errors = ValidationErrors::new();
    errors.add("end_date", error);
    AppError::Validation(errors)
}
