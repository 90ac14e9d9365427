use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "vacation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VacationStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    InProgress,
    Completed,
}

impl VacationStatus {
    /// Statuses that occupy the employee's calendar. Two records in these
    /// statuses may never overlap.
    pub const BLOCKING: [VacationStatus; 3] = [
        VacationStatus::Pending,
        VacationStatus::Approved,
        VacationStatus::InProgress,
    ];

    /// Statuses whose business days count against the yearly allocation.
    pub const CONSUMING: [VacationStatus; 3] = [
        VacationStatus::Approved,
        VacationStatus::InProgress,
        VacationStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VacationStatus::Pending => "pending",
            VacationStatus::Approved => "approved",
            VacationStatus::Rejected => "rejected",
            VacationStatus::Cancelled => "cancelled",
            VacationStatus::InProgress => "in_progress",
            VacationStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for VacationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "leave_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeaveType {
    Vacation,
    PersonalLeave,
    MedicalLeave,
    MarriageLeave,
    MaternityLeave,
    PaternityLeave,
    UnpaidLeave,
    Other,
}

/// A leave request as stored. External field names are kept for client
/// compatibility; the Rust names are the internal ones.
#[derive(Debug, Clone, Serialize, PartialEq, sqlx::FromRow)]
pub struct VacationRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "empleado")]
    pub employee_id: Uuid,
    #[serde(rename = "fechaInicio")]
    pub start_date: Date,
    #[serde(rename = "fechaFin")]
    pub end_date: Date,
    #[serde(rename = "tipo")]
    pub leave_type: LeaveType,
    #[serde(rename = "estado")]
    pub status: VacationStatus,
    #[serde(rename = "motivo")]
    pub reason: String,
    #[serde(rename = "observaciones")]
    pub notes: Option<String>,
    #[serde(rename = "empleadoReemplazo")]
    pub replacement_employee_id: Option<Uuid>,
    #[serde(rename = "instruccionesReemplazo")]
    pub replacement_instructions: Option<String>,
    #[serde(rename = "urgente")]
    pub urgent: bool,
    #[serde(rename = "diasSolicitados")]
    pub requested_days: f64,
    #[serde(rename = "diasHabiles")]
    pub business_days: i32,
    #[serde(rename = "anioVacaciones")]
    pub vacation_year: i32,
    #[serde(rename = "aprobadoPor")]
    pub approved_by: Option<Uuid>,
    #[serde(rename = "fechaDecision", with = "time::serde::rfc3339::option")]
    pub decision_date: Option<OffsetDateTime>,
    #[serde(rename = "motivoRechazo")]
    pub rejection_reason: Option<String>,
    #[serde(rename = "afectaSalario")]
    pub affects_salary: bool,
    #[serde(rename = "creadoPor")]
    pub created_by: Uuid,
    #[serde(rename = "actualizadoPor")]
    pub updated_by: Option<Uuid>,
    #[serde(rename = "createdAt", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(rename = "updatedAt", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Read-path projection: the stored record plus the status implied by today's date.
#[derive(Debug, Clone, Serialize)]
pub struct VacationView {
    #[serde(flatten)]
    pub record: VacationRecord,
    #[serde(rename = "estadoEfectivo")]
    pub effective_status: VacationStatus,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateVacationRequest {
    /// Only honoured for admin/HR requesters; employees always file for themselves.
    #[serde(rename = "empleado", default)]
    pub employee_id: Option<Uuid>,
    #[serde(rename = "fechaInicio")]
    pub start_date: Date,
    #[serde(rename = "fechaFin")]
    pub end_date: Date,
    #[serde(rename = "tipo")]
    pub leave_type: LeaveType,
    #[serde(rename = "motivo", default)]
    #[validate(length(min = 1, max = 500, message = "reason is required and must not exceed 500 characters"))]
    pub reason: String,
    #[serde(rename = "observaciones", default)]
    #[validate(length(max = 1000, message = "notes must not exceed 1000 characters"))]
    pub notes: Option<String>,
    #[serde(rename = "empleadoReemplazo", default)]
    pub replacement_employee_id: Option<Uuid>,
    #[serde(rename = "instruccionesReemplazo", default)]
    #[validate(length(max = 1000, message = "replacement instructions must not exceed 1000 characters"))]
    pub replacement_instructions: Option<String>,
    #[serde(rename = "urgente", default)]
    pub urgent: bool,
    #[serde(rename = "diasSolicitados", default)]
    #[validate(range(min = 0.5, max = 365.0, message = "requested days must be between 0.5 and 365"))]
    pub requested_days: Option<f64>,
    #[serde(rename = "diasHabiles", default)]
    #[validate(range(min = 0, max = 365, message = "business days must be between 0 and 365"))]
    pub business_days: Option<i32>,
    #[serde(rename = "anioVacaciones", default)]
    pub vacation_year: Option<i32>,
    #[serde(rename = "afectaSalario", default)]
    pub affects_salary: bool,
}

impl CreateVacationRequest {
    /// Minimal request with every optional field left unset.
    pub fn new(start_date: Date, end_date: Date, leave_type: LeaveType, reason: impl Into<String>) -> Self {
        Self {
            employee_id: None,
            start_date,
            end_date,
            leave_type,
            reason: reason.into(),
            notes: None,
            replacement_employee_id: None,
            replacement_instructions: None,
            urgent: false,
            requested_days: None,
            business_days: None,
            vacation_year: None,
            affects_salary: false,
        }
    }
}

/// Edit payload for a pending request. Absent fields are left untouched.
///
/// `null` is read the same as absent, so an edit can replace
/// `observaciones`, `empleadoReemplazo` or `instruccionesReemplazo` but never
/// clear them. Cancel and re-file to drop them.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateVacationRequest {
    #[serde(rename = "fechaInicio", default)]
    pub start_date: Option<Date>,
    #[serde(rename = "fechaFin", default)]
    pub end_date: Option<Date>,
    #[serde(rename = "tipo", default)]
    pub leave_type: Option<LeaveType>,
    #[serde(rename = "motivo", default)]
    #[validate(length(min = 1, max = 500, message = "reason must be between 1 and 500 characters"))]
    pub reason: Option<String>,
    #[serde(rename = "observaciones", default)]
    #[validate(length(max = 1000, message = "notes must not exceed 1000 characters"))]
    pub notes: Option<String>,
    #[serde(rename = "empleadoReemplazo", default)]
    pub replacement_employee_id: Option<Uuid>,
    #[serde(rename = "instruccionesReemplazo", default)]
    #[validate(length(max = 1000, message = "replacement instructions must not exceed 1000 characters"))]
    pub replacement_instructions: Option<String>,
    #[serde(rename = "urgente", default)]
    pub urgent: Option<bool>,
    #[serde(rename = "diasSolicitados", default)]
    #[validate(range(min = 0.5, max = 365.0, message = "requested days must be between 0.5 and 365"))]
    pub requested_days: Option<f64>,
    #[serde(rename = "diasHabiles", default)]
    #[validate(range(min = 0, max = 365, message = "business days must be between 0 and 365"))]
    pub business_days: Option<i32>,
    #[serde(rename = "anioVacaciones", default)]
    pub vacation_year: Option<i32>,
    #[serde(rename = "afectaSalario", default)]
    pub affects_salary: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RejectVacationRequest {
    #[serde(rename = "motivoRechazo", default)]
    #[validate(length(min = 1, max = 500, message = "rejection reason is required and must not exceed 500 characters"))]
    pub rejection_reason: String,
}

/// Field-level changes handed to the store. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VacationPatch {
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub leave_type: Option<LeaveType>,
    pub status: Option<VacationStatus>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub replacement_employee_id: Option<Uuid>,
    pub replacement_instructions: Option<String>,
    pub urgent: Option<bool>,
    pub requested_days: Option<f64>,
    pub business_days: Option<i32>,
    pub vacation_year: Option<i32>,
    pub approved_by: Option<Uuid>,
    pub decision_date: Option<OffsetDateTime>,
    pub rejection_reason: Option<String>,
    pub affects_salary: Option<bool>,
    pub updated_by: Option<Uuid>,
    pub updated_at: Option<OffsetDateTime>,
}

impl VacationPatch {
    pub fn changes_dates(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }

    /// Applies the patch in place. Used by stores that hold records in memory.
    pub fn apply_to(&self, record: &mut VacationRecord) {
        if let Some(v) = self.start_date {
            record.start_date = v;
        }
        if let Some(v) = self.end_date {
            record.end_date = v;
        }
        if let Some(v) = self.leave_type {
            record.leave_type = v;
        }
        if let Some(v) = self.status {
            record.status = v;
        }
        if let Some(v) = &self.reason {
            record.reason = v.clone();
        }
        if let Some(v) = &self.notes {
            record.notes = Some(v.clone());
        }
        if let Some(v) = self.replacement_employee_id {
            record.replacement_employee_id = Some(v);
        }
        if let Some(v) = &self.replacement_instructions {
            record.replacement_instructions = Some(v.clone());
        }
        if let Some(v) = self.urgent {
            record.urgent = v;
        }
        if let Some(v) = self.requested_days {
            record.requested_days = v;
        }
        if let Some(v) = self.business_days {
            record.business_days = v;
        }
        if let Some(v) = self.vacation_year {
            record.vacation_year = v;
        }
        if let Some(v) = self.approved_by {
            record.approved_by = Some(v);
        }
        if let Some(v) = self.decision_date {
            record.decision_date = Some(v);
        }
        if let Some(v) = &self.rejection_reason {
            record.rejection_reason = Some(v.clone());
        }
        if let Some(v) = self.affects_salary {
            record.affects_salary = v;
        }
        if let Some(v) = self.updated_by {
            record.updated_by = Some(v);
        }
        if let Some(v) = self.updated_at {
            record.updated_at = v;
        }
    }
}

/// Yearly vacation usage for one employee.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VacationBalance {
    pub employee_id: Uuid,
    pub year: i32,
    pub allocated_days: f64,
    pub used_days: f64,
    pub pending_days: f64,
    pub remaining_days: f64,
}

/// List filters. `limit` defaults to 100, capped at 500. `offset` defaults to 0.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VacationQuery {
    #[serde(rename = "empleado")]
    pub employee_id: Option<Uuid>,
    #[serde(rename = "estado")]
    pub status: Option<VacationStatus>,
    #[serde(rename = "anio")]
    pub year: Option<i32>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl VacationQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(100).clamp(1, 500)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    pub year: Option<i32>,
    #[serde(rename = "allocatedDays")]
    pub allocated_days: Option<f64>,
}
