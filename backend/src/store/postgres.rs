//! sqlx/Postgres collaborators.
//!
//! Writes that can create an overlap take a transaction-scoped advisory
//! lock keyed on the employee before re-running the conflict query, so two
//! concurrent requests for the same employee serialize. The
//! `vacations_no_overlap` exclusion constraint backs this up at the
//! database level.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use time::Date;
use uuid::Uuid;

use super::{AllocationSource, EmployeeDirectory, VacationStore};
use crate::{
    error::{AppError, Result},
    models::vacation::{VacationPatch, VacationQuery, VacationRecord, VacationStatus},
};

const COLUMNS: &str = r#"
    id, employee_id, start_date, end_date, leave_type, status, reason, notes,
    replacement_employee_id, replacement_instructions, urgent,
    requested_days, business_days, vacation_year,
    approved_by, decision_date, rejection_reason, affects_salary,
    created_by, updated_by, created_at, updated_at
"#;

fn status_names(statuses: &[VacationStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

async fn lock_employee(conn: &mut PgConnection, employee_id: Uuid) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
        .bind(employee_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn conflict_in(
    conn: &mut PgConnection,
    employee_id: Uuid,
    start: Date,
    end: Date,
    statuses: &[VacationStatus],
    exclude_id: Option<Uuid>,
) -> Result<Option<VacationRecord>> {
    let sql = format!(
        r#"
        SELECT {COLUMNS}
        FROM vacations
        WHERE employee_id = $1
          AND status::text = ANY($2)
          AND start_date <= $4
          AND $3 <= end_date
          AND ($5::uuid IS NULL OR id <> $5)
        ORDER BY start_date
        LIMIT 1
        "#
    );
    let row = sqlx::query_as::<_, VacationRecord>(&sql)
        .bind(employee_id)
        .bind(status_names(statuses))
        .bind(start)
        .bind(end)
        .bind(exclude_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

#[derive(Clone)]
pub struct PgVacationStore {
    pool: PgPool,
}

impl PgVacationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VacationStore for PgVacationStore {
    async fn insert(&self, record: VacationRecord) -> Result<VacationRecord> {
        let mut tx = self.pool.begin().await?;
        lock_employee(&mut tx, record.employee_id).await?;

        if VacationStatus::BLOCKING.contains(&record.status) {
            if let Some(existing) = conflict_in(
                &mut tx,
                record.employee_id,
                record.start_date,
                record.end_date,
                &VacationStatus::BLOCKING,
                None,
            )
            .await?
            {
                return Err(AppError::OverlappingRequest {
                    conflicting_id: Some(existing.id),
                });
            }
        }

        let sql = format!(
            r#"
            INSERT INTO vacations ({COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                    $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
            RETURNING {COLUMNS}
            "#
        );
        let inserted = sqlx::query_as::<_, VacationRecord>(&sql)
            .bind(record.id)
            .bind(record.employee_id)
            .bind(record.start_date)
            .bind(record.end_date)
            .bind(record.leave_type)
            .bind(record.status)
            .bind(&record.reason)
            .bind(&record.notes)
            .bind(record.replacement_employee_id)
            .bind(&record.replacement_instructions)
            .bind(record.urgent)
            .bind(record.requested_days)
            .bind(record.business_days)
            .bind(record.vacation_year)
            .bind(record.approved_by)
            .bind(record.decision_date)
            .bind(&record.rejection_reason)
            .bind(record.affects_salary)
            .bind(record.created_by)
            .bind(record.updated_by)
            .bind(record.created_at)
            .bind(record.updated_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::from_write)?;

        tx.commit().await.map_err(AppError::from_write)?;
        Ok(inserted)
    }

    async fn update(
        &self,
        id: Uuid,
        expected: &[VacationStatus],
        patch: VacationPatch,
    ) -> Result<Option<VacationRecord>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {COLUMNS} FROM vacations WHERE id = $1 FOR UPDATE");
        let Some(current) = sqlx::query_as::<_, VacationRecord>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };
        if !expected.contains(&current.status) {
            return Ok(None);
        }

        let mut next = current.clone();
        patch.apply_to(&mut next);

        if patch.changes_dates() && VacationStatus::BLOCKING.contains(&next.status) {
            lock_employee(&mut tx, next.employee_id).await?;
            if let Some(existing) = conflict_in(
                &mut tx,
                next.employee_id,
                next.start_date,
                next.end_date,
                &VacationStatus::BLOCKING,
                Some(id),
            )
            .await?
            {
                return Err(AppError::OverlappingRequest {
                    conflicting_id: Some(existing.id),
                });
            }
        }

        let sql = format!(
            r#"
            UPDATE vacations
            SET start_date               = COALESCE($2, start_date),
                end_date                 = COALESCE($3, end_date),
                leave_type               = COALESCE($4, leave_type),
                status                   = COALESCE($5, status),
                reason                   = COALESCE($6, reason),
                notes                    = COALESCE($7, notes),
                replacement_employee_id  = COALESCE($8, replacement_employee_id),
                replacement_instructions = COALESCE($9, replacement_instructions),
                urgent                   = COALESCE($10, urgent),
                requested_days           = COALESCE($11, requested_days),
                business_days            = COALESCE($12, business_days),
                vacation_year            = COALESCE($13, vacation_year),
                approved_by              = COALESCE($14, approved_by),
                decision_date            = COALESCE($15, decision_date),
                rejection_reason         = COALESCE($16, rejection_reason),
                affects_salary           = COALESCE($17, affects_salary),
                updated_by               = COALESCE($18, updated_by),
                updated_at               = COALESCE($19, NOW())
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, VacationRecord>(&sql)
            .bind(id)
            .bind(patch.start_date)
            .bind(patch.end_date)
            .bind(patch.leave_type)
            .bind(patch.status)
            .bind(&patch.reason)
            .bind(&patch.notes)
            .bind(patch.replacement_employee_id)
            .bind(&patch.replacement_instructions)
            .bind(patch.urgent)
            .bind(patch.requested_days)
            .bind(patch.business_days)
            .bind(patch.vacation_year)
            .bind(patch.approved_by)
            .bind(patch.decision_date)
            .bind(&patch.rejection_reason)
            .bind(patch.affects_salary)
            .bind(patch.updated_by)
            .bind(patch.updated_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::from_write)?;

        tx.commit().await.map_err(AppError::from_write)?;
        Ok(Some(updated))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<VacationRecord>> {
        let sql = format!("SELECT {COLUMNS} FROM vacations WHERE id = $1");
        let row = sqlx::query_as::<_, VacationRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_conflicting(
        &self,
        employee_id: Uuid,
        start: Date,
        end: Date,
        statuses: &[VacationStatus],
        exclude_id: Option<Uuid>,
    ) -> Result<Option<VacationRecord>> {
        let mut conn = self.pool.acquire().await?;
        conflict_in(&mut conn, employee_id, start, end, statuses, exclude_id).await
    }

    async fn find_by_employee_and_year(
        &self,
        employee_id: Uuid,
        year: i32,
        statuses: &[VacationStatus],
    ) -> Result<Vec<VacationRecord>> {
        let sql = format!(
            r#"
            SELECT {COLUMNS}
            FROM vacations
            WHERE employee_id = $1
              AND vacation_year = $2
              AND status::text = ANY($3)
            ORDER BY start_date
            "#
        );
        let rows = sqlx::query_as::<_, VacationRecord>(&sql)
            .bind(employee_id)
            .bind(year)
            .bind(status_names(statuses))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list(&self, query: &VacationQuery) -> Result<Vec<VacationRecord>> {
        let sql = format!(
            r#"
            SELECT {COLUMNS}
            FROM vacations
            WHERE ($1::uuid IS NULL OR employee_id = $1)
              AND ($2::text IS NULL OR status::text = $2)
              AND ($3::int4 IS NULL OR vacation_year = $3)
            ORDER BY created_at DESC, id
            LIMIT $4 OFFSET $5
            "#
        );
        let rows = sqlx::query_as::<_, VacationRecord>(&sql)
            .bind(query.employee_id)
            .bind(query.status.map(|s| s.as_str()))
            .bind(query.year)
            .bind(query.limit())
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[derive(Clone)]
pub struct PgEmployeeDirectory {
    pool: PgPool,
}

impl PgEmployeeDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmployeeDirectory for PgEmployeeDirectory {
    async fn exists(&self, employee_id: Uuid) -> Result<bool> {
        let ok: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM employees WHERE id = $1 AND is_active = true)",
        )
        .bind(employee_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(ok)
    }
}

/// Reads the allocation from the employee's active contract covering `year`.
#[derive(Clone)]
pub struct PgAllocations {
    pool: PgPool,
}

impl PgAllocations {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AllocationSource for PgAllocations {
    async fn allocated_days(&self, employee_id: Uuid, year: i32) -> Result<Option<f64>> {
        let days: Option<f64> = sqlx::query_scalar(
            r#"
            SELECT vacation_days
            FROM contracts
            WHERE employee_id = $1
              AND is_active = true
              AND start_date <= make_date($2, 12, 31)
              AND (end_date IS NULL OR end_date >= make_date($2, 1, 1))
            ORDER BY start_date DESC
            LIMIT 1
            "#,
        )
        .bind(employee_id)
        .bind(year)
        .fetch_optional(&self.pool)
        .await?;
        Ok(days)
    }
}
