//! Persistence and directory collaborators consumed by the vacation engine.
//!
//! Implementations must make overlap validation part of the write itself:
//! `insert` and any `update` that moves dates re-check for blocking
//! records of the same employee at commit time and fail with
//! `AppError::OverlappingRequest` if one appeared after the engine's own
//! pre-check. Without that, two concurrent requests could both pass the
//! read and both commit.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use time::Date;
use uuid::Uuid;

use crate::{
    error::Result,
    models::vacation::{VacationPatch, VacationQuery, VacationRecord, VacationStatus},
};

pub use memory::{MemoryAllocations, MemoryEmployeeDirectory, MemoryVacationStore};
pub use postgres::{PgAllocations, PgEmployeeDirectory, PgVacationStore};

#[async_trait]
pub trait VacationStore: Send + Sync {
    /// Persists a new record. Fails with `OverlappingRequest` if a blocking
    /// record of the same employee overlaps it at commit time.
    async fn insert(&self, record: VacationRecord) -> Result<VacationRecord>;

    /// Applies `patch` only while the stored status is one of `expected`.
    /// Returns `Ok(None)` when the record is missing or its status moved.
    /// Date changes are re-validated for overlap like `insert`.
    async fn update(
        &self,
        id: Uuid,
        expected: &[VacationStatus],
        patch: VacationPatch,
    ) -> Result<Option<VacationRecord>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<VacationRecord>>;

    /// First record of `employee_id` in one of `statuses` overlapping
    /// `[start, end]`, ignoring `exclude_id`.
    async fn find_conflicting(
        &self,
        employee_id: Uuid,
        start: Date,
        end: Date,
        statuses: &[VacationStatus],
        exclude_id: Option<Uuid>,
    ) -> Result<Option<VacationRecord>>;

    async fn find_by_employee_and_year(
        &self,
        employee_id: Uuid,
        year: i32,
        statuses: &[VacationStatus],
    ) -> Result<Vec<VacationRecord>>;

    /// Filtered page, newest first.
    async fn list(&self, query: &VacationQuery) -> Result<Vec<VacationRecord>>;
}

#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// True when the employee exists and is active.
    async fn exists(&self, employee_id: Uuid) -> Result<bool>;
}

/// Source of yearly vacation allocations, normally the employee's contract.
#[async_trait]
pub trait AllocationSource: Send + Sync {
    async fn allocated_days(&self, employee_id: Uuid, year: i32) -> Result<Option<f64>>;
}
