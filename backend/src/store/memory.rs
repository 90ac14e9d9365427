//! In-process collaborators. A single mutex around the record map makes the
//! overlap check and the write one atomic step.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use time::Date;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::{AllocationSource, EmployeeDirectory, VacationStore};
use crate::{
    error::{AppError, Result},
    models::vacation::{VacationPatch, VacationQuery, VacationRecord, VacationStatus},
    vacation::days::intervals_overlap,
};

#[derive(Default)]
pub struct MemoryVacationStore {
    records: Mutex<HashMap<Uuid, VacationRecord>>,
}

impl MemoryVacationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn first_conflict<'a>(
    records: impl Iterator<Item = &'a VacationRecord>,
    employee_id: Uuid,
    start: Date,
    end: Date,
    statuses: &[VacationStatus],
    exclude_id: Option<Uuid>,
) -> Option<&'a VacationRecord> {
    records
        .filter(|r| r.employee_id == employee_id)
        .filter(|r| Some(r.id) != exclude_id)
        .filter(|r| statuses.contains(&r.status))
        .filter(|r| intervals_overlap(r.start_date, r.end_date, start, end))
        .min_by_key(|r| r.start_date)
}

#[async_trait]
impl VacationStore for MemoryVacationStore {
    async fn insert(&self, record: VacationRecord) -> Result<VacationRecord> {
        let mut records = self.records.lock().await;

        if VacationStatus::BLOCKING.contains(&record.status) {
            if let Some(existing) = first_conflict(
                records.values(),
                record.employee_id,
                record.start_date,
                record.end_date,
                &VacationStatus::BLOCKING,
                None,
            ) {
                return Err(AppError::OverlappingRequest {
                    conflicting_id: Some(existing.id),
                });
            }
        }

        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: Uuid,
        expected: &[VacationStatus],
        patch: VacationPatch,
    ) -> Result<Option<VacationRecord>> {
        let mut records = self.records.lock().await;

        let Some(current) = records.get(&id) else {
            return Ok(None);
        };
        if !expected.contains(&current.status) {
            return Ok(None);
        }

        let mut next = current.clone();
        patch.apply_to(&mut next);

        if patch.changes_dates() && VacationStatus::BLOCKING.contains(&next.status) {
            if let Some(existing) = first_conflict(
                records.values(),
                next.employee_id,
                next.start_date,
                next.end_date,
                &VacationStatus::BLOCKING,
                Some(id),
            ) {
                return Err(AppError::OverlappingRequest {
                    conflicting_id: Some(existing.id),
                });
            }
        }

        records.insert(id, next.clone());
        Ok(Some(next))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<VacationRecord>> {
        Ok(self.records.lock().await.get(&id).cloned())
    }

    async fn find_conflicting(
        &self,
        employee_id: Uuid,
        start: Date,
        end: Date,
        statuses: &[VacationStatus],
        exclude_id: Option<Uuid>,
    ) -> Result<Option<VacationRecord>> {
        let records = self.records.lock().await;
        Ok(first_conflict(records.values(), employee_id, start, end, statuses, exclude_id).cloned())
    }

    async fn find_by_employee_and_year(
        &self,
        employee_id: Uuid,
        year: i32,
        statuses: &[VacationStatus],
    ) -> Result<Vec<VacationRecord>> {
        let records = self.records.lock().await;
        let mut found: Vec<VacationRecord> = records
            .values()
            .filter(|r| r.employee_id == employee_id)
            .filter(|r| r.vacation_year == year)
            .filter(|r| statuses.contains(&r.status))
            .cloned()
            .collect();
        found.sort_by_key(|r| r.start_date);
        Ok(found)
    }

    async fn list(&self, query: &VacationQuery) -> Result<Vec<VacationRecord>> {
        let records = self.records.lock().await;
        let mut found: Vec<VacationRecord> = records
            .values()
            .filter(|r| query.employee_id.map_or(true, |e| r.employee_id == e))
            .filter(|r| query.status.map_or(true, |s| r.status == s))
            .filter(|r| query.year.map_or(true, |y| r.vacation_year == y))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(found
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .collect())
    }
}

/// Set of active employee ids.
#[derive(Default)]
pub struct MemoryEmployeeDirectory {
    active: RwLock<HashSet<Uuid>>,
}

impl MemoryEmployeeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, employee_id: Uuid) {
        self.active.write().await.insert(employee_id);
    }

    pub async fn deactivate(&self, employee_id: Uuid) {
        self.active.write().await.remove(&employee_id);
    }
}

#[async_trait]
impl EmployeeDirectory for MemoryEmployeeDirectory {
    async fn exists(&self, employee_id: Uuid) -> Result<bool> {
        Ok(self.active.read().await.contains(&employee_id))
    }
}

#[derive(Default)]
pub struct MemoryAllocations {
    days: RwLock<HashMap<(Uuid, i32), f64>>,
}

impl MemoryAllocations {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, employee_id: Uuid, year: i32, days: f64) {
        self.days.write().await.insert((employee_id, year), days);
    }
}

#[async_trait]
impl AllocationSource for MemoryAllocations {
    async fn allocated_days(&self, employee_id: Uuid, year: i32) -> Result<Option<f64>> {
        Ok(self.days.read().await.get(&(employee_id, year)).copied())
    }
}
