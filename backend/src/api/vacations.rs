use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::AuthContext,
    error::{AppError, Result},
    models::vacation::{
        BalanceQuery, CreateVacationRequest, RejectVacationRequest, UpdateVacationRequest,
        VacationBalance, VacationQuery, VacationRecord, VacationView,
    },
    vacation::derive_effective_status,
    AppState,
};

fn view(record: VacationRecord, today: time::Date) -> VacationView {
    let effective_status = derive_effective_status(&record, today);
    VacationView {
        record,
        effective_status,
    }
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthContext,
    query: std::result::Result<Query<VacationQuery>, QueryRejection>,
) -> Result<Json<Vec<VacationView>>> {
    let Query(q) = query?;
    let today = OffsetDateTime::now_utc().date();
    let rows = state.engine.list(q, &auth, &*state.vacations).await?;
    Ok(Json(rows.into_iter().map(|r| view(r, today)).collect()))
}

pub async fn get_one(
    State(state): State<AppState>,
    auth: AuthContext,
    path: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Json<VacationView>> {
    let Path(id) = path?;
    let record = state.engine.get(id, &auth, &*state.vacations).await?;
    Ok(Json(view(record, OffsetDateTime::now_utc().date())))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: std::result::Result<Json<CreateVacationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<VacationRecord>)> {
    let Json(body) = payload?;
    let record = state
        .engine
        .create(
            body,
            &auth,
            &*state.vacations,
            &*state.employees,
            OffsetDateTime::now_utc(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    path: std::result::Result<Path<Uuid>, PathRejection>,
    payload: std::result::Result<Json<UpdateVacationRequest>, JsonRejection>,
) -> Result<Json<VacationRecord>> {
    let Path(id) = path?;
    let Json(body) = payload?;
    let record = state
        .engine
        .update(
            id,
            body,
            &auth,
            &*state.vacations,
            &*state.employees,
            OffsetDateTime::now_utc(),
        )
        .await?;
    Ok(Json(record))
}

pub async fn approve(
    State(state): State<AppState>,
    auth: AuthContext,
    path: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Json<VacationRecord>> {
    let Path(id) = path?;
    let record = state
        .engine
        .approve(id, &auth, &*state.vacations, OffsetDateTime::now_utc())
        .await?;
    Ok(Json(record))
}

pub async fn reject(
    State(state): State<AppState>,
    auth: AuthContext,
    path: std::result::Result<Path<Uuid>, PathRejection>,
    payload: std::result::Result<Json<RejectVacationRequest>, JsonRejection>,
) -> Result<Json<VacationRecord>> {
    let Path(id) = path?;
    let Json(body) = payload?;
    let record = state
        .engine
        .reject(
            id,
            &auth,
            &body.rejection_reason,
            &*state.vacations,
            OffsetDateTime::now_utc(),
        )
        .await?;
    Ok(Json(record))
}

pub async fn cancel(
    State(state): State<AppState>,
    auth: AuthContext,
    path: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Json<VacationRecord>> {
    let Path(id) = path?;
    let record = state
        .engine
        .cancel(id, &auth, &*state.vacations, OffsetDateTime::now_utc())
        .await?;
    Ok(Json(record))
}

/// `allocatedDays` from the query wins; otherwise the active contract supplies it.
pub async fn balance(
    State(state): State<AppState>,
    auth: AuthContext,
    path: std::result::Result<Path<Uuid>, PathRejection>,
    query: std::result::Result<Query<BalanceQuery>, QueryRejection>,
) -> Result<Json<VacationBalance>> {
    let Path(employee_id) = path?;
    let Query(q) = query?;
    if !auth.can_act_for(employee_id) {
        return Err(AppError::Forbidden);
    }

    let year = q.year.unwrap_or_else(|| OffsetDateTime::now_utc().year());
    let allocated_days = match q.allocated_days {
        Some(days) => days,
        None => state
            .allocations
            .allocated_days(employee_id, year)
            .await?
            .ok_or_else(|| {
                AppError::BadRequest(format!(
                    "No vacation allocation on record for {} in {}; pass allocatedDays",
                    employee_id, year
                ))
            })?,
    };
    if !allocated_days.is_finite() || allocated_days < 0.0 {
        return Err(AppError::BadRequest("allocatedDays must be a non-negative number".into()));
    }

    let balance = state
        .engine
        .balance(employee_id, year, allocated_days, &*state.vacations)
        .await?;
    Ok(Json(balance))
}
