pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod vacation;

use std::sync::Arc;

use store::{AllocationSource, EmployeeDirectory, VacationStore};
use vacation::VacationEngine;

/// Shared application state available to all handlers via axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    pub vacations: Arc<dyn VacationStore>,
    pub employees: Arc<dyn EmployeeDirectory>,
    pub allocations: Arc<dyn AllocationSource>,
    pub engine: VacationEngine,
    pub jwt_secret: String,
}
