pub mod vacations;

use axum::{
    routing::{get, patch},
    Json, Router,
};
use serde_json::{json, Value};

use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/api/health", get(health))
        // Vacation requests
        .route("/api/vacations", get(vacations::list).post(vacations::create))
        .route("/api/vacations/:id", get(vacations::get_one).put(vacations::update))
        .route("/api/vacations/:id/approve", patch(vacations::approve))
        .route("/api/vacations/:id/reject", patch(vacations::reject))
        .route("/api/vacations/:id/cancel", patch(vacations::cancel))
        // Balances
        .route("/api/vacation-balances/:employee_id", get(vacations::balance))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
