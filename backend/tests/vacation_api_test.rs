mod common;

use hr_backend::auth::Role;
use serde_json::{json, Value};
use uuid::Uuid;

async fn create_vacation(
    app: &common::TestApp,
    token: &str,
    body: Value,
) -> reqwest::Response {
    common::http_client()
        .post(app.url("/api/vacations"))
        .header("Authorization", format!("Bearer {}", token))
        .json(&body)
        .send()
        .await
        .unwrap()
}

async fn patch(app: &common::TestApp, token: &str, path: &str, body: Value) -> reqwest::Response {
    common::http_client()
        .patch(app.url(path))
        .header("Authorization", format!("Bearer {}", token))
        .json(&body)
        .send()
        .await
        .unwrap()
}

fn july_request() -> Value {
    json!({
        "fechaInicio": "2024-07-15",
        "fechaFin": "2024-07-29",
        "tipo": "vacation",
        "motivo": "Summer holidays",
    })
}

#[tokio::test]
async fn create_returns_201_with_wire_field_names() {
    let app = common::setup_test_app().await;
    let (employee_id, token) = common::create_test_employee(&app, &[Role::Employee]).await;

    let resp = create_vacation(&app, &token, july_request()).await;
    assert_eq!(resp.status(), 201);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["empleado"].as_str().unwrap(), employee_id.to_string());
    assert_eq!(body["fechaInicio"].as_str().unwrap(), "2024-07-15");
    assert_eq!(body["fechaFin"].as_str().unwrap(), "2024-07-29");
    assert_eq!(body["estado"].as_str().unwrap(), "pending");
    assert_eq!(body["diasHabiles"].as_i64().unwrap(), 11);
    assert_eq!(body["diasSolicitados"].as_f64().unwrap(), 15.0);
    assert_eq!(body["anioVacaciones"].as_i64().unwrap(), 2024);
    assert_eq!(body["urgente"].as_bool().unwrap(), false);
    assert!(body["aprobadoPor"].is_null());
    assert!(body["_id"].is_string());

    // Round-trip through the read path
    let id = body["_id"].as_str().unwrap();
    let resp = common::http_client()
        .get(app.url(&format!("/api/vacations/{}", id)))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let fetched: Value = resp.json().await.unwrap();
    assert_eq!(fetched["diasHabiles"].as_i64().unwrap(), 11);
    assert_eq!(fetched["estado"].as_str().unwrap(), "pending");
    assert_eq!(fetched["estadoEfectivo"].as_str().unwrap(), "pending");
}

#[tokio::test]
async fn requests_without_token_are_unauthorized() {
    let app = common::setup_test_app().await;

    let resp = common::http_client()
        .post(app.url("/api/vacations"))
        .json(&july_request())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn expired_token_returns_401() {
    let app = common::setup_test_app().await;
    let (employee_id, _token) = common::create_test_employee(&app, &[Role::Employee]).await;
    let expired = common::create_expired_token(employee_id);

    let resp = common::http_client()
        .get(app.url("/api/vacations"))
        .header("Authorization", format!("Bearer {}", expired))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn deactivated_employee_token_is_rejected() {
    let app = common::setup_test_app().await;
    let (employee_id, token) = common::create_test_employee(&app, &[Role::Employee]).await;
    app.employees.deactivate(employee_id).await;

    let resp = common::http_client()
        .get(app.url("/api/vacations"))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn invalid_date_range_returns_400() {
    let app = common::setup_test_app().await;
    let (_id, token) = common::create_test_employee(&app, &[Role::Employee]).await;

    let resp = create_vacation(
        &app,
        &token,
        json!({
            "fechaInicio": "2024-07-15",
            "fechaFin": "2024-07-15",
            "tipo": "vacation",
            "motivo": "Same day",
        }),
    )
    .await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"].as_str().unwrap(), "InvalidDateRange");
}

#[tokio::test]
async fn malformed_body_returns_400() {
    let app = common::setup_test_app().await;
    let (_id, token) = common::create_test_employee(&app, &[Role::Employee]).await;

    let resp = create_vacation(
        &app,
        &token,
        json!({ "fechaInicio": "2024-07-15", "tipo": "sabbatical" }),
    )
    .await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"].as_str().unwrap(), "BadRequest");
}

#[tokio::test]
async fn malformed_path_and_query_return_structured_400() {
    let app = common::setup_test_app().await;
    let (id, token) = common::create_test_employee(&app, &[Role::Employee]).await;
    let client = common::http_client();

    let paths = [
        "/api/vacations/not-a-uuid".to_string(),
        "/api/vacations?limit=lots".to_string(),
        "/api/vacations?estado=on_holiday".to_string(),
        format!("/api/vacation-balances/{}?year=next", id),
        "/api/vacation-balances/nobody?allocatedDays=22".to_string(),
    ];
    for path in paths {
        let resp = client
            .get(app.url(&path))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "{path}");
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"].as_str().unwrap(), "BadRequest", "{path}");
        assert!(!body["message"].as_str().unwrap().is_empty(), "{path}");
    }

    let resp = patch(&app, &token, "/api/vacations/not-a-uuid/cancel", json!({})).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"].as_str().unwrap(), "BadRequest");
}

#[tokio::test]
async fn validation_errors_list_every_field() {
    let app = common::setup_test_app().await;
    let (_id, token) = common::create_test_employee(&app, &[Role::Employee]).await;

    let resp = create_vacation(
        &app,
        &token,
        json!({
            "fechaInicio": "2024-07-15",
            "fechaFin": "2024-07-19",
            "tipo": "vacation",
            "motivo": "",
            "observaciones": "x".repeat(1001),
        }),
    )
    .await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"].as_str().unwrap(), "ValidationError");
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("reason"), "{message}");
    assert!(message.contains("notes"), "{message}");
}

#[tokio::test]
async fn touching_an_approved_request_returns_409() {
    let app = common::setup_test_app().await;
    let (employee_id, token) = common::create_test_employee(&app, &[Role::Employee]).await;
    let (_hr_id, hr_token) = common::create_test_employee(&app, &[Role::Hr]).await;

    let resp = create_vacation(
        &app,
        &hr_token,
        json!({
            "empleado": employee_id,
            "fechaInicio": "2024-07-10",
            "fechaFin": "2024-07-20",
            "tipo": "vacation",
            "motivo": "Family trip",
        }),
    )
    .await;
    assert_eq!(resp.status(), 201);
    let first: Value = resp.json().await.unwrap();
    let first_id = first["_id"].as_str().unwrap().to_string();

    let resp = patch(
        &app,
        &hr_token,
        &format!("/api/vacations/{}/approve", first_id),
        json!({}),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let resp = create_vacation(
        &app,
        &token,
        json!({
            "fechaInicio": "2024-07-20",
            "fechaFin": "2024-07-25",
            "tipo": "personal_leave",
            "motivo": "Moving house",
        }),
    )
    .await;
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"].as_str().unwrap(), "OverlappingRequest");
    assert_eq!(body["conflictingId"].as_str().unwrap(), first_id);
}

#[tokio::test]
async fn approval_workflow_over_http() {
    let app = common::setup_test_app().await;
    let (_employee_id, token) = common::create_test_employee(&app, &[Role::Employee]).await;
    let (hr_id, hr_token) = common::create_test_employee(&app, &[Role::Hr]).await;

    let resp = create_vacation(&app, &token, july_request()).await;
    let created: Value = resp.json().await.unwrap();
    let id = created["_id"].as_str().unwrap().to_string();

    // Employees cannot approve
    let resp = patch(&app, &token, &format!("/api/vacations/{}/approve", id), json!({})).await;
    assert_eq!(resp.status(), 403);

    let resp = patch(&app, &hr_token, &format!("/api/vacations/{}/approve", id), json!({})).await;
    assert_eq!(resp.status(), 200);
    let approved: Value = resp.json().await.unwrap();
    assert_eq!(approved["estado"].as_str().unwrap(), "approved");
    assert_eq!(approved["aprobadoPor"].as_str().unwrap(), hr_id.to_string());
    assert!(approved["fechaDecision"].is_string());

    // Second approval is an invalid transition
    let resp = patch(&app, &hr_token, &format!("/api/vacations/{}/approve", id), json!({})).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"].as_str().unwrap(), "InvalidTransition");

    // Approved requests can no longer be edited
    let resp = common::http_client()
        .put(app.url(&format!("/api/vacations/{}", id)))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "observaciones": "too late" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"].as_str().unwrap(), "ImmutableState");

    // The owner can still cancel
    let resp = patch(&app, &token, &format!("/api/vacations/{}/cancel", id), json!({})).await;
    assert_eq!(resp.status(), 200);
    let cancelled: Value = resp.json().await.unwrap();
    assert_eq!(cancelled["estado"].as_str().unwrap(), "cancelled");
}

#[tokio::test]
async fn reject_without_reason_leaves_request_pending() {
    let app = common::setup_test_app().await;
    let (_employee_id, token) = common::create_test_employee(&app, &[Role::Employee]).await;
    let (_admin_id, admin_token) = common::create_test_employee(&app, &[Role::Admin]).await;

    let resp = create_vacation(&app, &token, july_request()).await;
    let created: Value = resp.json().await.unwrap();
    let id = created["_id"].as_str().unwrap().to_string();

    let resp = patch(&app, &admin_token, &format!("/api/vacations/{}/reject", id), json!({})).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"].as_str().unwrap(), "ValidationError");

    let resp = common::http_client()
        .get(app.url(&format!("/api/vacations/{}", id)))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    let fetched: Value = resp.json().await.unwrap();
    assert_eq!(fetched["estado"].as_str().unwrap(), "pending");

    let resp = patch(
        &app,
        &admin_token,
        &format!("/api/vacations/{}/reject", id),
        json!({ "motivoRechazo": "Quarter close" }),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let rejected: Value = resp.json().await.unwrap();
    assert_eq!(rejected["estado"].as_str().unwrap(), "rejected");
    assert_eq!(rejected["motivoRechazo"].as_str().unwrap(), "Quarter close");

    // Rejected is terminal
    let resp = patch(&app, &token, &format!("/api/vacations/{}/cancel", id), json!({})).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"].as_str().unwrap(), "InvalidTransition");
}

#[tokio::test]
async fn employees_cannot_see_each_others_requests() {
    let app = common::setup_test_app().await;
    let (_a, token_a) = common::create_test_employee(&app, &[Role::Employee]).await;
    let (b, token_b) = common::create_test_employee(&app, &[Role::Employee]).await;

    let resp = create_vacation(&app, &token_a, july_request()).await;
    let created: Value = resp.json().await.unwrap();
    let id = created["_id"].as_str().unwrap();

    let resp = common::http_client()
        .get(app.url(&format!("/api/vacations/{}", id)))
        .header("Authorization", format!("Bearer {}", token_b))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = common::http_client()
        .get(app.url("/api/vacations"))
        .header("Authorization", format!("Bearer {}", token_b))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let list: Value = resp.json().await.unwrap();
    assert!(list.as_array().unwrap().is_empty());

    let resp = patch(&app, &token_b, &format!("/api/vacations/{}/cancel", id), json!({})).await;
    assert_eq!(resp.status(), 403);

    let resp = common::http_client()
        .get(app.url(&format!("/api/vacation-balances/{}?allocatedDays=20", b)))
        .header("Authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn unknown_vacation_returns_404() {
    let app = common::setup_test_app().await;
    let (_id, token) = common::create_test_employee(&app, &[Role::Employee]).await;

    let resp = common::http_client()
        .get(app.url(&format!("/api/vacations/{}", Uuid::new_v4())))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn unknown_replacement_returns_404() {
    let app = common::setup_test_app().await;
    let (_id, token) = common::create_test_employee(&app, &[Role::Employee]).await;

    let mut body = july_request();
    body["empleadoReemplazo"] = json!(Uuid::new_v4());
    let resp = create_vacation(&app, &token, body).await;
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"].as_str().unwrap(), "ReplacementNotFound");
}

#[tokio::test]
async fn balance_uses_contract_allocation_or_query_override() {
    let app = common::setup_test_app().await;
    let (employee_id, token) = common::create_test_employee(&app, &[Role::Employee]).await;
    let (_hr_id, hr_token) = common::create_test_employee(&app, &[Role::Hr]).await;

    let resp = create_vacation(&app, &token, july_request()).await;
    let created: Value = resp.json().await.unwrap();
    let id = created["_id"].as_str().unwrap().to_string();
    patch(&app, &hr_token, &format!("/api/vacations/{}/approve", id), json!({})).await;

    let balance_url = app.url(&format!("/api/vacation-balances/{}?year=2024", employee_id));

    // No contract on file and no override
    let resp = common::http_client()
        .get(&balance_url)
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    app.allocations.set(employee_id, 2024, 23.0).await;
    let resp = common::http_client()
        .get(&balance_url)
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["allocatedDays"].as_f64().unwrap(), 23.0);
    assert_eq!(body["usedDays"].as_f64().unwrap(), 11.0);
    assert_eq!(body["remainingDays"].as_f64().unwrap(), 12.0);

    let resp = common::http_client()
        .get(format!("{}&allocatedDays=30", balance_url))
        .header("Authorization", format!("Bearer {}", hr_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["allocatedDays"].as_f64().unwrap(), 30.0);
    assert_eq!(body["remainingDays"].as_f64().unwrap(), 19.0);
}

#[tokio::test]
async fn health_is_public() {
    let app = common::setup_test_app().await;
    let resp = common::http_client()
        .get(app.url("/api/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn concurrent_overlapping_creates_commit_once() {
    let app = common::setup_test_app().await;
    let (_id, token) = common::create_test_employee(&app, &[Role::Employee]).await;

    let attempts = (0..6).map(|_| create_vacation(&app, &token, july_request()));
    let statuses: Vec<u16> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|r| r.status().as_u16())
        .collect();

    assert_eq!(statuses.iter().filter(|s| **s == 201).count(), 1, "{statuses:?}");
    assert_eq!(statuses.iter().filter(|s| **s == 409).count(), 5, "{statuses:?}");
}
