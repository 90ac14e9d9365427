#![allow(dead_code)]
use std::{net::SocketAddr, sync::Arc};

use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use hr_backend::{
    api,
    auth::{create_token, Role},
    store::{MemoryAllocations, MemoryEmployeeDirectory, MemoryVacationStore},
    vacation::VacationEngine,
    AppState,
};

pub const JWT_SECRET: &str = "test-secret-that-is-at-least-32-chars-long!!";
const JWT_EXPIRY_HOURS: u64 = 12;

pub struct TestApp {
    pub addr: SocketAddr,
    pub employees: Arc<MemoryEmployeeDirectory>,
    pub allocations: Arc<MemoryAllocations>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Spin up the real Axum router on a random port backed by in-memory
/// collaborators. Each test gets its own isolated state.
pub async fn setup_test_app() -> TestApp {
    let employees = Arc::new(MemoryEmployeeDirectory::new());
    let allocations = Arc::new(MemoryAllocations::new());

    let state = AppState {
        vacations: Arc::new(MemoryVacationStore::new()),
        employees: employees.clone(),
        allocations: allocations.clone(),
        engine: VacationEngine::default(),
        jwt_secret: JWT_SECRET.to_string(),
    };

    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        addr,
        employees,
        allocations,
    }
}

/// Register an active employee with the given roles. Returns (employee_id, bearer token).
pub async fn create_test_employee(app: &TestApp, roles: &[Role]) -> (Uuid, String) {
    let id = Uuid::new_v4();
    app.employees.add(id).await;
    let token = create_token(id, roles.to_vec(), JWT_SECRET, JWT_EXPIRY_HOURS)
        .expect("Failed to create token");
    (id, token)
}

/// Create a JWT token that is already expired (exp in the past).
pub fn create_expired_token(employee_id: Uuid) -> String {
    use hr_backend::auth::Claims;
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = time::OffsetDateTime::now_utc();
    let claims = Claims {
        sub: employee_id,
        roles: vec![Role::Employee],
        exp: (now - time::Duration::hours(1)).unix_timestamp(), // expired 1 hour ago
        iat: (now - time::Duration::hours(2)).unix_timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to create expired token")
}

/// Build a reqwest client (reusable across requests in a test).
pub fn http_client() -> reqwest::Client {
    reqwest::Client::new()
}

/// Connect to the Postgres test database if `TEST_DATABASE_URL` is set.
/// Tests write and delete data, so they never fall back to `DATABASE_URL`.
pub async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Some(pool)
}

/// Insert an active employee row. Returns its id.
pub async fn insert_employee(pool: &PgPool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO employees (id, first_name, last_name, email, role, is_active) \
         VALUES ($1, 'Test', 'Employee', $2, 'employee'::app_role, true)",
    )
    .bind(id)
    .bind(format!("employee+{}@test.local", &id.to_string()[..8]))
    .execute(pool)
    .await
    .expect("Failed to create test employee");
    id
}

/// Remove everything belonging to the given employees.
pub async fn cleanup_employees(pool: &PgPool, ids: &[Uuid]) {
    let cleanup_queries = [
        "DELETE FROM vacations WHERE employee_id = ANY($1) OR created_by = ANY($1)",
        "DELETE FROM contracts WHERE employee_id = ANY($1)",
        "DELETE FROM employees WHERE id = ANY($1)",
    ];

    for q in cleanup_queries {
        let _ = sqlx::query(q).bind(ids).execute(pool).await;
    }
}
