use std::collections::HashSet;

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "app_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Employee,
    Admin,
    Hr,
}

impl Role {
    /// Admin and HR may act on any employee's records.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Admin | Role::Hr)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // employee id
    pub roles: Vec<Role>,
    pub exp: i64,
    pub iat: i64,
}

/// Identity of the caller. The vacation engine only checks capability
/// membership; authentication happens in the extractor below.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub requester_id: Uuid,
    pub capabilities: HashSet<Role>,
}

impl AuthContext {
    pub fn new(requester_id: Uuid, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            requester_id,
            capabilities: roles.into_iter().collect(),
        }
    }

    pub fn employee(requester_id: Uuid) -> Self {
        Self::new(requester_id, [Role::Employee])
    }

    pub fn is_elevated(&self) -> bool {
        self.capabilities.iter().any(Role::is_elevated)
    }

    /// Owner of the record or an elevated requester.
    pub fn can_act_for(&self, employee_id: Uuid) -> bool {
        self.requester_id == employee_id || self.is_elevated()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let token = extract_bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;

        let key = DecodingKey::from_secret(app_state.jwt_secret.as_bytes());
        let claims = decode::<Claims>(&token, &key, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                tracing::warn!("JWT decode failed: {}", e);
                AppError::Unauthorized
            })?
            .claims;

        // Deactivated employees keep valid tokens until expiry; reject them here.
        if !app_state.employees.exists(claims.sub).await? {
            tracing::debug!(employee_id = %claims.sub, "token subject is not an active employee");
            return Err(AppError::Unauthorized);
        }

        Ok(AuthContext::new(claims.sub, claims.roles))
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get("Authorization")?.to_str().ok()?;
    let token = auth.strip_prefix("Bearer ")?;
    Some(token.to_string())
}

pub fn create_token(
    employee_id: Uuid,
    roles: Vec<Role>,
    secret: &str,
    expiry_hours: u64,
) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = OffsetDateTime::now_utc();
    let exp = now + time::Duration::hours(expiry_hours as i64);

    let claims = Claims {
        sub: employee_id,
        roles,
        exp: exp.unix_timestamp(),
        iat: now.unix_timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
