//! Authentication and authorization
//!
//! Login resolves a username/password to a role (stored account first, then
//! the host password, then the shared user password) and issues a signed
//! bearer token. Requests without a token act as guests. Authorization is
//! static role matching per endpoint; there is no policy engine.

use crate::api::server::AppContext;
use crate::config::AuthConfig;
use crate::db;
use crate::error::{Error, Result};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::debug;

/// Actor role, ordered by privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Host,
    User,
    Guest,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Host => "host",
            Role::User => "user",
            Role::Guest => "guest",
        }
    }

    /// Parse a stored role string; unknown strings degrade to guest
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            "host" => Role::Host,
            "user" => Role::User,
            _ => Role::Guest,
        }
    }
}

/// Token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Username
    pub sub: String,
    /// Role string
    pub role: String,
    /// Expiry, seconds since epoch
    pub exp: i64,
}

/// Issue a signed bearer token for an authenticated actor
pub fn issue_token(username: &str, role: Role, auth: &AuthConfig) -> Result<String> {
    let exp = chrono::Utc::now() + chrono::Duration::minutes(auth.token_ttl_minutes);
    let claims = Claims {
        sub: username.to_string(),
        role: role.as_str().to_string(),
        exp: exp.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.secret_key.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("token encoding failed: {}", e)))
}

/// Verify a bearer token and return its claims
pub fn verify_token(token: &str, auth: &AuthConfig) -> Result<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(auth.secret_key.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| Error::Unauthorized(format!("invalid token: {}", e)))
}

/// Resolve credentials to a role
///
/// Order mirrors the account precedence: a stored user wins, then the host
/// password, then the shared user password. Anything else is rejected.
pub async fn resolve_login(
    pool: &Pool<Sqlite>,
    auth: &AuthConfig,
    username: &str,
    password: &str,
) -> Result<Role> {
    if let Some(user) = db::users::find_by_username(pool, username).await? {
        let verified = bcrypt::verify(password, &user.password_hash)
            .map_err(|e| Error::Internal(format!("bcrypt failure: {}", e)))?;
        if verified {
            return Ok(user.role);
        }
    }
    if username == "host" && password == auth.host_password {
        return Ok(Role::Host);
    }
    if password == auth.shared_user_password {
        return Ok(Role::User);
    }

    Err(Error::Unauthorized("invalid credentials".to_string()))
}

/// Authenticated actor extracted from the Authorization header
///
/// A missing header yields a guest actor; a present but invalid token is an
/// error. Role enforcement is the handler's job via [`AuthUser::require`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    /// Reject with `Forbidden` unless the actor holds one of `roles`
    pub fn require(&self, roles: &[Role]) -> Result<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            debug!("role {:?} denied (needs one of {:?})", self.role, roles);
            Err(Error::Forbidden)
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AppContext: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let ctx = AppContext::from_ref(state);

        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let token = match header.and_then(|h| h.strip_prefix("Bearer ")) {
            Some(token) => token,
            None => {
                return Ok(AuthUser {
                    username: "guest".to_string(),
                    role: Role::Guest,
                })
            }
        };

        let claims = verify_token(token, &ctx.config.auth)?;
        Ok(AuthUser {
            username: claims.sub,
            role: Role::from_str_lossy(&claims.role),
        })
    }
}
