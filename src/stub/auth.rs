use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    models::{AdminUser, Role, UserStatus},
    stub::{StubConfig, StubControl, repository::RepositoryState},
};

/// Claims
///
/// Payload of the HS256 tokens the stub issues. `generation` ties a token to the
/// control generation it was issued under, so bumping the generation
/// revokes every outstanding token at once.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub generation: u64,
    pub exp: usize,
    pub iat: usize,
}

/// issue_token
///
/// Signs a token for `user` that expires after the configured TTL.
pub fn issue_token(
    config: &StubConfig,
    user: &AdminUser,
    generation: u64,
) -> jsonwebtoken::errors::Result<String> {
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user.id.clone(),
        role: user.role,
        generation,
        iat: now,
        exp: now + config.token_ttl.as_secs() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

/// AuthUser
///
/// The resolved identity of an authenticated stub request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn can_moderate(&self) -> bool {
        self.role.can_access_console()
    }
}

/// AuthUser Extractor Implementation
///
/// Bearer token, signature and expiry, token generation, then a repository
/// lookup so deleted or banned accounts stop working immediately.
///
/// Rejection: `401` on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    StubConfig: FromRef<S>,
    StubControl: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = StubConfig::from_ref(state);
        let control = StubControl::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let claims = match decode::<Claims>(token, &decoding_key, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                match e.kind() {
                    ErrorKind::ExpiredSignature => tracing::debug!("Rejected expired token"),
                    other => tracing::debug!("Rejected token: {:?}", other),
                }
                return Err(StatusCode::UNAUTHORIZED);
            }
        };

        if claims.generation != control.generation() {
            tracing::debug!(user_id = %claims.sub, "Rejected revoked token");
            return Err(StatusCode::UNAUTHORIZED);
        }

        let user = repo
            .get_user(&claims.sub)
            .await
            .ok_or(StatusCode::UNAUTHORIZED)?;

        if user.status == UserStatus::Banned {
            return Err(StatusCode::UNAUTHORIZED);
        }

        Ok(AuthUser {
            id: user.id,
            username: user.username,
            role: user.role,
        })
    }
}
