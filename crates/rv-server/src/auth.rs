use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use rv_types::UserId;

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Header carrying the caller's user id when the server sits behind a
/// trusted gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Who is making a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    User(UserId),
}

impl Identity {
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::User(id) => Some(id),
            Self::Anonymous => None,
        }
    }
}

/// What the caller presented.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    UserHeader(String),
    Anonymous,
}

impl Credentials {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        match headers.get(USER_ID_HEADER).and_then(|v| v.to_str().ok()) {
            Some(raw) if !raw.trim().is_empty() => Self::UserHeader(raw.trim().to_string()),
            _ => Self::Anonymous,
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity>;
}

/// Accepts the user id header as-is. Only for deployments where a gateway
/// has already authenticated the caller.
pub struct TrustedHeaderAuth;

#[async_trait]
impl AuthProvider for TrustedHeaderAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match credentials {
            Credentials::UserHeader(raw) => Ok(Identity::User(UserId::new(raw.as_str())?)),
            Credentials::Anonymous => Ok(Identity::Anonymous),
        }
    }
}

/// Extractor for handlers that need an authenticated caller.
#[derive(Clone, Debug)]
pub struct Actor(pub UserId);

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let credentials = Credentials::from_headers(&parts.headers);
        match state.auth.authenticate(&credentials).await? {
            Identity::User(id) => Ok(Self(id)),
            Identity::Anonymous => Err(ServerError::Unauthenticated),
        }
    }
}
