//! Request extractors for the signed-in user and the calling client.

use std::net::SocketAddr;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts},
};

use super::AppState;
use crate::auth::session_token_from_cookie_header;
use crate::error::AppError;
use crate::models::{Session, User};

/// The user owning the request's session cookie. Rejects with 401.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub session: Session,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(session_token_from_cookie_header)
            .ok_or(AppError::Unauthenticated)?;

        match state.db.sessions().find_by_token(token).await? {
            Some((session, user)) => Ok(CurrentUser { user, session }),
            None => Err(AppError::Unauthenticated),
        }
    }
}

/// Address and user agent of the caller, recorded on new sessions.
///
/// The address is the peer's unless `trust_proxy_headers` is set.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// Key used for login throttling.
    pub fn rate_limit_key(&self) -> String {
        self.ip_address.clone().unwrap_or_else(|| "unknown".to_string())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ClientInfo {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_str = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        // Forwarding headers are client-controlled unless a proxy rewrites them
        let ip_address = if state.trust_proxy_headers {
            header_str("x-forwarded-for")
                .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
                .or_else(|| header_str("x-real-ip"))
                .or(peer)
        } else {
            peer
        };

        Ok(ClientInfo {
            ip_address,
            user_agent: header_str(header::USER_AGENT.as_str()),
        })
    }
}
