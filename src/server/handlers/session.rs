//! Sign in and sign out.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{AppState, ClientInfo, CurrentUser};
use crate::auth::{expired_session_cookie, session_cookie};
use crate::error::AppError;
use crate::models::User;

const BAD_CREDENTIALS: &str = "Try another email address or password.";
const RATE_LIMITED: &str = "Try again later.";

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct LoginForm {
    pub email_address: String,
    pub password: String,
}

/// What the login form needs to render.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginFormMetadata {
    pub action: &'static str,
    pub method: &'static str,
    pub fields: Vec<&'static str>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignedIn {
    pub notice: String,
    #[schema(value_type = Object)]
    pub user: User,
    pub redirect_to: String,
}

/// Login form metadata (`GET /session/new`, `GET /login`).
#[utoipa::path(
    get,
    path = "/session/new",
    responses((status = 200, description = "Login form", body = LoginFormMetadata)),
    tag = "Session"
)]
pub async fn new_session() -> Json<LoginFormMetadata> {
    Json(LoginFormMetadata {
        action: "/session",
        method: "POST",
        fields: vec!["email_address", "password"],
    })
}

#[utoipa::path(
    post,
    path = "/session",
    request_body = LoginForm,
    responses(
        (status = 200, description = "Signed in; session cookie set", body = SignedIn),
        (status = 422, description = "Bad credentials"),
        (status = 429, description = "Too many attempts")
    ),
    tag = "Session"
)]
pub async fn create_session(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(form): Json<LoginForm>,
) -> Result<impl IntoResponse, AppError> {
    if !state.login_limiter.check(&client.rate_limit_key()).await {
        return Err(AppError::TooManyRequests(RATE_LIMITED.to_string()));
    }

    let user = state
        .db
        .users()
        .authenticate(&form.email_address, &form.password)
        .await?
        .ok_or_else(|| AppError::Unprocessable(BAD_CREDENTIALS.to_string()))?;

    let session = state
        .db
        .sessions()
        .create(
            user.id,
            client.ip_address.as_deref(),
            client.user_agent.as_deref(),
        )
        .await?;
    tracing::info!("User {} signed in", user.email_address);

    Ok((
        [(header::SET_COOKIE, session_cookie(&session.token))],
        Json(SignedIn {
            notice: "Welcome back!".to_string(),
            user,
            redirect_to: "/".to_string(),
        }),
    ))
}

#[utoipa::path(
    delete,
    path = "/session",
    responses((status = 200, description = "Signed out", body = super::api_types::NoticeResponse)),
    tag = "Session"
)]
pub async fn destroy_session(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    state.db.sessions().delete(&current.session.token).await?;
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, expired_session_cookie())],
        Json(super::api_types::NoticeResponse {
            notice: "You have been signed out.".to_string(),
        }),
    ))
}
