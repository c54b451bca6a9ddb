//! Authentication: password digests, session cookies and login throttling.

mod limiter;
mod password;

pub use limiter::{LoginRateLimiter, LOGIN_ATTEMPTS, LOGIN_WINDOW};
pub use password::{hash_password, verify_password, PasswordError};

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "asap_session";

/// Pull the session token out of a `Cookie` header value.
pub fn session_token_from_cookie_header(header: &str) -> Option<&str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value establishing a session.
pub fn session_cookie(token: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, token
    )
}

/// `Set-Cookie` value clearing the session.
pub fn expired_session_cookie() -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        SESSION_COOKIE
    )
}
