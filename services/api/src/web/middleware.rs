//! services/api/src/web/middleware.rs
//!
//! Resolves the acting user for every request.

use axum::{extract::Request, middleware::Next, response::Response};

pub const USER_HEADER: &str = "x-user-id";
pub const GUEST_USER: &str = "guest-user";

/// The user a request acts for, available to handlers as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

/// Reads `x-user-id`; requests without one act as the guest user.
pub async fn resolve_user(mut req: Request, next: Next) -> Response {
    let user_id = req
        .headers()
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(GUEST_USER)
        .to_string();

    req.extensions_mut().insert(UserId(user_id));
    next.run(req).await
}
