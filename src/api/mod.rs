//! API handlers for the Libris REST endpoints

pub mod books;
pub mod borrowings;
pub mod fines;
pub mod health;
pub mod openapi;
pub mod payments;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::{error::AppError, models::Actor, AppState};

/// Extract the caller identity from the identity-provider headers.
///
/// An authenticating proxy in front of this service resolves credentials
/// and forwards `x-user-id` and `x-user-role`; the core only consumes them.
#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Forbidden("missing x-user-id header".to_string()))?;

        let user_id = Uuid::parse_str(user_id)
            .map_err(|_| AppError::Forbidden("invalid x-user-id header".to_string()))?;

        let is_admin = parts
            .headers
            .get("x-user-role")
            .and_then(|value| value.to_str().ok())
            .map(|role| role.eq_ignore_ascii_case("admin"))
            .unwrap_or(false);

        Ok(Actor::new(user_id, is_admin))
    }
}
