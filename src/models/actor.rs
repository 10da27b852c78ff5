//! Caller identity supplied by the upstream identity provider

use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Identity of the caller performing an operation.
///
/// The identity provider in front of this service authenticates users and
/// forwards an opaque user id plus a role flag; the core never handles
/// credentials.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl Actor {
    pub fn new(user_id: Uuid, is_admin: bool) -> Self {
        Self { user_id, is_admin }
    }

    /// Fail unless the caller has the administrator role
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "administrator role required".to_string(),
            ))
        }
    }

    /// Fail unless the caller is the given user or an administrator
    pub fn require_self_or_admin(&self, user_id: Uuid) -> AppResult<()> {
        if self.is_admin || self.user_id == user_id {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "operation restricted to the owner or an administrator".to_string(),
            ))
        }
    }
}
