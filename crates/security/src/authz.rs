//! Role gates for administrative operations.

use prodops_core::{AuthError, UserIdentity};
use tracing::warn;

/// Succeeds when the user holds at least one of `required`.
pub fn require_any_role(user: &UserIdentity, required: &[&str]) -> Result<(), AuthError> {
    if user.has_any_role(required) {
        return Ok(());
    }
    warn!(
        user_id = user.user_id,
        email = %user.email,
        required = ?required,
        "Access denied"
    );
    Err(AuthError::Forbidden {
        required: required.iter().map(|r| r.to_string()).collect(),
    })
}
