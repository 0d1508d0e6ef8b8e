//! Authenticated user identity and the directory it is looked up in.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CapabilityError;

/// Well-known role names.
pub mod roles {
    pub const SUPERVISOR: &str = "SUPERVISOR";
    pub const MAINTENANCE: &str = "MAINTENANCE";
    pub const OPERATOR: &str = "OPERATOR";
}

/// A verified user together with their role set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: i64,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl UserIdentity {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_any_role(&self, required: &[&str]) -> bool {
        required.iter().any(|role| self.has_role(role))
    }
}

/// Looks up active users by email. Backed by the relational store.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_active_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserIdentity>, CapabilityError>;
}
