//! Active users and their role names, for login.

use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgPool;

use prodops_core::error::CapabilityError;
use prodops_core::{UserDirectory, UserIdentity};

use crate::query_failed;

const CAPABILITY: &str = "user_directory";

pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_active_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserIdentity>, CapabilityError> {
        let row = sqlx::query(
            "SELECT u.id::BIGINT AS id, u.user_email, \
                    ARRAY_AGG(r.role_name::TEXT) AS roles \
             FROM users u \
             JOIN user_roles ur ON u.id = ur.user_id \
             JOIN roles r ON ur.role_id = r.id \
             WHERE u.user_email = $1 AND u.is_active = TRUE \
             GROUP BY u.id, u.user_email",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed(CAPABILITY, e))?;

        row.map(|row| -> Result<UserIdentity, sqlx::Error> {
            Ok(UserIdentity {
                user_id: row.try_get("id")?,
                email: row.try_get("user_email")?,
                roles: row.try_get("roles")?,
            })
        })
        .transpose()
        .map_err(|e| CapabilityError::invalid_response(CAPABILITY, e.to_string()))
    }
}
