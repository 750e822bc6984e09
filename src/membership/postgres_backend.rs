//! PostgreSQL-backed membership lookups.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

use super::MembershipStore;

pub struct PostgresMembershipStore {
    pool: PgPool,
}

impl PostgresMembershipStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Entity ids arrive as strings on the wire; the schema keys them as UUIDs.
/// A malformed id can never match a row, so it resolves to "not a member"
/// without a round-trip.
fn parse_id(raw: &str) -> Option<Uuid> {
    match Uuid::parse_str(raw) {
        Ok(id) => Some(id),
        Err(_) => {
            tracing::debug!(id = %raw, "Malformed entity id in membership lookup");
            None
        }
    }
}

#[async_trait]
impl MembershipStore for PostgresMembershipStore {
    async fn is_conversation_participant(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<bool, AppError> {
        let (Some(conversation_id), Some(user_id)) = (parse_id(conversation_id), parse_id(user_id))
        else {
            return Ok(false);
        };

        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM conversation_participants
                WHERE conversation_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn can_access_document(
        &self,
        document_id: &str,
        user_id: &str,
    ) -> Result<bool, AppError> {
        let (Some(document_id), Some(user_id)) = (parse_id(document_id), parse_id(user_id)) else {
            return Ok(false);
        };

        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM documents d
                JOIN project_members pm ON pm.project_id = d.project_id
                WHERE d.id = $1 AND pm.user_id = $2
            )
            "#,
        )
        .bind(document_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert!(parse_id("8c0f6c8e-5a8f-4f6e-9c64-2f8f1a6d0b1e").is_some());
        assert!(parse_id("not-a-uuid").is_none());
        assert!(parse_id("").is_none());
    }
}
