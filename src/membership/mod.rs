//! Membership lookups against the platform's relational database.
//!
//! The gateway never owns durable records; it only needs two point lookups
//! at room-join time: is this user a participant of a conversation, and may
//! this user access a document (i.e. is a member of the owning project).
//! Both are answered by a [`MembershipStore`] backend.

mod memory_backend;
mod postgres_backend;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::config::MembershipConfig;
use crate::error::AppError;

pub use memory_backend::MemoryMembershipStore;
pub use postgres_backend::PostgresMembershipStore;

/// Authorization lookups consumed at room-join time.
///
/// Results are evaluated once per join; membership is intentionally not
/// re-validated on later events (accepted staleness window until reconnect).
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Whether the user is a recorded participant of the conversation.
    async fn is_conversation_participant(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<bool, AppError>;

    /// Whether the user belongs to the project owning the document.
    async fn can_access_document(
        &self,
        document_id: &str,
        user_id: &str,
    ) -> Result<bool, AppError>;
}

/// Create a membership store based on configuration.
///
/// Falls back to the in-memory store when the postgres backend is requested
/// without a pool (e.g. local development without a database).
pub fn create_membership_store(
    config: &MembershipConfig,
    pool: Option<PgPool>,
) -> Arc<dyn MembershipStore> {
    match config.backend.as_str() {
        "postgres" => match pool {
            Some(pool) => {
                tracing::info!("Using PostgreSQL membership store");
                Arc::new(PostgresMembershipStore::new(pool))
            }
            None => {
                tracing::warn!(
                    "Postgres membership backend requested but no pool available, \
                     falling back to in-memory store"
                );
                Arc::new(MemoryMembershipStore::new())
            }
        },
        "memory" => {
            tracing::info!("Using in-memory membership store");
            Arc::new(MemoryMembershipStore::new())
        }
        other => {
            tracing::warn!(backend = %other, "Unknown membership backend, using in-memory store");
            Arc::new(MemoryMembershipStore::new())
        }
    }
}
