//! In-memory membership store.
//!
//! Default-deny: a user has no rights until explicitly granted. Used for
//! local development and tests.

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::AppError;

use super::MembershipStore;

#[derive(Default)]
pub struct MemoryMembershipStore {
    /// conversation_id -> participant user ids
    participants: DashMap<String, HashSet<String>>,
    /// document_id -> user ids with access via the owning project
    document_access: DashMap<String, HashSet<String>>,
}

impl MemoryMembershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant_conversation(&self, conversation_id: &str, user_id: &str) {
        self.participants
            .entry(conversation_id.to_string())
            .or_default()
            .insert(user_id.to_string());
    }

    pub fn grant_document(&self, document_id: &str, user_id: &str) {
        self.document_access
            .entry(document_id.to_string())
            .or_default()
            .insert(user_id.to_string());
    }

    pub fn revoke_conversation(&self, conversation_id: &str, user_id: &str) {
        if let Some(mut users) = self.participants.get_mut(conversation_id) {
            users.remove(user_id);
        }
    }
}

#[async_trait]
impl MembershipStore for MemoryMembershipStore {
    async fn is_conversation_participant(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<bool, AppError> {
        Ok(self
            .participants
            .get(conversation_id)
            .map(|users| users.contains(user_id))
            .unwrap_or(false))
    }

    async fn can_access_document(
        &self,
        document_id: &str,
        user_id: &str,
    ) -> Result<bool, AppError> {
        Ok(self
            .document_access
            .get(document_id)
            .map(|users| users.contains(user_id))
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_deny() {
        let store = MemoryMembershipStore::new();
        assert!(!store.is_conversation_participant("c1", "u1").await.unwrap());
        assert!(!store.can_access_document("d1", "u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_grant_and_revoke() {
        let store = MemoryMembershipStore::new();
        store.grant_conversation("c1", "u1");
        store.grant_document("d1", "u1");

        assert!(store.is_conversation_participant("c1", "u1").await.unwrap());
        assert!(store.can_access_document("d1", "u1").await.unwrap());
        assert!(!store.is_conversation_participant("c1", "u2").await.unwrap());

        store.revoke_conversation("c1", "u1");
        assert!(!store.is_conversation_participant("c1", "u1").await.unwrap());
    }
}
