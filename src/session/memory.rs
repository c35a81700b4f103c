use async_trait::async_trait;
use tokio::sync::RwLock;

use super::Session;
use crate::error::BatonError;
use crate::types::ConversationItem;

/// Process-local session. Cloning is not supported; share it behind an `Arc`.
#[derive(Debug)]
pub struct InMemorySession {
    id: String,
    items: RwLock<Vec<ConversationItem>>,
}

impl InMemorySession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            items: RwLock::new(Vec::new()),
        }
    }

    /// Session pre-populated with history.
    pub fn with_items(id: impl Into<String>, items: Vec<ConversationItem>) -> Self {
        Self {
            id: id.into(),
            items: RwLock::new(items),
        }
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl Session for InMemorySession {
    fn session_id(&self) -> &str {
        &self.id
    }

    async fn get_items(&self, limit: Option<usize>) -> Result<Vec<ConversationItem>, BatonError> {
        let items = self.items.read().await;
        let start = limit.map_or(0, |n| items.len().saturating_sub(n));
        Ok(items[start..].to_vec())
    }

    async fn add_items(&self, items: &[ConversationItem]) -> Result<(), BatonError> {
        self.items.write().await.extend_from_slice(items);
        Ok(())
    }

    async fn pop_item(&self) -> Result<Option<ConversationItem>, BatonError> {
        Ok(self.items.write().await.pop())
    }

    async fn clear_session(&self) -> Result<(), BatonError> {
        self.items.write().await.clear();
        Ok(())
    }
}
