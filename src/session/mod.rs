//! Conversation history persisted across runs.

pub mod memory;

pub use memory::InMemorySession;

use async_trait::async_trait;

use crate::error::BatonError;
use crate::types::ConversationItem;

/// Storage for a conversation's items.
///
/// The runner reads history before the first model call of a run and appends
/// the run's new items once it completes or pauses for approval.
#[async_trait]
pub trait Session: Send + Sync {
    fn session_id(&self) -> &str;

    /// Most recent `limit` items (all when `None`), oldest first.
    async fn get_items(&self, limit: Option<usize>) -> Result<Vec<ConversationItem>, BatonError>;

    async fn add_items(&self, items: &[ConversationItem]) -> Result<(), BatonError>;

    /// Remove and return the newest item.
    async fn pop_item(&self) -> Result<Option<ConversationItem>, BatonError>;

    async fn clear_session(&self) -> Result<(), BatonError>;
}
