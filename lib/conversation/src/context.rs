//! Resolution context for the active conversation.

use masked_sms_core::ActiveConversation;
use tokio::sync::{Mutex, MutexGuard};

/// Holds the conversation resolved by this process, if any.
///
/// Once set, callers get the cached record without touching the store or the
/// provider until [`invalidate`](Self::invalidate) is called. The lock is held
/// for the whole of a resolution so concurrent callers never create two
/// conversations.
#[derive(Debug, Default)]
pub struct ConversationContext {
    resolved: Mutex<Option<ActiveConversation>>,
}

impl ConversationContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached conversation.
    pub async fn current(&self) -> Option<ActiveConversation> {
        self.resolved.lock().await.clone()
    }

    /// Forgets the cached conversation so the next caller re-resolves it.
    pub async fn invalidate(&self) {
        self.resolved.lock().await.take();
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, Option<ActiveConversation>> {
        self.resolved.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use masked_sms_core::ConversationSid;

    #[tokio::test]
    async fn invalidate_clears_cached_conversation() {
        let context = ConversationContext::new();
        assert!(context.current().await.is_none());

        *context.lock().await = Some(ActiveConversation::new(ConversationSid::new("CH1")));
        assert_eq!(
            context.current().await.map(|c| c.id),
            Some(ConversationSid::new("CH1"))
        );

        context.invalidate().await;
        assert!(context.current().await.is_none());
    }
}
