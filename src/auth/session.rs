// Session state
// Process-wide, volatile slot for the current access credential.

use tokio::sync::RwLock;

/// Single source of truth for the short-lived access credential.
///
/// The request pipeline reads it immediately before every send, so a
/// credential written by a refresh is picked up by the very next outgoing
/// call without anything else being told. Never persisted; cleared on
/// sign-out and on refresh failure.
#[derive(Default)]
pub struct SessionStore {
    token: RwLock<Option<String>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<String> {
        let token = self.token.read().await;
        token.clone()
    }

    pub async fn set(&self, credential: String) {
        let mut token = self.token.write().await;
        *token = Some(credential);
    }

    pub async fn clear(&self) {
        let mut token = self.token.write().await;
        *token = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lifecycle() {
        let store = SessionStore::new();
        assert_eq!(store.get().await, None);

        store.set("token-a".to_string()).await;
        assert_eq!(store.get().await.as_deref(), Some("token-a"));

        // Refresh overwrites, it is not a history
        store.set("token-b".to_string()).await;
        assert_eq!(store.get().await.as_deref(), Some("token-b"));

        store.clear().await;
        assert_eq!(store.get().await, None);
    }
}
