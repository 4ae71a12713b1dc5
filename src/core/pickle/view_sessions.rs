use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Notify;

/// One live leaderboard per user per server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub guild_id: u64,
    pub user_id: u64,
}

/// Registry of live leaderboard sessions.
///
/// Opening a second leaderboard for the same key tells the first one to stop, so a user
/// never has two messages competing for their button presses.
#[derive(Default)]
pub struct ViewSessions {
    active: Arc<DashMap<SessionKey, Arc<Notify>>>,
}

impl ViewSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, key: SessionKey) -> SessionGuard {
        let signal = Arc::new(Notify::new());

        if let Some(previous) = self.active.insert(key, Arc::clone(&signal)) {
            tracing::debug!(
                guild_id = key.guild_id,
                user_id = key.user_id,
                "Superseding previous leaderboard session"
            );
            // notify_one stores a permit, so a driver that is not waiting yet still sees it.
            previous.notify_one();
        }

        SessionGuard {
            key,
            signal,
            active: Arc::clone(&self.active),
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

/// Held by a session driver for as long as the session runs.
pub struct SessionGuard {
    key: SessionKey,
    signal: Arc<Notify>,
    active: Arc<DashMap<SessionKey, Arc<Notify>>>,
}

impl SessionGuard {
    /// Resolves once a newer session for the same key has started.
    pub async fn superseded(&self) {
        self.signal.notified().await;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.active
            .remove_if(&self.key, |_, current| Arc::ptr_eq(current, &self.signal));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const KEY: SessionKey = SessionKey {
        guild_id: 1,
        user_id: 2,
    };

    #[tokio::test]
    async fn new_session_supersedes_the_old_one() {
        let sessions = ViewSessions::new();
        let first = sessions.begin(KEY);
        let _second = sessions.begin(KEY);

        tokio::time::timeout(Duration::from_secs(1), first.superseded())
            .await
            .expect("first session should be told to stop");
    }

    #[tokio::test]
    async fn other_keys_are_left_alone() {
        let sessions = ViewSessions::new();
        let first = sessions.begin(KEY);
        let _other = sessions.begin(SessionKey {
            guild_id: 1,
            user_id: 3,
        });

        let waited = tokio::time::timeout(Duration::from_millis(50), first.superseded()).await;
        assert!(waited.is_err());
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn dropping_an_old_guard_keeps_the_new_entry() {
        let sessions = ViewSessions::new();
        let first = sessions.begin(KEY);
        let second = sessions.begin(KEY);

        drop(first);
        assert_eq!(sessions.len(), 1);

        drop(second);
        assert!(sessions.is_empty());
    }
}
