//! Session registry for connected sync clients.
//!
//! Sessions are grouped by owner so edits fan out to the owner's other
//! devices and never cross into another owner's group.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashSet;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::models::messages::ServerMessage;

/// Routing info for one connected session
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub owner_id: String,
    pub sender: UnboundedSender<ServerMessage>,
    pub connected_at: DateTime<Utc>,
}

/// Session registry with dual indices for O(1) lookups
pub struct SessionRegistry {
    /// Primary storage: lookup by session_id for registration/cleanup - O(1)
    sessions: DashMap<String, SessionInfo>,

    /// Secondary index: lookup by owner_id for fan-out - O(1)
    owner_index: DashMap<String, HashSet<String>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            owner_index: DashMap::new(),
        }
    }

    /// Register a new session and hand back its message receiver - O(1)
    pub fn register(&self, session_id: &str, owner_id: &str) -> UnboundedReceiver<ServerMessage> {
        let (sender, receiver) = mpsc::unbounded_channel();

        // Insert into primary storage
        self.sessions.insert(
            session_id.to_string(),
            SessionInfo {
                owner_id: owner_id.to_string(),
                sender,
                connected_at: Utc::now(),
            },
        );

        // Update secondary index
        self.owner_index
            .entry(owner_id.to_string())
            .or_default()
            .insert(session_id.to_string());

        debug!("Registered session {} for owner '{}'", session_id, owner_id);

        receiver
    }

    /// Unregister a session - O(1). Safe to call for unknown session ids.
    ///
    /// Returns the removed session's info so callers can react to the
    /// owner group emptying.
    pub fn unregister(&self, session_id: &str) -> Option<SessionInfo> {
        // Remove from primary storage
        let (_, info) = self.sessions.remove(session_id)?;

        // Update secondary index
        if let Some(mut entry) = self.owner_index.get_mut(&info.owner_id) {
            entry.remove(session_id);

            // Clean up empty owner entries
            if entry.is_empty() {
                drop(entry); // Release lock before removal
                self.owner_index.remove(&info.owner_id);
            }
        }

        let lifetime = Utc::now().signed_duration_since(info.connected_at);
        debug!(
            "Unregistered session {} for owner '{}' after {}s",
            session_id,
            info.owner_id,
            lifetime.num_seconds()
        );

        Some(info)
    }

    /// Send a message to every other session of the same owner.
    ///
    /// The originating session is skipped so clients never echo their own
    /// edits back. Returns the number of sessions the message reached.
    pub fn broadcast(
        &self,
        owner_id: &str,
        sender_session: &str,
        message: &ServerMessage,
    ) -> usize {
        let mut delivered = 0;

        if let Some(session_ids) = self.owner_index.get(owner_id) {
            for session_id in session_ids.iter() {
                if session_id == sender_session {
                    continue;
                }
                if let Some(info) = self.sessions.get(session_id) {
                    match info.sender.send(message.clone()) {
                        Ok(()) => delivered += 1,
                        Err(e) => warn!(
                            "Failed to deliver to session {}: {}. Session will be cleaned up on disconnect.",
                            session_id, e
                        ),
                    }
                }
            }
        }

        delivered
    }

    /// Number of currently registered sessions across all owners
    pub fn connection_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of live sessions registered for one owner - O(1)
    pub fn owner_session_count(&self, owner_id: &str) -> usize {
        self.owner_index
            .get(owner_id)
            .map_or(0, |sessions| sessions.len())
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_count() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.connection_count(), 0);

        let _rx1 = registry.register("s1", "alice");
        let _rx2 = registry.register("s2", "alice");

        assert_eq!(registry.connection_count(), 2);
    }

    #[test]
    fn test_broadcast_skips_sender() {
        let registry = SessionRegistry::new();
        let mut rx1 = registry.register("s1", "alice");
        let mut rx2 = registry.register("s2", "alice");

        let msg = ServerMessage::Content {
            content: "hello".to_string(),
        };
        let delivered = registry.broadcast("alice", "s1", &msg);

        assert_eq!(delivered, 1);
        assert!(rx1.try_recv().is_err());
        assert_eq!(rx2.try_recv().unwrap(), msg);
    }

    #[test]
    fn test_broadcast_stays_within_owner() {
        let registry = SessionRegistry::new();
        let mut rx_a1 = registry.register("a1", "alice");
        let mut rx_a2 = registry.register("a2", "alice");
        let mut rx_b1 = registry.register("b1", "bob");

        let msg = ServerMessage::Content {
            content: "alice's note".to_string(),
        };
        let delivered = registry.broadcast("alice", "a1", &msg);

        // Only alice's other session hears about it
        assert_eq!(delivered, 1);
        assert!(rx_a1.try_recv().is_err());
        assert!(rx_a2.try_recv().is_ok());
        assert!(rx_b1.try_recv().is_err());
    }

    #[test]
    fn test_unregistered_session_gets_no_broadcasts() {
        let registry = SessionRegistry::new();
        let _rx1 = registry.register("s1", "alice");
        let mut rx2 = registry.register("s2", "alice");

        let removed = registry.unregister("s2");
        assert_eq!(removed.map(|info| info.owner_id), Some("alice".to_string()));
        assert_eq!(registry.connection_count(), 1);

        let msg = ServerMessage::Content {
            content: "late".to_string(),
        };
        let delivered = registry.broadcast("alice", "s1", &msg);

        assert_eq!(delivered, 0);
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn test_unregister_unknown_session_is_noop() {
        let registry = SessionRegistry::new();
        let _rx = registry.register("s1", "alice");

        assert!(registry.unregister("never-registered").is_none());
        assert!(registry.unregister("never-registered").is_none());

        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn test_owner_session_count_tracks_group() {
        let registry = SessionRegistry::new();
        let _rx_a1 = registry.register("a1", "alice");
        let _rx_a2 = registry.register("a2", "alice");
        let _rx_b1 = registry.register("b1", "bob");

        assert_eq!(registry.owner_session_count("alice"), 2);
        assert_eq!(registry.owner_session_count("bob"), 1);
        assert_eq!(registry.owner_session_count("carol"), 0);

        registry.unregister("a1");
        assert_eq!(registry.owner_session_count("alice"), 1);

        registry.unregister("a2");
        assert_eq!(registry.owner_session_count("alice"), 0);
    }

    #[test]
    fn test_dropped_receiver_not_counted_as_delivered() {
        let registry = SessionRegistry::new();
        let _rx1 = registry.register("s1", "alice");
        let rx2 = registry.register("s2", "alice");
        drop(rx2);

        let msg = ServerMessage::Pong {
            date: "now".to_string(),
        };
        let delivered = registry.broadcast("alice", "s1", &msg);

        assert_eq!(delivered, 0);
    }
}
