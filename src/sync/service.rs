//! Owner-document synchronization over live sessions.
//!
//! Each connection walks a simple lifecycle: it registers with the session
//! registry, receives the owner's stored note once, then loops on edit
//! messages until the transport drops. Edits are last-write-wins: the whole
//! document text is cached, saved and fanned out to the owner's other
//! sessions on every message.

use chrono::Utc;
use dashmap::DashMap;
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::db::dbnotes::NoteStore;
use crate::models::messages::ServerMessage;
use crate::sync::registry::SessionRegistry;

/// Coordinates the session registry, the note store and the per-owner
/// content cache.
pub struct SyncService {
    registry: SessionRegistry,
    store: Arc<dyn NoteStore>,
    /// Last content written per owner in this process. Not authoritative,
    /// the store is. Feeds the status endpoint's cached-owner gauge.
    content_cache: Cache<String, String>,
    /// Per-owner guard so concurrent edits for one owner save in order.
    /// Entries live only while the owner has sessions connected.
    write_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SyncService {
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self {
            registry: SessionRegistry::new(),
            store,
            content_cache: Cache::builder()
                .max_capacity(100_000)
                .time_to_idle(Duration::from_secs(60 * 60))
                .build(),
            write_locks: DashMap::new(),
        }
    }

    /// Bring a new session online.
    ///
    /// Registers the session, then looks up the owner's stored note. Returns
    /// the session's message receiver together with the initial content push,
    /// if the owner has anything stored. A failed lookup is logged and the
    /// session proceeds without an initial push.
    pub async fn handle_connect(
        &self,
        session_id: &str,
        owner_id: &str,
    ) -> (UnboundedReceiver<ServerMessage>, Option<ServerMessage>) {
        // Register before the lookup so edits broadcast while the fetch is
        // in flight queue up behind the initial push
        let receiver = self.registry.register(session_id, owner_id);

        let initial = match self.store.find_by_owner(owner_id).await {
            Ok(Some(note)) => {
                info!(
                    "Found stored note for owner '{}', sending to session {}",
                    owner_id, session_id
                );
                Some(ServerMessage::Content {
                    content: note.content,
                })
            }
            Ok(None) => {
                info!("No stored note for owner '{}'", owner_id);
                None
            }
            Err(e) => {
                error!("Error retrieving note for owner '{}': {}", owner_id, e);
                None
            }
        };

        (receiver, initial)
    }

    /// Apply one edit: cache it, save it, fan it out.
    ///
    /// Returns the reply owed to the sending session, if any. Missing or
    /// empty content is a silent no-op. An edit without an owner id is
    /// rejected with an error reply and neither saved nor broadcast. A
    /// failed save is reported to the sender but the broadcast still goes
    /// out, live sessions track the latest content even when the store
    /// write did not stick.
    pub async fn handle_edit(
        &self,
        session_id: &str,
        owner_id: &str,
        content: Option<String>,
    ) -> Option<ServerMessage> {
        let content = match content {
            Some(c) if !c.is_empty() => c,
            _ => return None,
        };

        if owner_id.is_empty() {
            error!("Session {} sent an update without an owner id", session_id);
            return Some(ServerMessage::Error {
                message: "Owner ID is required".to_string(),
            });
        }

        // Serialize cache update, save and broadcast per owner so two
        // sessions editing at once resolve last-write-wins
        let lock = self
            .write_locks
            .entry(owner_id.to_string())
            .or_default()
            .clone();
        let _guard = lock.lock().await;

        self.content_cache
            .insert(owner_id.to_string(), content.clone());

        let reply = match self.store.upsert(owner_id, &content).await {
            Ok(note) => {
                debug!(
                    "Saved note for owner '{}' ({} bytes)",
                    owner_id,
                    note.content.len()
                );
                None
            }
            Err(e) => {
                error!("Error saving note for owner '{}': {}", owner_id, e);
                Some(ServerMessage::Error {
                    message: format!("Failed to save content to database: {}", e),
                })
            }
        };

        // The broadcast is not gated on the save succeeding
        let delivered = self.registry.broadcast(
            owner_id,
            session_id,
            &ServerMessage::Content { content },
        );
        debug!(
            "Broadcast content for owner '{}' to {} sessions",
            owner_id, delivered
        );

        reply
    }

    /// Reply with the current server time
    pub fn handle_ping(&self) -> ServerMessage {
        ServerMessage::Pong {
            date: Utc::now().to_rfc3339(),
        }
    }

    /// Take a session offline. Safe to call more than once. When the
    /// owner's last session goes, the owner's write lock goes with it.
    pub fn handle_disconnect(&self, session_id: &str) {
        if let Some(info) = self.registry.unregister(session_id) {
            if self.registry.owner_session_count(&info.owner_id) == 0 {
                self.write_locks.remove(&info.owner_id);
            }
        }
    }

    /// Live sessions across all owners
    pub fn connection_count(&self) -> usize {
        self.registry.connection_count()
    }

    /// Owners with content cached in this process
    pub fn cached_owner_count(&self) -> u64 {
        self.content_cache.entry_count()
    }
}
