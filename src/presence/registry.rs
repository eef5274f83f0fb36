use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq)]
pub enum PresenceError {
    #[error("connection {connection_id} is already bound to user {bound_user_id}")]
    DuplicateAuth {
        connection_id: String,
        bound_user_id: String,
    },
}

/// Identity a connection authenticated as
#[derive(Debug, Clone, PartialEq)]
pub struct BoundUser {
    pub user_id: String,
    pub display_name: String,
}

/// Snapshot of one online user for presence broadcasts
#[derive(Debug, Clone)]
pub struct PresenceEntry {
    pub user_id: String,
    pub display_name: String,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct ConnectionState {
    user_id: String,
    display_name: String,
    current_chat: Option<String>,
    connected_at: DateTime<Utc>,
}

/// Maps live connections to authenticated identities and their
/// current-chat slot. Exclusive owner of that mapping; all access goes
/// through one lock.
#[derive(Default)]
pub struct PresenceRegistry {
    connections: RwLock<HashMap<String, ConnectionState>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a connection to an identity. Rebinding with the same user id
    /// is a no-op; rebinding with a different one fails.
    pub fn authenticate(
        &self,
        connection_id: &str,
        user_id: &str,
        display_name: &str,
    ) -> Result<(), PresenceError> {
        let mut connections = self.connections.write().unwrap();

        if let Some(existing) = connections.get(connection_id) {
            if existing.user_id != user_id {
                return Err(PresenceError::DuplicateAuth {
                    connection_id: connection_id.to_string(),
                    bound_user_id: existing.user_id.clone(),
                });
            }
            debug!(
                connection_id = %connection_id,
                user_id = %user_id,
                "Re-authentication with same identity ignored"
            );
            return Ok(());
        }

        connections.insert(
            connection_id.to_string(),
            ConnectionState {
                user_id: user_id.to_string(),
                display_name: display_name.to_string(),
                current_chat: None,
                connected_at: Utc::now(),
            },
        );

        info!(
            connection_id = %connection_id,
            user_id = %user_id,
            display_name = %display_name,
            "Connection authenticated"
        );
        Ok(())
    }

    pub fn lookup(&self, connection_id: &str) -> Option<BoundUser> {
        let connections = self.connections.read().unwrap();
        connections.get(connection_id).map(|c| BoundUser {
            user_id: c.user_id.clone(),
            display_name: c.display_name.clone(),
        })
    }

    pub fn current_chat(&self, connection_id: &str) -> Option<String> {
        let connections = self.connections.read().unwrap();
        connections
            .get(connection_id)
            .and_then(|c| c.current_chat.clone())
    }

    pub fn set_current_chat(&self, connection_id: &str, chat_id: Option<String>) {
        let mut connections = self.connections.write().unwrap();
        if let Some(state) = connections.get_mut(connection_id) {
            state.current_chat = chat_id;
        }
    }

    /// Clears all state for the connection and returns the identity it was
    /// bound to, so the caller can drive the remaining cleanup
    pub fn disconnect(&self, connection_id: &str) -> Option<BoundUser> {
        let mut connections = self.connections.write().unwrap();
        let removed = connections.remove(connection_id);

        if let Some(state) = &removed {
            info!(
                connection_id = %connection_id,
                user_id = %state.user_id,
                "Connection removed from presence"
            );
        }

        removed.map(|c| BoundUser {
            user_id: c.user_id,
            display_name: c.display_name,
        })
    }

    /// Roster of everyone currently online
    pub fn online_users(&self) -> Vec<PresenceEntry> {
        let connections = self.connections.read().unwrap();
        connections
            .values()
            .map(|c| PresenceEntry {
                user_id: c.user_id.clone(),
                display_name: c.display_name.clone(),
                last_seen: c.connected_at,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticate_and_lookup() {
        let registry = PresenceRegistry::new();

        registry.authenticate("conn-1", "u1", "Alice").unwrap();

        let bound = registry.lookup("conn-1").unwrap();
        assert_eq!(bound.user_id, "u1");
        assert_eq!(bound.display_name, "Alice");
        assert!(registry.lookup("conn-2").is_none());
    }

    #[test]
    fn test_same_identity_rebind_is_noop() {
        let registry = PresenceRegistry::new();

        registry.authenticate("conn-1", "u1", "Alice").unwrap();
        assert!(registry.authenticate("conn-1", "u1", "Alice").is_ok());
    }

    #[test]
    fn test_different_identity_rebind_fails() {
        let registry = PresenceRegistry::new();

        registry.authenticate("conn-1", "u1", "Alice").unwrap();
        let err = registry.authenticate("conn-1", "u2", "Bob").unwrap_err();

        assert_eq!(
            err,
            PresenceError::DuplicateAuth {
                connection_id: "conn-1".to_string(),
                bound_user_id: "u1".to_string(),
            }
        );
        // Original binding is untouched.
        assert_eq!(registry.lookup("conn-1").unwrap().user_id, "u1");
    }

    #[test]
    fn test_current_chat_slot() {
        let registry = PresenceRegistry::new();
        registry.authenticate("conn-1", "u1", "Alice").unwrap();

        assert_eq!(registry.current_chat("conn-1"), None);

        registry.set_current_chat("conn-1", Some("chat-1".to_string()));
        assert_eq!(registry.current_chat("conn-1"), Some("chat-1".to_string()));

        registry.set_current_chat("conn-1", None);
        assert_eq!(registry.current_chat("conn-1"), None);
    }

    #[test]
    fn test_disconnect_returns_bound_user() {
        let registry = PresenceRegistry::new();
        registry.authenticate("conn-1", "u1", "Alice").unwrap();

        let bound = registry.disconnect("conn-1").unwrap();
        assert_eq!(bound.user_id, "u1");

        assert!(registry.lookup("conn-1").is_none());
        assert!(registry.disconnect("conn-1").is_none());
    }

    #[test]
    fn test_online_users_roster() {
        let registry = PresenceRegistry::new();
        registry.authenticate("conn-1", "u1", "Alice").unwrap();
        registry.authenticate("conn-2", "u2", "Bob").unwrap();

        let mut ids: Vec<String> = registry
            .online_users()
            .into_iter()
            .map(|e| e.user_id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["u1", "u2"]);

        registry.disconnect("conn-1");
        assert_eq!(registry.online_users().len(), 1);
    }
}
