use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use roomcast::websockets::ConnectionManager;

// ============================================================================
// Mock Infrastructure
// ============================================================================

#[derive(Clone, Default)]
pub struct MockConnectionManager {
    sent_messages: Arc<RwLock<HashMap<String, Vec<String>>>>,
    connected: Arc<RwLock<Vec<String>>>,
}

impl MockConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_connected(&self, connection_id: &str) {
        self.connected.write().await.push(connection_id.to_string());
    }

    pub async fn messages_for(&self, connection_id: &str) -> Vec<String> {
        self.sent_messages
            .read()
            .await
            .get(connection_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Sent messages parsed as JSON values
    pub async fn json_messages_for(&self, connection_id: &str) -> Vec<serde_json::Value> {
        self.messages_for(connection_id)
            .await
            .iter()
            .map(|m| serde_json::from_str(m).expect("mock captured invalid JSON"))
            .collect()
    }

    pub async fn clear_messages(&self) {
        self.sent_messages.write().await.clear();
    }
}

#[async_trait]
impl ConnectionManager for MockConnectionManager {
    async fn add_connection(&self, connection_id: String, _sender: mpsc::UnboundedSender<String>) {
        self.add_connected(&connection_id).await;
    }

    async fn remove_connection(&self, connection_id: &str) {
        self.connected
            .write()
            .await
            .retain(|c| c != connection_id);
    }

    async fn send_to(&self, connection_id: &str, message: &str) {
        self.sent_messages
            .write()
            .await
            .entry(connection_id.to_string())
            .or_default()
            .push(message.to_string());
    }

    async fn send_to_many(&self, connection_ids: &[String], message: &str) {
        for connection_id in connection_ids {
            self.send_to(connection_id, message).await;
        }
    }

    async fn broadcast(&self, message: &str) {
        let connected = self.connected.read().await.clone();
        for connection_id in &connected {
            self.send_to(connection_id, message).await;
        }
    }
}
