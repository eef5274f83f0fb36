use std::sync::Arc;

use roomcast::observer::{EventBus, MetricsObserver};
use roomcast::presence::PresenceRegistry;
use roomcast::room::RoomStore;
use roomcast::session::{ClientIntent, SessionRouter};
use roomcast::websockets::ConnectionManager;

use super::mocks::MockConnectionManager;

// ============================================================================
// Test Setup
// ============================================================================

pub struct TestSetup {
    pub router: Arc<SessionRouter>,
    pub rooms: Arc<RoomStore>,
    pub presence: Arc<PresenceRegistry>,
    pub connections: MockConnectionManager,
    pub metrics: Arc<MetricsObserver>,
}

impl TestSetup {
    /// Registers a connection with the mock transport
    pub async fn connect(&self, connection_id: &str) {
        self.connections.add_connected(connection_id).await;
    }

    pub async fn authenticate(&self, connection_id: &str, user_id: &str, user_name: &str) {
        self.connect(connection_id).await;
        self.router
            .handle_intent(
                connection_id,
                ClientIntent::Authenticate {
                    user_id: user_id.to_string(),
                    user_name: user_name.to_string(),
                },
            )
            .await;
    }

    pub async fn join_chat(&self, connection_id: &str, chat_id: &str) {
        self.router
            .handle_intent(
                connection_id,
                ClientIntent::JoinChat {
                    chat_id: chat_id.to_string(),
                },
            )
            .await;
    }

    pub async fn join_room(&self, connection_id: &str, room_id: &str) {
        self.router
            .handle_intent(
                connection_id,
                ClientIntent::JoinRoom {
                    room_id: room_id.to_string(),
                    role: None,
                },
            )
            .await;
    }

    /// Events captured for a connection, parsed and filtered by wire tag
    pub async fn events_of_type(&self, connection_id: &str, tag: &str) -> Vec<serde_json::Value> {
        self.connections
            .json_messages_for(connection_id)
            .await
            .into_iter()
            .filter(|v| v["type"] == tag)
            .collect()
    }
}

#[derive(Default)]
pub struct TestSetupBuilder {
    seed_rooms: bool,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed_rooms(mut self) -> Self {
        self.seed_rooms = true;
        self
    }

    pub fn build(self) -> TestSetup {
        let event_bus = EventBus::new();
        let metrics = Arc::new(MetricsObserver::new());
        event_bus.subscribe(None, metrics.clone());

        let rooms = Arc::new(RoomStore::new(event_bus));
        if self.seed_rooms {
            rooms.seed_default_rooms();
        }

        let presence = Arc::new(PresenceRegistry::new());
        let connections = MockConnectionManager::new();
        let router = Arc::new(SessionRouter::new(
            presence.clone(),
            rooms.clone(),
            Arc::new(connections.clone()) as Arc<dyn ConnectionManager>,
        ));

        TestSetup {
            router,
            rooms,
            presence,
            connections,
            metrics,
        }
    }
}
