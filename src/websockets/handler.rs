use async_trait::async_trait;
use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::session::{ClientIntent, SessionRouter};
use crate::shared::AppState;

use super::socket::{Connection, MessageHandler};

/// Parses inbound frames into client intents and forwards them to the
/// session router. Malformed frames are logged and dropped; the
/// connection stays up.
pub struct RouterMessageHandler {
    router: Arc<SessionRouter>,
}

impl RouterMessageHandler {
    pub fn new(router: Arc<SessionRouter>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl MessageHandler for RouterMessageHandler {
    async fn handle_message(&self, connection_id: &str, message: String) {
        match serde_json::from_str::<ClientIntent>(&message) {
            Ok(intent) => {
                self.router.handle_intent(connection_id, intent).await;
            }
            Err(e) => {
                warn!(
                    connection_id = %connection_id,
                    error = %e,
                    "Failed to parse client intent"
                );
            }
        }
    }
}

/// WebSocket endpoint: GET /ws
///
/// The upgrade is anonymous; identity arrives in-band through the
/// `authenticate` intent.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(app_state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_websocket_connection(socket, app_state))
}

/// Handle the upgraded WebSocket connection
async fn handle_websocket_connection(socket: axum::extract::ws::WebSocket, app_state: AppState) {
    let connection_id = Uuid::new_v4().to_string();

    info!(
        connection_id = %connection_id,
        "WebSocket connection established"
    );

    // Create the outbound channel (app -> client)
    let (outbound_sender, outbound_receiver) = mpsc::unbounded_channel::<String>();

    app_state
        .connections
        .add_connection(connection_id.clone(), outbound_sender)
        .await;

    let message_handler = Arc::new(RouterMessageHandler::new(app_state.router.clone()));

    let connection = Connection::new(
        connection_id.clone(),
        Box::new(socket),
        outbound_receiver,
        message_handler,
    );

    // Run the connection until disconnect
    match connection.run().await {
        Ok(()) => {
            info!(
                connection_id = %connection_id,
                "WebSocket connection closed cleanly"
            );
        }
        Err(e) => {
            warn!(
                connection_id = %connection_id,
                error = %e,
                "WebSocket connection error"
            );
        }
    }

    // Cleanup: unregister the transport, then drive session cleanup
    // (chat/room channels, presence, status broadcast).
    app_state
        .connections
        .remove_connection(&connection_id)
        .await;
    app_state.router.handle_disconnect(&connection_id).await;
}
