use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::messages::{ChatMessage, ClientIntent, OnlineUser, RoomUser, ServerEvent, TypingEvent};
use crate::presence::{BoundUser, PresenceRegistry};
use crate::room::models::ParticipantRole;
use crate::room::RoomStore;
use crate::websockets::ConnectionManager;

const DEFAULT_PARTICIPANTS_PAGE_SIZE: usize = 20;

/// Per-connection protocol handler.
///
/// Translates inbound intents into presence/store operations and fans the
/// results back out to the right connection sets: the requester, a chat
/// channel, a room channel, or everyone. Owns the chat and room channel
/// maps (connection ids per channel); room *membership* lives in the
/// store, channels only describe where frames get delivered.
pub struct SessionRouter {
    presence: Arc<PresenceRegistry>,
    rooms: Arc<RoomStore>,
    connections: Arc<dyn ConnectionManager>,
    // chat id -> connection ids
    chat_channels: RwLock<HashMap<String, HashSet<String>>>,
    // room id -> connection ids
    room_channels: RwLock<HashMap<String, HashSet<String>>>,
}

impl SessionRouter {
    pub fn new(
        presence: Arc<PresenceRegistry>,
        rooms: Arc<RoomStore>,
        connections: Arc<dyn ConnectionManager>,
    ) -> Self {
        Self {
            presence,
            rooms,
            connections,
            chat_channels: RwLock::new(HashMap::new()),
            room_channels: RwLock::new(HashMap::new()),
        }
    }

    /// Entry point for one inbound intent from one connection
    pub async fn handle_intent(&self, connection_id: &str, intent: ClientIntent) {
        match intent {
            ClientIntent::Authenticate { user_id, user_name } => {
                self.handle_authenticate(connection_id, user_id, user_name)
                    .await;
            }
            ClientIntent::JoinChat { chat_id } => {
                self.handle_join_chat(connection_id, chat_id).await;
            }
            ClientIntent::LeaveChat { chat_id } => {
                self.handle_leave_chat(connection_id, chat_id).await;
            }
            ClientIntent::SendMessage { chat_id, text } => {
                self.handle_send_message(connection_id, chat_id, text).await;
            }
            ClientIntent::Typing { chat_id, is_typing } => {
                self.handle_typing(connection_id, chat_id, is_typing).await;
            }
            ClientIntent::GetRooms => {
                self.handle_get_rooms(connection_id).await;
            }
            ClientIntent::JoinRoom { room_id, role } => {
                self.handle_join_room(connection_id, room_id, role).await;
            }
            ClientIntent::LeaveRoom { room_id } => {
                self.handle_leave_room(connection_id, room_id).await;
            }
            ClientIntent::GetRoomParticipants {
                room_id,
                page,
                page_size,
            } => {
                self.handle_get_room_participants(connection_id, room_id, page, page_size)
                    .await;
            }
            ClientIntent::SearchRooms { query } => {
                self.handle_search_rooms(connection_id, query).await;
            }
            ClientIntent::GetRoomStats { room_id } => {
                self.handle_get_room_stats(connection_id, room_id).await;
            }
        }
    }

    async fn handle_authenticate(&self, connection_id: &str, user_id: String, user_name: String) {
        if let Err(e) = self
            .presence
            .authenticate(connection_id, &user_id, &user_name)
        {
            warn!(
                connection_id = %connection_id,
                error = %e,
                "Authentication rejected"
            );
            return;
        }

        self.broadcast_user_status().await;
    }

    async fn handle_join_chat(&self, connection_id: &str, chat_id: String) {
        let user = match self.authenticated(connection_id, "joinChat") {
            Some(user) => user,
            None => return,
        };

        // One current chat per connection; leave the previous one first.
        if let Some(previous) = self.presence.current_chat(connection_id) {
            self.handle_leave_chat(connection_id, previous).await;
        }

        {
            let mut channels = self.chat_channels.write().await;
            channels
                .entry(chat_id.clone())
                .or_default()
                .insert(connection_id.to_string());
        }
        self.presence
            .set_current_chat(connection_id, Some(chat_id.clone()));

        info!(
            connection_id = %connection_id,
            user_id = %user.user_id,
            chat_id = %chat_id,
            "Joined chat"
        );
    }

    async fn handle_leave_chat(&self, connection_id: &str, chat_id: String) {
        if self.authenticated(connection_id, "leaveChat").is_none() {
            return;
        }

        {
            let mut channels = self.chat_channels.write().await;
            if let Some(members) = channels.get_mut(&chat_id) {
                members.remove(connection_id);
                if members.is_empty() {
                    channels.remove(&chat_id);
                }
            }
        }
        self.presence.set_current_chat(connection_id, None);

        debug!(connection_id = %connection_id, chat_id = %chat_id, "Left chat");
    }

    async fn handle_send_message(&self, connection_id: &str, chat_id: String, text: String) {
        let user = match self.authenticated(connection_id, "sendMessage") {
            Some(user) => user,
            None => return,
        };

        let message = ChatMessage::new(
            chat_id.clone(),
            text,
            user.user_id.clone(),
            user.display_name.clone(),
        );

        // Every member of the chat channel gets the message, sender included.
        let recipients = self.chat_channel_members(&chat_id, None).await;
        self.send_to_many(&recipients, &ServerEvent::Message(message))
            .await;

        debug!(
            chat_id = %chat_id,
            sender = %user.user_id,
            recipients = recipients.len(),
            "Chat message delivered"
        );
    }

    async fn handle_typing(&self, connection_id: &str, chat_id: String, is_typing: bool) {
        let user = match self.authenticated(connection_id, "typing") {
            Some(user) => user,
            None => return,
        };

        let event = ServerEvent::Typing(TypingEvent {
            user_id: user.user_id,
            user_name: user.display_name,
            chat_id: chat_id.clone(),
            is_typing,
        });

        // The sender already knows they are typing.
        let recipients = self.chat_channel_members(&chat_id, Some(connection_id)).await;
        self.send_to_many(&recipients, &event).await;
    }

    async fn handle_get_rooms(&self, connection_id: &str) {
        let user = match self.authenticated(connection_id, "getRooms") {
            Some(user) => user,
            None => return,
        };

        let event = ServerEvent::RoomsList {
            public: self.rooms.public_rooms(),
            user: self.rooms.user_rooms(&user.user_id),
        };
        self.send_to(connection_id, &event).await;
    }

    async fn handle_join_room(
        &self,
        connection_id: &str,
        room_id: String,
        role: Option<ParticipantRole>,
    ) {
        let user = match self.presence.lookup(connection_id) {
            Some(user) => user,
            None => {
                self.send_to(
                    connection_id,
                    &ServerEvent::room_joined_failed(room_id, "Not authenticated"),
                )
                .await;
                return;
            }
        };

        let role = role.unwrap_or_default();

        // The channel lock is held across the store call and the sends so
        // recipients observe join/leave for the same user in mutation
        // order.
        let mut channels = self.room_channels.write().await;
        let joined = self
            .rooms
            .join_room(&room_id, &user.user_id, &user.display_name, role);

        if !joined {
            drop(channels);
            self.send_to(
                connection_id,
                &ServerEvent::room_joined_failed(room_id, "Failed to join room"),
            )
            .await;
            return;
        }

        channels
            .entry(room_id.clone())
            .or_default()
            .insert(connection_id.to_string());
        let others: Vec<String> = channels
            .get(&room_id)
            .into_iter()
            .flatten()
            .filter(|id| id.as_str() != connection_id)
            .cloned()
            .collect();

        self.send_to(connection_id, &ServerEvent::room_joined_ok(room_id.clone()))
            .await;

        let notification = ServerEvent::UserJoinedRoom {
            room_id,
            user: RoomUser {
                id: user.user_id,
                name: user.display_name,
                role: Some(role),
            },
        };
        self.send_to_many(&others, &notification).await;
    }

    async fn handle_leave_room(&self, connection_id: &str, room_id: String) {
        let user = match self.presence.lookup(connection_id) {
            Some(user) => user,
            None => {
                self.send_to(
                    connection_id,
                    &ServerEvent::room_left_failed(room_id, "Not authenticated"),
                )
                .await;
                return;
            }
        };

        // Same ordered unit as join: store call and sends under the
        // channel lock.
        let mut channels = self.room_channels.write().await;
        let left = self.rooms.leave_room(&room_id, &user.user_id);

        if !left {
            drop(channels);
            self.send_to(
                connection_id,
                &ServerEvent::room_left_failed(room_id, "Failed to leave room"),
            )
            .await;
            return;
        }

        if let Some(members) = channels.get_mut(&room_id) {
            members.remove(connection_id);
            if members.is_empty() {
                channels.remove(&room_id);
            }
        }
        let others: Vec<String> = channels
            .get(&room_id)
            .into_iter()
            .flatten()
            .filter(|id| id.as_str() != connection_id)
            .cloned()
            .collect();

        self.send_to(connection_id, &ServerEvent::room_left_ok(room_id.clone()))
            .await;

        let notification = ServerEvent::UserLeftRoom {
            room_id,
            user: RoomUser {
                id: user.user_id,
                name: user.display_name,
                role: None,
            },
        };
        self.send_to_many(&others, &notification).await;
    }

    async fn handle_get_room_participants(
        &self,
        connection_id: &str,
        room_id: String,
        page: Option<usize>,
        page_size: Option<usize>,
    ) {
        let page = self.rooms.participants_page(
            &room_id,
            page.unwrap_or(0),
            page_size.unwrap_or(DEFAULT_PARTICIPANTS_PAGE_SIZE),
        );
        self.send_to(connection_id, &ServerEvent::RoomParticipants(page))
            .await;
    }

    async fn handle_search_rooms(&self, connection_id: &str, query: String) {
        let user = self.presence.lookup(connection_id);
        let rooms = self
            .rooms
            .search_rooms(&query, user.as_ref().map(|u| u.user_id.as_str()));

        self.send_to(
            connection_id,
            &ServerEvent::RoomsSearchResult { query, rooms },
        )
        .await;
    }

    async fn handle_get_room_stats(&self, connection_id: &str, room_id: String) {
        let stats = self.rooms.room_stats(&room_id);
        self.send_to(connection_id, &ServerEvent::RoomStats { room_id, stats })
            .await;
    }

    /// Full cleanup for a closed connection.
    ///
    /// Chat and room *channels* are cleared synchronously here; room
    /// *membership* in the store is deliberately retained so a user can
    /// reconnect into their rooms.
    pub async fn handle_disconnect(&self, connection_id: &str) {
        {
            let mut channels = self.chat_channels.write().await;
            channels.retain(|_, members| {
                members.remove(connection_id);
                !members.is_empty()
            });
        }
        {
            let mut channels = self.room_channels.write().await;
            channels.retain(|_, members| {
                members.remove(connection_id);
                !members.is_empty()
            });
        }

        if let Some(user) = self.presence.disconnect(connection_id) {
            info!(
                connection_id = %connection_id,
                user_id = %user.user_id,
                "Session closed"
            );
            self.broadcast_user_status().await;
        }
    }

    /// Presence roster pushed to every connection
    async fn broadcast_user_status(&self) {
        let users: Vec<OnlineUser> = self
            .presence
            .online_users()
            .into_iter()
            .map(OnlineUser::from)
            .collect();

        if let Ok(json) = serde_json::to_string(&ServerEvent::UserStatus { users }) {
            self.connections.broadcast(&json).await;
        }
    }

    fn authenticated(&self, connection_id: &str, intent: &'static str) -> Option<BoundUser> {
        let user = self.presence.lookup(connection_id);
        if user.is_none() {
            warn!(
                connection_id = %connection_id,
                intent = intent,
                "Intent from unauthenticated connection dropped"
            );
        }
        user
    }

    async fn chat_channel_members(&self, chat_id: &str, except: Option<&str>) -> Vec<String> {
        let channels = self.chat_channels.read().await;
        channels
            .get(chat_id)
            .into_iter()
            .flatten()
            .filter(|id| Some(id.as_str()) != except)
            .cloned()
            .collect()
    }

    async fn send_to(&self, connection_id: &str, event: &ServerEvent) {
        match serde_json::to_string(event) {
            Ok(json) => self.connections.send_to(connection_id, &json).await,
            Err(e) => warn!(error = %e, "Failed to serialize server event"),
        }
    }

    async fn send_to_many(&self, connection_ids: &[String], event: &ServerEvent) {
        match serde_json::to_string(event) {
            Ok(json) => self.connections.send_to_many(connection_ids, &json).await,
            Err(e) => warn!(error = %e, "Failed to serialize server event"),
        }
    }
}
