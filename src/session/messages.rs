use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::presence::PresenceEntry;
use crate::room::models::{ParticipantRole, Room};
use crate::room::{ParticipantsPage, RoomStats};

/// Inbound client intents.
///
/// The `type` tags and field names are the wire contract and must not
/// change. Each intent carries a statically checked payload shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientIntent {
    Authenticate {
        user_id: String,
        user_name: String,
    },
    JoinChat {
        chat_id: String,
    },
    LeaveChat {
        chat_id: String,
    },
    SendMessage {
        chat_id: String,
        text: String,
    },
    Typing {
        chat_id: String,
        is_typing: bool,
    },
    GetRooms,
    JoinRoom {
        room_id: String,
        role: Option<ParticipantRole>,
    },
    LeaveRoom {
        room_id: String,
    },
    GetRoomParticipants {
        room_id: String,
        page: Option<usize>,
        page_size: Option<usize>,
    },
    SearchRooms {
        query: String,
    },
    GetRoomStats {
        room_id: String,
    },
}

/// A message delivered to a chat channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub sender_id: String,
    pub sender_name: String,
    pub timestamp: DateTime<Utc>,
    pub chat_id: String,
}

/// Typing-state change in a chat channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypingEvent {
    pub user_id: String,
    pub user_name: String,
    pub chat_id: String,
    pub is_typing: bool,
}

/// One entry of the broadcast presence roster
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUser {
    pub id: String,
    pub name: String,
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
}

impl From<PresenceEntry> for OnlineUser {
    fn from(entry: PresenceEntry) -> Self {
        Self {
            id: entry.user_id,
            name: entry.display_name,
            is_online: true,
            last_seen: entry.last_seen,
        }
    }
}

/// Identity payload attached to room join/leave notifications
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomUser {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<ParticipantRole>,
}

/// Outbound server events; tags and field names mirror the wire contract
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    UserStatus {
        users: Vec<OnlineUser>,
    },
    Message(ChatMessage),
    Typing(TypingEvent),
    RoomsList {
        public: Vec<Room>,
        user: Vec<Room>,
    },
    RoomJoined {
        room_id: String,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    RoomLeft {
        room_id: String,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    UserJoinedRoom {
        room_id: String,
        user: RoomUser,
    },
    UserLeftRoom {
        room_id: String,
        user: RoomUser,
    },
    RoomParticipants(ParticipantsPage),
    RoomsSearchResult {
        query: String,
        rooms: Vec<Room>,
    },
    RoomStats {
        room_id: String,
        stats: RoomStats,
    },
}

impl ServerEvent {
    pub fn room_joined_ok(room_id: String) -> Self {
        ServerEvent::RoomJoined {
            room_id,
            success: true,
            error: None,
        }
    }

    pub fn room_joined_failed(room_id: String, error: impl Into<String>) -> Self {
        ServerEvent::RoomJoined {
            room_id,
            success: false,
            error: Some(error.into()),
        }
    }

    pub fn room_left_ok(room_id: String) -> Self {
        ServerEvent::RoomLeft {
            room_id,
            success: true,
            error: None,
        }
    }

    pub fn room_left_failed(room_id: String, error: impl Into<String>) -> Self {
        ServerEvent::RoomLeft {
            room_id,
            success: false,
            error: Some(error.into()),
        }
    }
}

impl ChatMessage {
    /// Builds a chat message with a collision-resistant id and the
    /// current timestamp
    pub fn new(chat_id: String, text: String, sender_id: String, sender_name: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text,
            sender_id,
            sender_name,
            timestamp: Utc::now(),
            chat_id,
        }
    }
}
