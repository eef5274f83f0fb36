use serde::{Deserialize, Serialize};

use crate::room::models::{Participant, ParticipantRole, Room};

/// Events that can occur in the room core
///
/// Events represent facts about mutations that have already happened.
/// They are published by the room store and fanned out to observers
/// without coupling the store to any of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A room came into existence
    RoomCreated { room: Room },

    /// A room was deleted by one of its admins
    RoomDeleted { room_id: String, deleted_by: String },

    /// A user joined a room
    UserJoinedRoom {
        room_id: String,
        participant: Participant,
    },

    /// A user left a room
    UserLeftRoom {
        room_id: String,
        participant: Participant,
    },

    /// A room admin changed another participant's role
    UserRoleUpdated {
        room_id: String,
        user_id: String,
        new_role: ParticipantRole,
        updated_by: String,
    },
}

/// Channel key for subscriptions, one per event variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    RoomCreated,
    RoomDeleted,
    UserJoinedRoom,
    UserLeftRoom,
    UserRoleUpdated,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::RoomCreated => "roomCreated",
            EventKind::RoomDeleted => "roomDeleted",
            EventKind::UserJoinedRoom => "userJoinedRoom",
            EventKind::UserLeftRoom => "userLeftRoom",
            EventKind::UserRoleUpdated => "userRoleUpdated",
        }
    }
}

impl DomainEvent {
    /// The subscription channel this event belongs to
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::RoomCreated { .. } => EventKind::RoomCreated,
            DomainEvent::RoomDeleted { .. } => EventKind::RoomDeleted,
            DomainEvent::UserJoinedRoom { .. } => EventKind::UserJoinedRoom,
            DomainEvent::UserLeftRoom { .. } => EventKind::UserLeftRoom,
            DomainEvent::UserRoleUpdated { .. } => EventKind::UserRoleUpdated,
        }
    }

    /// Room the event concerns. Every event in this core is room-specific.
    pub fn room_id(&self) -> &str {
        match self {
            DomainEvent::RoomCreated { room } => &room.id,
            DomainEvent::RoomDeleted { room_id, .. } => room_id,
            DomainEvent::UserJoinedRoom { room_id, .. } => room_id,
            DomainEvent::UserLeftRoom { room_id, .. } => room_id,
            DomainEvent::UserRoleUpdated { room_id, .. } => room_id,
        }
    }
}
