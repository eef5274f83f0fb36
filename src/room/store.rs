use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::models::{Participant, ParticipantRole, Room, RoomSpec, RoomType};
use super::types::{ParticipantsPage, RoomStats};
use crate::observer::{DomainEvent, EventBus};

/// Rooms and the user→rooms reverse index live under one lock so they
/// mutate as a single atomic unit.
#[derive(Default)]
struct StoreState {
    rooms: HashMap<String, Room>,
    user_rooms: HashMap<String, HashSet<String>>,
}

/// Exclusive owner of room lifecycle, membership, and per-room roles.
///
/// Business-rule violations (absent room, capacity, missing permission,
/// duplicate membership) come back as `false`/`None`, never as errors;
/// callers translate them into reply payloads. Every successful mutation
/// publishes a [`DomainEvent`] while the state lock is still held, so
/// observers see events in mutation order. Observers must not call back
/// into the store.
pub struct RoomStore {
    state: Mutex<StoreState>,
    event_bus: EventBus,
}

impl RoomStore {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            event_bus,
        }
    }

    /// Creates the venues every deployment starts with
    pub fn seed_default_rooms(&self) {
        self.create_room(RoomSpec {
            id: Some("general".to_string()),
            name: Some("General".to_string()),
            description: Some("Main room for everyone".to_string()),
            room_type: Some(RoomType::Public),
            max_participants: Some(100),
        });
        self.create_room(RoomSpec {
            id: Some("announcements".to_string()),
            name: Some("Announcements".to_string()),
            description: Some("Important announcements".to_string()),
            room_type: Some(RoomType::Announcement),
            max_participants: Some(1000),
        });
        self.create_room(RoomSpec {
            id: Some("support".to_string()),
            name: Some("Support".to_string()),
            description: Some("Technical support".to_string()),
            room_type: Some(RoomType::Restricted),
            max_participants: Some(50),
        });
    }

    #[instrument(skip(self, spec))]
    pub fn create_room(&self, spec: RoomSpec) -> Room {
        let room = Room::from_spec(spec);

        let mut state = self.state.lock().unwrap();
        // Re-creating an existing id replaces the room; the old
        // membership must not linger in the reverse index.
        if let Some(previous) = state.rooms.remove(&room.id) {
            warn!(room_id = %room.id, "Replacing existing room");
            evict_from_reverse_index(&mut state, &previous);
        }
        state.rooms.insert(room.id.clone(), room.clone());

        info!(room_id = %room.id, name = %room.name, "Room created");
        self.event_bus
            .publish(&DomainEvent::RoomCreated { room: room.clone() });
        room
    }

    /// Deletes a room. Only a participant holding the admin role in that
    /// room may do so; anyone else gets `false`, same as an absent room.
    #[instrument(skip(self))]
    pub fn delete_room(&self, room_id: &str, requesting_user_id: &str) -> bool {
        let mut state = self.state.lock().unwrap();

        let authorized = state
            .rooms
            .get(room_id)
            .map(|room| room.is_admin(requesting_user_id))
            .unwrap_or(false);
        if !authorized {
            debug!(
                room_id = %room_id,
                user_id = %requesting_user_id,
                "Room delete refused"
            );
            return false;
        }

        let room = state.rooms.remove(room_id).unwrap();
        evict_from_reverse_index(&mut state, &room);

        info!(
            room_id = %room_id,
            deleted_by = %requesting_user_id,
            participants = room.participant_count(),
            "Room deleted"
        );
        self.event_bus.publish(&DomainEvent::RoomDeleted {
            room_id: room_id.to_string(),
            deleted_by: requesting_user_id.to_string(),
        });
        true
    }

    /// Adds a user to a room. `false` when the room is absent, inactive,
    /// at capacity, or the user is already a member.
    #[instrument(skip(self, user_name))]
    pub fn join_room(
        &self,
        room_id: &str,
        user_id: &str,
        user_name: &str,
        role: ParticipantRole,
    ) -> bool {
        let mut state = self.state.lock().unwrap();

        let room = match state.rooms.get_mut(room_id) {
            Some(room) if room.is_active => room,
            _ => {
                debug!(room_id = %room_id, "Join refused: room absent or inactive");
                return false;
            }
        };

        if room.is_full() {
            debug!(
                room_id = %room_id,
                capacity = room.max_participants,
                "Join refused: room at capacity"
            );
            return false;
        }

        if room.has_participant(user_id) {
            debug!(
                room_id = %room_id,
                user_id = %user_id,
                "Join refused: already a participant"
            );
            return false;
        }

        let participant = Participant::new(user_id.to_string(), user_name.to_string(), role);
        room.participants.push(participant.clone());
        room.updated_at = chrono::Utc::now();

        state
            .user_rooms
            .entry(user_id.to_string())
            .or_default()
            .insert(room_id.to_string());

        info!(
            room_id = %room_id,
            user_id = %user_id,
            role = %participant.role,
            "User joined room"
        );
        self.event_bus.publish(&DomainEvent::UserJoinedRoom {
            room_id: room_id.to_string(),
            participant,
        });
        true
    }

    /// Removes a user from a room. `false` when the room or the
    /// membership is absent; calling it again changes nothing.
    #[instrument(skip(self))]
    pub fn leave_room(&self, room_id: &str, user_id: &str) -> bool {
        let mut state = self.state.lock().unwrap();

        let room = match state.rooms.get_mut(room_id) {
            Some(room) => room,
            None => return false,
        };

        let index = match room.participants.iter().position(|p| p.user_id == user_id) {
            Some(index) => index,
            None => {
                debug!(
                    room_id = %room_id,
                    user_id = %user_id,
                    "Leave refused: not a participant"
                );
                return false;
            }
        };

        let participant = room.participants.remove(index);
        room.updated_at = chrono::Utc::now();

        if let Some(rooms) = state.user_rooms.get_mut(user_id) {
            rooms.remove(room_id);
            if rooms.is_empty() {
                state.user_rooms.remove(user_id);
            }
        }

        info!(room_id = %room_id, user_id = %user_id, "User left room");
        self.event_bus.publish(&DomainEvent::UserLeftRoom {
            room_id: room_id.to_string(),
            participant,
        });
        true
    }

    /// Changes a participant's room-scoped role. Requires the requester
    /// to be an admin participant of that room.
    #[instrument(skip(self))]
    pub fn update_participant_role(
        &self,
        room_id: &str,
        user_id: &str,
        new_role: ParticipantRole,
        requesting_user_id: &str,
    ) -> bool {
        let mut state = self.state.lock().unwrap();

        let room = match state.rooms.get_mut(room_id) {
            Some(room) => room,
            None => return false,
        };

        if !room.is_admin(requesting_user_id) {
            debug!(
                room_id = %room_id,
                user_id = %requesting_user_id,
                "Role update refused: requester is not a room admin"
            );
            return false;
        }

        let participant = match room.participants.iter_mut().find(|p| p.user_id == user_id) {
            Some(participant) => participant,
            None => return false,
        };

        participant.role = new_role;
        participant.last_activity = chrono::Utc::now();
        room.updated_at = chrono::Utc::now();

        info!(
            room_id = %room_id,
            user_id = %user_id,
            new_role = %new_role,
            updated_by = %requesting_user_id,
            "Participant role updated"
        );
        self.event_bus.publish(&DomainEvent::UserRoleUpdated {
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            new_role,
            updated_by: requesting_user_id.to_string(),
        });
        true
    }

    pub fn get_room(&self, room_id: &str) -> Option<Room> {
        let state = self.state.lock().unwrap();
        state.rooms.get(room_id).cloned()
    }

    pub fn rooms_by_type(&self, room_type: RoomType) -> Vec<Room> {
        let state = self.state.lock().unwrap();
        state
            .rooms
            .values()
            .filter(|room| room.room_type == room_type)
            .cloned()
            .collect()
    }

    pub fn public_rooms(&self) -> Vec<Room> {
        self.rooms_by_type(RoomType::Public)
    }

    /// Rooms the user belongs to, via the reverse index
    pub fn user_rooms(&self, user_id: &str) -> Vec<Room> {
        let state = self.state.lock().unwrap();
        state
            .user_rooms
            .get(user_id)
            .into_iter()
            .flatten()
            .filter_map(|room_id| state.rooms.get(room_id))
            .cloned()
            .collect()
    }

    pub fn participants(&self, room_id: &str) -> Vec<Participant> {
        let state = self.state.lock().unwrap();
        state
            .rooms
            .get(room_id)
            .map(|room| room.participants.clone())
            .unwrap_or_default()
    }

    /// Stable pagination over the join-ordered participant list.
    /// An out-of-range page yields empty items with the correct total.
    pub fn participants_page(
        &self,
        room_id: &str,
        page: usize,
        page_size: usize,
    ) -> ParticipantsPage {
        let participants = self.participants(room_id);
        let total = participants.len();
        let start = page.saturating_mul(page_size).min(total);
        let end = start.saturating_add(page_size).min(total);

        ParticipantsPage {
            participants: participants[start..end].to_vec(),
            total,
            page,
            page_size,
            has_more: end < total,
        }
    }

    /// Case-insensitive substring search over name and description.
    /// With a user id the result set is restricted to public rooms plus
    /// rooms the user already belongs to.
    pub fn search_rooms(&self, query: &str, user_id: Option<&str>) -> Vec<Room> {
        let term = query.to_lowercase();
        let state = self.state.lock().unwrap();

        let member_of: HashSet<&String> = user_id
            .and_then(|id| state.user_rooms.get(id))
            .into_iter()
            .flatten()
            .collect();

        state
            .rooms
            .values()
            .filter(|room| {
                user_id.is_none()
                    || room.room_type == RoomType::Public
                    || member_of.contains(&room.id)
            })
            .filter(|room| {
                room.name.to_lowercase().contains(&term)
                    || room
                        .description
                        .as_ref()
                        .map(|d| d.to_lowercase().contains(&term))
                        .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// Per-role counts. An absent room reports all zeroes.
    pub fn room_stats(&self, room_id: &str) -> RoomStats {
        let participants = self.participants(room_id);
        let count_role = |role: ParticipantRole| {
            participants.iter().filter(|p| p.role == role).count()
        };

        RoomStats {
            total_participants: participants.len(),
            online_participants: participants.len(),
            admins: count_role(ParticipantRole::Admin),
            moderators: count_role(ParticipantRole::Moderator),
            users: count_role(ParticipantRole::User),
            observers: count_role(ParticipantRole::Observer),
        }
    }
}

fn evict_from_reverse_index(state: &mut StoreState, room: &Room) {
    for participant in &room.participants {
        if let Some(rooms) = state.user_rooms.get_mut(&participant.user_id) {
            rooms.remove(&room.id);
            if rooms.is_empty() {
                state.user_rooms.remove(&participant.user_id);
            }
        }
    }
}
