use chrono::{DateTime, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Venue category for a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RoomType {
    Public,
    Private,
    Restricted,
    Announcement,
}

/// Room-scoped role of a participant. The same user may hold different
/// roles in different rooms.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ParticipantRole {
    Admin,
    Moderator,
    #[default]
    User,
    Observer,
}

/// Membership record scoped to one room
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: String,
    pub user_name: String,
    pub role: ParticipantRole,
    pub joined_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Participant {
    pub fn new(user_id: String, user_name: String, role: ParticipantRole) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            user_name,
            role,
            joined_at: now,
            last_activity: now,
        }
    }
}

/// A named, bounded venue with typed membership.
///
/// `participants` is kept in join order; the reverse index in the store
/// must agree with it at all times.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    pub participants: Vec<Participant>,
    pub max_participants: usize,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.max_participants
    }

    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p.user_id == user_id)
    }

    pub fn participant(&self, user_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    /// Whether `user_id` holds the admin role in this room
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.participants
            .iter()
            .any(|p| p.user_id == user_id && p.role == ParticipantRole::Admin)
    }

    /// Builds a room from a spec, generating an id when none is given
    pub fn from_spec(spec: RoomSpec) -> Self {
        let now = Utc::now();
        Self {
            id: spec.id.unwrap_or_else(generate_room_id),
            name: spec.name.unwrap_or_else(|| "New room".to_string()),
            description: spec.description,
            room_type: spec.room_type.unwrap_or(RoomType::Public),
            participants: Vec::new(),
            max_participants: spec.max_participants.unwrap_or(DEFAULT_ROOM_CAPACITY),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Creation input for a room. Unset fields fall back to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSpec {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub room_type: Option<RoomType>,
    pub max_participants: Option<usize>,
}

pub const DEFAULT_ROOM_CAPACITY: usize = 50;

/// Collision-resistant room id: millisecond timestamp plus a random suffix
fn generate_room_id() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!(
        "room_{}_{}",
        Utc::now().timestamp_millis(),
        suffix.to_lowercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_spec_applies_defaults() {
        let room = Room::from_spec(RoomSpec::default());

        assert!(room.id.starts_with("room_"));
        assert_eq!(room.name, "New room");
        assert_eq!(room.room_type, RoomType::Public);
        assert_eq!(room.max_participants, DEFAULT_ROOM_CAPACITY);
        assert!(room.is_active);
        assert!(room.participants.is_empty());
    }

    #[test]
    fn test_from_spec_keeps_explicit_values() {
        let room = Room::from_spec(RoomSpec {
            id: Some("general".to_string()),
            name: Some("General".to_string()),
            description: Some("Main room".to_string()),
            room_type: Some(RoomType::Announcement),
            max_participants: Some(5),
        });

        assert_eq!(room.id, "general");
        assert_eq!(room.name, "General");
        assert_eq!(room.description.as_deref(), Some("Main room"));
        assert_eq!(room.room_type, RoomType::Announcement);
        assert_eq!(room.max_participants, 5);
    }

    #[test]
    fn test_generated_ids_differ() {
        let a = Room::from_spec(RoomSpec::default());
        let b = Room::from_spec(RoomSpec::default());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_capacity_and_membership_helpers() {
        let mut room = Room::from_spec(RoomSpec {
            max_participants: Some(2),
            ..Default::default()
        });
        room.participants.push(Participant::new(
            "u1".to_string(),
            "Alice".to_string(),
            ParticipantRole::Admin,
        ));

        assert!(!room.is_full());
        assert!(room.has_participant("u1"));
        assert!(!room.has_participant("u2"));
        assert!(room.is_admin("u1"));

        room.participants.push(Participant::new(
            "u2".to_string(),
            "Bob".to_string(),
            ParticipantRole::User,
        ));
        assert!(room.is_full());
        assert!(!room.is_admin("u2"));
    }

    #[test]
    fn test_enums_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&ParticipantRole::Moderator).unwrap(),
            "\"moderator\""
        );
        assert_eq!(
            serde_json::to_string(&RoomType::Restricted).unwrap(),
            "\"restricted\""
        );
    }
}
