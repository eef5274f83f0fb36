use serde::{Deserialize, Serialize};

use super::models::Participant;

/// One page of a room's join-ordered participant list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantsPage {
    pub participants: Vec<Participant>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub has_more: bool,
}

/// Per-role participant counts for a room
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStats {
    pub total_participants: usize,
    pub online_participants: usize,
    pub admins: usize,
    pub moderators: usize,
    pub users: usize,
    pub observers: usize,
}
