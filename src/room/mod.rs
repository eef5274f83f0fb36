// Public API - what other modules can use
pub use store::RoomStore;
pub use types::{ParticipantsPage, RoomStats};

// Internal modules
pub mod models;
mod store;
mod types;
