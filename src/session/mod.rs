// Public API - what other modules can use
pub use messages::{ChatMessage, ClientIntent, OnlineUser, RoomUser, ServerEvent, TypingEvent};
pub use router::SessionRouter;

// Internal modules
mod messages;
mod router;
