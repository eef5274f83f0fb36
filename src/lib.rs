// Library crate for the roomcast messaging server
// This file exposes the public API for integration tests

pub mod observer;
pub mod presence;
pub mod room;
pub mod session;
pub mod shared;
pub mod websockets;

// Re-export commonly used types for easier access in tests
pub use observer::{DomainEvent, EventBus, EventKind, Observer};
pub use presence::{PresenceError, PresenceRegistry};
pub use room::{models::Room, RoomStore};
pub use session::{ClientIntent, ServerEvent, SessionRouter};
pub use websockets::{ConnectionManager, InMemoryConnectionManager, MessageHandler};
