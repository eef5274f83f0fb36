// Public API
pub use connection_manager::{ConnectionManager, InMemoryConnectionManager};
pub use handler::{websocket_handler, RouterMessageHandler};
pub use socket::{Connection, MessageHandler, SocketWrapper};

// Internal modules
mod connection_manager;
mod handler;
mod socket;
