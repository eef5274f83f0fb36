// Public API
pub use registry::{BoundUser, PresenceEntry, PresenceError, PresenceRegistry};

// Internal modules
mod registry;
