use std::sync::Arc;

use crate::observer::EventBus;
use crate::presence::PresenceRegistry;
use crate::room::RoomStore;
use crate::session::SessionRouter;
use crate::websockets::ConnectionManager;

/// Shared application state containing all dependencies.
///
/// Constructed once at startup and handed to the transport by reference;
/// there is no process-global instance.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<SessionRouter>,
    pub connections: Arc<dyn ConnectionManager>,
    pub rooms: Arc<RoomStore>,
    pub presence: Arc<PresenceRegistry>,
    pub event_bus: EventBus,
}

impl AppState {
    pub fn new(
        router: Arc<SessionRouter>,
        connections: Arc<dyn ConnectionManager>,
        rooms: Arc<RoomStore>,
        presence: Arc<PresenceRegistry>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            router,
            connections,
            rooms,
            presence,
            event_bus,
        }
    }
}
