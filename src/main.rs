use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roomcast::observer::{
    AnalyticsObserver, EventBus, LoggingObserver, MetricsObserver, NotificationObserver,
};
use roomcast::presence::PresenceRegistry;
use roomcast::room::RoomStore;
use roomcast::session::SessionRouter;
use roomcast::shared::AppState;
use roomcast::websockets::{websocket_handler, ConnectionManager, InMemoryConnectionManager};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomcast=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting roomcast messaging server");

    // Event fan-out with the standard cross-cutting observers attached
    let event_bus = EventBus::new();
    event_bus.subscribe(None, Arc::new(LoggingObserver));
    event_bus.subscribe(None, Arc::new(MetricsObserver::new()));
    event_bus.subscribe(None, Arc::new(NotificationObserver::new()));
    event_bus.subscribe(None, Arc::new(AnalyticsObserver::new()));

    // Core state, explicitly constructed and wired
    let rooms = Arc::new(RoomStore::new(event_bus.clone()));
    rooms.seed_default_rooms();

    let presence = Arc::new(PresenceRegistry::new());
    let connections: Arc<dyn ConnectionManager> = Arc::new(InMemoryConnectionManager::new());
    let router = Arc::new(SessionRouter::new(
        presence.clone(),
        rooms.clone(),
        connections.clone(),
    ));

    let app_state = AppState::new(router, connections, rooms, presence, event_bus);

    let app = Router::new()
        .route("/", get(|| async { "roomcast" }))
        .route("/ws", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    info!("Server running on http://localhost:3000");
    axum::serve(listener, app).await.unwrap();
}
