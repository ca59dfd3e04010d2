pub mod handlers;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::components::reminder::Notifier;
use crate::store::EventStore;
use handlers::{
    create_handler, delete_handler, get_handler, health_handler, index_handler, list_handler,
    test_reminder_handler, update_handler,
};

#[derive(Clone)]
pub struct AppState {
    /// Event store shared with the reminder poller
    pub store: Arc<dyn EventStore>,
    /// Notifier used by the test endpoint
    pub notifier: Arc<dyn Notifier>,
    /// Title of notifications
    pub notification_title: String,
}

/// Build the HTTP router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/test_reminder", get(test_reminder_handler))
        .route("/api/schedules", get(list_handler).post(create_handler))
        .route(
            "/api/schedules/{id}",
            get(get_handler).put(update_handler).delete(delete_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
