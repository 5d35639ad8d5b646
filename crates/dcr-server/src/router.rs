use axum::routing::{delete, get, post, put};
use axum::Router;
use dcr_protocol::routes;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all event-node endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(routes::HEALTH, get(handler::health))
        .route(routes::EVENTS, post(handler::create_event))
        .route(
            routes::EVENT,
            get(handler::get_event).delete(handler::delete_event),
        )
        .route(routes::RESET, put(handler::reset_event))
        .route(routes::EXECUTED_BY, get(handler::is_executed))
        .route(
            routes::INCLUDED,
            get(handler::is_included).put(handler::set_included),
        )
        .route(routes::CONDITION, get(handler::check_condition))
        .route(routes::MILESTONE, get(handler::check_milestone))
        .route(routes::STATE, get(handler::get_state))
        .route(routes::SET_PENDING, put(handler::set_pending))
        .route(routes::EXECUTE, put(handler::execute))
        .route(routes::LOCK, post(handler::lock))
        .route(routes::UNLOCK, delete(handler::unlock))
        .route(routes::EVENT_HISTORY, get(handler::event_history))
        .route(routes::WORKFLOW_HISTORY, get(handler::workflow_history))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
