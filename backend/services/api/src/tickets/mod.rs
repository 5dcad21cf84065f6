pub mod handlers;
pub mod responses;

use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/tickets",
            get(handlers::list_tickets).post(handlers::create_ticket),
        )
        .route(
            "/api/tickets/{id}",
            get(handlers::get_ticket)
                .put(handlers::update_ticket)
                .delete(handlers::delete_ticket),
        )
        .route("/api/stats", get(handlers::stats))
        .route("/api/options", get(handlers::options))
        .route("/api/refresh", post(handlers::refresh))
}
