pub mod handlers;

use axum::routing::{get, put};
use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/api/categories/{id}",
            put(handlers::update_category).delete(handlers::delete_category),
        )
        .route(
            "/api/labels",
            get(handlers::list_labels).post(handlers::create_label),
        )
        .route(
            "/api/labels/{id}",
            put(handlers::update_label).delete(handlers::delete_label),
        )
}
