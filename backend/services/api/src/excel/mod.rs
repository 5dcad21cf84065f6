pub mod handlers;

use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/export/xlsx", get(handlers::export_xlsx))
        .route("/api/import/xlsx", post(handlers::import_xlsx))
}
