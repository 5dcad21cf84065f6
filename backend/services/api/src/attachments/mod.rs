pub mod handlers;

use axum::routing::get;
use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/tickets/{id}/attachments",
            get(handlers::list_attachments).post(handlers::upload_attachment),
        )
        .route(
            "/api/attachments/{id}",
            get(handlers::download_attachment).delete(handlers::delete_attachment),
        )
}
