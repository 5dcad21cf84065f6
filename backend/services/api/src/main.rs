mod attachments;
mod auth;
mod error;
mod excel;
mod extractors;
mod session;
mod taxonomy;
mod tickets;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use helpdesk_common::error::HelpdeskResult;
use helpdesk_common::types::ServiceInfo;
use helpdesk_config::{init_tracing, AppConfig, StorageBackend};
use helpdesk_db::attachments::pg_repository::PgAttachmentRepository;
use helpdesk_db::attachments::repositories::AttachmentRepository;
use helpdesk_db::attachments::store::AttachmentStore;
use helpdesk_db::sheet::XlsxTicketRepository;
use helpdesk_db::taxonomy::pg_repository::PgTaxonomyRepository;
use helpdesk_db::taxonomy::repositories::TaxonomyRepository;
use helpdesk_db::tickets::pg_repository::PgTicketRepository;
use helpdesk_db::tickets::repositories::TicketRepository;
use helpdesk_db::users::file_repository::FileUserRepository;
use helpdesk_db::users::repositories::UserRepository;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::session::SessionKeys;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tickets: Arc<dyn TicketRepository>,
    /// Set on the postgres backend only, as are taxonomy and attachments.
    pub pg_tickets: Option<PgTicketRepository>,
    pub taxonomy: Option<Arc<dyn TaxonomyRepository>>,
    pub attachments: Option<Arc<dyn AttachmentRepository>>,
    pub store: AttachmentStore,
    pub users: Arc<dyn UserRepository>,
    pub sessions: SessionKeys,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        tickets: Arc<dyn TicketRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            store: AttachmentStore::new(&config.attachments_dir),
            sessions: SessionKeys::new(&config.secret_key, config.session_ttl_hours),
            config: Arc::new(config),
            tickets,
            pg_tickets: None,
            taxonomy: None,
            attachments: None,
            users,
        }
    }

    pub fn with_postgres(mut self, repo: PgTicketRepository) -> Self {
        let pool = repo.pool().clone();
        self.taxonomy = Some(Arc::new(PgTaxonomyRepository::new(pool.clone())));
        self.attachments = Some(Arc::new(PgAttachmentRepository::new(pool)));
        self.tickets = Arc::new(repo.clone());
        self.pg_tickets = Some(repo);
        self
    }
}

/// Calendar date used for `days_open` and new tickets.
pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn info(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo::new("helpdesk-api", state.tickets.backend_name()))
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = format!(
        "\
# HELP helpdesk_up Service up indicator\n\
# TYPE helpdesk_up gauge\n\
helpdesk_up 1\n\
# HELP helpdesk_info Service info\n\
# TYPE helpdesk_info gauge\n\
helpdesk_info{{service=\"helpdesk-api\",version=\"{}\",backend=\"{}\"}} 1\n",
        env!("CARGO_PKG_VERSION"),
        state.tickets.backend_name(),
    );

    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        body,
    )
}

fn build_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .route("/metrics", get(metrics))
        .merge(auth::router())
        .merge(tickets::router())
        .merge(taxonomy::router())
        .merge(attachments::router())
        .merge(excel::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn build_state(config: AppConfig) -> HelpdeskResult<AppState> {
    let users = FileUserRepository::new(&config.users_file);
    if let Some(password) = &config.admin_bootstrap_password {
        users.bootstrap_admin(password).await?;
    }
    let users: Arc<dyn UserRepository> = Arc::new(users);

    match config.storage_backend {
        StorageBackend::Excel => {
            let sheet = XlsxTicketRepository::new(&config.excel_file, &config.sheet_name);
            sheet.init_if_missing().await?;
            tracing::info!(path = %sheet.path().display(), sheet = sheet.sheet_name(), "using workbook");
            Ok(AppState::new(config, Arc::new(sheet), users))
        }
        StorageBackend::Postgres => {
            let pool =
                helpdesk_db::create_pool(config.require_database_url("the postgres backend")?)
                    .await?;
            helpdesk_db::ensure_schema(&pool).await?;
            let repo = PgTicketRepository::new(pool);
            Ok(AppState::new(config, Arc::new(repo.clone()), users).with_postgres(repo))
        }
    }
}

#[tokio::main]
async fn main() {
    let config = AppConfig::from_env().expect("failed to load config");
    init_tracing(&config.log_level);
    tracing::info!(
        service = "helpdesk-api",
        backend = config.storage_backend.as_str(),
        "starting"
    );

    let addr: SocketAddr = config.bind_addr().parse().expect("invalid bind address");
    let state = build_state(config)
        .await
        .expect("failed to initialise storage");
    let app = build_router(state);

    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app).await.expect("server error");
}
