use std::env;
use std::path::Path;
use std::str::FromStr;

use helpdesk_common::error::{HelpdeskError, HelpdeskResult};
use serde::Deserialize;

/// Locations searched for the users file when `USERS_FILE` is not set:
/// local development, mounted secret files, working directory.
const USERS_FILE_LOCATIONS: &[&str] = &[
    ".env/users.json",
    "/etc/secrets/users_data.json",
    "users.json",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Excel,
    Postgres,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excel => "excel",
            Self::Postgres => "postgres",
        }
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "excel" | "xlsx" => Ok(Self::Excel),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(format!("unknown storage backend: {other}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub excel_file: String,
    pub sheet_name: String,
    pub users_file: String,
    pub admin_bootstrap_password: Option<String>,
    pub secret_key: String,
    pub session_ttl_hours: i64,
    pub attachments_dir: String,
    pub max_upload_bytes: usize,
    pub cors_origins: Vec<String>,
    pub sync_interval_secs: u64,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    /// Loads `.env` file if present, then reads vars.
    pub fn from_env() -> HelpdeskResult<Self> {
        // Best-effort .env load; ignore if missing
        let _ = dotenvy::dotenv();

        let storage_backend: StorageBackend = get_var_or("STORAGE_BACKEND", "excel")
            .parse()
            .map_err(HelpdeskError::Config)?;
        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(HelpdeskError::Config(
                "DATABASE_URL is required when STORAGE_BACKEND=postgres".to_owned(),
            ));
        }

        Ok(Self {
            storage_backend,
            database_url,
            excel_file: get_var_or("EXCEL_FILE", "tickets.xlsx"),
            sheet_name: get_var_or("SHEET_NAME", "IT Service Tickets"),
            users_file: env::var("USERS_FILE").unwrap_or_else(|_| locate_users_file()),
            admin_bootstrap_password: env::var("ADMIN_BOOTSTRAP_PASSWORD")
                .ok()
                .filter(|v| !v.is_empty()),
            secret_key: get_var_or("SECRET_KEY", "ticketing-dashboard-secret-key-2025"),
            session_ttl_hours: parse_var("SESSION_TTL_HOURS", "12")?,
            attachments_dir: get_var_or("ATTACHMENTS_DIR", "attachments"),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", "10485760")?,
            cors_origins: get_var_or(
                "CORS_ORIGINS",
                "http://localhost:3000,http://127.0.0.1:3000",
            )
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_owned)
            .collect(),
            sync_interval_secs: parse_var("SYNC_INTERVAL_SECS", "60")?,
            host: get_var_or("HOST", "0.0.0.0"),
            port: parse_var("PORT", "5000")?,
            log_level: get_var_or("LOG_LEVEL", "info"),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The database URL, or a config error naming who needed it.
    pub fn require_database_url(&self, purpose: &str) -> HelpdeskResult<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| HelpdeskError::Config(format!("DATABASE_URL is required for {purpose}")))
    }
}

fn locate_users_file() -> String {
    USERS_FILE_LOCATIONS
        .iter()
        .find(|p| Path::new(p).exists())
        .unwrap_or(&USERS_FILE_LOCATIONS[0])
        .to_string()
}

fn get_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_var<T>(key: &str, default: &str) -> HelpdeskResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_var_or(key, default)
        .parse()
        .map_err(|e| HelpdeskError::Config(format!("invalid {key}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_vars() {
        for key in [
            "STORAGE_BACKEND",
            "DATABASE_URL",
            "PORT",
            "CORS_ORIGINS",
            "USERS_FILE",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn config_defaults_to_excel_backend() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear_vars();

        let cfg = AppConfig::from_env().expect("should parse config");
        assert_eq!(cfg.storage_backend, StorageBackend::Excel);
        assert_eq!(cfg.excel_file, "tickets.xlsx");
        assert_eq!(cfg.sheet_name, "IT Service Tickets");
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.session_ttl_hours, 12);
        assert_eq!(
            cfg.cors_origins,
            vec!["http://localhost:3000", "http://127.0.0.1:3000"]
        );
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn postgres_backend_requires_database_url() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear_vars();

        env::set_var("STORAGE_BACKEND", "postgres");
        let result = AppConfig::from_env();
        assert!(matches!(result, Err(HelpdeskError::Config(_))));

        env::set_var("DATABASE_URL", "postgres://localhost/helpdesk_test");
        let cfg = AppConfig::from_env().expect("should parse config");
        assert_eq!(cfg.storage_backend, StorageBackend::Postgres);
        assert_eq!(
            cfg.require_database_url("tests").expect("url"),
            "postgres://localhost/helpdesk_test"
        );

        clear_vars();
    }

    #[test]
    fn invalid_port_is_rejected() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear_vars();

        env::set_var("PORT", "not-a-port");
        let result = AppConfig::from_env();
        assert!(result.is_err());

        clear_vars();
    }

    #[test]
    fn explicit_users_file_wins() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear_vars();

        env::set_var("USERS_FILE", "/tmp/helpdesk-users.json");
        let cfg = AppConfig::from_env().expect("should parse config");
        assert_eq!(cfg.users_file, "/tmp/helpdesk-users.json");

        clear_vars();
    }

    #[test]
    fn storage_backend_parses_aliases() {
        assert_eq!("XLSX".parse::<StorageBackend>(), Ok(StorageBackend::Excel));
        assert_eq!(
            "postgresql".parse::<StorageBackend>(),
            Ok(StorageBackend::Postgres)
        );
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn bind_addr_formats_correctly() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear_vars();

        let mut cfg = AppConfig::from_env().expect("should parse config");
        cfg.host = "127.0.0.1".to_owned();
        cfg.port = 3000;
        assert_eq!(cfg.bind_addr(), "127.0.0.1:3000");
    }
}
