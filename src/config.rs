use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "ClinicDesk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const BIND_ENV: &str = "CLINICDESK_BIND";
pub const DATABASE_ENV: &str = "CLINICDESK_DB";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,clinicdesk=debug"
}

/// Get the application data directory
/// ~/ClinicDesk/ on all platforms; falls back to the working directory
/// when no home directory is known.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default SQLite database file
pub fn database_path() -> PathBuf {
    app_data_dir().join("clinicdesk.db")
}

/// Where the HTTP service listens and which database it serves.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
}

impl ServerConfig {
    /// Read `CLINICDESK_BIND` and `CLINICDESK_DB`, falling back to defaults.
    pub fn from_env() -> Result<Self, String> {
        Self::from_values(
            std::env::var(BIND_ENV).ok().as_deref(),
            std::env::var(DATABASE_ENV).ok().as_deref(),
        )
    }

    fn from_values(bind: Option<&str>, database: Option<&str>) -> Result<Self, String> {
        let bind = bind.filter(|v| !v.trim().is_empty()).unwrap_or(DEFAULT_BIND_ADDR);
        let bind_addr = bind
            .trim()
            .parse()
            .map_err(|e| format!("Invalid {BIND_ENV} '{bind}': {e}"))?;
        let database_path = database
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(database_path);
        Ok(Self {
            bind_addr,
            database_path,
        })
    }
}
