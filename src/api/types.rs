//! Shared types for the HTTP layer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::db;

/// Shared context for all API routes. Each request opens its own
/// connection to the database file.
#[derive(Clone)]
pub struct ApiContext {
    db_path: Arc<PathBuf>,
}

impl ApiContext {
    /// Open the database once so migrations run before the first request.
    pub fn initialize(db_path: impl Into<PathBuf>) -> Result<Self, db::DatabaseError> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| db::DatabaseError::MigrationFailed {
                    version: 0,
                    reason: format!("cannot create {}: {e}", parent.display()),
                })?;
            }
        }
        db::open_database(&db_path)?;
        tracing::info!(path = %db_path.display(), "Database ready");
        Ok(Self {
            db_path: Arc::new(db_path),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn open_db(&self) -> Result<Connection, ApiError> {
        db::open_database(&self.db_path).map_err(ApiError::from)
    }
}

/// Success envelope: `{ "success": true, "data": … }`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data }
    }
}

/// Body of the queue mutations keyed by session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionActionRequest {
    pub session_id: uuid::Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToQueueRequest {
    pub patient_id: uuid::Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u32,
}
