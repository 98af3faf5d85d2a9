//! Database API trait and its error type.

use async_trait::async_trait;
use thiserror::Error;

use super::types::{BranchInfo, CreateDatabaseRequest, DatabaseInfo, SettingsPatch};

/// Error returned by the API client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The provider answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ApiError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        ApiError::Status {
            status,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}

/// Result type for API client calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Result of a delete call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Operations the reconciler needs from the provider.
///
/// Lookups return `Ok(None)` for a missing resource rather than an error.
/// Implementations own transport, authentication and retries.
#[async_trait]
pub trait DatabaseApi: Send + Sync {
    async fn get_database(&self, organization: &str, name: &str)
        -> ApiResult<Option<DatabaseInfo>>;

    async fn create_database(
        &self,
        organization: &str,
        request: &CreateDatabaseRequest,
    ) -> ApiResult<DatabaseInfo>;

    /// Patch database settings. `name` is the current remote name, which
    /// differs from `patch.new_name` during a rename.
    async fn update_database_settings(
        &self,
        organization: &str,
        name: &str,
        patch: &SettingsPatch,
    ) -> ApiResult<DatabaseInfo>;

    async fn delete_database(&self, organization: &str, name: &str) -> ApiResult<DeleteOutcome>;

    async fn get_branch(
        &self,
        organization: &str,
        database: &str,
        branch: &str,
    ) -> ApiResult<Option<BranchInfo>>;

    async fn create_branch(
        &self,
        organization: &str,
        database: &str,
        branch: &str,
        parent: &str,
    ) -> ApiResult<BranchInfo>;

    async fn set_branch_cluster_size(
        &self,
        organization: &str,
        database: &str,
        branch: &str,
        cluster_size: &str,
    ) -> ApiResult<BranchInfo>;
}
