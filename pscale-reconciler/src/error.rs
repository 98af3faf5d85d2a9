//! Reconciliation error types.

use std::time::Duration;

use thiserror::Error;

use crate::clients::ApiError;

/// Errors that abort a reconciliation pass.
///
/// Nothing is rolled back: mutations completed before the error stay
/// applied remotely and the next pass converges from there.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Missing or invalid input. Raised before any remote call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Remote existence contradicts what the phase expects.
    #[error("conflict on database {database} in organization {organization}: {message}")]
    Conflict {
        organization: String,
        database: String,
        message: String,
    },

    /// A database or branch that must exist is missing.
    #[error("{resource} not found in organization {organization}")]
    NotFound {
        organization: String,
        resource: String,
    },

    /// The API client returned an error that cannot be ignored.
    #[error("{operation} failed for database {database} in organization {organization}: {source}")]
    RemoteOperation {
        operation: &'static str,
        organization: String,
        database: String,
        #[source]
        source: ApiError,
    },

    /// The database did not leave a provisioning state before the deadline.
    #[error(
        "database {database} in organization {organization} still {last_state} after {waited:?}"
    )]
    Timeout {
        organization: String,
        database: String,
        last_state: String,
        waited: Duration,
    },
}

impl ReconcileError {
    /// Adapter for `map_err` on API client calls.
    pub fn remote<'a>(
        operation: &'static str,
        organization: &'a str,
        database: &'a str,
    ) -> impl FnOnce(ApiError) -> ReconcileError + 'a {
        move |source| ReconcileError::RemoteOperation {
            operation,
            organization: organization.to_string(),
            database: database.to_string(),
            source,
        }
    }

    pub fn database_not_found(organization: &str, database: &str) -> Self {
        ReconcileError::NotFound {
            organization: organization.to_string(),
            resource: format!("database {database}"),
        }
    }

    pub fn branch_not_found(organization: &str, database: &str, branch: &str) -> Self {
        ReconcileError::NotFound {
            organization: organization.to_string(),
            resource: format!("branch {branch} of database {database}"),
        }
    }
}

/// Result type for reconciliation.
pub type Result<T> = std::result::Result<T, ReconcileError>;
