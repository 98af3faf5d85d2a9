//! Contract for the PlanetScale API client.
//!
//! The reconciler never speaks HTTP itself. It consumes the `DatabaseApi`
//! trait, implemented by whatever client the runtime wires in:
//! - databases: get, create, update settings, delete
//! - branches: get, create, set cluster size

pub mod api;
pub mod types;

pub use api::{ApiError, ApiResult, DatabaseApi, DeleteOutcome};
pub use types::{BranchInfo, CreateDatabaseRequest, DatabaseInfo, SettingsPatch};
