//! Desired and observed database state.
//!
//! `DatabaseSpec` is what the caller wants, `DatabaseStatus` is what a
//! reconciliation pass persisted last time and returns this time.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clients::DatabaseInfo;

/// Default branch name of a freshly created database.
pub const DEFAULT_BRANCH: &str = "main";

/// Cluster size used when the spec does not name one.
pub const DEFAULT_CLUSTER_SIZE: &str = "PS_10";

/// Database engine. Immutable once the database exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Mysql,
    Postgresql,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Mysql => "mysql",
            EngineKind::Postgresql => "postgresql",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EngineKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mysql" => Ok(EngineKind::Mysql),
            "postgresql" => Ok(EngineKind::Postgresql),
            _ => Err(()),
        }
    }
}

/// CPU architecture of a postgresql cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    #[default]
    X86,
    Arm,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X86 => "x86",
            Arch::Arm => "arm",
        }
    }

    /// Suffix used in qualified cluster size tokens (`PS_10_AWS_ARM`).
    pub fn token(&self) -> &'static str {
        match self {
            Arch::X86 => "X86",
            Arch::Arm => "ARM",
        }
    }
}

/// Remote database state as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DatabaseState {
    #[default]
    Pending,
    Importing,
    Awakening,
    SleepInProgress,
    Resizing,
    Ready,
    Sleeping,
    Other(String),
}

impl DatabaseState {
    pub fn as_str(&self) -> &str {
        match self {
            DatabaseState::Pending => "pending",
            DatabaseState::Importing => "importing",
            DatabaseState::Awakening => "awakening",
            DatabaseState::SleepInProgress => "sleep_in_progress",
            DatabaseState::Resizing => "resizing",
            DatabaseState::Ready => "ready",
            DatabaseState::Sleeping => "sleeping",
            DatabaseState::Other(s) => s,
        }
    }

    /// Whether the provider still rejects dependent operations (branch
    /// creation) in this state. Unknown states count as settled.
    pub fn is_transitional(&self) -> bool {
        matches!(
            self,
            DatabaseState::Pending
                | DatabaseState::Importing
                | DatabaseState::Awakening
                | DatabaseState::SleepInProgress
                | DatabaseState::Resizing
        )
    }
}

impl From<&str> for DatabaseState {
    fn from(s: &str) -> Self {
        match s {
            "pending" => DatabaseState::Pending,
            "importing" => DatabaseState::Importing,
            "awakening" => DatabaseState::Awakening,
            "sleep_in_progress" => DatabaseState::SleepInProgress,
            "resizing" => DatabaseState::Resizing,
            "ready" => DatabaseState::Ready,
            "sleeping" => DatabaseState::Sleeping,
            other => DatabaseState::Other(other.to_string()),
        }
    }
}

impl From<String> for DatabaseState {
    fn from(s: String) -> Self {
        DatabaseState::from(s.as_str())
    }
}

impl From<DatabaseState> for String {
    fn from(state: DatabaseState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for DatabaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings that only apply to mysql databases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MysqlOptions {
    pub automatic_migrations: Option<bool>,
    pub migration_framework: Option<String>,
    pub migration_table_name: Option<String>,
    pub allow_foreign_key_constraints: Option<bool>,
}

/// Settings that only apply to postgresql databases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostgresOptions {
    pub arch: Option<Arch>,
    pub major_version: Option<u32>,
}

/// Desired configuration for one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseSpec {
    /// Physical name. Derived from the logical id when absent.
    pub name: Option<String>,
    /// Falls back to the environment default when absent.
    pub organization: Option<String>,
    /// Region slug, e.g. `us-east` or `gcp-us-central1`.
    pub region: Option<String>,
    pub replicas: Option<u32>,
    pub kind: EngineKind,
    pub cluster_size: String,
    pub require_approval_for_deploy: Option<bool>,
    pub restrict_region: Option<bool>,
    pub allow_data_branching: Option<bool>,
    pub insights_raw_queries: Option<bool>,
    pub production_branch_web_console: Option<bool>,
    pub mysql: MysqlOptions,
    pub postgresql: PostgresOptions,
    pub default_branch: String,
    /// Take over a same-named database instead of failing with a conflict.
    pub adopt: bool,
    /// Delete the remote database when the resource is destroyed.
    /// When false, destroying only drops the local record.
    pub delete: bool,
}

impl Default for DatabaseSpec {
    fn default() -> Self {
        Self {
            name: None,
            organization: None,
            region: None,
            replicas: None,
            kind: EngineKind::default(),
            cluster_size: DEFAULT_CLUSTER_SIZE.to_string(),
            require_approval_for_deploy: None,
            restrict_region: None,
            allow_data_branching: None,
            insights_raw_queries: None,
            production_branch_web_console: None,
            mysql: MysqlOptions::default(),
            postgresql: PostgresOptions::default(),
            default_branch: DEFAULT_BRANCH.to_string(),
            adopt: false,
            delete: false,
        }
    }
}

impl DatabaseSpec {
    /// Architecture requested for the cluster, postgresql only.
    pub fn arch(&self) -> Option<Arch> {
        match self.kind {
            EngineKind::Postgresql => self.postgresql.arch,
            EngineKind::Mysql => None,
        }
    }
}

/// Persisted record of a reconciled database.
///
/// Read back as the prior state of the next pass. Older records may lack
/// most fields, so everything defaults; `organizationId` is the legacy
/// spelling of `organization`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseStatus {
    pub id: String,
    pub name: String,
    #[serde(alias = "organizationId")]
    pub organization: String,
    pub state: DatabaseState,
    pub default_branch: String,
    pub plan: String,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub region: Option<String>,
    pub replicas: Option<u32>,
    pub kind: EngineKind,
    pub cluster_size: String,
    pub require_approval_for_deploy: Option<bool>,
    pub restrict_region: Option<bool>,
    pub allow_data_branching: Option<bool>,
    pub insights_raw_queries: Option<bool>,
    pub production_branch_web_console: Option<bool>,
    pub mysql: MysqlOptions,
    pub postgresql: PostgresOptions,
    pub adopt: bool,
    pub delete: bool,
}

impl DatabaseStatus {
    /// Status after a successful pass: spec fields merged with what the
    /// provider reported in its last response.
    pub fn applied(
        info: &DatabaseInfo,
        organization: &str,
        spec: &DatabaseSpec,
        cluster_size: String,
    ) -> Self {
        Self {
            id: info.id.clone(),
            name: info.name.clone(),
            organization: organization.to_string(),
            state: info.state.clone(),
            default_branch: info.default_branch.clone(),
            plan: info.plan.clone(),
            html_url: info.html_url.clone(),
            created_at: info.created_at,
            updated_at: info.updated_at,
            region: info.region.clone().or_else(|| spec.region.clone()),
            replicas: spec.replicas,
            kind: info.kind,
            cluster_size,
            require_approval_for_deploy: spec.require_approval_for_deploy,
            restrict_region: spec.restrict_region,
            allow_data_branching: spec.allow_data_branching,
            insights_raw_queries: spec.insights_raw_queries,
            production_branch_web_console: spec.production_branch_web_console,
            mysql: spec.mysql.clone(),
            postgresql: spec.postgresql.clone(),
            adopt: spec.adopt,
            delete: spec.delete,
        }
    }

    /// Status of a database found remotely but never managed by us.
    /// Used as the prior state when adopting.
    pub fn observed(info: &DatabaseInfo, organization: &str) -> Self {
        Self {
            id: info.id.clone(),
            name: info.name.clone(),
            organization: organization.to_string(),
            state: info.state.clone(),
            default_branch: info.default_branch.clone(),
            plan: info.plan.clone(),
            html_url: info.html_url.clone(),
            created_at: info.created_at,
            updated_at: info.updated_at,
            region: info.region.clone(),
            kind: info.kind,
            ..Default::default()
        }
    }
}
