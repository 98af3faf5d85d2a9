//! Request and response payloads exchanged with the API client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{DatabaseSpec, DatabaseState, EngineKind};

/// Database as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub id: String,
    pub name: String,
    pub state: DatabaseState,
    pub default_branch: String,
    pub plan: String,
    pub html_url: String,
    pub kind: EngineKind,
    pub region: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Branch as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchInfo {
    pub name: String,
    pub parent_branch: Option<String>,
    pub cluster_size: Option<String>,
    pub ready: bool,
}

/// Fields accepted by the create endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateDatabaseRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
    pub kind: EngineKind,
    pub cluster_size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_version: Option<u32>,
}

impl CreateDatabaseRequest {
    pub fn new(name: &str, spec: &DatabaseSpec, cluster_size: &str) -> Self {
        let major_version = match spec.kind {
            EngineKind::Postgresql => spec.postgresql.major_version,
            EngineKind::Mysql => None,
        };
        Self {
            name: name.to_string(),
            region: spec.region.clone(),
            replicas: spec.replicas,
            kind: spec.kind,
            cluster_size: cluster_size.to_string(),
            major_version,
        }
    }
}

/// Settings update. Unset fields are left untouched remotely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_approval_for_deploy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restrict_branch_region: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_data_branching: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insights_raw_queries: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production_branch_web_console: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automatic_migrations: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migration_framework: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migration_table_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_foreign_key_constraints: Option<bool>,
}

impl SettingsPatch {
    /// All settings carried by the spec. Mysql-only fields stay unset for
    /// postgresql databases.
    pub fn from_spec(spec: &DatabaseSpec) -> Self {
        let mut patch = Self {
            require_approval_for_deploy: spec.require_approval_for_deploy,
            restrict_branch_region: spec.restrict_region,
            allow_data_branching: spec.allow_data_branching,
            insights_raw_queries: spec.insights_raw_queries,
            production_branch_web_console: spec.production_branch_web_console,
            ..Default::default()
        };
        if spec.kind == EngineKind::Mysql {
            patch.automatic_migrations = spec.mysql.automatic_migrations;
            patch.migration_framework = spec.mysql.migration_framework.clone();
            patch.migration_table_name = spec.mysql.migration_table_name.clone();
            patch.allow_foreign_key_constraints = spec.mysql.allow_foreign_key_constraints;
        }
        patch
    }

    pub fn rename(new_name: &str) -> Self {
        Self {
            new_name: Some(new_name.to_string()),
            ..Default::default()
        }
    }

    pub fn switch_default_branch(branch: &str) -> Self {
        Self::default().with_default_branch(branch)
    }

    pub fn with_default_branch(mut self, branch: &str) -> Self {
        self.default_branch = Some(branch.to_string());
        self
    }
}
