//! Shared test utilities for reconciler integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use pscale_reconciler::clients::{
    ApiError, ApiResult, BranchInfo, CreateDatabaseRequest, DatabaseApi, DatabaseInfo,
    DeleteOutcome, SettingsPatch,
};
use pscale_reconciler::{
    DatabaseReconciler, DatabaseState, EngineKind, Environment, ReconcilerConfig,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// One recorded API call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetDatabase {
        organization: String,
        name: String,
    },
    CreateDatabase {
        organization: String,
        request: CreateDatabaseRequest,
    },
    UpdateSettings {
        organization: String,
        name: String,
        patch: SettingsPatch,
    },
    DeleteDatabase {
        organization: String,
        name: String,
    },
    GetBranch {
        organization: String,
        database: String,
        branch: String,
    },
    CreateBranch {
        organization: String,
        database: String,
        branch: String,
        parent: String,
    },
    SetClusterSize {
        organization: String,
        database: String,
        branch: String,
        cluster_size: String,
    },
}

impl Call {
    pub fn op(&self) -> Op {
        match self {
            Call::GetDatabase { .. } => Op::GetDatabase,
            Call::CreateDatabase { .. } => Op::CreateDatabase,
            Call::UpdateSettings { .. } => Op::UpdateSettings,
            Call::DeleteDatabase { .. } => Op::DeleteDatabase,
            Call::GetBranch { .. } => Op::GetBranch,
            Call::CreateBranch { .. } => Op::CreateBranch,
            Call::SetClusterSize { .. } => Op::SetClusterSize,
        }
    }

    pub fn is_mutation(&self) -> bool {
        !matches!(self.op(), Op::GetDatabase | Op::GetBranch)
    }
}

/// API operation, used to inject failures and filter calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    GetDatabase,
    CreateDatabase,
    UpdateSettings,
    DeleteDatabase,
    GetBranch,
    CreateBranch,
    SetClusterSize,
}

struct FakeDatabase {
    info: DatabaseInfo,
    branches: HashMap<String, BranchInfo>,
    /// Lookups left before a provisioning database turns ready.
    polls_until_ready: u32,
}

#[derive(Default)]
struct FakeState {
    databases: HashMap<(String, String), FakeDatabase>,
    calls: Vec<Call>,
    failures: HashMap<Op, ApiError>,
    provisioning_polls: u32,
}

/// In-memory provider that records every call in order.
///
/// Newly created databases stay `pending` for `provisioning_polls` lookups
/// and reject branch creation meanwhile, like the real provider.
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Self::with_provisioning_polls(0)
    }

    pub fn with_provisioning_polls(polls: u32) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                provisioning_polls: polls,
                ..Default::default()
            }),
        })
    }

    /// Seed a ready database with a `main` branch on `PS_10`.
    pub fn insert_database(&self, organization: &str, name: &str, kind: EngineKind) -> DatabaseInfo {
        let cluster_size = match kind {
            EngineKind::Mysql => "PS_10",
            EngineKind::Postgresql => "PS_10_AWS_X86",
        };
        let info = new_info(organization, name, kind, DatabaseState::Ready, None);
        let mut branches = HashMap::new();
        branches.insert("main".to_string(), new_branch("main", None, cluster_size));

        let mut state = self.state.lock().unwrap();
        state.databases.insert(
            key(organization, name),
            FakeDatabase {
                info: info.clone(),
                branches,
                polls_until_ready: 0,
            },
        );
        info
    }

    pub fn insert_branch(&self, organization: &str, database: &str, branch: &str, cluster_size: &str) {
        let mut state = self.state.lock().unwrap();
        let db = state
            .databases
            .get_mut(&key(organization, database))
            .expect("database seeded");
        db.branches.insert(
            branch.to_string(),
            new_branch(branch, Some("main"), cluster_size),
        );
    }

    /// Fail every subsequent call of `op` with `error`.
    pub fn fail(&self, op: Op, error: ApiError) {
        self.state.lock().unwrap().failures.insert(op, error);
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failures.clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn ops(&self) -> Vec<Op> {
        self.calls().iter().map(Call::op).collect()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn settings_patches(&self) -> Vec<SettingsPatch> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::UpdateSettings { patch, .. } => Some(patch),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn database(&self, organization: &str, name: &str) -> Option<DatabaseInfo> {
        let state = self.state.lock().unwrap();
        state
            .databases
            .get(&key(organization, name))
            .map(|db| db.info.clone())
    }

    pub fn branch(&self, organization: &str, database: &str, branch: &str) -> Option<BranchInfo> {
        let state = self.state.lock().unwrap();
        state
            .databases
            .get(&key(organization, database))
            .and_then(|db| db.branches.get(branch).cloned())
    }

    /// Record `call` and return the injected failure for it, if any.
    fn record(&self, call: Call) -> ApiResult<()> {
        let mut state = self.state.lock().unwrap();
        let op = call.op();
        state.calls.push(call);
        match state.failures.get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn key(organization: &str, name: &str) -> (String, String) {
    (organization.to_string(), name.to_string())
}

fn new_info(
    organization: &str,
    name: &str,
    kind: EngineKind,
    state: DatabaseState,
    region: Option<String>,
) -> DatabaseInfo {
    let now = Utc::now();
    DatabaseInfo {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        state,
        default_branch: "main".to_string(),
        plan: "scaler_pro".to_string(),
        html_url: format!("https://app.planetscale.com/{organization}/{name}"),
        kind,
        region,
        created_at: now,
        updated_at: now,
    }
}

fn new_branch(name: &str, parent: Option<&str>, cluster_size: &str) -> BranchInfo {
    BranchInfo {
        name: name.to_string(),
        parent_branch: parent.map(str::to_string),
        cluster_size: Some(cluster_size.to_string()),
        ready: true,
    }
}

fn not_found(what: &str) -> ApiError {
    ApiError::status(404, format!("{what} not found"))
}

#[async_trait]
impl DatabaseApi for FakeApi {
    async fn get_database(&self, organization: &str, name: &str) -> ApiResult<Option<DatabaseInfo>> {
        self.record(Call::GetDatabase {
            organization: organization.to_string(),
            name: name.to_string(),
        })?;
        let mut state = self.state.lock().unwrap();
        Ok(state.databases.get_mut(&key(organization, name)).map(|db| {
            if db.polls_until_ready > 0 {
                db.polls_until_ready -= 1;
                if db.polls_until_ready == 0 {
                    db.info.state = DatabaseState::Ready;
                }
            }
            db.info.clone()
        }))
    }

    async fn create_database(
        &self,
        organization: &str,
        request: &CreateDatabaseRequest,
    ) -> ApiResult<DatabaseInfo> {
        self.record(Call::CreateDatabase {
            organization: organization.to_string(),
            request: request.clone(),
        })?;
        let mut state = self.state.lock().unwrap();
        let db_key = key(organization, &request.name);
        if state.databases.contains_key(&db_key) {
            return Err(ApiError::status(409, "name has already been taken"));
        }

        let polls = state.provisioning_polls;
        let initial = if polls > 0 {
            DatabaseState::Pending
        } else {
            DatabaseState::Ready
        };
        let info = new_info(
            organization,
            &request.name,
            request.kind,
            initial,
            request.region.clone(),
        );
        let mut branches = HashMap::new();
        branches.insert(
            "main".to_string(),
            new_branch("main", None, &request.cluster_size),
        );
        state.databases.insert(
            db_key,
            FakeDatabase {
                info: info.clone(),
                branches,
                polls_until_ready: polls,
            },
        );
        Ok(info)
    }

    async fn update_database_settings(
        &self,
        organization: &str,
        name: &str,
        patch: &SettingsPatch,
    ) -> ApiResult<DatabaseInfo> {
        self.record(Call::UpdateSettings {
            organization: organization.to_string(),
            name: name.to_string(),
            patch: patch.clone(),
        })?;
        let mut state = self.state.lock().unwrap();
        let mut db = state
            .databases
            .remove(&key(organization, name))
            .ok_or_else(|| not_found("database"))?;

        if let Some(branch) = &patch.default_branch {
            if !db.branches.contains_key(branch) {
                state.databases.insert(key(organization, name), db);
                return Err(ApiError::status(422, format!("branch {branch} does not exist")));
            }
            db.info.default_branch = branch.clone();
        }

        let mut final_name = name.to_string();
        if let Some(new_name) = &patch.new_name {
            if state.databases.contains_key(&key(organization, new_name)) {
                state.databases.insert(key(organization, name), db);
                return Err(ApiError::status(409, "name has already been taken"));
            }
            db.info.name = new_name.clone();
            db.info.html_url = format!("https://app.planetscale.com/{organization}/{new_name}");
            final_name = new_name.clone();
        }

        db.info.updated_at = Utc::now();
        let info = db.info.clone();
        state.databases.insert(key(organization, &final_name), db);
        Ok(info)
    }

    async fn delete_database(&self, organization: &str, name: &str) -> ApiResult<DeleteOutcome> {
        self.record(Call::DeleteDatabase {
            organization: organization.to_string(),
            name: name.to_string(),
        })?;
        let mut state = self.state.lock().unwrap();
        Ok(match state.databases.remove(&key(organization, name)) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotFound,
        })
    }

    async fn get_branch(
        &self,
        organization: &str,
        database: &str,
        branch: &str,
    ) -> ApiResult<Option<BranchInfo>> {
        self.record(Call::GetBranch {
            organization: organization.to_string(),
            database: database.to_string(),
            branch: branch.to_string(),
        })?;
        let state = self.state.lock().unwrap();
        let db = state
            .databases
            .get(&key(organization, database))
            .ok_or_else(|| not_found("database"))?;
        Ok(db.branches.get(branch).cloned())
    }

    async fn create_branch(
        &self,
        organization: &str,
        database: &str,
        branch: &str,
        parent: &str,
    ) -> ApiResult<BranchInfo> {
        self.record(Call::CreateBranch {
            organization: organization.to_string(),
            database: database.to_string(),
            branch: branch.to_string(),
            parent: parent.to_string(),
        })?;
        let mut state = self.state.lock().unwrap();
        let db = state
            .databases
            .get_mut(&key(organization, database))
            .ok_or_else(|| not_found("database"))?;
        if db.info.state.is_transitional() {
            return Err(ApiError::status(422, "database is still provisioning"));
        }
        if db.branches.contains_key(branch) {
            return Err(ApiError::status(409, format!("branch {branch} already exists")));
        }
        let parent_size = db
            .branches
            .get(parent)
            .and_then(|p| p.cluster_size.clone())
            .ok_or_else(|| not_found("parent branch"))?;
        let created = new_branch(branch, Some(parent), &parent_size);
        db.branches.insert(branch.to_string(), created.clone());
        Ok(created)
    }

    async fn set_branch_cluster_size(
        &self,
        organization: &str,
        database: &str,
        branch: &str,
        cluster_size: &str,
    ) -> ApiResult<BranchInfo> {
        self.record(Call::SetClusterSize {
            organization: organization.to_string(),
            database: database.to_string(),
            branch: branch.to_string(),
            cluster_size: cluster_size.to_string(),
        })?;
        let mut state = self.state.lock().unwrap();
        let db = state
            .databases
            .get_mut(&key(organization, database))
            .ok_or_else(|| not_found("database"))?;
        let info = db
            .branches
            .get_mut(branch)
            .ok_or_else(|| not_found("branch"))?;
        info.cluster_size = Some(cluster_size.to_string());
        Ok(info.clone())
    }
}

/// Reconciler config used across tests: fast polls, one minute deadline.
pub fn test_config() -> ReconcilerConfig {
    ReconcilerConfig::default()
        .with_scope("test", "ci")
        .with_poll_interval(Duration::from_secs(1), Duration::from_secs(5))
        .with_ready_timeout(Duration::from_secs(60))
        .with_environment(Environment {
            organization: Some("env-org".to_string()),
        })
}

pub fn reconciler(api: &Arc<FakeApi>) -> DatabaseReconciler {
    reconciler_with(api, test_config())
}

pub fn reconciler_with(api: &Arc<FakeApi>, config: ReconcilerConfig) -> DatabaseReconciler {
    init_tracing();
    DatabaseReconciler::new(api.clone(), config)
}

/// Install a `RUST_LOG`-driven subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pscale_reconciler=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
