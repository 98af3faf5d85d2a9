//! Database reconciler - converges a PlanetScale database and its default
//! branch through the API client.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::branch::{create_branch, ensure_cluster_size, find_branch};
use super::{Outcome, Phase, Reconciler};
use crate::clients::{CreateDatabaseRequest, DatabaseApi, DatabaseInfo, DeleteOutcome, SettingsPatch};
use crate::config::ReconcilerConfig;
use crate::error::{ReconcileError, Result};
use crate::model::{DatabaseSpec, DatabaseStatus};
use crate::normalize::{normalize_cluster_size, physical_name, resolve_name, resolve_organization};
use crate::waiter::ReadinessWaiter;

/// Database reconciler.
///
/// Each pass is a single sequential flow of API calls. There is no
/// locking: the runtime must not run two passes for the same resource id
/// at once, otherwise the calls interleave in undefined order.
pub struct DatabaseReconciler {
    api: Arc<dyn DatabaseApi>,
    waiter: ReadinessWaiter,
    config: ReconcilerConfig,
}

/// Name, organization and cluster size a pass works with.
struct Target {
    organization: String,
    name: String,
    cluster_size: String,
}

impl DatabaseReconciler {
    pub fn new(api: Arc<dyn DatabaseApi>, config: ReconcilerConfig) -> Self {
        Self {
            api,
            waiter: ReadinessWaiter::from_config(&config),
            config,
        }
    }

    fn target(
        &self,
        id: &str,
        spec: &DatabaseSpec,
        prior: Option<&DatabaseStatus>,
    ) -> Result<Target> {
        let organization = resolve_organization(id, spec, prior, &self.config.environment)?;
        let name = resolve_name(id, spec, prior, |id| physical_name(&self.config.scope, id));
        if name.is_empty() {
            return Err(ReconcileError::Configuration(format!(
                "cannot derive a database name from id {id}: set `name`"
            )));
        }
        let cluster_size = normalize_cluster_size(
            &spec.cluster_size,
            spec.kind,
            spec.arch(),
            spec.region.as_deref(),
        )?;
        Ok(Target {
            organization,
            name,
            cluster_size,
        })
    }

    async fn get_database(&self, organization: &str, name: &str) -> Result<Option<DatabaseInfo>> {
        debug!(organization = %organization, database = %name, "Looking up database");
        self.api
            .get_database(organization, name)
            .await
            .map_err(ReconcileError::remote("get database", organization, name))
    }

    async fn update_settings(
        &self,
        organization: &str,
        name: &str,
        patch: &SettingsPatch,
    ) -> Result<DatabaseInfo> {
        info!(organization = %organization, database = %name, ?patch, "Updating database settings");
        self.api
            .update_database_settings(organization, name, patch)
            .await
            .map_err(ReconcileError::remote("update database settings", organization, name))
    }

    /// Create a database, or adopt a same-named one when the spec allows it.
    async fn create(
        &self,
        id: &str,
        spec: &DatabaseSpec,
        prior: Option<&DatabaseStatus>,
    ) -> Result<DatabaseStatus> {
        let Target {
            organization,
            name,
            cluster_size,
        } = self.target(id, spec, prior)?;

        if let Some(existing) = self.get_database(&organization, &name).await? {
            if !spec.adopt {
                return Err(ReconcileError::Conflict {
                    organization,
                    database: name,
                    message: "already exists; set adopt to manage it".to_string(),
                });
            }
            info!(
                organization = %organization,
                database = %name,
                id = %existing.id,
                "Adopting existing database"
            );
            let adopted = DatabaseStatus::observed(&existing, &organization);
            return self.update(id, spec, Some(&adopted)).await;
        }

        info!(
            organization = %organization,
            database = %name,
            kind = %spec.kind,
            cluster_size = %cluster_size,
            "Creating database"
        );
        let request = CreateDatabaseRequest::new(&name, spec, &cluster_size);
        let created = self
            .api
            .create_database(&organization, &request)
            .await
            .map_err(ReconcileError::remote("create database", &organization, &name))?;

        // The create endpoint rejects approval, region restriction, insights
        // and console settings, so they always follow as a separate patch.
        // A failure here leaves the database created but not fully
        // configured; the next pass applies the settings again.
        let mut current = self
            .update_settings(&organization, &name, &SettingsPatch::from_spec(spec))
            .await?;

        if spec.default_branch != created.default_branch {
            self.waiter
                .wait_until_ready(self.api.as_ref(), &organization, &name)
                .await?;
            if find_branch(self.api.as_ref(), &organization, &name, &spec.default_branch)
                .await?
                .is_none()
            {
                create_branch(
                    self.api.as_ref(),
                    &organization,
                    &name,
                    &spec.default_branch,
                    &created.default_branch,
                )
                .await?;
            }
            ensure_cluster_size(
                self.api.as_ref(),
                &organization,
                &name,
                &spec.default_branch,
                &cluster_size,
            )
            .await?;
            current = self
                .update_settings(
                    &organization,
                    &name,
                    &SettingsPatch::switch_default_branch(&spec.default_branch),
                )
                .await?;
        }

        Ok(DatabaseStatus::applied(
            &current,
            &organization,
            spec,
            cluster_size,
        ))
    }

    /// Converge an existing database: rename, default branch, settings,
    /// then cluster size of the production branch.
    async fn update(
        &self,
        id: &str,
        spec: &DatabaseSpec,
        prior: Option<&DatabaseStatus>,
    ) -> Result<DatabaseStatus> {
        let Target {
            organization,
            name,
            cluster_size,
        } = self.target(id, spec, prior)?;

        // Rename goes first and on its own; the provider does not apply a
        // rename and other settings atomically.
        if let Some(old_name) = prior
            .map(|p| p.name.as_str())
            .filter(|old| !old.is_empty() && *old != name)
        {
            info!(
                organization = %organization,
                from = %old_name,
                to = %name,
                "Renaming database"
            );
            match self
                .api
                .update_database_settings(&organization, old_name, &SettingsPatch::rename(&name))
                .await
            {
                Ok(_) => {}
                // A retried pass finds the rename already applied.
                Err(e) if e.is_not_found() => {
                    if self.get_database(&organization, &name).await?.is_none() {
                        return Err(ReconcileError::database_not_found(&organization, old_name));
                    }
                    warn!(
                        organization = %organization,
                        from = %old_name,
                        to = %name,
                        "Database already renamed"
                    );
                }
                Err(e) => {
                    return Err(ReconcileError::remote("rename database", &organization, old_name)(e))
                }
            }
        }

        let current = self
            .get_database(&organization, &name)
            .await?
            .ok_or_else(|| ReconcileError::database_not_found(&organization, &name))?;

        if current.kind != spec.kind {
            return Err(ReconcileError::Configuration(format!(
                "database {name} in organization {organization} is {}; engine kind cannot change to {}",
                current.kind, spec.kind
            )));
        }

        if spec.default_branch != current.default_branch
            && find_branch(self.api.as_ref(), &organization, &name, &spec.default_branch)
                .await?
                .is_none()
        {
            self.waiter
                .wait_until_ready(self.api.as_ref(), &organization, &name)
                .await?;
            create_branch(
                self.api.as_ref(),
                &organization,
                &name,
                &spec.default_branch,
                &current.default_branch,
            )
            .await?;
        }

        let patch = SettingsPatch::from_spec(spec).with_default_branch(&spec.default_branch);
        let updated = self.update_settings(&organization, &name, &patch).await?;

        ensure_cluster_size(
            self.api.as_ref(),
            &organization,
            &name,
            &spec.default_branch,
            &cluster_size,
        )
        .await?;

        Ok(DatabaseStatus::applied(
            &updated,
            &organization,
            spec,
            cluster_size,
        ))
    }

    /// Delete the remote database when the spec asks for it.
    ///
    /// With `delete` unset only the local record goes away and the remote
    /// database keeps running. A database that is already gone counts as
    /// deleted.
    pub async fn finalize(
        &self,
        id: &str,
        spec: &DatabaseSpec,
        prior: Option<&DatabaseStatus>,
    ) -> Result<()> {
        if !spec.delete {
            info!(id = %id, "Delete disabled, leaving remote database in place");
            return Ok(());
        }

        let organization = resolve_organization(id, spec, prior, &self.config.environment)?;
        let name = prior
            .map(|p| p.name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| {
                resolve_name(id, spec, prior, |id| physical_name(&self.config.scope, id))
            });

        info!(organization = %organization, database = %name, "Deleting database");
        match self.api.delete_database(&organization, &name).await {
            Ok(DeleteOutcome::Deleted) => {
                info!(organization = %organization, database = %name, "Database deleted");
                Ok(())
            }
            Ok(DeleteOutcome::NotFound) => {
                warn!(organization = %organization, database = %name, "Database already gone");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                warn!(organization = %organization, database = %name, "Database already gone");
                Ok(())
            }
            Err(e) => Err(ReconcileError::remote("delete database", &organization, &name)(e)),
        }
    }
}

#[async_trait]
impl Reconciler for DatabaseReconciler {
    type Spec = DatabaseSpec;
    type Status = DatabaseStatus;

    async fn reconcile(
        &self,
        phase: Phase,
        id: &str,
        spec: &Self::Spec,
        prior: Option<&Self::Status>,
    ) -> Result<Outcome<Self::Status>> {
        info!("Reconciling database {} ({})", id, phase.as_str());

        let result = match phase {
            Phase::Create => self.create(id, spec, prior).await.map(Outcome::Applied),
            Phase::Update => self.update(id, spec, prior).await.map(Outcome::Applied),
            Phase::Delete => self.finalize(id, spec, prior).await.map(|()| Outcome::Removed),
        };

        if let Err(e) = &result {
            error!("Database reconciliation failed for {} ({}): {}", id, phase.as_str(), e);
        }
        result
    }
}
