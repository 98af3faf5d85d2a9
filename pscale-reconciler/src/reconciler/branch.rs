//! Branch helpers - the dependent sub-resource of a database.

use tracing::{debug, info};

use crate::clients::{BranchInfo, DatabaseApi};
use crate::error::{ReconcileError, Result};

/// Look up a branch, `None` if it does not exist.
pub async fn find_branch(
    api: &dyn DatabaseApi,
    organization: &str,
    database: &str,
    branch: &str,
) -> Result<Option<BranchInfo>> {
    debug!(database = %database, branch = %branch, "Probing branch");
    api.get_branch(organization, database, branch)
        .await
        .map_err(ReconcileError::remote("get branch", organization, database))
}

/// Create `branch` from `parent`. The database must be out of provisioning.
pub async fn create_branch(
    api: &dyn DatabaseApi,
    organization: &str,
    database: &str,
    branch: &str,
    parent: &str,
) -> Result<BranchInfo> {
    info!(
        organization = %organization,
        database = %database,
        branch = %branch,
        parent = %parent,
        "Creating branch"
    );
    api.create_branch(organization, database, branch, parent)
        .await
        .map_err(ReconcileError::remote("create branch", organization, database))
}

/// Make the branch run on `cluster_size`, resizing only when it differs.
///
/// Resizing a live branch is a separate provider mechanism from settings
/// updates, which is why this is not folded into the settings patch.
pub async fn ensure_cluster_size(
    api: &dyn DatabaseApi,
    organization: &str,
    database: &str,
    branch: &str,
    cluster_size: &str,
) -> Result<()> {
    let current = find_branch(api, organization, database, branch)
        .await?
        .ok_or_else(|| ReconcileError::branch_not_found(organization, database, branch))?;

    if current.cluster_size.as_deref() == Some(cluster_size) {
        debug!(
            database = %database,
            branch = %branch,
            cluster_size = %cluster_size,
            "Branch already at desired cluster size"
        );
        return Ok(());
    }

    info!(
        organization = %organization,
        database = %database,
        branch = %branch,
        from = current.cluster_size.as_deref().unwrap_or("unknown"),
        to = %cluster_size,
        "Resizing branch"
    );
    api.set_branch_cluster_size(organization, database, branch, cluster_size)
        .await
        .map_err(ReconcileError::remote("set branch cluster size", organization, database))?;
    Ok(())
}
