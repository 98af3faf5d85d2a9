//! Reconcilers for managed resources.
//!
//! A reconciler compares desired state (spec) with what the provider
//! reports and issues the calls needed to converge, for the phase the
//! runtime asks for.

pub mod branch;
pub mod database;

use async_trait::async_trait;

use crate::error::Result;

pub use database::DatabaseReconciler;

/// Lifecycle phase requested by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Create,
    Update,
    Delete,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Create => "create",
            Phase::Update => "update",
            Phase::Delete => "delete",
        }
    }
}

impl std::str::FromStr for Phase {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "create" => Ok(Phase::Create),
            "update" => Ok(Phase::Update),
            "delete" => Ok(Phase::Delete),
            _ => Err(()),
        }
    }
}

/// What the runtime should persist after a pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<S> {
    /// Store this status as the new record.
    Applied(S),
    /// Drop the local record.
    Removed,
}

impl<S> Outcome<S> {
    pub fn applied(self) -> Option<S> {
        match self {
            Outcome::Applied(status) => Some(status),
            Outcome::Removed => None,
        }
    }
}

/// Trait for resource reconcilers.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// Desired configuration supplied by the caller.
    type Spec: Sync;
    /// Record persisted between passes.
    type Status: Send + Sync;

    /// Run one pass for `phase`, given the record persisted by the previous
    /// pass (absent on first creation).
    async fn reconcile(
        &self,
        phase: Phase,
        id: &str,
        spec: &Self::Spec,
        prior: Option<&Self::Status>,
    ) -> Result<Outcome<Self::Status>>;
}
