//! pscale-reconciler: declarative reconciliation of PlanetScale databases.
//!
//! Given a desired database configuration, this crate:
//! - Resolves the effective name, organization and cluster size
//! - Creates, adopts, updates or deletes the database through the API client
//! - Creates the requested default branch once the database has provisioned
//! - Returns the status record the runtime persists for the next pass
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use pscale_reconciler::{DatabaseReconciler, DatabaseSpec, Phase, Reconciler, ReconcilerConfig};
//!
//! let reconciler = DatabaseReconciler::new(Arc::new(client), ReconcilerConfig::from_env());
//! let spec = DatabaseSpec { default_branch: "staging".into(), ..Default::default() };
//! let outcome = reconciler.reconcile(Phase::Create, "orders", &spec, None).await?;
//! ```

pub mod clients;
pub mod config;
pub mod error;
pub mod model;
pub mod normalize;
pub mod reconciler;
pub mod waiter;

pub use clients::{ApiError, DatabaseApi};
pub use config::{Environment, NameScope, ReconcilerConfig};
pub use error::{ReconcileError, Result};
pub use model::{Arch, DatabaseSpec, DatabaseState, DatabaseStatus, EngineKind};
pub use reconciler::{DatabaseReconciler, Outcome, Phase, Reconciler};
pub use waiter::ReadinessWaiter;
