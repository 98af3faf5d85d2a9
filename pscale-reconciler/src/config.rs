//! Reconciler configuration and environment defaults.

use std::time::Duration;

/// Primary environment variable holding the default organization.
pub const ORGANIZATION_ENV: &str = "PLANETSCALE_ORGANIZATION";

/// Older spelling, consulted after `ORGANIZATION_ENV`.
pub const LEGACY_ORGANIZATION_ENV: &str = "PLANETSCALE_ORG_ID";

/// Defaults taken from the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    pub organization: Option<String>,
}

impl Environment {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let organization = [ORGANIZATION_ENV, LEGACY_ORGANIZATION_ENV]
            .into_iter()
            .filter_map(|key| lookup(key))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty());
        Self { organization }
    }
}

/// App and stage used to derive physical names from logical ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameScope {
    pub app: String,
    pub stage: String,
}

impl Default for NameScope {
    fn default() -> Self {
        Self {
            app: "app".to_string(),
            stage: "dev".to_string(),
        }
    }
}

/// Configuration for `DatabaseReconciler`.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// First delay between readiness polls.
    pub poll_interval: Duration,
    /// Upper bound for the doubling poll delay.
    pub max_poll_interval: Duration,
    /// How long to wait for a database to leave provisioning.
    pub ready_timeout: Duration,
    pub scope: NameScope,
    pub environment: Environment,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_poll_interval: Duration::from_secs(10),
            ready_timeout: Duration::from_secs(600),
            scope: NameScope::default(),
            environment: Environment::default(),
        }
    }
}

impl ReconcilerConfig {
    /// Defaults with the environment read from the current process.
    pub fn from_env() -> Self {
        Self {
            environment: Environment::from_env(),
            ..Default::default()
        }
    }

    pub fn with_scope(mut self, app: &str, stage: &str) -> Self {
        self.scope = NameScope {
            app: app.to_string(),
            stage: stage.to_string(),
        };
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_poll_interval(mut self, initial: Duration, max: Duration) -> Self {
        self.poll_interval = initial;
        self.max_poll_interval = max;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }
}
