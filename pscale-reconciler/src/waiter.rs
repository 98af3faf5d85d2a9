//! Polling until a database leaves its provisioning states.
//!
//! The provider has no completion event, so dependent operations (branch
//! creation on a fresh database) wait here first.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::clients::{DatabaseApi, DatabaseInfo};
use crate::config::ReconcilerConfig;
use crate::error::{ReconcileError, Result};

/// Polls a database with doubling delays until it settles or a deadline passes.
#[derive(Debug, Clone)]
pub struct ReadinessWaiter {
    poll_interval: Duration,
    max_poll_interval: Duration,
    timeout: Duration,
}

impl ReadinessWaiter {
    pub fn new(poll_interval: Duration, max_poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            max_poll_interval: max_poll_interval.max(poll_interval),
            timeout,
        }
    }

    pub fn from_config(config: &ReconcilerConfig) -> Self {
        Self::new(
            config.poll_interval,
            config.max_poll_interval,
            config.ready_timeout,
        )
    }

    /// Wait until `database` is no longer in a transitional state.
    ///
    /// Only transitional states are retried. A failed lookup aborts the
    /// wait, and a database that disappears is `NotFound`.
    pub async fn wait_until_ready<A>(
        &self,
        api: &A,
        organization: &str,
        database: &str,
    ) -> Result<DatabaseInfo>
    where
        A: DatabaseApi + ?Sized,
    {
        let started = Instant::now();
        // No deadline when the timeout does not fit the clock.
        let deadline = started.checked_add(self.timeout);
        let mut delay = self.poll_interval;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let info = api
                .get_database(organization, database)
                .await
                .map_err(ReconcileError::remote("get database", organization, database))?
                .ok_or_else(|| ReconcileError::database_not_found(organization, database))?;

            if !info.state.is_transitional() {
                info!(
                    organization = %organization,
                    database = %database,
                    state = %info.state,
                    attempts = attempt,
                    "Database ready"
                );
                return Ok(info);
            }

            let now = Instant::now();
            if deadline.is_some_and(|deadline| now >= deadline) {
                return Err(ReconcileError::Timeout {
                    organization: organization.to_string(),
                    database: database.to_string(),
                    last_state: info.state.to_string(),
                    waited: now - started,
                });
            }

            debug!(
                organization = %organization,
                database = %database,
                state = %info.state,
                attempt,
                "Database still provisioning, retrying in {:?}",
                delay
            );
            let pause = match deadline {
                Some(deadline) => delay.min(deadline - now),
                None => delay,
            };
            tokio::time::sleep(pause).await;
            delay = (delay * 2).min(self.max_poll_interval);
        }
    }
}
