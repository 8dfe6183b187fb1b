//! Application state shared across handlers.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinSet;
use tracing::debug;

use crate::config::RelayConfig;
use crate::error::AppError;
use crate::salesforce::{SalesforceClient, credential_source_from_config};
use crate::services::DecisionRelay;
use crate::slack::SlackClient;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    slack: SlackClient,
    relay: DecisionRelay,
    home_view_path: PathBuf,
    tasks: Mutex<JoinSet<()>>,
}

impl AppState {
    /// Create state from already-built collaborators.
    #[must_use]
    pub fn new(slack: SlackClient, relay: DecisionRelay, home_view_path: PathBuf) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                slack,
                relay,
                home_view_path,
                tasks: Mutex::new(JoinSet::new()),
            }),
        }
    }

    /// Build the Slack and Salesforce clients and the relay from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn from_config(config: &RelayConfig) -> Result<Self, AppError> {
        let slack = SlackClient::from_config(&config.slack, &config.http)?;

        let credentials =
            credential_source_from_config(&config.salesforce.credential, &config.http)?;
        let salesforce =
            SalesforceClient::from_config(&config.salesforce, credentials, &config.http)?;

        let relay = DecisionRelay::new(
            Arc::new(slack.clone()),
            Arc::new(salesforce),
            config.dedupe_ttl,
        );

        Ok(Self::new(
            slack,
            relay,
            config.slack.home_view_path.clone(),
        ))
    }

    /// Get a reference to the Slack client.
    #[must_use]
    pub fn slack(&self) -> &SlackClient {
        &self.inner.slack
    }

    /// Get a reference to the decision relay.
    #[must_use]
    pub fn relay(&self) -> &DecisionRelay {
        &self.inner.relay
    }

    /// Path of the App Home view JSON.
    #[must_use]
    pub fn home_view_path(&self) -> &Path {
        &self.inner.home_view_path
    }

    /// Run `task` in the background, after the webhook has been acknowledged.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Reap finished tasks so the set only holds running ones
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }

    /// Wait for every background task spawned so far.
    pub async fn drain(&self) {
        let mut tasks = {
            let mut guard = self
                .inner
                .tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };

        if !tasks.is_empty() {
            debug!(pending = tasks.len(), "Waiting for background relays");
        }
        while tasks.join_next().await.is_some() {}
    }
}
