//! Ordered teardown of a live channel.
//!
//! Stages run strictly in sequence:
//!
//! 1. **Discovering**: resolve the channel and its dependents.
//! 2. **DeletingDependents**: per output, delete the output, then its asset.
//!    A custom streaming policy is deleted once the last asset whose
//!    locators reference it is gone.
//! 3. **AwaitingStop**: re-read the channel state; stop a running channel or
//!    wait out a stopping one.
//! 4. **DeletingChannel**: delete the live event.
//! 5. **ReconcilingMetadata**: drop the metadata record (warning on failure).
//!
//! Fatal errors end the run with a failure outcome naming the stage. Asset
//! and policy failures are recorded per dependent and the run continues.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use liveops_core::config::TeardownConfig;
use liveops_core::{metadata_id, ChannelIdentity, ChannelState, Error, Result};
use liveops_media::MediaClient;
use liveops_store::MetadataStore;

use crate::discovery::{discover, OutputPlan};
use crate::outcome::{DependentKind, DependentOutcome, DependentStatus, TeardownOutcome, TeardownStage};

/// Timing of the stop wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeardownSettings {
    pub stop_poll_interval: Duration,
    /// `None` waits as long as the channel keeps stopping.
    pub stop_max_wait: Option<Duration>,
}

impl Default for TeardownSettings {
    fn default() -> Self {
        Self::from(&TeardownConfig::default())
    }
}

impl From<&TeardownConfig> for TeardownSettings {
    fn from(config: &TeardownConfig) -> Self {
        Self {
            stop_poll_interval: config.stop_poll_interval(),
            stop_max_wait: config.stop_max_wait(),
        }
    }
}

/// Failure of a fatal step, tagged with where it happened.
struct StageError {
    stage: TeardownStage,
    error: Error,
}

fn at(stage: TeardownStage) -> impl FnOnce(Error) -> StageError {
    move |error| StageError { stage, error }
}

/// Running tally of what happened to each dependent.
#[derive(Default)]
struct Progress {
    dependents: Vec<DependentOutcome>,
    warnings: Vec<String>,
}

impl Progress {
    fn push(&mut self, outcome: DependentOutcome) {
        if let DependentStatus::Failed(error) = &outcome.status {
            self.warnings
                .push(format!("{} {} was not deleted: {error}", outcome.kind, outcome.name));
        }
        self.dependents.push(outcome);
    }
}

/// Custom policies and the number of not-yet-deleted assets referencing them.
struct PolicyRefs {
    remaining: HashMap<String, usize>,
    /// Policies already deleted, attempted or skipped.
    settled: HashSet<String>,
}

impl PolicyRefs {
    fn new(plans: &[OutputPlan]) -> Self {
        let mut remaining = HashMap::new();
        for plan in plans.iter().filter(|p| p.asset.is_some()) {
            for policy in &plan.custom_policies {
                *remaining.entry(policy.clone()).or_insert(0) += 1;
            }
        }
        Self {
            remaining,
            settled: HashSet::new(),
        }
    }

    /// One referencing asset was deleted. True when `policy` is now
    /// unreferenced and still to be deleted.
    fn release(&mut self, policy: &str) -> bool {
        let Some(count) = self.remaining.get_mut(policy) else {
            return false;
        };
        *count = count.saturating_sub(1);
        *count == 0 && self.settled.insert(policy.to_string())
    }

    /// `policy` stays in place. True the first time, so it is reported once.
    fn keep(&mut self, policy: &str) -> bool {
        self.settled.insert(policy.to_string())
    }
}

/// Tears down channels using injected media and store handles.
#[derive(Clone)]
pub struct TeardownOrchestrator {
    media: Arc<dyn MediaClient>,
    store: Arc<dyn MetadataStore>,
    settings: TeardownSettings,
    cancel: CancellationToken,
}

impl TeardownOrchestrator {
    pub fn new(
        media: Arc<dyn MediaClient>,
        store: Arc<dyn MetadataStore>,
        settings: TeardownSettings,
    ) -> Self {
        Self {
            media,
            store,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort stop waits when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn settings(&self) -> &TeardownSettings {
        &self.settings
    }

    /// Tear down a channel and everything attached to it.
    ///
    /// Never returns an error: failures are reported in the outcome.
    pub async fn run(&self, identity: &ChannelIdentity, delete_asset: bool) -> TeardownOutcome {
        let channel = identity.channel_name.clone();
        tracing::info!(channel = %channel, account = %identity.scope, delete_asset, "Starting teardown");

        let mut progress = Progress::default();
        match self.execute(identity, delete_asset, &mut progress).await {
            Ok(()) => {
                tracing::info!(
                    channel = %channel,
                    dependents = progress.dependents.len(),
                    warnings = progress.warnings.len(),
                    "Teardown complete"
                );
                TeardownOutcome::succeeded(channel, progress.dependents, progress.warnings)
            }
            Err(StageError { stage, error }) => {
                tracing::error!(channel = %channel, stage = %stage, error = %error, "Teardown failed");
                TeardownOutcome::failed(channel, stage, &error, progress.dependents, progress.warnings)
            }
        }
    }

    async fn execute(
        &self,
        identity: &ChannelIdentity,
        delete_asset: bool,
        progress: &mut Progress,
    ) -> std::result::Result<(), StageError> {
        let discovery = discover(self.media.as_ref(), identity)
            .await
            .map_err(at(TeardownStage::Discovering))?;

        self.delete_dependents(identity, discovery.plans, delete_asset, progress)
            .await
            .map_err(at(TeardownStage::DeletingDependents))?;

        self.await_stop(identity)
            .await
            .map_err(at(TeardownStage::AwaitingStop))?;

        self.media
            .delete_channel(&identity.scope, &identity.channel_name)
            .await
            .map_err(at(TeardownStage::DeletingChannel))?;
        tracing::info!(channel = %identity.channel_name, "Deleted live event");

        self.reconcile_metadata(identity, progress).await;
        Ok(())
    }

    async fn delete_dependents(
        &self,
        identity: &ChannelIdentity,
        plans: Vec<OutputPlan>,
        delete_asset: bool,
        progress: &mut Progress,
    ) -> Result<()> {
        let scope = &identity.scope;
        let mut policies = PolicyRefs::new(&plans);

        for plan in plans {
            let output = &plan.output.name;
            if let Err(e) = self
                .media
                .delete_output(scope, &identity.channel_name, output)
                .await
            {
                progress.push(DependentOutcome::failed(DependentKind::Output, output, &e));
                return Err(e);
            }
            tracing::debug!(channel = %identity.channel_name, output = %output, "Deleted live output");
            progress.push(DependentOutcome::deleted(DependentKind::Output, output));

            for note in plan.notes {
                progress.push(note);
            }

            let Some(asset) = plan.asset else {
                continue;
            };

            if !delete_asset {
                progress.push(DependentOutcome::skipped(
                    DependentKind::Asset,
                    &asset.name,
                    "asset retained by request",
                ));
                for policy in plan.custom_policies {
                    if policies.keep(&policy) {
                        progress.push(DependentOutcome::skipped(
                            DependentKind::StreamingPolicy,
                            policy,
                            "asset retained by request",
                        ));
                    }
                }
                continue;
            }

            if let Err(e) = self.media.delete_asset(scope, &asset.name).await {
                tracing::warn!(asset = %asset.name, error = %e, "Failed to delete asset");
                progress.push(DependentOutcome::failed(DependentKind::Asset, &asset.name, &e));
                // Locators of a surviving asset still reference its policies.
                for policy in plan.custom_policies {
                    if policies.keep(&policy) {
                        progress.push(DependentOutcome::skipped(
                            DependentKind::StreamingPolicy,
                            policy,
                            "owning asset was not deleted",
                        ));
                    }
                }
                continue;
            }
            tracing::debug!(asset = %asset.name, "Deleted asset");
            progress.push(DependentOutcome::deleted(DependentKind::Asset, &asset.name));
            for locator in &plan.locators {
                progress.push(DependentOutcome::deleted(DependentKind::Locator, &locator.name));
            }

            for policy in plan.custom_policies {
                if !policies.release(&policy) {
                    continue;
                }
                match self.media.delete_policy(scope, &policy).await {
                    Ok(()) => {
                        tracing::debug!(policy = %policy, "Deleted streaming policy");
                        progress.push(DependentOutcome::deleted(
                            DependentKind::StreamingPolicy,
                            policy,
                        ));
                    }
                    Err(e) => {
                        tracing::warn!(policy = %policy, error = %e, "Failed to delete streaming policy");
                        progress.push(DependentOutcome::failed(
                            DependentKind::StreamingPolicy,
                            policy,
                            &e,
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    /// Bring the channel to a deletable state.
    async fn await_stop(&self, identity: &ChannelIdentity) -> Result<()> {
        let name = &identity.channel_name;
        let state = self.current_state(identity).await?;

        match state {
            ChannelState::Running => {
                tracing::info!(channel = %name, "Stopping live event");
                self.media.stop_channel(&identity.scope, name).await
            }
            ChannelState::Stopping => self.wait_while_stopping(identity).await,
            other => {
                tracing::debug!(channel = %name, state = %other, "No stop needed");
                Ok(())
            }
        }
    }

    async fn wait_while_stopping(&self, identity: &ChannelIdentity) -> Result<()> {
        let name = &identity.channel_name;
        let started = Instant::now();
        tracing::info!(channel = %name, "Waiting for live event to stop");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    return Err(Error::Cancelled(format!(
                        "stopped waiting for live event {name} to stop"
                    )));
                }
                _ = tokio::time::sleep(self.settings.stop_poll_interval) => {}
            }

            let state = self.current_state(identity).await?;
            if state != ChannelState::Stopping {
                tracing::info!(
                    channel = %name,
                    state = %state,
                    waited_ms = started.elapsed().as_millis() as u64,
                    "Live event left Stopping"
                );
                return Ok(());
            }

            if let Some(max_wait) = self.settings.stop_max_wait {
                if started.elapsed() >= max_wait {
                    return Err(Error::Timeout {
                        what: format!("live event {name} to stop"),
                        waited_secs: started.elapsed().as_secs(),
                    });
                }
            }
        }
    }

    async fn current_state(&self, identity: &ChannelIdentity) -> Result<ChannelState> {
        let name = &identity.channel_name;
        match self.media.get_channel(&identity.scope, name).await {
            Ok(Some(channel)) => Ok(channel.state),
            Ok(None) => Err(Error::StateTransition(format!(
                "live event {name} disappeared before it could be deleted"
            ))),
            Err(e) => Err(Error::StateTransition(format!(
                "failed to query state of live event {name}: {e}"
            ))),
        }
    }

    async fn reconcile_metadata(&self, identity: &ChannelIdentity, progress: &mut Progress) {
        let id = metadata_id(identity);
        match self.store.delete(identity).await {
            Ok(true) => tracing::debug!(id = %id, store = self.store.name(), "Removed metadata record"),
            Ok(false) => {
                tracing::warn!(id = %id, "Metadata store not configured");
                progress.warnings.push(format!(
                    "metadata store is not configured; record {id} was not removed"
                ));
            }
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "Failed to remove metadata record");
                progress
                    .warnings
                    .push(format!("failed to remove metadata record {id}: {e}"));
            }
        }
    }
}
