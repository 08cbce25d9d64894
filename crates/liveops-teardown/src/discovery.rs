//! Read-only discovery of a channel's dependents.
//!
//! Walks channel -> outputs -> asset -> locators -> policies. Only the
//! channel lookup and the output listing are fatal; any other lookup that
//! fails or finds nothing ends that leg with a note and the walk continues.

use std::collections::HashSet;

use liveops_core::{
    is_custom_policy, AssetRecord, Channel, ChannelIdentity, Error, LiveOutputRecord, Result,
    StreamingLocatorRecord,
};
use liveops_media::MediaClient;

use crate::outcome::{DependentKind, DependentOutcome};

/// Everything found attached to a channel.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub channel: Channel,
    /// One plan per live output, in listing order.
    pub plans: Vec<OutputPlan>,
}

/// What to delete for a single live output.
#[derive(Debug, Clone)]
pub struct OutputPlan {
    pub output: LiveOutputRecord,
    /// The output's asset, when it could be resolved.
    pub asset: Option<AssetRecord>,
    /// Locators whose policy was captured.
    pub locators: Vec<StreamingLocatorRecord>,
    /// Distinct channel-prefixed policies referenced by the asset's locators.
    pub custom_policies: Vec<String>,
    /// Legs that ended early and policies that are kept.
    pub notes: Vec<DependentOutcome>,
}

impl OutputPlan {
    fn new(output: LiveOutputRecord) -> Self {
        Self {
            output,
            asset: None,
            locators: Vec::new(),
            custom_policies: Vec::new(),
            notes: Vec::new(),
        }
    }
}

/// Discover a channel's dependents.
///
/// Fails with [`Error::NotFound`] when the channel does not exist.
pub async fn discover(media: &dyn MediaClient, identity: &ChannelIdentity) -> Result<Discovery> {
    let scope = &identity.scope;
    let name = &identity.channel_name;

    let channel = media
        .get_channel(scope, name)
        .await?
        .ok_or_else(|| Error::not_found("live event", name))?;

    let outputs = media.list_outputs(scope, name).await?;
    tracing::debug!(channel = %name, state = %channel.state, outputs = outputs.len(), "Discovered live event");

    let mut plans = Vec::with_capacity(outputs.len());
    for output in outputs {
        plans.push(plan_output(media, identity, output).await);
    }

    Ok(Discovery { channel, plans })
}

async fn plan_output(
    media: &dyn MediaClient,
    identity: &ChannelIdentity,
    output: LiveOutputRecord,
) -> OutputPlan {
    let scope = &identity.scope;
    let asset_name = output.asset_name.clone();
    let mut plan = OutputPlan::new(output);

    match media.get_asset(scope, &asset_name).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            plan.notes.push(DependentOutcome::skipped(
                DependentKind::Asset,
                &asset_name,
                "asset not found",
            ));
            return plan;
        }
        Err(e) => {
            tracing::warn!(asset = %asset_name, error = %e, "Asset lookup failed");
            plan.notes.push(DependentOutcome::skipped(
                DependentKind::Asset,
                &asset_name,
                format!("asset lookup failed: {e}"),
            ));
            return plan;
        }
    }

    let locator_names = match media.list_locators_for_asset(scope, &asset_name).await {
        Ok(names) => dedup(names),
        Err(e) => {
            tracing::warn!(asset = %asset_name, error = %e, "Listing streaming locators failed");
            plan.notes.push(DependentOutcome::skipped(
                DependentKind::Locator,
                &asset_name,
                format!("locator listing failed: {e}"),
            ));
            Vec::new()
        }
    };

    let mut policies = Vec::new();
    for locator_name in &locator_names {
        match media.get_locator(scope, locator_name).await {
            Ok(Some(locator)) => {
                if let Some(policy) = &locator.streaming_policy_name {
                    policies.push(policy.clone());
                }
                plan.locators.push(locator);
            }
            Ok(None) => plan.notes.push(DependentOutcome::skipped(
                DependentKind::Locator,
                locator_name,
                "locator not found",
            )),
            Err(e) => {
                tracing::warn!(locator = %locator_name, error = %e, "Locator lookup failed");
                plan.notes.push(DependentOutcome::skipped(
                    DependentKind::Locator,
                    locator_name,
                    format!("locator lookup failed: {e}"),
                ));
            }
        }
    }

    for policy in dedup(policies) {
        if is_custom_policy(&policy, &identity.channel_name) {
            plan.custom_policies.push(policy);
        } else {
            plan.notes
                .push(DependentOutcome::preserved(DependentKind::StreamingPolicy, policy));
        }
    }

    plan.asset = Some(AssetRecord {
        name: asset_name,
        locator_names,
    });
    plan
}

/// Drop repeated names, keeping first-seen order.
fn dedup(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|n| seen.insert(n.clone()))
        .collect()
}
