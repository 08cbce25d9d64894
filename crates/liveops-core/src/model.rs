//! Channel and media-resource data model.
//!
//! These types mirror what the media service reports about a live event and
//! the resources hanging off it, carrying only the fields the teardown flow
//! needs to discover and order deletions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The media-services account a channel lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountScope {
    pub subscription_id: String,
    pub resource_group: String,
    pub account_name: String,
}

impl fmt::Display for AccountScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_group, self.account_name)
    }
}

/// Identity of a live channel: the key for every downstream lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelIdentity {
    pub scope: AccountScope,
    pub channel_name: String,
}

impl ChannelIdentity {
    pub fn new(scope: AccountScope, channel_name: impl Into<String>) -> Self {
        Self {
            scope,
            channel_name: channel_name.into(),
        }
    }
}

impl fmt::Display for ChannelIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scope, self.channel_name)
    }
}

// ---------------------------------------------------------------------------
// Channel state
// ---------------------------------------------------------------------------

/// Resource state of a live channel as reported by the media service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Deleting,
}

impl ChannelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelState::Stopped => "Stopped",
            ChannelState::Starting => "Starting",
            ChannelState::Running => "Running",
            ChannelState::Stopping => "Stopping",
            ChannelState::Deleting => "Deleting",
        }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stopped" => Ok(ChannelState::Stopped),
            "starting" => Ok(ChannelState::Starting),
            "running" => Ok(ChannelState::Running),
            "stopping" => Ok(ChannelState::Stopping),
            "deleting" => Ok(ChannelState::Deleting),
            other => Err(Error::Validation(format!(
                "unknown channel resource state '{other}'"
            ))),
        }
    }
}

/// A live channel as reported by `get_channel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub state: ChannelState,
}

// ---------------------------------------------------------------------------
// Dependents
// ---------------------------------------------------------------------------

/// A live output attached to a channel. Each output records into exactly
/// one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveOutputRecord {
    pub name: String,
    pub asset_name: String,
}

/// An asset as reported by `get_asset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    pub container: Option<String>,
}

/// A discovered asset together with the locators that reference it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub name: String,
    /// Distinct locator names, in the order the service listed them.
    pub locator_names: Vec<String>,
}

/// A streaming locator and the policy it publishes with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingLocatorRecord {
    pub name: String,
    pub streaming_policy_name: Option<String>,
}

/// Whether a streaming policy was created for this channel and may be
/// deleted with it. Shared and predefined policies never carry the channel
/// name as a prefix.
pub fn is_custom_policy(policy_name: &str, channel_name: &str) -> bool {
    !channel_name.is_empty() && policy_name.starts_with(channel_name)
}

// ---------------------------------------------------------------------------
// Metadata record
// ---------------------------------------------------------------------------

/// Per-channel document persisted in the metadata store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMetadata {
    pub id: String,
    pub live_event_name: String,
    pub ams_account_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_state: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl ChannelMetadata {
    pub fn new(identity: &ChannelIdentity) -> Self {
        Self {
            id: metadata_id(identity),
            live_event_name: identity.channel_name.clone(),
            ams_account_name: identity.scope.account_name.clone(),
            azure_region: None,
            resource_state: None,
            last_updated: Utc::now(),
        }
    }
}

/// Document id of a channel's metadata record.
pub fn metadata_id(identity: &ChannelIdentity) -> String {
    format!("{}-{}", identity.channel_name, identity.scope.account_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> AccountScope {
        AccountScope {
            subscription_id: "sub".into(),
            resource_group: "rg".into(),
            account_name: "amsacct".into(),
        }
    }

    #[test]
    fn channel_state_parses_case_insensitively() {
        assert_eq!("Running".parse::<ChannelState>().unwrap(), ChannelState::Running);
        assert_eq!("stopping".parse::<ChannelState>().unwrap(), ChannelState::Stopping);
        assert_eq!("STOPPED".parse::<ChannelState>().unwrap(), ChannelState::Stopped);
        assert!("Allocating".parse::<ChannelState>().is_err());
    }

    #[test]
    fn channel_state_display_roundtrip() {
        for state in [
            ChannelState::Stopped,
            ChannelState::Starting,
            ChannelState::Running,
            ChannelState::Stopping,
            ChannelState::Deleting,
        ] {
            assert_eq!(state.to_string().parse::<ChannelState>().unwrap(), state);
        }
    }

    #[test]
    fn custom_policy_requires_channel_prefix() {
        assert!(is_custom_policy("CH1-custom-policy", "CH1"));
        assert!(!is_custom_policy("shared-default-policy", "CH1"));
        assert!(!is_custom_policy("Predefined_ClearStreamingOnly", "CH1"));
        assert!(!is_custom_policy("anything", ""));
    }

    #[test]
    fn metadata_id_combines_channel_and_account() {
        let identity = ChannelIdentity::new(scope(), "CH1");
        assert_eq!(metadata_id(&identity), "CH1-amsacct");
    }

    #[test]
    fn metadata_serializes_camel_case() {
        let identity = ChannelIdentity::new(scope(), "CH1");
        let record = ChannelMetadata::new(&identity);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "CH1-amsacct");
        assert_eq!(json["liveEventName"], "CH1");
        assert_eq!(json["amsAccountName"], "amsacct");
        assert!(json.get("azureRegion").is_none());
    }

    #[test]
    fn identity_display() {
        let identity = ChannelIdentity::new(scope(), "CH1");
        assert_eq!(identity.to_string(), "rg/amsacct/CH1");
    }
}
