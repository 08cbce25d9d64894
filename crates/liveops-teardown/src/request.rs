//! Teardown request parsing.
//!
//! Callers send a loosely shaped JSON object (or query string). It is parsed
//! into [`RawTeardownRequest`] and validated into a [`TeardownRequest`] in a
//! single step; nothing downstream touches the raw fields.

use serde::Deserialize;
use utoipa::ToSchema;

use liveops_core::{Error, Result};

/// Teardown request as received on the wire.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawTeardownRequest {
    /// Live event (channel) name
    #[serde(default, alias = "liveEventName")]
    pub channel_name: Option<String>,
    /// Delete the recorded assets and their custom streaming policies (default true)
    #[serde(default)]
    pub delete_asset: Option<bool>,
    /// Region suffix selecting the media account
    #[serde(default, alias = "azureRegion")]
    pub region_selector: Option<String>,
}

/// A validated teardown request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownRequest {
    pub channel_name: String,
    pub delete_asset: bool,
    pub region: Option<String>,
}

impl TeardownRequest {
    pub fn new(channel_name: impl Into<String>) -> Self {
        Self {
            channel_name: channel_name.into(),
            delete_asset: true,
            region: None,
        }
    }
}

impl RawTeardownRequest {
    /// Parse a JSON body.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| Error::Validation(format!("invalid request body: {e}")))
    }

    /// Fill fields missing here from `other` (query parameters backing up the
    /// body).
    pub fn or(self, other: RawTeardownRequest) -> Self {
        Self {
            channel_name: self.channel_name.or(other.channel_name),
            delete_asset: self.delete_asset.or(other.delete_asset),
            region_selector: self.region_selector.or(other.region_selector),
        }
    }

    /// Validate into a [`TeardownRequest`].
    pub fn validate(self) -> Result<TeardownRequest> {
        let channel_name = self
            .channel_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::Validation("channelName is required".into()))?;

        if channel_name.contains('/') {
            return Err(Error::Validation(format!(
                "channelName '{channel_name}' must not contain '/'"
            )));
        }

        let region = self
            .region_selector
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        Ok(TeardownRequest {
            channel_name,
            delete_asset: self.delete_asset.unwrap_or(true),
            region,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_body_defaults_delete_asset() {
        let request = RawTeardownRequest::from_json(br#"{"channelName":"CH1"}"#)
            .unwrap()
            .validate()
            .unwrap();
        assert_eq!(request, TeardownRequest::new("CH1"));
    }

    #[test]
    fn aliases_are_accepted() {
        let request = RawTeardownRequest::from_json(
            br#"{"liveEventName":"CH1","deleteAsset":false,"azureRegion":"euwe"}"#,
        )
        .unwrap()
        .validate()
        .unwrap();
        assert_eq!(request.channel_name, "CH1");
        assert!(!request.delete_asset);
        assert_eq!(request.region.as_deref(), Some("euwe"));
    }

    #[test]
    fn missing_channel_is_validation_error() {
        let err = RawTeardownRequest::from_json(br#"{"deleteAsset":true}"#)
            .unwrap()
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn blank_channel_is_validation_error() {
        let err = RawTeardownRequest::from_json(br#"{"channelName":"   "}"#)
            .unwrap()
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("channelName is required"));
    }

    #[test]
    fn empty_body_parses_to_default() {
        let raw = RawTeardownRequest::from_json(b"  ").unwrap();
        assert!(raw.channel_name.is_none());
    }

    #[test]
    fn malformed_body_is_validation_error() {
        let err = RawTeardownRequest::from_json(b"{not json").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn wrong_type_is_validation_error() {
        let err = RawTeardownRequest::from_json(br#"{"channelName":"CH1","deleteAsset":"yes"}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn body_takes_precedence_over_query() {
        let body = RawTeardownRequest {
            channel_name: Some("FromBody".into()),
            ..Default::default()
        };
        let query = RawTeardownRequest {
            channel_name: Some("FromQuery".into()),
            delete_asset: Some(false),
            region_selector: None,
        };
        let request = body.or(query).validate().unwrap();
        assert_eq!(request.channel_name, "FromBody");
        assert!(!request.delete_asset);
    }

    #[test]
    fn blank_region_is_dropped() {
        let raw = RawTeardownRequest {
            channel_name: Some("CH1".into()),
            region_selector: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(raw.validate().unwrap().region, None);
    }

    #[test]
    fn slash_in_channel_is_rejected() {
        let raw = RawTeardownRequest {
            channel_name: Some("a/b".into()),
            ..Default::default()
        };
        assert!(raw.validate().is_err());
    }
}
