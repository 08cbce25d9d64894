//! JSON shapes returned by the media-services management API.

use serde::Deserialize;

/// An ARM resource envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct Resource<P> {
    pub name: String,
    #[serde(default)]
    pub properties: P,
}

/// A page of a list operation.
#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LiveEventProperties {
    pub resource_state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LiveOutputProperties {
    pub asset_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssetProperties {
    pub container: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StreamingLocatorProperties {
    pub streaming_policy_name: Option<String>,
}

/// Response of `assets/{name}/listStreamingLocators`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListStreamingLocatorsResponse {
    #[serde(default)]
    pub streaming_locators: Vec<LocatorSummary>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LocatorSummary {
    pub name: Option<String>,
}

/// Body of an `Azure-AsyncOperation` status resource.
#[derive(Debug, Deserialize)]
pub(crate) struct AsyncOperation {
    pub status: String,
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

/// Standard ARM error envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl ErrorDetail {
    pub fn describe(&self) -> String {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => format!("{code}: {message}"),
            (None, Some(message)) => message.clone(),
            (Some(code), None) => code.clone(),
            (None, None) => "unknown error".into(),
        }
    }
}
