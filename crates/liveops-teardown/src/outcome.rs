//! Teardown outcome and per-dependent accumulator.

use std::fmt;

use serde::Serialize;
use utoipa::ToSchema;

use liveops_core::Error;

/// Stage of the teardown process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum TeardownStage {
    Discovering,
    DeletingDependents,
    AwaitingStop,
    DeletingChannel,
    ReconcilingMetadata,
    Done,
}

impl TeardownStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeardownStage::Discovering => "Discovering",
            TeardownStage::DeletingDependents => "DeletingDependents",
            TeardownStage::AwaitingStop => "AwaitingStop",
            TeardownStage::DeletingChannel => "DeletingChannel",
            TeardownStage::ReconcilingMetadata => "ReconcilingMetadata",
            TeardownStage::Done => "Done",
        }
    }
}

impl fmt::Display for TeardownStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of resource hanging off a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum DependentKind {
    Output,
    Asset,
    Locator,
    StreamingPolicy,
}

impl fmt::Display for DependentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DependentKind::Output => "live output",
            DependentKind::Asset => "asset",
            DependentKind::Locator => "streaming locator",
            DependentKind::StreamingPolicy => "streaming policy",
        })
    }
}

/// What happened to a single dependent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "status", content = "detail", rename_all = "camelCase")]
pub enum DependentStatus {
    Deleted,
    /// Shared or predefined; never deleted with a channel.
    Preserved,
    /// Not attempted, with the reason.
    Skipped(String),
    /// Deletion attempted and failed, with the error.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DependentOutcome {
    pub kind: DependentKind,
    pub name: String,
    #[serde(flatten)]
    pub status: DependentStatus,
}

impl DependentOutcome {
    pub fn deleted(kind: DependentKind, name: impl Into<String>) -> Self {
        Self::with_status(kind, name, DependentStatus::Deleted)
    }

    pub fn preserved(kind: DependentKind, name: impl Into<String>) -> Self {
        Self::with_status(kind, name, DependentStatus::Preserved)
    }

    pub fn skipped(kind: DependentKind, name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::with_status(kind, name, DependentStatus::Skipped(reason.into()))
    }

    pub fn failed(kind: DependentKind, name: impl Into<String>, error: &Error) -> Self {
        Self::with_status(kind, name, DependentStatus::Failed(error.to_string()))
    }

    fn with_status(kind: DependentKind, name: impl Into<String>, status: DependentStatus) -> Self {
        Self {
            kind,
            name: name.into(),
            status,
        }
    }
}

/// The single result of a teardown invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeardownOutcome {
    pub channel: String,
    pub success: bool,
    /// Message of the fatal error, verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<TeardownStage>,
    /// HTTP status derived from the fatal error; 200 on success.
    #[serde(skip)]
    pub status: u16,
    pub dependents: Vec<DependentOutcome>,
    pub warnings: Vec<String>,
}

impl TeardownOutcome {
    pub fn succeeded(
        channel: impl Into<String>,
        dependents: Vec<DependentOutcome>,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            success: true,
            error_detail: None,
            failed_stage: None,
            status: 200,
            dependents,
            warnings,
        }
    }

    pub fn failed(
        channel: impl Into<String>,
        stage: TeardownStage,
        error: &Error,
        dependents: Vec<DependentOutcome>,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            success: false,
            error_detail: Some(error.to_string()),
            failed_stage: Some(stage),
            status: error.http_status(),
            dependents,
            warnings,
        }
    }

    /// Dependents that were attempted and not removed.
    pub fn failed_dependents(&self) -> impl Iterator<Item = &DependentOutcome> {
        self.dependents
            .iter()
            .filter(|d| matches!(d.status, DependentStatus::Failed(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependent_serializes_flat() {
        let json = serde_json::to_value(DependentOutcome::skipped(
            DependentKind::Asset,
            "a1",
            "asset retained by request",
        ))
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "kind": "asset",
                "name": "a1",
                "status": "skipped",
                "detail": "asset retained by request"
            })
        );

        let json = serde_json::to_value(DependentOutcome::deleted(DependentKind::Output, "out1"))
            .unwrap();
        assert_eq!(json["status"], "deleted");
        assert!(json.get("detail").is_none());
    }

    #[test]
    fn failed_outcome_carries_error_verbatim() {
        let err = Error::not_found("live event", "CH1");
        let outcome = TeardownOutcome::failed(
            "CH1",
            TeardownStage::Discovering,
            &err,
            Vec::new(),
            Vec::new(),
        );
        assert!(!outcome.success);
        assert_eq!(outcome.error_detail.as_deref(), Some("live event not found: CH1"));
        assert_eq!(outcome.status, 404);
    }

    #[test]
    fn failed_dependents_filters() {
        let err = Error::remote("delete asset", Some(500), "boom");
        let outcome = TeardownOutcome::succeeded(
            "CH1",
            vec![
                DependentOutcome::deleted(DependentKind::Output, "out1"),
                DependentOutcome::failed(DependentKind::Asset, "a1", &err),
            ],
            Vec::new(),
        );
        let failed: Vec<_> = outcome.failed_dependents().map(|d| d.name.as_str()).collect();
        assert_eq!(failed, vec!["a1"]);
    }
}
