//! Caller-facing teardown result payloads.

use serde::Serialize;
use utoipa::ToSchema;

use liveops_core::Error;

use crate::outcome::{DependentOutcome, TeardownOutcome, TeardownStage};

/// Body returned when a channel was torn down.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeardownSuccess {
    pub channel_name: String,
    pub success: bool,
    /// Version of the running service
    pub operations_version: String,
    /// Non-fatal problems (dependents left behind, metadata not reconciled)
    pub warnings: Vec<String>,
    pub dependents: Vec<DependentOutcome>,
}

/// Body returned when a teardown could not complete.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeardownFailure {
    pub success: bool,
    pub error_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<TeardownStage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependents: Vec<DependentOutcome>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Result of an invocation with the status to send it with.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TeardownReport {
    Success(TeardownSuccess),
    Failure(TeardownFailure),
}

impl TeardownReport {
    pub fn from_outcome(outcome: TeardownOutcome, operations_version: &str) -> (u16, Self) {
        if outcome.success {
            let body = TeardownSuccess {
                channel_name: outcome.channel,
                success: true,
                operations_version: operations_version.to_string(),
                warnings: outcome.warnings,
                dependents: outcome.dependents,
            };
            return (200, TeardownReport::Success(body));
        }

        let body = TeardownFailure {
            success: false,
            error_message: outcome
                .error_detail
                .unwrap_or_else(|| "teardown failed".to_string()),
            failed_stage: outcome.failed_stage,
            dependents: outcome.dependents,
            warnings: outcome.warnings,
        };
        (outcome.status, TeardownReport::Failure(body))
    }

    /// Failure before any teardown was attempted (e.g. invalid input).
    pub fn from_error(error: &Error) -> (u16, Self) {
        let body = TeardownFailure {
            success: false,
            error_message: error.to_string(),
            failed_stage: None,
            dependents: Vec::new(),
            warnings: Vec::new(),
        };
        (error.http_status(), TeardownReport::Failure(body))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TeardownReport::Success(_))
    }
}
