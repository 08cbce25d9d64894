//! liveops-teardown: dependency discovery and ordered channel teardown.
//!
//! A teardown request is validated ([`request`]), the channel's dependents
//! are discovered ([`discovery`]), deleted in dependency order before the
//! channel itself ([`orchestrator`]), and the result is shaped for callers
//! ([`report`]).

pub mod discovery;
pub mod orchestrator;
pub mod outcome;
pub mod report;
pub mod request;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use discovery::{discover, Discovery, OutputPlan};
pub use orchestrator::{TeardownOrchestrator, TeardownSettings};
pub use outcome::{DependentKind, DependentOutcome, DependentStatus, TeardownOutcome, TeardownStage};
pub use report::{TeardownFailure, TeardownReport, TeardownSuccess};
pub use request::{RawTeardownRequest, TeardownRequest};
