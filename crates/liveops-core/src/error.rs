//! Unified error type for liveops.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for the HTTP layer to derive a status code via [`Error::http_status`].

use std::fmt;

/// Unified error type covering every failure mode of a channel operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested resource could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of resource (e.g. "live event", "asset").
        entity: String,
        /// The name that was looked up.
        id: String,
    },

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A call to the media service failed (transport error, non-success
    /// status, or a resource that vanished underneath us).
    #[error("Remote error [{operation}]: {message}")]
    Remote {
        /// The media-service operation that failed.
        operation: String,
        /// HTTP status returned by the service, if one was received.
        status: Option<u16>,
        /// Human-readable error description.
        message: String,
    },

    /// Re-querying the channel while waiting for a state change failed.
    #[error("State transition error: {0}")]
    StateTransition(String),

    /// A bounded wait expired.
    #[error("Timed out after {waited_secs}s waiting for {what}")]
    Timeout {
        /// What we were waiting for.
        what: String,
        /// How long we waited.
        waited_secs: u64,
    },

    /// The operation was cancelled (e.g. server shutdown).
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// The metadata store failed.
    #[error("Store error: {source}")]
    Store {
        /// The underlying store error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration is missing or inconsistent.
    #[error("Config error: {0}")]
    Config(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Validation(_) => 400,
            Error::Unauthorized(_) => 401,
            Error::Remote { .. } => 502,
            Error::StateTransition(_) => 502,
            Error::Timeout { .. } => 504,
            Error::Cancelled(_) => 503,
            Error::Store { .. } => 500,
            Error::Config(_) => 500,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Short machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "not_found",
            Error::Validation(_) => "validation_error",
            Error::Unauthorized(_) => "unauthorized",
            Error::Remote { .. } => "remote_error",
            Error::StateTransition(_) => "state_transition_error",
            Error::Timeout { .. } => "timeout",
            Error::Cancelled(_) => "cancelled",
            Error::Store { .. } => "store_error",
            Error::Config(_) => "config_error",
            Error::Io { .. } => "io_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Remote`].
    pub fn remote(
        operation: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Error::Remote {
            operation: operation.into(),
            status,
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Store`].
    pub fn store(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Store {
            source: source.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = Error::not_found("live event", "CH1");
        assert_eq!(err.to_string(), "live event not found: CH1");
        assert_eq!(err.http_status(), 404);
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn validation_display() {
        let err = Error::Validation("channelName is required".into());
        assert_eq!(err.to_string(), "Validation error: channelName is required");
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn remote_display() {
        let err = Error::remote("delete live event", Some(409), "outputs still attached");
        assert_eq!(
            err.to_string(),
            "Remote error [delete live event]: outputs still attached"
        );
        assert_eq!(err.http_status(), 502);
    }

    #[test]
    fn timeout_display() {
        let err = Error::Timeout {
            what: "live event CH1 to stop".into(),
            waited_secs: 600,
        };
        assert_eq!(
            err.to_string(),
            "Timed out after 600s waiting for live event CH1 to stop"
        );
        assert_eq!(err.http_status(), 504);
    }

    #[test]
    fn store_display() {
        let err = Error::store("connection refused");
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn state_transition_and_cancelled_statuses() {
        assert_eq!(Error::StateTransition("boom".into()).http_status(), 502);
        assert_eq!(Error::Cancelled("shutdown".into()).http_status(), 503);
    }
}
