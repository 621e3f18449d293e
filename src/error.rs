//! Engine-level error taxonomy.
//!
//! Every failure that crosses the engine boundary is one of these classes.
//! Driver-level detail ([`StoreError`](crate::services::drs::StoreError)) is
//! folded in at the accessor with read/write context; the message keeps the
//! underlying detail, the class tells the caller how to react.

use std::time::Duration;
use thiserror::Error;

use crate::services::drs::StoreError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Driver subsystem not present or not initializable. Terminal for the
    /// whole engine until a re-probe succeeds.
    #[error("driver store unavailable: {0}")]
    StoreUnavailable(String),

    /// Store is present but a read/enumeration failed. A failed pass; the next
    /// scheduled poll retries.
    #[error("driver store read failed: {0}")]
    StoreRead(String),

    /// A mutation failed, with the store-specific reason attached.
    #[error("driver store write failed: {0}")]
    StoreWrite(String),

    /// A mutation referenced an executable with no application entry.
    #[error("no application entry for {0}")]
    NotFound(String),

    /// A bounded OS/driver call exceeded its deadline.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// The OS refused to resolve a process detail. Recovered locally during
    /// enumeration; surfaces only when nothing partial can be returned.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

impl EngineError {
    /// Classify a store failure encountered on a read path.
    pub fn read(err: StoreError) -> Self {
        if err.is_connectivity() {
            EngineError::StoreUnavailable(err.to_string())
        } else {
            EngineError::StoreRead(err.to_string())
        }
    }

    /// Classify a store failure encountered on a write path.
    pub fn write(err: StoreError) -> Self {
        match err {
            StoreError::ApplicationNotFound(executable) => EngineError::NotFound(executable),
            err if err.is_connectivity() => EngineError::StoreUnavailable(err.to_string()),
            err => EngineError::StoreWrite(err.to_string()),
        }
    }

    /// True for failures that mean "stop polling until a re-probe succeeds".
    pub fn is_unavailable(&self) -> bool {
        matches!(self, EngineError::StoreUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_errors_map_to_unavailable() {
        let err = EngineError::read(StoreError::LibraryNotFound);
        assert!(err.is_unavailable());

        let err = EngineError::write(StoreError::SessionFailed(-4));
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_read_failures_map_to_store_read() {
        let err = EngineError::read(StoreError::ApiStatus(-1));
        assert!(matches!(err, EngineError::StoreRead(_)));
    }

    #[test]
    fn test_missing_application_maps_to_not_found() {
        let err = EngineError::write(StoreError::ApplicationNotFound("game.exe".to_string()));
        assert_eq!(err, EngineError::NotFound("game.exe".to_string()));
    }

    #[test]
    fn test_write_failures_keep_store_detail() {
        let err = EngineError::write(StoreError::SaveFailed(-9));
        match err {
            EngineError::StoreWrite(msg) => assert!(msg.contains("-9")),
            other => panic!("expected StoreWrite, got {other:?}"),
        }
    }
}
