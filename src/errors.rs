//! Typed errors for the workflow core.
//!
//! Ordinary "not found" and "not yet valid" outcomes are return values
//! (`None` / `Ok(false)`), never errors. `WorkflowError` only covers
//! snapshot data that cannot be encoded or decoded.

use thiserror::Error;
use uuid::Uuid;

/// Which part of a checkpoint a snapshot error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotPart {
    Canvas,
    ActionHistory,
}

impl std::fmt::Display for SnapshotPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotPart::Canvas => write!(f, "canvas"),
            SnapshotPart::ActionHistory => write!(f, "action history"),
        }
    }
}

/// Errors from the workflow core.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Failed to serialize {part} for checkpoint: {source}")]
    SnapshotEncode {
        part: SnapshotPart,
        #[source]
        source: serde_json::Error,
    },

    #[error("Checkpoint {checkpoint_id} holds a corrupt {part} snapshot: {source}")]
    SnapshotDecode {
        checkpoint_id: Uuid,
        part: SnapshotPart,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize action payload: {0}")]
    PayloadEncode(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_error() -> serde_json::Error {
        serde_json::from_str::<u32>("not json").unwrap_err()
    }

    #[test]
    fn snapshot_decode_carries_checkpoint_id() {
        let id = Uuid::new_v4();
        let err = WorkflowError::SnapshotDecode {
            checkpoint_id: id,
            part: SnapshotPart::ActionHistory,
            source: json_error(),
        };
        match &err {
            WorkflowError::SnapshotDecode {
                checkpoint_id,
                part,
                ..
            } => {
                assert_eq!(*checkpoint_id, id);
                assert_eq!(*part, SnapshotPart::ActionHistory);
            }
            _ => panic!("Expected SnapshotDecode"),
        }
        let message = err.to_string();
        assert!(message.contains(&id.to_string()));
        assert!(message.contains("action history"));
    }

    #[test]
    fn snapshot_encode_names_the_part() {
        let err = WorkflowError::SnapshotEncode {
            part: SnapshotPart::Canvas,
            source: json_error(),
        };
        assert!(err.to_string().starts_with("Failed to serialize canvas"));
    }

    #[test]
    fn workflow_error_exposes_source() {
        use std::error::Error as _;
        let err = WorkflowError::PayloadEncode(json_error());
        assert!(err.source().is_some());
    }
}
