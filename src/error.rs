use std::path::PathBuf;

use thiserror::Error;

use crate::registry::DuplicateCheckResult;

/// Soft failure of a single collection strategy. Collectors swallow these and
/// move on to the next strategy in their chain.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("{source_name} unavailable: {reason}")]
    SourceUnavailable {
        source_name: &'static str,
        reason: String,
    },
    #[error("{source_name} output missing required field `{field}`")]
    ParseIncomplete {
        source_name: &'static str,
        field: &'static str,
    },
}

impl CollectError {
    pub fn unavailable(source_name: &'static str, reason: impl Into<String>) -> Self {
        CollectError::SourceUnavailable {
            source_name,
            reason: reason.into(),
        }
    }

    pub fn incomplete(source_name: &'static str, field: &'static str) -> Self {
        CollectError::ParseIncomplete { source_name, field }
    }
}

/// Outcomes of a registration attempt that are shown to the user.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("{}", .0.conflict_message())]
    Conflict(DuplicateCheckResult),
    #[error("server rejected the inventory (HTTP {status}): {body}")]
    ServerRejected { status: u16, body: String },
    #[error("could not connect to the inventory server: {0}")]
    Connection(String),
    #[error("failed to submit inventory: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("{0} is required")]
    Missing(&'static str),
}
