use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong while reading, changing or sharing tasks.
#[derive(Error, Debug)]
pub enum TodoError {
    #[error("task {0} not found")]
    NotFound(u64),

    #[error("{0}")]
    Validation(String),

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt task file {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize tasks: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("network error ({addr}): {source}")]
    Network {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("config error: {0}")]
    Config(String),
}

impl TodoError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        TodoError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn network(addr: impl Into<String>, source: io::Error) -> Self {
        TodoError::Network {
            addr: addr.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TodoError>;
