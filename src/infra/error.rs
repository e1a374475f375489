use std::{net::SocketAddr, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
    #[error("view counter file {path:?} is corrupt: {source}")]
    CorruptViewFile {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("failed to install tracing subscriber: {0}")]
    Telemetry(String),
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl InfraError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
