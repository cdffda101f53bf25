//! Error types module
//!
//! All client failures are unified under `VideostoreError`. Server-reported
//! failures keep the original `tonic::Status` so callers can inspect the code,
//! message and details exactly as the server sent them.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum VideostoreError {
    #[error("RPC failed: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid resource name: {0}")]
    InvalidResourceName(String),

    #[error("No client registered for API: {0}")]
    UnknownApi(String),

    #[error("API already registered: {0}")]
    DuplicateRegistration(String),
}

impl VideostoreError {
    /// The server status this error carries, if it came from an RPC.
    pub fn status(&self) -> Option<&tonic::Status> {
        match self {
            VideostoreError::Rpc(status) => Some(status),
            _ => None,
        }
    }

    /// gRPC status code, or `None` for failures that never reached the server.
    pub fn code(&self) -> Option<tonic::Code> {
        self.status().map(tonic::Status::code)
    }
}

pub type Result<T> = std::result::Result<T, VideostoreError>;
