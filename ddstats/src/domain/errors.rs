//! Structured error types for ddstats
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! None of these are fatal to the process: each belongs to one attempt
//! (a tick, a connect, a submission) that is abandoned and retried on its
//! own schedule.

use super::types::{Address, Pid};
use std::time::Duration;
use thiserror::Error;

/// The block or frame buffer could not be turned into typed data.
///
/// The caller treats this as "no update this tick".
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Buffer is {actual} bytes, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Frame count {0} is out of range")]
    FrameCount(i32),
}

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Failed to read {len} bytes at {address}: {source}")]
    ReadFailed {
        address: Address,
        len: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Short read at {address}: got {actual} of {expected} bytes")]
    ShortRead { address: Address, expected: usize, actual: usize },

    #[error("Process {0} is gone")]
    ProcessGone(Pid),

    #[error("Failed to read /proc/{0}/maps")]
    MapsUnavailable(Pid, #[source] std::io::Error),

    #[error("No executable mapping found for process {0}")]
    ModuleNotFound(Pid),
}

/// Resolving the stats block address failed; the whole attempt is dropped.
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("Could not resolve module base: {0}")]
    ModuleBase(#[source] MemoryError),

    #[error("Pointer hop {index} at {address} failed: {source}")]
    Hop {
        index: usize,
        address: Address,
        #[source]
        source: MemoryError,
    },

    #[error("Stats block marker not found at {0}")]
    MarkerMismatch(Address),
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Submission timed out after {0:?}")]
    Timeout(Duration),

    #[error("Server rejected the game: {0}")]
    Rejected(String),

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum LiveError {
    #[error("Live channel is not connected")]
    NotConnected,

    #[error("Live channel handshake failed: {0}")]
    Handshake(String),

    #[error("Invalid live channel URL: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
