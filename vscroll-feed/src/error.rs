//! Error types for vscroll-feed
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Why a readiness probe could not report the resource as playable
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// Metadata request failed in transport
    #[error("network error: {0}")]
    Network(String),

    /// Resource responded but cannot be played
    #[error("resource not playable: {reason}")]
    Unplayable { reason: String },

    /// Probe did not resolve within the configured timeout
    #[error("probe timed out")]
    TimedOut,

    /// Probe was canceled before it resolved
    #[error("probe canceled")]
    Canceled,
}

/// Main error type for vscroll-feed
#[derive(Error, Debug)]
pub enum Error {
    /// Readiness probe failed
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    /// Host addressed an index outside the feed
    #[error("Unknown feed item: {0}")]
    UnknownItem(usize),

    /// Feed controller task is no longer running
    #[error("Feed controller channel closed")]
    ChannelClosed,

    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(#[from] vscroll_common::Error),
}

/// Convenience Result type using vscroll-feed Error
pub type Result<T> = std::result::Result<T, Error>;
