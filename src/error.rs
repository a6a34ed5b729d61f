//! Error types
//!
//! `LoadError` is cloned into every caller that attaches to a shared
//! conversion, so variants carry owned strings instead of source errors.

use thiserror::Error;

/// Errors surfaced by [`crate::Ktx2Loader::load`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("Missing initialization: call configure() with a capability profile before loading")]
    NotConfigured,

    #[error("Failed to parse KTX2 container: {0}")]
    Parse(String),

    #[error("Unsupported supercompression scheme: {0}")]
    UnsupportedSupercompression(u32),

    #[error("Unsupported vkFormat: {0}")]
    UnsupportedVkFormat(u32),

    #[error("Unsupported pixelDepth for block-compressed format")]
    UnsupportedDepth,

    #[error("Failed to decode level data: {0}")]
    Decode(String),

    #[error("Transcoding failed: {0}")]
    Transcode(String),

    #[error("Transcoder bootstrap failed: {0}")]
    Bootstrap(String),

    #[error("Worker pool has been disposed")]
    PoolDisposed,

    #[error("I/O error: {0}")]
    Io(String),
}

impl LoadError {
    /// Flatten a collaborator error (with its context chain) into a parse error
    pub(crate) fn parse(err: anyhow::Error) -> Self {
        LoadError::Parse(format!("{:#}", err))
    }

    /// Flatten a collaborator error into a decode error
    pub(crate) fn decode(err: anyhow::Error) -> Self {
        LoadError::Decode(format!("{:#}", err))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Worker limit must be at least 1")]
    ZeroWorkerLimit,

    #[error("Invalid capability profile: {0}")]
    InvalidProfile(#[from] serde_json::Error),

    #[error("Unknown GPU feature name: {0}")]
    UnknownFeature(String),
}
