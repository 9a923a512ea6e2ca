// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    // The requested block range has from past to
    InvalidBlockRange(String),
    // An event filter could not be built from the given strings
    InvalidFilter(String),
    // Transient Ethereum provider error
    TransientProviderError(String),
    // Ethereum provider error
    ProviderError(String),
    // Internal tracker error
    InternalError(String),
    // Uncategorized error
    Generic(String),
}

impl TrackerError {
    /// Returns a short string identifying the error type for metrics labels
    pub fn error_type(&self) -> &'static str {
        match self {
            TrackerError::InvalidBlockRange(_) => "invalid_block_range",
            TrackerError::InvalidFilter(_) => "invalid_filter",
            TrackerError::TransientProviderError(_) => "transient_provider_error",
            TrackerError::ProviderError(_) => "provider_error",
            TrackerError::InternalError(_) => "internal_error",
            TrackerError::Generic(_) => "generic",
        }
    }
}

impl std::fmt::Display for TrackerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackerError::InvalidBlockRange(msg) => write!(f, "invalid block range: {}", msg),
            TrackerError::InvalidFilter(msg) => write!(f, "invalid event filter: {}", msg),
            TrackerError::TransientProviderError(msg) => {
                write!(f, "transient provider error: {}", msg)
            }
            TrackerError::ProviderError(msg) => write!(f, "provider error: {}", msg),
            TrackerError::InternalError(msg) => write!(f, "internal error: {}", msg),
            TrackerError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for TrackerError {}

impl From<ethers::providers::ProviderError> for TrackerError {
    fn from(err: ethers::providers::ProviderError) -> Self {
        TrackerError::ProviderError(format!("{:?}", err))
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;
