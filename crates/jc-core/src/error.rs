//! Error types for jetcorr

use thiserror::Error;

/// jetcorr error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An expected distribution is absent. Non-fatal: the bin is skipped.
    #[error("Missing distribution: {0}")]
    MissingDistribution(String),

    /// A bin border resolves outside the reference axis.
    #[error("Invalid bin range: {0}")]
    InvalidBinRange(String),

    /// Configuration disagrees with the loaded data (e.g. axis bin counts).
    #[error("Configuration mismatch: {0}")]
    ConfigurationMismatch(String),

    /// An external correction provider has nothing loaded.
    #[error("Correction unavailable: {0}")]
    CorrectionUnavailable(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

impl Error {
    /// Errors that only invalidate a single bin; the pipeline skips the bin and continues.
    pub fn is_per_bin(&self) -> bool {
        matches!(self, Error::MissingDistribution(_) | Error::InvalidBinRange(_) | Error::Computation(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_bin_classification() {
        assert!(Error::MissingDistribution("x".into()).is_per_bin());
        assert!(Error::InvalidBinRange("x".into()).is_per_bin());
        assert!(!Error::ConfigurationMismatch("x".into()).is_per_bin());
        assert!(!Error::CorrectionUnavailable("x".into()).is_per_bin());
    }

    #[test]
    fn display_carries_message() {
        let e = Error::ConfigurationMismatch("deltaPhi bins 64 != 80".into());
        assert_eq!(e.to_string(), "Configuration mismatch: deltaPhi bins 64 != 80");
    }
}
