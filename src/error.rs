//! Error taxonomy shared by the library and the CLI.
//!
//! Each component owns one enum. The binary classifies them by downcasting an
//! `anyhow::Error`, so every variant's `Display` is the user-facing message.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Cookie file rejected before any network activity.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Cookie file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Cookie path is not a file: {}", .0.display())]
    NotAFile(PathBuf),
    #[error("Cookie file is empty: {}", .0.display())]
    Empty(PathBuf),
    #[error("Cookie file is not readable: {}", .0.display())]
    Unreadable(PathBuf),
    #[error("Cookie file is not a valid text file: {}", .0.display())]
    NotText(PathBuf),
    #[error("Cookie file does not appear to be in Netscape format: {}", .0.display())]
    NotNetscape(PathBuf),
}

/// Channel enumeration failed; nothing to salvage.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("Authentication required. Please provide a valid YouTube Premium cookie file.")]
    AuthenticationRequired,
    #[error("Could not extract channel information")]
    NoInformation,
    #[error("Failed to list channel videos: {0}")]
    Extraction(String),
    #[error("Unexpected error listing channel: {0}")]
    Unexpected(String),
    #[error("Listing cancelled by user")]
    Interrupted,
}

/// Planner-level fatal conditions. Per-item failures are reported through
/// `DownloadStats` instead.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("could not create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not open metadata ledger: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Download cancelled by user")]
    Interrupted,
}

/// Failures reported by the extraction collaborator.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("lost contact with {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
    /// Transport or extraction failure, carrying the collaborator's message.
    #[error("{0}")]
    Failed(String),
    #[error("unreadable metadata from extractor: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("interrupted by user")]
    Interrupted,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("{} has no video_id column", .0.display())]
    MissingIdColumn(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_name_the_path() {
        let path = PathBuf::from("/tmp/cookies.txt");
        assert_eq!(
            ValidationError::Empty(path.clone()).to_string(),
            "Cookie file is empty: /tmp/cookies.txt"
        );
        assert!(
            ValidationError::NotNetscape(path)
                .to_string()
                .contains("does not appear to be in Netscape format")
        );
    }

    #[test]
    fn listing_extraction_keeps_underlying_message() {
        let err = ListingError::Extraction("HTTP Error 404".into());
        assert_eq!(err.to_string(), "Failed to list channel videos: HTTP Error 404");
    }
}
