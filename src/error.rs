//! Error types for the downloader front-end

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop a download from starting or finishing cleanly
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Could not find the '{0}' executable. Make sure it is installed and on your PATH.")]
    ExecutableNotFound(String),

    #[error("Enter a URL.")]
    MissingUrl,

    #[error("Select a valid folder: {}", .0.display())]
    InvalidDestination(PathBuf),

    #[error("A download is already in progress.")]
    AlreadyRunning,

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl DownloadError {
    /// Title for the dialog shown when a download is refused up front
    pub fn dialog_title(&self) -> &'static str {
        match self {
            Self::ExecutableNotFound(_) => "yt-dlp not found",
            Self::MissingUrl => "Missing URL",
            Self::InvalidDestination(_) => "Invalid destination",
            Self::AlreadyRunning => "Download in progress",
            Self::Spawn { .. } | Self::Unexpected(_) => "Download failed",
        }
    }
}

/// Failures while writing the last-folder record
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DownloadError>;
