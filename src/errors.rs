/*!
 * Error types for the teamgrab application.
 *
 * Each stage of the pipeline has its own error enum so that failures stay
 * attributable to a single video id, using the thiserror crate for
 * ergonomic error definitions.
 */

use std::time::Duration;
use thiserror::Error;

/// Errors raised while fetching a video with the external download tool
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DownloadError {
    /// The download tool could not be started at all
    #[error("Failed to launch download tool '{program}': {message}")]
    Launch {
        /// Program that was invoked
        program: String,
        /// OS error message
        message: String,
    },

    /// The download tool exited with a non-zero status
    #[error("Download tool exited with status {status}: {stderr}")]
    ToolFailed {
        /// Exit code, or -1 when killed by a signal
        status: i32,
        /// Filtered standard error output
        stderr: String,
    },

    /// The tool reported success but the video file is not on disk
    #[error("Download tool produced no file at {0}")]
    MissingOutput(String),

    /// The download did not finish within the configured timeout
    #[error("Download timed out after {0:?}")]
    TimedOut(Duration),

    /// The video directory could not be prepared
    #[error("Could not prepare working directory: {0}")]
    Workspace(String),

    /// The run was cancelled before or during the download
    #[error("Download cancelled")]
    Cancelled,
}

/// Errors raised by the extraction collaborator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    /// The video file was expected on disk but is absent
    #[error("Video file is missing: {0}")]
    MissingVideo(String),

    /// The job is not in a state that allows extraction
    #[error("Video {0} is not ready for processing")]
    NotReady(String),

    /// The extraction command could not be started
    #[error("Failed to launch extractor '{program}': {message}")]
    Launch {
        /// Program that was invoked
        program: String,
        /// OS error message
        message: String,
    },

    /// The extraction command exited with a non-zero status
    #[error("Extractor exited with status {status}: {stderr}")]
    Failed {
        /// Exit code, or -1 when killed by a signal
        status: i32,
        /// Filtered standard error output
        stderr: String,
    },

    /// The extraction did not finish within the configured timeout
    #[error("Extraction timed out after {0:?}")]
    TimedOut(Duration),

    /// Artifacts or the video could not be cleaned up
    #[error("Workspace error: {0}")]
    Workspace(String),

    /// The run was cancelled during extraction
    #[error("Extraction cancelled")]
    Cancelled,
}

/// Errors found while validating the configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A numeric setting that must be positive was zero
    #[error("'{0}' must be at least 1")]
    ZeroValue(&'static str),

    /// A required string setting was empty
    #[error("'{0}' must not be empty")]
    Empty(&'static str),

    /// The download URL template does not reference the video id
    #[error("Download URL template must contain '{{id}}': {0}")]
    UrlTemplate(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the download stage
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    /// Error from the extraction stage
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
