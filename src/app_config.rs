use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::ConfigError;

/// Application configuration module
/// This module handles loading, defaulting and validating the settings of
/// the download and extraction pipeline.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Root directory holding one working directory per video id
    #[serde(default = "default_checks_dir")]
    pub checks_dir: PathBuf,

    /// Download stage settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Extraction stage settings
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Artifact naming and skip heuristic
    #[serde(default)]
    pub artifacts: ArtifactConfig,

    /// Only download videos, never process them
    #[serde(default)]
    pub download_only: bool,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            checks_dir: default_checks_dir(),
            download: DownloadConfig::default(),
            extraction: ExtractionConfig::default(),
            artifacts: ArtifactConfig::default(),
            download_only: false,
            log_level: LogLevel::default(),
        }
    }
}

/// Settings for the external download tool and the worker pool
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DownloadConfig {
    /// Download tool executable
    #[serde(default = "default_download_program")]
    pub program: String,

    /// Source URL, `{id}` is replaced with the video id
    #[serde(default = "default_url_template")]
    pub url_template: String,

    /// Format selector passed to the tool
    #[serde(default = "default_format")]
    pub format: String,

    /// File name of the downloaded video inside the id directory
    #[serde(default = "default_video_file_name")]
    pub video_file_name: String,

    /// Number of downloads running at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-download timeout in seconds (0 disables it)
    #[serde(default = "default_download_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            program: default_download_program(),
            url_template: default_url_template(),
            format: default_format(),
            video_file_name: default_video_file_name(),
            concurrency: default_concurrency(),
            timeout_secs: default_download_timeout_secs(),
        }
    }
}

impl DownloadConfig {
    /// Build the source URL for a video id
    pub fn url_for(&self, id: &str) -> String {
        self.url_template.replace("{id}", id)
    }

    /// Timeout as a duration, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        timeout_from_secs(self.timeout_secs)
    }
}

/// Settings for the extraction collaborator
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExtractionConfig {
    /// Extraction command executable
    #[serde(default = "default_extractor_program")]
    pub program: String,

    /// Number of battle finders the extractor runs in parallel
    #[serde(default = "default_concurrency")]
    pub nb_finders: usize,

    /// Number of team extractors the extractor runs in parallel
    #[serde(default = "default_concurrency")]
    pub nb_extractors: usize,

    /// Per-video timeout in seconds (0 disables it)
    #[serde(default = "default_extraction_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            program: default_extractor_program(),
            nb_finders: default_concurrency(),
            nb_extractors: default_concurrency(),
            timeout_secs: default_extraction_timeout_secs(),
        }
    }
}

impl ExtractionConfig {
    /// Timeout as a duration, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        timeout_from_secs(self.timeout_secs)
    }
}

/// Naming of the files produced by the extractor
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ArtifactConfig {
    /// Artifact file name prefix
    #[serde(default = "default_artifact_prefix")]
    pub prefix: String,

    /// Artifact file name suffix
    #[serde(default = "default_artifact_suffix")]
    pub suffix: String,

    /// A video with more artifacts than this is considered processed
    #[serde(default = "default_skip_threshold")]
    pub skip_threshold: usize,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            prefix: default_artifact_prefix(),
            suffix: default_artifact_suffix(),
            skip_threshold: default_skip_threshold(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching filter for the `log` facade
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn default_checks_dir() -> PathBuf {
    PathBuf::from("checks")
}

fn default_download_program() -> String {
    "yt-dlp".to_string()
}

fn default_url_template() -> String {
    "https://www.youtube.com/watch?v={id}".to_string()
}

fn default_format() -> String {
    // 720p mp4 video-only stream, enough for the extractor
    "136".to_string()
}

fn default_video_file_name() -> String {
    "video.mp4".to_string()
}

fn default_concurrency() -> usize {
    2
}

fn default_download_timeout_secs() -> u64 {
    3600
}

fn default_extraction_timeout_secs() -> u64 {
    0
}

fn default_extractor_program() -> String {
    "team-extractor".to_string()
}

fn default_artifact_prefix() -> String {
    "team_".to_string()
}

fn default_artifact_suffix() -> String {
    ".png".to_string()
}

fn default_skip_threshold() -> usize {
    10
}

impl Config {
    /// Load the configuration from a JSON file, falling back to defaults
    /// when the file does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.checks_dir.as_os_str().is_empty() {
            return Err(ConfigError::Empty("checks_dir"));
        }

        if self.download.program.trim().is_empty() {
            return Err(ConfigError::Empty("download.program"));
        }
        if !self.download.url_template.contains("{id}") {
            return Err(ConfigError::UrlTemplate(self.download.url_template.clone()));
        }
        if self.download.video_file_name.trim().is_empty() {
            return Err(ConfigError::Empty("download.video_file_name"));
        }
        if self.download.concurrency == 0 {
            return Err(ConfigError::ZeroValue("download.concurrency"));
        }

        if self.extraction.program.trim().is_empty() {
            return Err(ConfigError::Empty("extraction.program"));
        }
        if self.extraction.nb_finders == 0 {
            return Err(ConfigError::ZeroValue("extraction.nb_finders"));
        }
        if self.extraction.nb_extractors == 0 {
            return Err(ConfigError::ZeroValue("extraction.nb_extractors"));
        }

        if self.artifacts.prefix.is_empty() && self.artifacts.suffix.is_empty() {
            return Err(ConfigError::Empty("artifacts.prefix/suffix"));
        }

        Ok(())
    }
}
