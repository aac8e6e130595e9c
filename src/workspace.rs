use anyhow::{Context, Result};
use chrono::Local;
use regex::Regex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::app_config::Config;
use crate::identifiers::VideoId;

// @module: Per-video working directories and artifact files

/// Matches artifact file names such as `team_012.png`
#[derive(Debug, Clone)]
pub struct ArtifactPattern {
    regex: Regex,
}

impl ArtifactPattern {
    /// Pattern equivalent to the glob `<prefix>*<suffix>`
    pub fn new(prefix: &str, suffix: &str) -> Result<Self> {
        let pattern = format!("^{}.*{}$", regex::escape(prefix), regex::escape(suffix));
        let regex = Regex::new(&pattern)
            .with_context(|| format!("Invalid artifact pattern: {}", pattern))?;
        Ok(Self { regex })
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.regex.is_match(file_name)
    }
}

// @struct: Filesystem layout under the checks directory
#[derive(Debug, Clone)]
pub struct VideoWorkspace {
    root: PathBuf,
    video_file_name: String,
    artifacts: ArtifactPattern,
}

impl VideoWorkspace {
    pub fn new<P: Into<PathBuf>>(root: P, video_file_name: &str, artifacts: ArtifactPattern) -> Self {
        Self {
            root: root.into(),
            video_file_name: video_file_name.to_string(),
            artifacts,
        }
    }

    /// Build the workspace described by the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let artifacts = ArtifactPattern::new(&config.artifacts.prefix, &config.artifacts.suffix)?;
        Ok(Self::new(
            config.checks_dir.clone(),
            &config.download.video_file_name,
            artifacts,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // @returns: Working directory of a video
    pub fn dir(&self, id: &VideoId) -> PathBuf {
        self.root.join(id.as_str())
    }

    // @returns: Path of the downloaded video
    pub fn video_path(&self, id: &VideoId) -> PathBuf {
        self.dir(id).join(&self.video_file_name)
    }

    /// Temporary file yt-dlp writes before renaming it to the video path
    pub fn partial_video_path(&self, id: &VideoId) -> PathBuf {
        let mut path = self.video_path(id).into_os_string();
        path.push(".part");
        PathBuf::from(path)
    }

    // @creates: Root directory if needed
    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create directory: {}", self.root.display()))
    }

    // @creates: Video directory if needed
    pub fn ensure_dir(&self, id: &VideoId) -> Result<PathBuf> {
        let dir = self.dir(id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        Ok(dir)
    }

    pub fn has_video(&self, id: &VideoId) -> bool {
        self.video_path(id).is_file()
    }

    /// Artifact files currently present for a video, sorted by name
    pub fn list_artifacts(&self, id: &VideoId) -> Result<Vec<PathBuf>> {
        let dir = self.dir(id);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut artifacts = Vec::new();
        for entry in fs::read_dir(&dir)
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            let is_artifact = path.is_file()
                && path
                    .file_name()
                    .is_some_and(|name| self.artifacts.matches(&name.to_string_lossy()));
            if is_artifact {
                artifacts.push(path);
            }
        }
        artifacts.sort();
        Ok(artifacts)
    }

    pub fn count_artifacts(&self, id: &VideoId) -> Result<usize> {
        Ok(self.list_artifacts(id)?.len())
    }

    /// Delete every artifact of a video, returning how many were removed
    pub fn clear_artifacts(&self, id: &VideoId) -> Result<usize> {
        let artifacts = self.list_artifacts(id)?;
        for path in &artifacts {
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove artifact: {}", path.display()))?;
        }
        Ok(artifacts.len())
    }

    /// Delete the downloaded video, returning whether a file was removed
    pub fn remove_video(&self, id: &VideoId) -> Result<bool> {
        let path = self.video_path(id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)
            .with_context(|| format!("Failed to remove video: {}", path.display()))?;
        Ok(true)
    }

    /// Delete the video and its partial download, returning how many
    /// files were removed
    pub fn remove_download_leftovers(&self, id: &VideoId) -> Result<usize> {
        let mut removed = 0;
        for path in [self.video_path(id), self.partial_video_path(id)] {
            if path.exists() {
                fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove file: {}", path.display()))?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Append a timestamped line to the issues log at the root
    pub fn append_issue(&self, log_name: &str, content: &str) -> Result<PathBuf> {
        let path = self.root.join(log_name);
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {:?}", path))?;

        writeln!(file, "[{}] {}", timestamp, content)
            .with_context(|| format!("Failed to write to log file: {:?}", path))?;

        Ok(path)
    }
}
