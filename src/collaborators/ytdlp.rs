use async_trait::async_trait;
use log::debug;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use super::{summarize_stderr, Downloader};
use crate::app_config::DownloadConfig;
use crate::errors::DownloadError;
use crate::identifiers::VideoId;

/// Downloads videos by shelling out to yt-dlp
#[derive(Debug, Clone)]
pub struct YtDlpDownloader {
    config: DownloadConfig,
}

impl YtDlpDownloader {
    pub fn new(config: &DownloadConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Command line arguments for one download
    pub fn args(&self, id: &VideoId, dest: &Path) -> Vec<String> {
        vec![
            "--ignore-config".to_string(),
            self.config.url_for(id.as_str()),
            "-f".to_string(),
            self.config.format.clone(),
            "-o".to_string(),
            dest.to_string_lossy().to_string(),
        ]
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    fn name(&self) -> &str {
        &self.config.program
    }

    async fn download(&self, id: &VideoId, dest: &Path) -> Result<(), DownloadError> {
        let args = self.args(id, dest);
        let program = &self.config.program;
        debug!("Running {} {}", program, args.join(" "));

        let output = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DownloadError::Launch {
                program: program.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(DownloadError::ToolFailed {
                status: output.status.code().unwrap_or(-1),
                stderr: summarize_stderr(&output.stderr),
            });
        }

        Ok(())
    }
}
