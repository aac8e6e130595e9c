use async_trait::async_trait;
use log::debug;
use std::process::Stdio;
use tokio::process::Command;

use super::{summarize_stderr, ExtractionRequest, Extractor};
use crate::app_config::ExtractionConfig;
use crate::errors::ExtractionError;

/// Runs an external extraction program on each video
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: String,
}

impl CommandExtractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            program: config.program.clone(),
        }
    }

    pub fn args(request: &ExtractionRequest) -> Vec<String> {
        vec![
            "--video".to_string(),
            request.video_path.to_string_lossy().to_string(),
            "--output".to_string(),
            request.output_dir.to_string_lossy().to_string(),
            "--finders".to_string(),
            request.nb_finders.to_string(),
            "--extractors".to_string(),
            request.nb_extractors.to_string(),
        ]
    }
}

#[async_trait]
impl Extractor for CommandExtractor {
    fn name(&self) -> &str {
        &self.program
    }

    async fn extract(&self, request: &ExtractionRequest) -> Result<(), ExtractionError> {
        let args = Self::args(request);
        debug!("Running {} {}", self.program, args.join(" "));

        // The extractor reports its own progress on stdout
        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ExtractionError::Launch {
                program: self.program.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ExtractionError::Failed {
                status: output.status.code().unwrap_or(-1),
                stderr: summarize_stderr(&output.stderr),
            });
        }

        Ok(())
    }
}
