/*!
 * External collaborators driven by the pipeline.
 *
 * - `Downloader`: fetches one video to a destination path (`ytdlp`)
 * - `Extractor`: derives artifacts from a downloaded video (`command`)
 * - `mock`: scripted implementations of both for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::errors::{DownloadError, ExtractionError};
use crate::identifiers::VideoId;

pub mod command;
pub mod mock;
pub mod ytdlp;

pub use command::CommandExtractor;
pub use ytdlp::YtDlpDownloader;

/// Fetches a video to disk
#[async_trait]
pub trait Downloader: Send + Sync + Debug {
    /// Short name used in log messages
    fn name(&self) -> &str;

    /// Download `id` to `dest`.
    ///
    /// Implementations must report a failing tool as an error; the caller
    /// still checks that `dest` exists afterwards.
    async fn download(&self, id: &VideoId, dest: &Path) -> Result<(), DownloadError>;
}

/// Arguments of one extraction call
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRequest {
    pub video_path: PathBuf,
    pub output_dir: PathBuf,
    /// Parallel battle finders inside the extractor
    pub nb_finders: usize,
    /// Parallel team extractors inside the extractor
    pub nb_extractors: usize,
}

/// Derives artifact files from a downloaded video
#[async_trait]
pub trait Extractor: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Run the extraction, writing artifacts into `request.output_dir`
    async fn extract(&self, request: &ExtractionRequest) -> Result<(), ExtractionError>;
}

/// Why a bounded call did not complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    TimedOut,
    Cancelled,
}

/// Drive `future` until it completes, the timeout elapses or `cancel` fires.
///
/// Dropping the future on interruption kills any child process spawned
/// with `kill_on_drop`.
pub async fn run_bounded<F: Future>(
    future: F,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<F::Output, Interrupted> {
    let deadline = async {
        match timeout {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Interrupted::Cancelled),
        output = future => Ok(output),
        _ = deadline => Err(Interrupted::TimedOut),
    }
}

/// Keep the last few meaningful lines of a tool's stderr
pub(crate) fn summarize_stderr(stderr: &[u8]) -> String {
    const MAX_LINES: usize = 5;

    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("[download]"))
        .collect();

    let start = lines.len().saturating_sub(MAX_LINES);
    lines[start..].join(" | ")
}
