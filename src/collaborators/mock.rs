/*!
 * Mock collaborators for testing.
 *
 * - `MockDownloader::working()` - writes a small file at the destination
 * - `MockDownloader::failing()` - exits like a failing tool
 * - `MockDownloader::no_output()` - succeeds without writing anything
 * - `MockExtractor::working(n)` - writes `n` artifact files
 * - `MockExtractor::failing()` - always errors
 *
 * Both record their calls and the peak number of concurrent calls.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{Downloader, ExtractionRequest, Extractor};
use crate::errors::{DownloadError, ExtractionError};
use crate::identifiers::VideoId;

/// Tracks how many calls overlap
#[derive(Debug, Default)]
struct ConcurrencyGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyGauge {
    /// Count one more running call until the guard is dropped
    fn enter(&self) -> GaugeGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        GaugeGuard { gauge: self }
    }

    fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Leaves the gauge on drop, including when a timed-out call is abandoned
struct GaugeGuard<'a> {
    gauge: &'a ConcurrencyGauge,
}

impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        self.gauge.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Behavior mode for the mock downloader
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DownloadBehavior {
    /// Writes the destination file
    Working,
    /// Returns a tool failure
    Failing,
    /// Reports success without writing the file
    NoOutput,
}

/// Scripted downloader
#[derive(Debug)]
pub struct MockDownloader {
    behavior: DownloadBehavior,
    delay: Duration,
    calls: Mutex<Vec<VideoId>>,
    gauge: ConcurrencyGauge,
}

impl MockDownloader {
    pub fn new(behavior: DownloadBehavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            gauge: ConcurrencyGauge::default(),
        }
    }

    pub fn working() -> Self {
        Self::new(DownloadBehavior::Working)
    }

    pub fn failing() -> Self {
        Self::new(DownloadBehavior::Failing)
    }

    pub fn no_output() -> Self {
        Self::new(DownloadBehavior::NoOutput)
    }

    /// Make every download take at least `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Ids downloaded so far, in call order
    pub fn calls(&self) -> Vec<VideoId> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Highest number of downloads seen running at once
    pub fn peak_concurrency(&self) -> usize {
        self.gauge.peak()
    }

    /// Downloads currently running
    pub fn in_flight(&self) -> usize {
        self.gauge.current()
    }
}

#[async_trait]
impl Downloader for MockDownloader {
    fn name(&self) -> &str {
        "mock-downloader"
    }

    async fn download(&self, id: &VideoId, dest: &Path) -> Result<(), DownloadError> {
        self.calls.lock().push(id.clone());
        let guard = self.gauge.enter();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        drop(guard);

        match self.behavior {
            DownloadBehavior::Working => fs::write(dest, id.as_str().as_bytes())
                .map_err(|e| DownloadError::ToolFailed {
                    status: 1,
                    stderr: e.to_string(),
                }),
            DownloadBehavior::Failing => Err(DownloadError::ToolFailed {
                status: 1,
                stderr: "ERROR: Simulated download failure".to_string(),
            }),
            DownloadBehavior::NoOutput => Ok(()),
        }
    }
}

/// Snapshot taken when the mock extractor is invoked
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionCall {
    pub request: ExtractionRequest,
    /// Artifact-looking files already in the output directory
    pub artifacts_before: usize,
    /// Whether the video file existed at call time
    pub video_present: bool,
}

/// Behavior mode for the mock extractor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExtractBehavior {
    /// Writes `artifacts` files named `team_<n>.png`
    Working { artifacts: usize },
    /// Returns an extractor failure
    Failing,
}

/// Scripted extractor
#[derive(Debug)]
pub struct MockExtractor {
    behavior: ExtractBehavior,
    delay: Duration,
    calls: Mutex<Vec<ExtractionCall>>,
    gauge: ConcurrencyGauge,
}

impl MockExtractor {
    pub fn new(behavior: ExtractBehavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            gauge: ConcurrencyGauge::default(),
        }
    }

    pub fn working(artifacts: usize) -> Self {
        Self::new(ExtractBehavior::Working { artifacts })
    }

    pub fn failing() -> Self {
        Self::new(ExtractBehavior::Failing)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<ExtractionCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.gauge.peak()
    }

    pub fn in_flight(&self) -> usize {
        self.gauge.current()
    }
}

fn count_team_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| {
                    let name = entry.file_name().to_string_lossy().to_string();
                    name.starts_with("team_") && name.ends_with(".png")
                })
                .count()
        })
        .unwrap_or(0)
}

#[async_trait]
impl Extractor for MockExtractor {
    fn name(&self) -> &str {
        "mock-extractor"
    }

    async fn extract(&self, request: &ExtractionRequest) -> Result<(), ExtractionError> {
        self.calls.lock().push(ExtractionCall {
            request: request.clone(),
            artifacts_before: count_team_files(&request.output_dir),
            video_present: request.video_path.is_file(),
        });

        let guard = self.gauge.enter();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        drop(guard);

        match self.behavior {
            ExtractBehavior::Working { artifacts } => {
                for index in 0..artifacts {
                    let path = request.output_dir.join(format!("team_{}.png", index));
                    fs::write(&path, b"png").map_err(|e| ExtractionError::Failed {
                        status: 1,
                        stderr: e.to_string(),
                    })?;
                }
                Ok(())
            }
            ExtractBehavior::Failing => Err(ExtractionError::Failed {
                status: 2,
                stderr: "Simulated extraction failure".to_string(),
            }),
        }
    }
}
