/*!
 * # teamgrab - parallel video download and sequential team extraction
 *
 * A Rust library and CLI that downloads a list of videos with bounded
 * parallelism and feeds each finished download to a single extraction
 * stage, so network-bound downloads overlap with compute-bound extraction.
 *
 * ## Features
 *
 * - Video ids given literally or through list files
 * - Parallel downloads through yt-dlp (or any `Downloader`)
 * - Strictly sequential extraction through an external command
 *   (or any `Extractor`)
 * - Skips videos that already have enough artifacts
 * - Per-job timeouts and cooperative cancellation
 * - Download-only mode
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `identifiers`: Video id validation and input resolution
 * - `workspace`: Per-video directories, video files and artifacts
 * - `job`: Job phases and the signals exchanged between stages
 * - `queue`: Handoff queue between the download pool and the processor
 * - `pool`: Bounded-parallel download stage
 * - `processor`: Sequential extraction stage
 * - `collaborators`: Download tool and extractor interfaces:
 *   - `collaborators::ytdlp`: yt-dlp downloader
 *   - `collaborators::command`: external extraction command
 *   - `collaborators::mock`: scripted collaborators for tests
 * - `reporter`: Injected logging interface
 * - `app_controller`: Wires the stages together
 * - `app_config`: Configuration management
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod collaborators;
pub mod errors;
pub mod identifiers;
pub mod job;
pub mod pool;
pub mod processor;
pub mod queue;
pub mod reporter;
pub mod workspace;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, RunSummary};
pub use collaborators::{Downloader, ExtractionRequest, Extractor};
pub use errors::{AppError, ConfigError, DownloadError, ExtractionError};
pub use identifiers::VideoId;
pub use job::{CompletionSignal, JobOutcome, JobReport};
