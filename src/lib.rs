//! # Screeny
//!
//! Pixel-accurate, full-page web screenshots via headless Chrome.
//!
//! The core of the crate is the capture pipeline: each job checks a page
//! context out of a bounded pool, configures viewport and device emulation,
//! filters ad/tracker requests, waits for a configurable readiness condition,
//! freezes animations, and rasters the full page height at the configured
//! device pixel ratio. Batch runs process jobs concurrently while preserving
//! input order in the results, and one bad URL never aborts the rest.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use screeny::{BrowserPool, CaptureJob, CaptureOptions, JobRunner};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = Arc::new(CaptureOptions::default());
//!     let pool = Arc::new(BrowserPool::launch(&options).await?);
//!
//!     let runner = JobRunner::new(pool.clone(), options.clone());
//!     let results = runner.run(vec![CaptureJob::new("https://example.com")]).await;
//!     println!("{} results", results.len());
//!
//!     pool.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ### Single Screenshot
//! ```bash
//! screeny single --url https://example.com --output-dir shots/
//! ```
//!
//! ### Batch Processing
//! ```bash
//! screeny batch --input urls.txt --output-dir shots/ --format jpeg --quality 85
//! ```

/// Configuration, job and result types
pub mod config;

/// Error types for the capture pipeline
pub mod error;

/// Browser engine lifecycle and the bounded page-context pool
pub mod browser_pool;

/// Page preparation: viewport, device emulation, request filtering
pub mod preparer;

/// Readiness waiting strategies
pub mod readiness;

/// Animation freezing for deterministic output
pub mod stabilizer;

/// Full-page raster capture and encoding
pub mod capturer;

/// Job dispatch, ordering, and result aggregation
pub mod runner;

/// Batch input file parsing
pub mod batch;

/// Command-line interface implementation
pub mod cli;

/// URL validation, blocklist, and filename helpers
pub mod utils;


pub use browser_pool::{BrowserPool, PageHandle};
pub use cli::{setup_logging, Cli, CliRunner, Commands};
pub use config::{
    CaptureJob, CaptureOptions, CaptureResult, ImageFormat, JobStatus, Viewport, WaitState,
};
pub use error::CaptureError;
pub use runner::{JobRunner, JobStage, RunSummary};
pub use utils::Blocklist;
