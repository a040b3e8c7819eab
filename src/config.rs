//! Configuration management with serde serialization/deserialization
//!
//! This module provides the shared option bundle for a capture run, the
//! per-job request/result types, and the Chrome launch configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CaptureError;

/// Shared configuration for a capture run
///
/// Built once from the CLI (optionally seeded from a JSON config file) and
/// shared read-only across all jobs of the run.
///
/// # Examples
///
/// ```rust
/// use screeny::CaptureOptions;
///
/// // Use default configuration
/// let options = CaptureOptions::default();
///
/// // Create custom configuration
/// let options = CaptureOptions {
///     pool_size: 3,
///     jpeg_quality: 80,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureOptions {
    /// Number of concurrently checked-out page contexts (default: 4)
    ///
    /// Bounds memory and CPU use of the shared Chrome process. Recommended
    /// range: 3-5.
    pub pool_size: usize,

    /// Browser viewport configuration for screenshots
    pub viewport: Viewport,

    /// Output image format (default: PNG)
    pub format: ImageFormat,

    /// JPEG quality, clamped to 1-100 at capture time (default: 90)
    ///
    /// Ignored for PNG output.
    pub jpeg_quality: u8,

    /// Load milestone to wait for before capturing (default: network idle)
    pub wait_state: WaitState,

    /// Optional CSS selector that must additionally resolve to a visible
    /// element before capture
    pub wait_selector: Option<String>,

    /// Upper bound on readiness waiting per job (default: 30 seconds)
    ///
    /// On expiry the job proceeds to a best-effort capture and the result is
    /// flagged as timed out, unless the page never rendered any content.
    pub wait_timeout: Duration,

    /// Abort requests matching the ad/tracker blocklist (default: true)
    pub block_ads: bool,

    /// Freeze CSS animations/transitions before capture (default: true)
    ///
    /// Required for byte-identical repeat captures of static pages.
    pub freeze_animations: bool,

    /// Directory screenshots are written to (default: ./screenshots)
    pub output_dir: PathBuf,

    /// Path to Chrome/Chromium executable (default: auto-detect)
    pub chrome_path: Option<String>,

    /// Custom User-Agent string (default: Chrome default, or a mobile UA
    /// when mobile emulation is enabled)
    pub user_agent: Option<String>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            pool_size: 4,
            viewport: Viewport::default(),
            format: ImageFormat::Png,
            jpeg_quality: 90,
            wait_state: WaitState::NetworkIdle,
            wait_selector: None,
            wait_timeout: Duration::from_secs(30),
            block_ads: true,
            freeze_animations: true,
            output_dir: PathBuf::from("./screenshots"),
            chrome_path: None,
            user_agent: None,
        }
    }
}

impl CaptureOptions {
    /// JPEG quality clamped to the valid CDP range.
    pub fn clamped_quality(&self) -> u8 {
        self.jpeg_quality.clamp(1, 100)
    }
}

/// Browser viewport configuration
///
/// # Examples
///
/// ```rust
/// use screeny::Viewport;
///
/// // Desktop viewport (default)
/// let desktop = Viewport::default();
///
/// // Mobile viewport
/// let mobile = Viewport {
///     width: 375,
///     height: 812,
///     device_scale_factor: 3.0,
///     mobile: true,
/// };
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Viewport {
    /// Viewport width in logical pixels (default: 1920)
    pub width: u32,

    /// Viewport height in logical pixels (default: 1080)
    pub height: u32,

    /// Device pixel ratio applied to the output raster (default: 2.0)
    ///
    /// Output pixel dimensions are logical dimensions multiplied by this
    /// factor.
    pub device_scale_factor: f64,

    /// Whether to emulate a mobile device (default: false)
    ///
    /// Enables touch events and a mobile user agent.
    pub mobile: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            device_scale_factor: 2.0,
            mobile: false,
        }
    }
}

/// Supported output image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG - lossless, quality setting ignored
    Png,
    /// JPEG - lossy, honors the quality setting
    Jpeg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }
}

/// Load milestone the readiness waiter blocks on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WaitState {
    /// Wait until the window load event fires
    Load,
    /// Wait until DOMContentLoaded fires
    #[value(name = "domcontentloaded")]
    DomContentLoaded,
    /// Wait until the load event has fired and no new network resources
    /// appeared for a 500ms quiet window
    #[value(name = "networkidle")]
    NetworkIdle,
}

/// A single unit of work: one URL to capture
///
/// Created by the job runner from CLI input or a batch-file row, immutable
/// once created and consumed exactly once by the pipeline.
#[derive(Debug, Clone)]
pub struct CaptureJob {
    /// Unique identifier for log correlation
    pub id: String,
    /// Target URL as supplied by the user; validated by the runner
    pub url: String,
    /// Optional output file stem overriding the URL-derived name
    pub output_name: Option<String>,
}

impl CaptureJob {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url: url.into(),
            output_name: None,
        }
    }

    pub fn with_name(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            output_name: Some(name.into()),
            ..Self::new(url)
        }
    }
}

/// Terminal status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Succeeded,
    Failed,
}

/// Outcome of one capture job
///
/// Produced exactly once per job and never mutated afterwards. The runner
/// aggregates these, in input order, into the final summary.
#[derive(Debug, Clone)]
pub struct CaptureResult {
    pub job: CaptureJob,
    pub status: JobStatus,
    /// Path the image was written to, on success
    pub output_path: Option<PathBuf>,
    pub error: Option<CaptureError>,
    /// Readiness waiting expired and the capture is best-effort
    pub timed_out: bool,
    pub elapsed: Duration,
}

impl CaptureResult {
    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Succeeded
    }

    pub fn failed(job: CaptureJob, error: CaptureError, elapsed: Duration) -> Self {
        let timed_out = matches!(error, CaptureError::TimedOut(_));
        Self {
            job,
            status: JobStatus::Failed,
            output_path: None,
            error: Some(error),
            timed_out,
            elapsed,
        }
    }
}

/// Generate Chrome command-line arguments for headless screenshot operation
///
/// Scrollbars are hidden and background throttling disabled so that offscreen
/// content renders identically to onscreen content in full-page captures.
pub fn get_chrome_args(options: &CaptureOptions) -> Vec<String> {
    let mut args = vec![
        "--headless".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        "--hide-scrollbars".to_string(),
        "--mute-audio".to_string(),
        "--disable-background-timer-throttling".to_string(),
        "--disable-backgrounding-occluded-windows".to_string(),
        "--disable-renderer-backgrounding".to_string(),
        "--disable-extensions".to_string(),
        "--disable-default-apps".to_string(),
        "--disable-sync".to_string(),
        "--no-first-run".to_string(),
        "--no-zygote".to_string(),
        "--disable-accelerated-2d-canvas".to_string(),
        format!(
            "--window-size={},{}",
            options.viewport.width, options.viewport.height
        ),
        format!(
            "--user-data-dir=/tmp/screeny-profile-{}",
            std::process::id()
        ),
    ];

    if let Some(user_agent) = &options.user_agent {
        args.push(format!("--user-agent={user_agent}"));
    }

    args
}

/// Build the chromiumoxide launch configuration from the run options
pub fn create_browser_config(
    options: &CaptureOptions,
) -> Result<chromiumoxide::browser::BrowserConfig, CaptureError> {
    use chromiumoxide::browser::BrowserConfig;

    let mut builder = BrowserConfig::builder()
        .window_size(options.viewport.width, options.viewport.height)
        .args(get_chrome_args(options));

    if let Some(chrome_path) = &options.chrome_path {
        builder = builder.chrome_executable(chrome_path);
    }

    builder.build().map_err(CaptureError::EngineUnavailable)
}

/// Reject configurations the pipeline cannot honor
pub fn validate_options(options: &CaptureOptions) -> Result<(), CaptureError> {
    if options.pool_size == 0 {
        return Err(CaptureError::InvalidInput(
            "pool size must be greater than 0".to_string(),
        ));
    }

    if options.viewport.width == 0 || options.viewport.height == 0 {
        return Err(CaptureError::InvalidInput(
            "viewport dimensions must be greater than 0".to_string(),
        ));
    }

    if options.viewport.device_scale_factor < 1.0 {
        return Err(CaptureError::InvalidInput(
            "device scale factor must be at least 1.0".to_string(),
        ));
    }

    if options.wait_timeout.is_zero() {
        return Err(CaptureError::InvalidInput(
            "wait timeout must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_default() {
        let options = CaptureOptions::default();
        assert_eq!(options.pool_size, 4);
        assert_eq!(options.jpeg_quality, 90);
        assert_eq!(options.wait_timeout, Duration::from_secs(30));
        assert_eq!(options.format, ImageFormat::Png);
        assert_eq!(options.wait_state, WaitState::NetworkIdle);
        assert!(options.block_ads);
        assert!(options.freeze_animations);
    }

    #[test]
    fn test_viewport_default() {
        let viewport = Viewport::default();
        assert_eq!(viewport.width, 1920);
        assert_eq!(viewport.height, 1080);
        assert_eq!(viewport.device_scale_factor, 2.0);
        assert!(!viewport.mobile);
    }

    #[test]
    fn test_quality_clamping() {
        let mut options = CaptureOptions::default();
        options.jpeg_quality = 0;
        assert_eq!(options.clamped_quality(), 1);
        options.jpeg_quality = 255;
        assert_eq!(options.clamped_quality(), 100);
        options.jpeg_quality = 85;
        assert_eq!(options.clamped_quality(), 85);
    }

    #[test]
    fn test_chrome_args_generation() {
        let options = CaptureOptions::default();
        let args = get_chrome_args(&options);

        assert!(args.contains(&"--headless".to_string()));
        assert!(args.contains(&"--hide-scrollbars".to_string()));
        assert!(args.contains(&"--mute-audio".to_string()));
        assert!(args.contains(&format!(
            "--window-size={},{}",
            options.viewport.width, options.viewport.height
        )));
    }

    #[test]
    fn test_validate_options_rejects_bad_values() {
        let mut options = CaptureOptions::default();
        assert!(validate_options(&options).is_ok());

        options.pool_size = 0;
        assert!(validate_options(&options).is_err());

        options = CaptureOptions::default();
        options.viewport.width = 0;
        assert!(validate_options(&options).is_err());

        options = CaptureOptions::default();
        options.viewport.device_scale_factor = 0.5;
        assert!(validate_options(&options).is_err());

        options = CaptureOptions::default();
        options.wait_timeout = Duration::ZERO;
        assert!(validate_options(&options).is_err());
    }

    #[test]
    fn test_job_construction() {
        let job = CaptureJob::new("https://example.com");
        assert!(!job.id.is_empty());
        assert!(job.output_name.is_none());

        let named = CaptureJob::with_name("https://example.com", "home");
        assert_eq!(named.output_name.as_deref(), Some("home"));
    }

    #[test]
    fn test_format_extensions() {
        assert_eq!(ImageFormat::Png.extension(), "png");
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
    }

    #[test]
    fn test_options_roundtrip_json() {
        let options = CaptureOptions::default();
        let json = serde_json::to_string(&options).unwrap();
        let parsed: CaptureOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.pool_size, options.pool_size);
        assert_eq!(parsed.format, options.format);
        assert_eq!(parsed.wait_state, options.wait_state);
    }
}
