use crate::batch;
use crate::browser_pool::BrowserPool;
use crate::config::{validate_options, CaptureJob, CaptureOptions, CaptureResult, ImageFormat, WaitState};
use crate::error::CaptureError;
use crate::runner::{JobRunner, RunSummary};
use crate::utils::format_duration;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "screeny")]
#[command(about = "Deterministic full-page web screenshot capture")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, help = "JSON configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(short, long, default_value = "./screenshots", help = "Output directory")]
    pub output_dir: PathBuf,

    #[arg(long, value_enum, help = "Output format")]
    pub format: Option<ImageFormat>,

    #[arg(long, help = "JPEG quality 1-100")]
    pub quality: Option<u8>,

    #[arg(long, help = "Viewport width in pixels")]
    pub width: Option<u32>,

    #[arg(long, help = "Viewport height in pixels")]
    pub height: Option<u32>,

    #[arg(long, help = "Device pixel ratio, >= 1.0")]
    pub scale: Option<f64>,

    #[arg(long, help = "Emulate a mobile device")]
    pub mobile: bool,

    #[arg(long, value_enum, help = "Load milestone to wait for")]
    pub wait_state: Option<WaitState>,

    #[arg(long, help = "CSS selector that must be visible before capture")]
    pub wait_selector: Option<String>,

    #[arg(long, help = "Readiness timeout in milliseconds")]
    pub wait_timeout: Option<u64>,

    #[arg(long, help = "Do not freeze animations before capture")]
    pub no_freeze: bool,

    #[arg(long, help = "Do not block ad/tracker requests")]
    pub no_block_ads: bool,

    #[arg(long, help = "Concurrent page context limit")]
    pub pool_size: Option<usize>,

    #[arg(long, help = "Chrome executable path")]
    pub chrome_path: Option<String>,

    #[arg(long, help = "Custom User-Agent string")]
    pub user_agent: Option<String>,

    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Capture a single URL
    Single {
        #[arg(short, long, help = "URL to capture")]
        url: String,

        #[arg(long, help = "Output file stem overriding the URL-derived name")]
        output_name: Option<String>,
    },

    /// Capture every URL in a batch file (plain text or CSV)
    Batch {
        #[arg(short, long, help = "Input file: one URL per line, or CSV with a url column")]
        input: PathBuf,
    },
}

/// Build the run options from an optional JSON config file plus CLI
/// overrides, then validate the combination.
pub async fn load_options(args: &Cli) -> Result<CaptureOptions, CaptureError> {
    let mut options = if let Some(config_path) = &args.config {
        let content = tokio::fs::read_to_string(config_path)
            .await
            .map_err(|e| CaptureError::Io(format!("{}: {e}", config_path.display())))?;
        serde_json::from_str(&content)?
    } else {
        CaptureOptions::default()
    };

    options.output_dir = args.output_dir.clone();

    if let Some(format) = args.format {
        options.format = format;
    }
    if let Some(quality) = args.quality {
        options.jpeg_quality = quality;
    }
    if let Some(width) = args.width {
        options.viewport.width = width;
    }
    if let Some(height) = args.height {
        options.viewport.height = height;
    }
    if let Some(scale) = args.scale {
        options.viewport.device_scale_factor = scale;
    }
    if args.mobile {
        options.viewport.mobile = true;
    }
    if let Some(wait_state) = args.wait_state {
        options.wait_state = wait_state;
    }
    if args.wait_selector.is_some() {
        options.wait_selector = args.wait_selector.clone();
    }
    if let Some(timeout_ms) = args.wait_timeout {
        options.wait_timeout = Duration::from_millis(timeout_ms);
    }
    if args.no_freeze {
        options.freeze_animations = false;
    }
    if args.no_block_ads {
        options.block_ads = false;
    }
    if let Some(pool_size) = args.pool_size {
        options.pool_size = pool_size;
    }
    if args.chrome_path.is_some() {
        options.chrome_path = args.chrome_path.clone();
    }
    if args.user_agent.is_some() {
        options.user_agent = args.user_agent.clone();
    }

    validate_options(&options)?;
    Ok(options)
}

pub struct CliRunner {
    pub options: Arc<CaptureOptions>,
    pub pool: Arc<BrowserPool>,
    pub runner: JobRunner,
}

impl CliRunner {
    /// Launch the browser engine. Failure here is fatal for the run.
    pub async fn new(options: CaptureOptions) -> Result<Self, CaptureError> {
        let options = Arc::new(options);
        let pool = Arc::new(BrowserPool::launch(&options).await?);
        let runner = JobRunner::new(pool.clone(), options.clone());

        Ok(Self {
            options,
            pool,
            runner,
        })
    }

    pub async fn run(&self, command: Commands) -> Result<Vec<CaptureResult>, CaptureError> {
        let jobs = match command {
            Commands::Single { url, output_name } => {
                info!("Capturing single URL: {}", url);
                vec![match output_name {
                    Some(name) => CaptureJob::with_name(url, name),
                    None => CaptureJob::new(url),
                }]
            }
            Commands::Batch { input } => batch::load_jobs(&input).await?,
        };

        Ok(self.runner.run(jobs).await)
    }

    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}

/// Print the per-URL outcome report. Returns true if any failure was fatal
/// at the engine level, which maps to a non-zero exit.
pub fn report_results(results: &[CaptureResult]) -> bool {
    let summary = RunSummary::from_results(results);

    println!(
        "\n{} jobs: {} succeeded, {} failed, {} timed out",
        summary.total, summary.succeeded, summary.failed, summary.timed_out
    );

    for result in results {
        let elapsed = format_duration(result.elapsed);
        match (&result.output_path, &result.error) {
            (Some(path), _) => {
                let flag = if result.timed_out { " [timed out]" } else { "" };
                println!("  ok   {} -> {} ({elapsed}){flag}", result.job.url, path.display());
            }
            (None, Some(error)) => {
                println!("  FAIL {} [{}] {} ({elapsed})", result.job.url, error.kind(), error);
            }
            (None, None) => {
                println!("  FAIL {} (no error recorded)", result.job.url);
            }
        }
    }

    results
        .iter()
        .any(|r| r.error.as_ref().map(|e| e.is_fatal()).unwrap_or(false))
}

pub fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli(extra: &[&str]) -> Cli {
        let mut argv = vec!["screeny"];
        argv.extend_from_slice(extra);
        argv.extend_from_slice(&["single", "--url", "https://example.com"]);
        Cli::parse_from(argv)
    }

    #[tokio::test]
    async fn test_cli_defaults_flow_into_options() {
        let cli = base_cli(&[]);
        let options = load_options(&cli).await.unwrap();
        assert_eq!(options.pool_size, 4);
        assert_eq!(options.format, ImageFormat::Png);
        assert_eq!(options.wait_state, WaitState::NetworkIdle);
        assert!(options.freeze_animations);
        assert!(options.block_ads);
    }

    #[tokio::test]
    async fn test_cli_overrides() {
        let cli = base_cli(&[
            "--format",
            "jpeg",
            "--quality",
            "75",
            "--width",
            "375",
            "--height",
            "812",
            "--scale",
            "3.0",
            "--mobile",
            "--wait-state",
            "load",
            "--wait-timeout",
            "5000",
            "--no-freeze",
            "--no-block-ads",
            "--pool-size",
            "2",
        ]);
        let options = load_options(&cli).await.unwrap();
        assert_eq!(options.format, ImageFormat::Jpeg);
        assert_eq!(options.jpeg_quality, 75);
        assert_eq!(options.viewport.width, 375);
        assert_eq!(options.viewport.height, 812);
        assert_eq!(options.viewport.device_scale_factor, 3.0);
        assert!(options.viewport.mobile);
        assert_eq!(options.wait_state, WaitState::Load);
        assert_eq!(options.wait_timeout, Duration::from_millis(5000));
        assert!(!options.freeze_animations);
        assert!(!options.block_ads);
        assert_eq!(options.pool_size, 2);
    }

    #[tokio::test]
    async fn test_cli_rejects_invalid_combination() {
        let cli = base_cli(&["--scale", "0.5"]);
        let err = load_options(&cli).await.unwrap_err();
        assert_eq!(err.kind(), "InvalidInput");
    }

    #[tokio::test]
    async fn test_config_file_seeds_options() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut f = std::fs::File::create(&path).unwrap();
        let json = serde_json::to_string(&CaptureOptions {
            pool_size: 2,
            ..Default::default()
        })
        .unwrap();
        f.write_all(json.as_bytes()).unwrap();

        let mut argv = vec!["screeny".to_string(), "--config".to_string()];
        argv.push(path.to_string_lossy().into_owned());
        argv.extend(["single", "--url", "https://example.com"].map(String::from));
        let cli = Cli::parse_from(argv);

        let options = load_options(&cli).await.unwrap();
        assert_eq!(options.pool_size, 2);
    }
}
