use std::time::Duration;
use url::Url;

use crate::config::{CaptureJob, ImageFormat};
use crate::error::CaptureError;

/// Predicate-driven blocklist of known ad/tracker URL patterns
///
/// The pipeline never hardcodes matching logic; rules live here so rule-set
/// updates stay out of the capture path.
pub struct Blocklist {
    patterns: Vec<String>,
}

impl Blocklist {
    pub fn new() -> Self {
        let patterns = [
            // Ad networks
            "doubleclick.net",
            "googlesyndication.com",
            "googleadservices.com",
            "adsystem",
            "adnxs.com",
            "amazon-adsystem.com",
            // Tag managers / analytics
            "googletagmanager.com",
            "google-analytics.com",
            "analytics.google.com",
            // Trackers
            "hotjar.com",
            "mixpanel.com",
            "segment.com",
            "crazyegg.com",
            "mouseflow.com",
            "clarity.ms",
            "facebook.com/tr",
        ]
        .iter()
        .map(|p| p.to_string())
        .collect();

        Self { patterns }
    }

    pub fn add_pattern(&mut self, pattern: impl Into<String>) {
        self.patterns.push(pattern.into());
    }

    /// Whether a request URL matches any blocked pattern.
    pub fn should_block(&self, url: &str) -> bool {
        let url_lower = url.to_lowercase();
        self.patterns.iter().any(|p| url_lower.contains(p))
    }

    /// CDP fetch-domain URL patterns, one wildcard glob per rule.
    ///
    /// Only matching requests are paused by the interceptor; everything else
    /// proceeds without a round-trip through us.
    pub fn cdp_url_patterns(&self) -> Vec<String> {
        self.patterns.iter().map(|p| format!("*{p}*")).collect()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for Blocklist {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse and validate a job URL, accepting only http/https
pub fn validate_url(url: &str) -> Result<Url, CaptureError> {
    let parsed = Url::parse(url)
        .map_err(|e| CaptureError::InvalidInput(format!("malformed URL {url:?}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(CaptureError::InvalidInput(format!(
            "unsupported URL scheme {other:?} in {url:?}"
        ))),
    }
}

pub fn sanitize_filename(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '&' | '=' | '#' => '_',
            c if c.is_control() || c.is_whitespace() => '_',
            c => c,
        })
        .collect::<String>()
        .trim_matches('_')
        .to_string()
}

/// Deterministic output filename for a job
///
/// Uses the explicit output name when one was supplied, otherwise a sanitized
/// form of the URL. The same job and format always produce the same name.
pub fn output_filename(job: &CaptureJob, format: ImageFormat) -> String {
    let stem = match &job.output_name {
        Some(name) => sanitize_filename(name),
        None => {
            let stripped = job
                .url
                .trim_start_matches("https://")
                .trim_start_matches("http://")
                .trim_end_matches('/');
            sanitize_filename(stripped)
        }
    };

    let stem = if stem.is_empty() {
        "screenshot".to_string()
    } else {
        stem
    };

    format!("{stem}.{}", format.extension())
}

pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    let millis = duration.subsec_millis();

    if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else if seconds > 0 {
        format!("{}.{}s", seconds, millis / 100)
    } else {
        format!("{millis}ms")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocklist_matches_known_ad_hosts() {
        let blocklist = Blocklist::new();

        assert!(blocklist.should_block("https://googletagmanager.com/gtm.js"));
        assert!(blocklist.should_block("https://ad.doubleclick.net/ddm/trackclk"));
        assert!(blocklist.should_block("https://www.facebook.com/tr?id=123"));
        assert!(blocklist.should_block("HTTPS://STATIC.HOTJAR.COM/c.js"));

        assert!(!blocklist.should_block("https://example.com/main.js"));
        assert!(!blocklist.should_block("https://example.com/style.css"));
    }

    #[test]
    fn test_blocklist_custom_pattern() {
        let mut blocklist = Blocklist::new();
        assert!(!blocklist.should_block("https://ads.internal.test/banner"));
        blocklist.add_pattern("ads.internal.test");
        assert!(blocklist.should_block("https://ads.internal.test/banner"));
    }

    #[test]
    fn test_cdp_patterns_are_globs() {
        let blocklist = Blocklist::new();
        let patterns = blocklist.cdp_url_patterns();
        assert_eq!(patterns.len(), blocklist.len());
        assert!(patterns.iter().all(|p| p.starts_with('*') && p.ends_with('*')));
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com").is_ok());
        assert!(validate_url("http://example.com/path?q=1").is_ok());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("not a url").is_err());
        assert!(validate_url("").is_err());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("test.txt"), "test.txt");
        assert_eq!(sanitize_filename("a/b:c?d"), "a_b_c_d");
        assert_eq!(sanitize_filename("  spaced  "), "spaced");
    }

    #[test]
    fn test_output_filename_from_url() {
        let job = CaptureJob::new("https://example.com/pricing?plan=pro");
        assert_eq!(
            output_filename(&job, ImageFormat::Png),
            "example.com_pricing_plan_pro.png"
        );
    }

    #[test]
    fn test_output_filename_prefers_explicit_name() {
        let job = CaptureJob::with_name("https://example.com", "landing page");
        assert_eq!(output_filename(&job, ImageFormat::Jpeg), "landing_page.jpg");
    }

    #[test]
    fn test_output_filename_is_deterministic() {
        let job = CaptureJob::new("https://example.com/a");
        assert_eq!(
            output_filename(&job, ImageFormat::Png),
            output_filename(&job, ImageFormat::Png)
        );
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs(5)), "5.0s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
    }
}
