use std::time::Duration;
use thiserror::Error;

/// Error taxonomy for the capture pipeline.
///
/// Only `EngineUnavailable` is fatal for a whole run; everything else is
/// caught at the job-runner boundary and converted into a failed
/// `CaptureResult` for that one job.
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("browser engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("page load failed: {0}")]
    LoadFailed(String),

    #[error("readiness wait timed out after {0:?}")]
    TimedOut(Duration),

    #[error("render exceeded ceiling of {0:?}")]
    RenderTimeout(Duration),

    #[error("image encoding failed: {0}")]
    Encoding(String),

    #[error("io error: {0}")]
    Io(String),
}

impl CaptureError {
    /// Fatal errors abort the whole run; per-job errors do not.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CaptureError::EngineUnavailable(_))
    }

    /// Short stable label used in the run summary.
    pub fn kind(&self) -> &'static str {
        match self {
            CaptureError::EngineUnavailable(_) => "EngineUnavailable",
            CaptureError::InvalidInput(_) => "InvalidInput",
            CaptureError::LoadFailed(_) => "LoadFailed",
            CaptureError::TimedOut(_) => "TimedOut",
            CaptureError::RenderTimeout(_) => "RenderTimeout",
            CaptureError::Encoding(_) => "EncodingError",
            CaptureError::Io(_) => "IOError",
        }
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CaptureError {
    fn from(err: serde_json::Error) -> Self {
        CaptureError::InvalidInput(err.to_string())
    }
}
