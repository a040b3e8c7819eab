//! Animation freezing for deterministic captures
//!
//! Injects a style override that zeroes CSS animation/transition timing and
//! pauses media playback, so two captures of the same static page produce
//! byte-identical output. Must run after readiness waiting: freezing earlier
//! can stop lazy-loaded content from ever triggering.

use crate::browser_pool::PageHandle;
use crate::config::CaptureOptions;
use crate::error::CaptureError;
use tracing::debug;

const FREEZE_SCRIPT: &str = r#"
    (() => {
        if (document.querySelector('style[data-screeny-freeze]')) {
            return true;
        }
        const style = document.createElement('style');
        style.setAttribute('data-screeny-freeze', '');
        style.textContent = `
            *, *::before, *::after {
                animation-duration: 0.01ms !important;
                animation-delay: -0.01ms !important;
                animation-iteration-count: 1 !important;
                transition-duration: 0ms !important;
                transition-delay: 0ms !important;
                scroll-behavior: auto !important;
                background-attachment: initial !important;
            }
        `;
        document.head.appendChild(style);
        document.querySelectorAll('video, audio').forEach(m => {
            try { m.pause(); } catch (_) {}
        });
        if (document.getAnimations) {
            document.getAnimations().forEach(a => {
                try { a.pause(); } catch (_) {}
            });
        }
        return true;
    })()
"#;

/// Freeze animations and transitions on the page.
///
/// No-op when `freeze_animations` is off. Idempotent: the injected style tag
/// is marked and re-injection is skipped.
pub async fn freeze(handle: &PageHandle, options: &CaptureOptions) -> Result<(), CaptureError> {
    if !options.freeze_animations {
        return Ok(());
    }

    handle
        .page
        .evaluate(FREEZE_SCRIPT)
        .await
        .map_err(|e| CaptureError::LoadFailed(format!("animation freeze: {e}")))?;

    debug!("Animations frozen");
    Ok(())
}
