//! Readiness waiting: load milestones, selector waits, lazy-content settling
//!
//! Each job's wait is independent and backed by its own page handle, so a
//! slow page never blocks other jobs. Waits are bounded by the configured
//! timeout; expiry does not fail the job but flags the eventual result as
//! timed out, unless the page rendered nothing at all.

use crate::browser_pool::PageHandle;
use crate::config::{CaptureOptions, WaitState};
use crate::error::CaptureError;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Ceiling for the lazy-load scroll pass, separate from the readiness budget.
const SETTLE_CEILING: Duration = Duration::from_secs(5);

/// Quiet window with no new network resources that defines "network idle".
const NETWORK_IDLE_QUIET_MS: u64 = 500;

/// What the waiter concluded about the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyOutcome {
    /// The readiness budget expired and capture proceeds best-effort.
    pub timed_out: bool,
}

/// Navigate to the job URL and block until the page is ready or the budget
/// runs out.
///
/// On expiry the page is checked for content: a page with a populated body
/// yields a timed-out outcome, an empty one yields `LoadFailed`.
pub async fn navigate_and_wait(
    handle: &PageHandle,
    url: &str,
    options: &CaptureOptions,
) -> Result<ReadyOutcome, CaptureError> {
    let page = &handle.page;
    let deadline = Instant::now() + options.wait_timeout;
    let mut timed_out = false;

    match timeout(options.wait_timeout, page.goto(url)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => return Err(CaptureError::LoadFailed(e.to_string())),
        Err(_) => {
            warn!("Navigation to {} exceeded wait budget", url);
            timed_out = true;
        }
    }

    if !timed_out {
        timed_out = !wait_for_milestone(handle, options.wait_state, deadline).await?;
    }

    if !timed_out {
        if let Some(selector) = &options.wait_selector {
            timed_out = !wait_for_selector(handle, selector, deadline).await?;
        }
    }

    if !timed_out {
        settle_lazy_content(handle).await;
    }

    if timed_out && !has_rendered_content(handle).await {
        return Err(CaptureError::LoadFailed(format!(
            "no content rendered within {:?}",
            options.wait_timeout
        )));
    }

    Ok(ReadyOutcome { timed_out })
}

/// Wait for the requested load milestone. Returns false on budget expiry.
async fn wait_for_milestone(
    handle: &PageHandle,
    state: WaitState,
    deadline: Instant,
) -> Result<bool, CaptureError> {
    let script = match state {
        WaitState::Load => {
            r#"
                new Promise(resolve => {
                    if (document.readyState === 'complete') {
                        resolve(true);
                    } else {
                        window.addEventListener('load', () => resolve(true));
                    }
                })
            "#
            .to_string()
        }
        WaitState::DomContentLoaded => {
            r#"
                new Promise(resolve => {
                    if (document.readyState !== 'loading') {
                        resolve(true);
                    } else {
                        document.addEventListener('DOMContentLoaded', () => resolve(true));
                    }
                })
            "#
            .to_string()
        }
        // Idle is defined as: load event fired and no new resource-timing
        // entries for the quiet window.
        WaitState::NetworkIdle => format!(
            r#"
                new Promise(resolve => {{
                    const QUIET = {NETWORK_IDLE_QUIET_MS};
                    let seen = performance.getEntriesByType('resource').length;
                    let lastChange = Date.now();
                    const tick = () => {{
                        const now = performance.getEntriesByType('resource').length;
                        if (now !== seen) {{
                            seen = now;
                            lastChange = Date.now();
                        }}
                        if (document.readyState === 'complete' &&
                            Date.now() - lastChange >= QUIET) {{
                            resolve(true);
                        }} else {{
                            setTimeout(tick, 100);
                        }}
                    }};
                    tick();
                }})
            "#
        ),
    };

    run_until(handle, &script, deadline).await
}

/// Wait for a selector to resolve to a visible element. Returns false on
/// budget expiry.
async fn wait_for_selector(
    handle: &PageHandle,
    selector: &str,
    deadline: Instant,
) -> Result<bool, CaptureError> {
    let script = format!(
        r#"
            new Promise(resolve => {{
                const check = () => {{
                    const el = document.querySelector('{}');
                    if (el && el.getClientRects().length > 0) {{
                        resolve(true);
                    }} else {{
                        setTimeout(check, 100);
                    }}
                }};
                check();
            }})
        "#,
        selector.replace('\\', "\\\\").replace('\'', "\\'")
    );

    run_until(handle, &script, deadline).await
}

/// Evaluate a promise-returning script, bounded by the readiness deadline.
///
/// Returns Ok(false) when the deadline expires first; evaluation errors are
/// load failures since they indicate a dead or crashed page context.
async fn run_until(
    handle: &PageHandle,
    script: &str,
    deadline: Instant,
) -> Result<bool, CaptureError> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return Ok(false);
    }

    match timeout(remaining, handle.page.evaluate(script)).await {
        Ok(Ok(_)) => Ok(true),
        Ok(Err(e)) => Err(CaptureError::LoadFailed(e.to_string())),
        Err(_) => Ok(false),
    }
}

/// Scroll through the full page height to trigger lazy loading, then return
/// to the top. Best effort: failures and overruns are logged, not fatal.
async fn settle_lazy_content(handle: &PageHandle) {
    let script = r#"
        new Promise(resolve => {
            if (!document.body) {
                resolve(true);
                return;
            }
            const step = () => {
                window.scrollBy(0, window.innerHeight);
                if (window.scrollY + window.innerHeight < document.body.scrollHeight) {
                    setTimeout(step, 100);
                } else {
                    window.scrollTo(0, 0);
                    setTimeout(() => resolve(true), 250);
                }
            };
            step();
        })
    "#;

    match timeout(SETTLE_CEILING, handle.page.evaluate(script)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => debug!("Lazy-load settle failed: {}", e),
        Err(_) => debug!("Lazy-load settle exceeded {:?}", SETTLE_CEILING),
    }
}

/// Whether the page rendered anything at all, used to distinguish a
/// best-effort timed-out capture from a dead load.
async fn has_rendered_content(handle: &PageHandle) -> bool {
    let script = "document.body ? document.body.childElementCount : 0";
    match timeout(Duration::from_secs(2), handle.page.evaluate(script)).await {
        Ok(Ok(value)) => value
            .into_value::<u64>()
            .map(|count| count > 0)
            .unwrap_or(false),
        _ => false,
    }
}
