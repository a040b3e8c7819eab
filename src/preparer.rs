//! Page preparation: viewport, device emulation, and request filtering
//!
//! Everything here runs against a freshly checked-out page handle before
//! navigation, so that the very first network request already sees the
//! emulated device and the ad/tracker filter.

use crate::browser_pool::PageHandle;
use crate::config::CaptureOptions;
use crate::error::CaptureError;
use crate::utils::Blocklist;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetTouchEmulationEnabledParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::fetch::{
    DisableParams, EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::network::ErrorReason;
use futures::StreamExt;
use tracing::{debug, trace};

/// User agent presented when mobile emulation is on and no override is set.
const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";

/// Configure a page handle according to the run options.
///
/// Idempotent per handle: request interception is disabled before it is
/// re-enabled, so re-preparing a reused handle resets the filter instead of
/// stacking a second one.
pub async fn prepare(handle: &PageHandle, options: &CaptureOptions) -> Result<(), CaptureError> {
    let page = &handle.page;
    let viewport = &options.viewport;

    let metrics = SetDeviceMetricsOverrideParams::builder()
        .width(viewport.width)
        .height(viewport.height)
        .device_scale_factor(viewport.device_scale_factor)
        .mobile(viewport.mobile)
        .build()
        .map_err(CaptureError::LoadFailed)?;

    page.execute(metrics)
        .await
        .map_err(|e| CaptureError::LoadFailed(format!("device metrics override: {e}")))?;

    if viewport.mobile {
        let touch = SetTouchEmulationEnabledParams::builder()
            .enabled(true)
            .build()
            .map_err(CaptureError::LoadFailed)?;
        page.execute(touch)
            .await
            .map_err(|e| CaptureError::LoadFailed(format!("touch emulation: {e}")))?;

        let ua = options
            .user_agent
            .clone()
            .unwrap_or_else(|| MOBILE_USER_AGENT.to_string());
        page.execute(SetUserAgentOverrideParams::new(ua))
            .await
            .map_err(|e| CaptureError::LoadFailed(format!("user agent override: {e}")))?;
    }

    if options.block_ads {
        install_request_filter(handle, &Blocklist::new()).await?;
    }

    debug!(
        "Page prepared: {}x{} @{}x mobile={} block_ads={}",
        viewport.width,
        viewport.height,
        viewport.device_scale_factor,
        viewport.mobile,
        options.block_ads
    );

    Ok(())
}

/// Install the ad/tracker request filter on a page.
///
/// Only URLs matching a blocklist pattern are paused by the fetch domain;
/// every paused request is aborted as blocked-by-client. Unmatched traffic
/// never reaches us. The listener task exits on its own when the page's
/// event stream ends at handle checkin.
async fn install_request_filter(
    handle: &PageHandle,
    blocklist: &Blocklist,
) -> Result<(), CaptureError> {
    let page = &handle.page;

    let patterns: Vec<RequestPattern> = blocklist
        .cdp_url_patterns()
        .into_iter()
        .map(|glob| RequestPattern::builder().url_pattern(glob).build())
        .collect();

    if patterns.is_empty() {
        return Ok(());
    }

    // Register the listener before enabling fetch to avoid a race where the
    // first matched request pauses with nobody draining the event stream.
    let mut pause_events = page
        .event_listener::<EventRequestPaused>()
        .await
        .map_err(|e| CaptureError::LoadFailed(format!("request filter listener: {e}")))?;

    // Reset any filter installed by an earlier prepare of this handle.
    let _ = page.execute(DisableParams::default()).await;

    let enable = EnableParams::builder().patterns(patterns).build();
    page.execute(enable)
        .await
        .map_err(|e| CaptureError::LoadFailed(format!("request filter enable: {e}")))?;

    let page = page.clone();
    tokio::spawn(async move {
        while let Some(event) = pause_events.next().await {
            trace!("Blocking request {}", event.request.url);
            let params =
                FailRequestParams::new(event.request_id.clone(), ErrorReason::BlockedByClient);
            let _ = page.execute(params).await;
        }
    });

    Ok(())
}
