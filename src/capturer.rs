//! Full-page raster capture and encoding
//!
//! Chrome composes the entire scrollable height in one surface capture
//! (capture-beyond-viewport), so pages taller than the viewport come out
//! seamless. The PNG bytes from the protocol are decoded once to validate the
//! raster and read its dimensions, then re-encoded to JPEG when requested.

use crate::browser_pool::PageHandle;
use crate::config::{CaptureOptions, ImageFormat};
use crate::error::CaptureError;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use image::GenericImageView;
use std::io::Cursor;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Internal ceiling on the raster itself, independent of readiness waiting.
const RENDER_CEILING: Duration = Duration::from_secs(60);

/// A finished capture with its pixel dimensions.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Raster the full page and encode to the configured format.
///
/// JPEG quality is clamped to [1,100]; PNG ignores quality. Exceeding the
/// render ceiling yields `RenderTimeout`; any other render-stage failure,
/// including a raster Chrome cannot decode, yields `EncodingError`.
pub async fn capture(
    handle: &PageHandle,
    options: &CaptureOptions,
) -> Result<CapturedImage, CaptureError> {
    let params = ScreenshotParams::builder()
        .format(CaptureScreenshotFormat::Png)
        .full_page(true)
        .from_surface(true)
        .build();

    let png_bytes = match timeout(RENDER_CEILING, handle.page.screenshot(params)).await {
        Ok(Ok(bytes)) => bytes,
        // The page is loaded by this stage, so a protocol failure here is a
        // render problem, not a load problem.
        Ok(Err(e)) => return Err(CaptureError::Encoding(format!("raster capture: {e}"))),
        Err(_) => return Err(CaptureError::RenderTimeout(RENDER_CEILING)),
    };

    let captured = finish(png_bytes, options)?;

    debug!(
        "Captured {}x{} ({} bytes)",
        captured.width,
        captured.height,
        captured.bytes.len()
    );

    Ok(captured)
}

/// Validate the protocol raster, read its dimensions, and produce the output
/// bytes in the configured format.
fn finish(png_bytes: Vec<u8>, options: &CaptureOptions) -> Result<CapturedImage, CaptureError> {
    let image = image::load_from_memory(&png_bytes)
        .map_err(|e| CaptureError::Encoding(format!("raster decode: {e}")))?;
    let (width, height) = image.dimensions();

    let bytes = match options.format {
        ImageFormat::Png => png_bytes,
        ImageFormat::Jpeg => {
            let mut jpeg_bytes = Vec::new();
            image
                .write_to(
                    &mut Cursor::new(&mut jpeg_bytes),
                    image::ImageOutputFormat::Jpeg(options.clamped_quality()),
                )
                .map_err(|e| CaptureError::Encoding(format!("jpeg encode: {e}")))?;
            jpeg_bytes
        }
    };

    Ok(CapturedImage {
        bytes,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_raster_is_an_encoding_error() {
        let options = CaptureOptions::default();
        let err = finish(vec![0u8; 16], &options).unwrap_err();
        assert_eq!(err.kind(), "EncodingError");
    }

    #[test]
    fn test_jpeg_reencode_preserves_dimensions() {
        let mut png = Vec::new();
        image::DynamicImage::new_rgb8(4, 6)
            .write_to(&mut Cursor::new(&mut png), image::ImageOutputFormat::Png)
            .unwrap();

        let options = CaptureOptions {
            format: ImageFormat::Jpeg,
            jpeg_quality: 80,
            ..Default::default()
        };
        let captured = finish(png, &options).unwrap();
        assert_eq!((captured.width, captured.height), (4, 6));
        assert!(!captured.bytes.is_empty());
    }
}
