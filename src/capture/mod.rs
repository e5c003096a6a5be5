use anyhow::{bail, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

mod synthetic;

pub use synthetic::SyntheticSource;

/// JPEG quality used for frames sent to the analyzer. Keeps the payload
/// compact without losing the detail the model needs.
pub const JPEG_QUALITY: u8 = 80;

/// One raw frame pulled from the media source, tightly packed RGB8.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Boundary to whatever supplies live video. The engine only ever asks for
/// the most recent frame; `None` means no frame is available yet and the
/// sampling cycle skips silently.
pub trait FrameSource: Send + Sync {
    fn latest_frame(&self) -> Result<Option<RawFrame>>;
    fn dimensions(&self) -> (u32, u32);
}

/// Encode a raw frame as JPEG. CPU-bound; callers run this on the blocking
/// pool.
pub fn encode_frame_jpeg(frame: &RawFrame, quality: u8) -> Result<Vec<u8>> {
    let expected = frame.width as usize * frame.height as usize * 3;
    if frame.pixels.len() != expected {
        bail!(
            "frame buffer is {} bytes, expected {} for {}x{} RGB8",
            frame.pixels.len(),
            expected,
            frame.width,
            frame.height
        );
    }

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality)
        .encode(
            &frame.pixels,
            frame.width,
            frame.height,
            ExtendedColorType::Rgb8,
        )
        .context("failed to encode frame as JPEG")?;
    Ok(jpeg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_synthetic_frame() {
        let source = SyntheticSource::new(64, 48);
        let frame = source.latest_frame().unwrap().unwrap();
        let jpeg = encode_frame_jpeg(&frame, JPEG_QUALITY).unwrap();
        // JPEG SOI marker
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert!(jpeg.len() > 100);
    }

    #[test]
    fn rejects_mismatched_buffer() {
        let frame = RawFrame {
            width: 10,
            height: 10,
            pixels: vec![0; 7],
        };
        assert!(encode_frame_jpeg(&frame, JPEG_QUALITY).is_err());
    }
}
