use std::sync::Arc;
use std::time::Duration;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageBuffer, Rgb, RgbImage};
use tracing::{debug, info, warn};

use crate::device::{PreviewSink, VideoFrame};
use crate::error::CaptureResult;
use crate::persist::{Blob, PersistenceSink};
use crate::session::CaptureConfig;

pub const PHOTO_MIME: &str = "image/jpeg";

/// One encoded still
#[derive(Debug, Clone)]
pub struct PhotoArtifact {
    /// 1-based position in the burst
    pub index: usize,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub jpeg: Vec<u8>,
}

/// Render `frame` onto a `dims`-sized raster, mirror it horizontally and
/// encode it as JPEG.
///
/// A missing frame renders as black, the same as drawing a video element
/// that has nothing to show. Frames of a different size are scaled to fit.
pub fn encode_photo(
    frame: Option<&VideoFrame>,
    dims: (u32, u32),
    quality: u8,
) -> CaptureResult<Vec<u8>> {
    let (width, height) = dims;
    let source = frame.and_then(|f| {
        ImageBuffer::<Rgb<u8>, &[u8]>::from_raw(f.width, f.height, f.pixels.as_slice())
    });

    // Match what the user saw in the front-facing preview
    let canvas = match source {
        Some(img) if img.dimensions() == dims => imageops::flip_horizontal(&img),
        Some(img) => {
            let mut scaled = imageops::resize(&img, width, height, FilterType::Triangle);
            imageops::flip_horizontal_in_place(&mut scaled);
            scaled
        }
        None => RgbImage::new(width, height),
    };

    let mut jpeg = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality);
    encoder.encode(canvas.as_raw(), width, height, ExtendedColorType::Rgb8)?;

    Ok(jpeg)
}

/// Filename of the `index`-th still of a burst
pub fn photo_filename(prefix: &str, index: usize) -> String {
    format!("{}_photo_{}.jpg", prefix, index)
}

/// Takes evenly spaced stills from the live preview.
pub struct PhotoBurstCapturer {
    preview: Arc<dyn PreviewSink>,
    sink: Arc<PersistenceSink>,
    count: usize,
    gap: Duration,
    quality: u8,
    fallback_dimensions: (u32, u32),
    prefix: String,
}

impl PhotoBurstCapturer {
    pub fn new(
        preview: Arc<dyn PreviewSink>,
        sink: Arc<PersistenceSink>,
        config: &CaptureConfig,
    ) -> Self {
        Self {
            preview,
            sink,
            count: config.photo_count,
            gap: config.photo_gap,
            quality: config.jpeg_quality,
            fallback_dimensions: (config.ideal_width, config.ideal_height),
            prefix: config.file_prefix.clone(),
        }
    }

    /// Capture and save the whole burst. Returns the number of stills saved.
    ///
    /// The next still is only scheduled once the previous one has been
    /// handed off, so a slow encode delays the rest instead of overlapping.
    pub async fn capture_burst(&self) -> usize {
        info!("Starting photo burst ({} stills, {:?} apart)", self.count, self.gap);

        let mut saved = 0;
        for index in 1..=self.count {
            match self.capture_frame(index) {
                Ok(photo) => {
                    if self.sink.save(Blob::new(photo.jpeg, PHOTO_MIME), &photo.filename) {
                        saved += 1;
                    }
                }
                Err(e) => warn!("Failed to capture still {}: {}", index, e),
            }

            if index < self.count {
                tokio::time::sleep(self.gap).await;
            }
        }

        info!("Photo burst complete: {}/{} stills saved", saved, self.count);
        saved
    }

    /// Grab and encode the current frame without suspending.
    pub fn capture_frame(&self, index: usize) -> CaptureResult<PhotoArtifact> {
        let (width, height) = match self.preview.video_dimensions() {
            (0, _) | (_, 0) => self.fallback_dimensions,
            dims => dims,
        };

        let frame = self.preview.current_frame();
        if frame.is_none() {
            debug!("No decodable frame for still {}, rendering blank", index);
        }

        let jpeg = encode_photo(frame.as_ref(), (width, height), self.quality)?;

        Ok(PhotoArtifact {
            index,
            filename: photo_filename(&self.prefix, index),
            width,
            height,
            jpeg,
        })
    }
}
