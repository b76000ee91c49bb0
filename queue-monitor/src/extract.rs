use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info, warn};

use crate::bounded::BoundedWorker;
use crate::capture::Frame;
use crate::config::MonitorConfig;
use crate::debug::save_debug_image;
use crate::error::Result;
use crate::logging::LoggingConfig;
use crate::tesseract::OcrEngine;
use crate::threshold::threshold_frame;

/// Frame in, lowercase text out.
///
/// 1. Grayscale
/// 2. Binarize at the configured threshold
/// 3. OCR (bounded by the OCR timeout), then lowercase
pub struct TextExtractor {
    engine: Arc<dyn OcrEngine>,
    worker: BoundedWorker,
    threshold: u8,
    logging: LoggingConfig,
}

impl TextExtractor {
    pub fn new(engine: Arc<dyn OcrEngine>, config: &MonitorConfig) -> Self {
        Self {
            engine,
            worker: BoundedWorker::new("ocr", config.ocr_timeout),
            threshold: config.threshold,
            logging: config.logging.clone(),
        }
    }

    /// Like [`TextExtractor::try_extract`], but a failure is logged and read
    /// as "no text on screen".
    pub fn extract(&self, frame: Frame) -> String {
        match self.try_extract(frame) {
            Ok(text) => text,
            Err(e) => {
                error!("Error processing image: {}", e);
                String::new()
            }
        }
    }

    pub fn try_extract(&self, frame: Frame) -> Result<String> {
        let binary = threshold_frame(&frame.image, self.threshold);

        if let Some(dir) = &self.logging.debug_image_dir {
            match save_debug_image(dir, frame.frame_num, &binary) {
                Ok(path) => debug!("[debug] frame {} saved to {}", frame.frame_num, path.display()),
                Err(e) => warn!("[debug] could not save frame {}: {}", frame.frame_num, e),
            }
        }

        let engine = self.engine.clone();
        let start = Instant::now();
        let text = self
            .worker
            .run(move || engine.recognize(&binary))?
            .to_lowercase();
        if self.logging.debug_timing {
            debug!(
                "[{}] frame {} took {}ms",
                self.worker.name(),
                frame.frame_num,
                start.elapsed().as_millis()
            );
        }

        let trimmed = text.trim();
        if self.logging.log_detected_text && !trimmed.is_empty() {
            info!("Detected text: {}", trimmed);
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use image::{GrayImage, Rgb, RgbImage};
    use std::sync::Mutex;

    /// Records what it was shown and answers with a fixed string.
    struct Recording {
        seen: Mutex<Vec<GrayImage>>,
        answer: std::result::Result<String, String>,
    }

    impl OcrEngine for Recording {
        fn recognize(&self, image: &GrayImage) -> Result<String> {
            self.seen.lock().unwrap().push(image.clone());
            self.answer.clone().map_err(Error::from)
        }

        fn version(&self) -> Result<String> {
            Ok("test".into())
        }
    }

    fn frame(image: RgbImage) -> Frame {
        Frame {
            image,
            frame_num: 0,
        }
    }

    #[test]
    fn lowercases_and_feeds_binary_image() -> Result<()> {
        let engine = Arc::new(Recording {
            seen: Mutex::new(vec![]),
            answer: Ok("Solo Shuffle\nQUEUE Ready\n".into()),
        });
        let extractor = TextExtractor::new(engine.clone(), &MonitorConfig::default());

        let image = RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([40, 40, 40])
            }
        });
        let text = extractor.try_extract(frame(image))?;
        assert_eq!(text, "solo shuffle\nqueue ready\n");

        let seen = engine.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].as_raw(), &vec![255, 0]);
        Ok(())
    }

    #[test]
    fn ocr_failure_reads_as_empty_text() {
        let engine = Arc::new(Recording {
            seen: Mutex::new(vec![]),
            answer: Err("tesseract crashed".into()),
        });
        let extractor = TextExtractor::new(engine, &MonitorConfig::default());
        let image = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        assert!(extractor.try_extract(frame(image.clone())).is_err());
        assert_eq!(extractor.extract(frame(image)), "");
    }
}
