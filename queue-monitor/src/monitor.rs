use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, info};

use crate::bounded::BoundedWorker;
use crate::capture::{Frame, FrameSource};
use crate::config::MonitorConfig;
use crate::error::{Error, Result};
use crate::extract::TextExtractor;
use crate::keywords::Keywords;
use crate::notify::{Delivery, Notifier, NotifierState};
use crate::region::CaptureRegion;
use crate::tesseract::OcrEngine;
use crate::util::format_seconds;

/// How often the inter-scan sleep checks for a stop request.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Outcome of a single scan.
#[derive(Debug)]
pub enum Tick {
    /// The capture failed or timed out; nothing else ran
    NoFrame(Error),

    /// A frame was read but none of the keywords were in it
    NoMatch,

    /// A keyword was found, and this is what the notifier did about it
    Matched { keyword: String, delivery: Delivery },
}

/// The polling loop: capture → threshold/OCR → keyword match → notify.
///
/// ```no_run
/// # use std::sync::{atomic::AtomicBool, Arc};
/// # use queue_monitor::{capture::ScreenCapturer, config::MonitorConfig, monitor::QueueMonitor,
/// #     region::CaptureRegion, tesseract::TesseractCli};
/// # fn main() -> queue_monitor::error::Result<()> {
/// let config = MonitorConfig::default();
/// let engine = Arc::new(TesseractCli::from_config(&config));
/// let region = CaptureRegion::for_primary_display()?;
/// let mut monitor = QueueMonitor::new(config, region, Arc::new(ScreenCapturer), engine)?;
/// monitor.run(&AtomicBool::new(false));
/// # Ok(())
/// # }
/// ```
pub struct QueueMonitor {
    config: MonitorConfig,
    region: CaptureRegion,
    source: Arc<dyn FrameSource>,
    capture_worker: BoundedWorker,
    extractor: TextExtractor,
    keywords: Keywords,
    notifier: Notifier,
    frame_num: u64,
}

impl QueueMonitor {
    pub fn new(
        config: MonitorConfig,
        region: CaptureRegion,
        source: Arc<dyn FrameSource>,
        engine: Arc<dyn OcrEngine>,
    ) -> Result<Self> {
        let notifier = Notifier::from_config(&config)?;
        Ok(Self {
            capture_worker: BoundedWorker::new("capture", config.capture_timeout),
            extractor: TextExtractor::new(engine, &config),
            keywords: Keywords::new(&config.keywords),
            region,
            source,
            notifier,
            frame_num: 0,
            config,
        })
    }

    /// Grab the region once. A failure is logged before it is returned.
    pub fn capture_frame(&mut self) -> Result<Frame> {
        let source = self.source.clone();
        let region = self.region;
        let start = Instant::now();
        match self.capture_worker.run(move || source.capture(&region)) {
            Ok(image) => {
                let frame = Frame {
                    image,
                    frame_num: self.frame_num,
                };
                self.frame_num += 1;
                if self.config.logging.debug_timing {
                    debug!(
                        "[capture] frame {} took {}ms",
                        frame.frame_num,
                        start.elapsed().as_millis()
                    );
                }
                Ok(frame)
            }
            Err(e) => {
                error!("Error capturing screen: {}", e);
                Err(e)
            }
        }
    }

    /// One full scan. `now` is the instant the cooldown is measured against.
    pub fn check_for_queue(&mut self, now: Instant) -> Tick {
        let frame = match self.capture_frame() {
            Ok(frame) => frame,
            Err(e) => return Tick::NoFrame(e),
        };

        let text = self.extractor.extract(frame);

        let keyword = match self.keywords.first_match(&text) {
            Some(keyword) => keyword.to_string(),
            None => return Tick::NoMatch,
        };

        if self.notifier.state(now) == NotifierState::Idle {
            info!("Queue pop detected! (matched \"{}\")", keyword);
        }
        let delivery = self.notifier.notify(now);
        if let Delivery::Suppressed { remaining } = &delivery {
            debug!(
                "Queue pop still visible, next notification allowed in {}",
                format_seconds(remaining.as_secs_f64())
            );
        }

        Tick::Matched { keyword, delivery }
    }

    /// Scan, sleep, repeat until `stop` is set. The scan in progress always
    /// completes; the sleep after it is cut short.
    pub fn run(&mut self, stop: &AtomicBool) {
        info!("Starting screen monitoring...");
        info!("Looking for keywords: {:?}", self.keywords.as_slice());
        info!("Monitoring screen region: {}", self.region);

        while !stop.load(Ordering::Acquire) {
            self.check_for_queue(Instant::now());
            self.sleep_until_next_scan(stop);
        }

        info!("Stopping monitor...");
    }

    fn sleep_until_next_scan(&self, stop: &AtomicBool) {
        let deadline = Instant::now() + self.config.scan_interval;
        while !stop.load(Ordering::Acquire) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(STOP_POLL_INTERVAL));
        }
    }
}
