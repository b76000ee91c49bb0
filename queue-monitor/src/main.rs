use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, info};

use queue_monitor::capture::ScreenCapturer;
use queue_monitor::config::MonitorConfig;
use queue_monitor::error::{Error, Result};
use queue_monitor::logging::init_logging;
use queue_monitor::monitor::QueueMonitor;
use queue_monitor::region::CaptureRegion;
use queue_monitor::tesseract::OcrEngine;

fn main() -> ExitCode {
    let config = MonitorConfig::default();

    println!("Queue Monitor");
    println!("----------------");
    println!(
        "1. Make sure your phone's IP address is correct: {}",
        config.phone_ip
    );
    println!("2. Make sure the game window is on the primary display");
    println!("3. Press Ctrl+C to stop monitoring");
    println!("----------------");

    init_logging();

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Error in monitoring: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: MonitorConfig) -> Result<()> {
    let engine = ocr_engine(&config)?;
    let region = CaptureRegion::for_primary_display()?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::Release))?;
    }

    let mut monitor = QueueMonitor::new(config, region, Arc::new(ScreenCapturer), engine)?;

    // Anything escaping the loop body is fatal.
    panic::catch_unwind(AssertUnwindSafe(|| monitor.run(&stop)))
        .map_err(|_| Error::from("monitor loop panicked"))
}

#[cfg(not(feature = "tesseract"))]
fn ocr_engine(config: &MonitorConfig) -> Result<Arc<dyn OcrEngine>> {
    use queue_monitor::tesseract::{exe_looks_present, TesseractCli};

    let engine = TesseractCli::from_config(config);
    match engine.version() {
        Ok(version) => info!("Using tesseract {} at {}", version, engine.exe.display()),
        Err(e) => {
            if !exe_looks_present(&engine.exe) {
                error!(
                    "Tesseract is not installed at {}. Please install it from: https://github.com/UB-Mannheim/tesseract/wiki",
                    engine.exe.display()
                );
            }
            return Err(e.context("tesseract is unavailable"));
        }
    }
    engine
        .check_language()
        .map_err(|e| e.context("tesseract cannot read this language"))?;
    Ok(Arc::new(engine))
}

#[cfg(feature = "tesseract")]
fn ocr_engine(config: &MonitorConfig) -> Result<Arc<dyn OcrEngine>> {
    let engine = queue_monitor::tesseract::init_tesseract(None, Some(&config.language))
        .map_err(|e| e.context("tesseract is unavailable"))?;
    info!("Using {}", engine.version()?);
    Ok(Arc::new(engine))
}
