use std::io::Write;
use std::path::PathBuf;

use env_logger::{Builder, Env};

/// Specify which chatty events are logged.
/// Logging every tick at one scan per second quickly becomes unreadable, so
/// only the detected text is enabled by default.
///
/// Errors and the startup/shutdown lines are always logged.
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// log the (trimmed) OCR text whenever it is non-empty
    pub log_detected_text: bool,

    /// print the full tesseract command line before every recognition
    pub debug_ocr_command: bool,

    /// print how long capture and OCR took on every tick
    pub debug_timing: bool,

    /// write every binarized frame to this directory, for tuning the threshold
    pub debug_image_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            // on
            log_detected_text: true,

            // off
            debug_ocr_command: false,
            debug_timing: false,
            debug_image_dir: None,
        }
    }
}

/// Install the global logger: `<timestamp> - <LEVEL> - <message>` on stderr.
///
/// Defaults to `info`; `RUST_LOG` overrides it (e.g. `RUST_LOG=debug` to see
/// suppressed notifications and the debug channels above).
pub fn init_logging() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                buf.timestamp_millis(),
                record.level(),
                record.args()
            )
        })
        .init();
}
