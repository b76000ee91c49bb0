use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;
use std::time::Duration;

use crate::logging::LoggingConfig;

/// The literal string the phone-side listener waits for.
pub const QUEUE_POP_PAYLOAD: &str = "queue_pop";

pub const DEFAULT_PHONE_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 130);
pub const DEFAULT_PORT: u16 = 9876;
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5);
pub const DEFAULT_THRESHOLD: u8 = 200;
pub const DEFAULT_KEYWORDS: [&str; 5] = ["ready", "queue", "solo shuffle", "arena", "blitz"];
pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_OCR_TIMEOUT: Duration = Duration::from_secs(10);

#[cfg(windows)]
pub const DEFAULT_TESSERACT_EXE: &str = r"C:\Program Files\Tesseract-OCR\tesseract.exe";
#[cfg(not(windows))]
pub const DEFAULT_TESSERACT_EXE: &str = "tesseract";

/// Everything the monitor needs, fixed for the lifetime of the process.
///
/// The binary always runs with [`MonitorConfig::default`]; the builder exists
/// so that embedders and tests can point the monitor somewhere else.
#[derive(Builder, Clone, Debug)]
#[builder(default, build_fn(validate = "Self::validate"))]
pub struct MonitorConfig {
    /// IPv4 address of the device listening for notifications
    pub phone_ip: Ipv4Addr,

    /// UDP port of the device listening for notifications
    pub port: u16,

    /// Sleep between the end of one scan and the start of the next
    pub scan_interval: Duration,

    /// Substrings that count as a queue pop, matched against lowercase text
    #[builder(setter(custom))]
    pub keywords: Vec<String>,

    /// Grayscale values strictly above this become white, the rest black
    pub threshold: u8,

    /// Minimum spacing between two notifications
    pub cooldown: Duration,

    /// Path to the tesseract executable (or a command on `PATH`)
    #[builder(setter(into))]
    pub tesseract_exe: PathBuf,

    /// Tesseract language code
    #[builder(setter(into))]
    pub language: String,

    /// Longest the loop waits for one screen grab
    pub capture_timeout: Duration,

    /// Longest the loop waits for one OCR pass
    pub ocr_timeout: Duration,

    pub logging: LoggingConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            phone_ip: DEFAULT_PHONE_IP,
            port: DEFAULT_PORT,
            scan_interval: DEFAULT_SCAN_INTERVAL,
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            threshold: DEFAULT_THRESHOLD,
            cooldown: DEFAULT_COOLDOWN,
            tesseract_exe: PathBuf::from(DEFAULT_TESSERACT_EXE),
            language: "eng".to_string(),
            capture_timeout: DEFAULT_CAPTURE_TIMEOUT,
            ocr_timeout: DEFAULT_OCR_TIMEOUT,
            logging: LoggingConfig::default(),
        }
    }
}

impl MonitorConfig {
    pub fn builder() -> MonitorConfigBuilder {
        MonitorConfigBuilder::default()
    }

    /// Where notifications are sent
    pub fn destination(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.phone_ip, self.port))
    }
}

impl MonitorConfigBuilder {
    pub fn keywords<I, S>(&mut self, keywords: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = Some(keywords.into_iter().map(Into::into).collect());
        self
    }

    fn validate(&self) -> Result<(), String> {
        if let Some(keywords) = &self.keywords {
            if keywords.is_empty() {
                return Err("at least one keyword is required".into());
            }
            // An empty substring would match every frame, even a blank one.
            if keywords.iter().any(|k| k.trim().is_empty()) {
                return Err("keywords must not be blank".into());
            }
        }
        if self.scan_interval == Some(Duration::ZERO) {
            return Err("scan_interval must be greater than zero".into());
        }
        Ok(())
    }
}
