use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use image::{GrayImage, ImageFormat};
use log::{debug, warn};
use wait_timeout::ChildExt;

use crate::config::{MonitorConfig, DEFAULT_OCR_TIMEOUT};
use crate::error::{Error, Result};
use crate::util::{command_to_string, parse_tesseract_languages, parse_tesseract_version};

#[cfg(feature = "tesseract")]
pub use self::in_process::{download_tesseract_traineddata, init_tesseract, TesseractLib};

/// Turns a binarized image into text.
///
/// Called from a helper thread (see
/// [`BoundedWorker`](crate::bounded::BoundedWorker)), hence `Send + Sync`.
pub trait OcrEngine: Send + Sync {
    /// Recognize all text in the image. Case is preserved; callers lowercase.
    fn recognize(&self, image: &GrayImage) -> Result<String>;

    /// Report the engine version. Used at startup to check that the engine
    /// is installed at all.
    fn version(&self) -> Result<String>;
}

/// Runs the `tesseract` executable once per image.
///
/// The image is piped to stdin as PNG and the text read back from stdout,
/// so nothing touches the disk. Every child is waited on, and one that
/// outlives `timeout` is killed.
#[derive(Clone, Debug)]
pub struct TesseractCli {
    pub exe: PathBuf,
    pub language: String,

    /// kill the process if it has not exited after this long
    pub timeout: Duration,

    /// print the command line before each recognition
    pub debug_command: bool,
}

impl TesseractCli {
    pub fn new(exe: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            exe: exe.into(),
            language: language.into(),
            timeout: DEFAULT_OCR_TIMEOUT,
            debug_command: false,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            timeout: config.ocr_timeout,
            debug_command: config.logging.debug_ocr_command,
            ..Self::new(&config.tesseract_exe, &config.language)
        }
    }

    /// Fail unless traineddata for every `+`-separated part of the
    /// configured language is installed.
    pub fn check_language(&self) -> Result<()> {
        let output = self
            .command()
            .arg("--list-langs")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::from(e).context(format!("running {}", self.exe_display())))?;

        if !output.status.success() {
            return Err(Error::from_display(format!(
                "{} --list-langs exited with {}",
                self.exe_display(),
                output.status
            )));
        }

        // Older builds print the list on stderr.
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        let installed = parse_tesseract_languages(&text);

        let missing: Vec<&str> = self
            .language
            .split('+')
            .filter(|lang| !installed.iter().any(|have| have == lang))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        Err(Error::from_display(format!(
            "tesseract has no traineddata for {} (installed: {})",
            missing.join("+"),
            installed.join(", ")
        )))
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.exe);
        hide_console_window(&mut cmd);
        cmd
    }

    fn exe_display(&self) -> std::path::Display<'_> {
        self.exe.display()
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &GrayImage) -> Result<String> {
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        let mut cmd = self.command();
        cmd.arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if self.debug_command {
            debug!("[tesseract] command appears below:");
            debug!("{}", command_to_string(&cmd));
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::from(e).context(format!("spawning {}", self.exe_display())))?;

        // The pipes are serviced off-thread so a child that stops reading
        // cannot block us past the timeout. Dropping stdin closes the pipe,
        // which tells tesseract the image is complete.
        let stdin = child.stdin.take();
        let writer = thread::spawn(move || match stdin {
            Some(mut stdin) => stdin.write_all(&png),
            None => Ok(()),
        });
        let stdout = read_in_background(child.stdout.take());
        let stderr = read_in_background(child.stderr.take());

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                kill_and_reap(&mut child);
                return Err(Error::from_display(format!(
                    "tesseract did not finish within {}ms and was killed",
                    self.timeout.as_millis()
                )));
            }
            Err(e) => {
                kill_and_reap(&mut child);
                return Err(Error::from(e).context("waiting for tesseract"));
            }
        };

        let written = join_pipe(writer, "stdin");
        let stdout = join_pipe(stdout, "stdout")?;
        let stderr = join_pipe(stderr, "stderr")?;

        if !status.success() {
            return Err(Error::from_display(format!(
                "tesseract exited with {}: {}",
                status,
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        written?;

        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    fn version(&self) -> Result<String> {
        let output = self
            .command()
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::from(e).context(format!("running {}", self.exe_display())))?;

        // Older builds print the banner on stderr.
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(Error::from_display(format!(
                "{} --version exited with {}",
                self.exe_display(),
                output.status
            )));
        }

        parse_tesseract_version(&text).ok_or_else(|| {
            Error::from_display(format!(
                "could not read a tesseract version from {}",
                self.exe_display()
            ))
        })
    }
}

fn read_in_background<R>(pipe: Option<R>) -> JoinHandle<io::Result<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn join_pipe<T>(handle: JoinHandle<io::Result<T>>, pipe: &str) -> Result<T> {
    handle
        .join()
        .map_err(|_| Error::from_display(format!("tesseract {} thread panicked", pipe)))?
        .map_err(|e| Error::from(e).context(format!("tesseract {}", pipe)))
}

/// Kill the child if it is still running, then collect it so it does not
/// linger as a zombie.
fn kill_and_reap(child: &mut Child) {
    // Fails when the child already exited, which is fine.
    let _ = child.kill();
    if let Err(e) = child.wait() {
        warn!("[tesseract] could not reap pid {}: {}", child.id(), e);
    }
}

/// Keep Windows from flashing a console window for every OCR call.
#[cfg(windows)]
fn hide_console_window(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x08000000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console_window(_cmd: &mut Command) {}

/// Whether the given path looks like something we could execute.
/// Bare command names are resolved through `PATH` by the OS, so they pass.
pub fn exe_looks_present(exe: &Path) -> bool {
    exe.components().count() <= 1 || exe.exists()
}

#[cfg(feature = "tesseract")]
mod in_process {
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::Path;
    use std::sync::Mutex;

    use image::GrayImage;
    use log::info;
    use tesseract::Tesseract;

    use super::OcrEngine;
    use crate::error::{Error, NoneError, Result};

    /// In-process recognition through libtesseract.
    pub struct TesseractLib {
        datapath: String,
        language: String,
        tesseract: Mutex<Option<Tesseract>>,
    }

    impl OcrEngine for TesseractLib {
        fn recognize(&self, image: &GrayImage) -> Result<String> {
            let mut slot = self
                .tesseract
                .lock()
                .map_err(|e| Error::from_display(e.to_string()))?;

            // A failed call consumes the instance, so start over if needed.
            let model = match slot.take() {
                Some(model) => model,
                None => Tesseract::new(Some(&self.datapath), Some(&self.language))?,
            };

            let (width, height) = image.dimensions();
            let mut model = model
                .set_frame(
                    image.as_raw(),
                    width as i32,
                    height as i32,
                    1,
                    width as i32,
                )?
                .set_source_resolution(96);
            let text = model.get_text()?;
            *slot = Some(model);

            Ok(text)
        }

        fn version(&self) -> Result<String> {
            Ok(format!("libtesseract ({})", self.language))
        }
    }

    /// Attempts to download the latest traineddata file from Github
    pub fn download_tesseract_traineddata(download_path: &Path) -> Result<()> {
        let filename = download_path
            .file_name()
            .ok_or(NoneError)?
            .to_str()
            .ok_or(NoneError)?;
        let url = format!(
            "https://github.com/tesseract-ocr/tessdata/raw/4.00/{}",
            filename
        );
        let body = reqwest::blocking::get(url)?.error_for_status()?.bytes()?;

        // Automatically create needed directories
        fs::create_dir_all(download_path.parent().ok_or(NoneError)?)?;

        let mut file = File::create(download_path)?;
        Ok(file.write_all(body.as_ref())?)
    }

    /// Initialize a Tesseract instance, automatically downloading traineddata if needed
    pub fn init_tesseract(datapath: Option<&str>, language: Option<&str>) -> Result<TesseractLib> {
        let current_exe = std::env::current_exe()?;
        let default_datapath = current_exe
            .parent()
            .ok_or(NoneError)?
            .to_str()
            .ok_or(NoneError)?
            .to_string();
        let datapath = datapath.map(str::to_string).unwrap_or(default_datapath);
        let language = language.unwrap_or("eng").to_string();
        info!("[tesseract] using datapath {}", datapath);
        info!("[tesseract] using language {}", language);

        let traineddata_pathbuf = Path::new(&datapath).join(format!("{}.traineddata", language));
        if !traineddata_pathbuf.exists() {
            info!(
                "[tesseract] could not find traineddata at {}, downloading...",
                traineddata_pathbuf.display()
            );
            download_tesseract_traineddata(&traineddata_pathbuf)
                .map_err(|e| e.context("downloading traineddata"))?;
            info!("[tesseract] traineddata downloaded");
        }

        let tesseract = Tesseract::new(Some(&datapath), Some(&language))?;
        Ok(TesseractLib {
            datapath,
            language,
            tesseract: Mutex::new(Some(tesseract)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn missing_executable_fails_the_version_check() {
        let engine = TesseractCli::new("/definitely/not/here/tesseract", "eng");
        let err = engine.version().unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here/tesseract"), "{}", err);
    }

    #[test]
    fn missing_executable_fails_recognition() {
        let engine = TesseractCli::new("/definitely/not/here/tesseract", "eng");
        let image = GrayImage::from_pixel(8, 8, Luma([0]));
        assert!(engine.recognize(&image).is_err());
    }

    #[test]
    fn exe_presence() {
        assert!(exe_looks_present(Path::new("tesseract")));
        assert!(!exe_looks_present(Path::new("/definitely/not/here/tesseract")));
    }

    #[test]
    fn from_config_carries_logging_flag() {
        let mut config = MonitorConfig::default();
        config.logging.debug_ocr_command = true;
        config.language = "deu".into();
        let engine = TesseractCli::from_config(&config);
        assert!(engine.debug_command);
        assert_eq!(engine.language, "deu");
        assert_eq!(engine.exe, config.tesseract_exe);
        assert_eq!(engine.timeout, config.ocr_timeout);
    }

    /// Write an executable shell script standing in for tesseract.
    #[cfg(unix)]
    fn fake_tesseract(name: &str, body: &str) -> Result<PathBuf> {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("queue-monitor-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir)?;
        let path = dir.join("tesseract");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        Ok(path)
    }

    /// Large enough that the PNG does not fit in a pipe buffer.
    #[cfg(unix)]
    fn noise(size: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            let n = (x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(40_503)).rotate_left(13);
            Luma([(n >> 7) as u8])
        })
    }

    #[test]
    #[cfg(unix)]
    fn reads_text_from_stdout() -> Result<()> {
        let exe = fake_tesseract("reads", "cat > /dev/null\necho 'Queue Ready'")?;
        let engine = TesseractCli::new(&exe, "eng");
        assert_eq!(engine.recognize(&noise(64))?, "Queue Ready\n");
        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn engine_exiting_before_reading_is_collected() -> Result<()> {
        let exe = fake_tesseract("exits", "echo 'Failed loading language' >&2\nexit 3")?;
        let engine = TesseractCli::new(&exe, "eng");
        let image = noise(600);
        for _ in 0..3 {
            // The exit status is only known once the child has been waited on.
            let err = engine.recognize(&image).unwrap_err();
            assert!(err.to_string().contains("exit status: 3"), "{}", err);
        }
        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn hung_engine_is_killed_at_the_timeout() -> Result<()> {
        use crate::bounded::BoundedWorker;
        use std::sync::Arc;
        use std::time::Instant;

        let exe = fake_tesseract("hangs", "exec sleep 30")?;
        let engine = Arc::new(TesseractCli {
            timeout: Duration::from_millis(150),
            ..TesseractCli::new(&exe, "eng")
        });
        let worker = BoundedWorker::new("ocr", Duration::from_secs(2));
        let image = noise(8);

        for _ in 0..3 {
            let start = Instant::now();
            let (engine, image) = (engine.clone(), image.clone());
            let err = worker.run(move || engine.recognize(&image)).unwrap_err();
            assert!(err.to_string().contains("did not finish"), "{}", err);
            assert!(start.elapsed() < Duration::from_secs(2));
            assert!(!worker.is_busy());
        }
        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn language_must_be_installed() -> Result<()> {
        let exe = fake_tesseract(
            "langs",
            "echo 'List of available languages in \"/tmp/tessdata/\" (2):'\necho eng\necho osd",
        )?;
        TesseractCli::new(&exe, "eng").check_language()?;
        TesseractCli::new(&exe, "eng+osd").check_language()?;

        let err = TesseractCli::new(&exe, "deu").check_language().unwrap_err();
        assert!(err.to_string().contains("deu"), "{}", err);
        Ok(())
    }

    #[test]
    #[ignore = "requires tesseract to be installed"]
    fn reports_installed_tesseract_version() -> Result<()> {
        let engine = TesseractCli::from_config(&MonitorConfig::default());
        let version = engine.version()?;
        assert!(version.chars().next().map_or(false, |c| c.is_ascii_digit()));
        Ok(())
    }
}
