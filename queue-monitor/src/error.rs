use std::error::Error as StdError;
use std::fmt::{Display, Formatter};
use std::io;

use crate::config::MonitorConfigBuilderError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    pub message: String,
    pub source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.source {
            Some(source) => Some(source.as_ref() as &(dyn StdError + 'static)),
            None => None,
        }
    }
}

impl Error {
    /// Wrap any standard Error into a library Error.
    /// Similar to [`anyhow`](https://github.com/dtolnay/anyhow/blob/master/src/error.rs#L88).
    pub fn from_std<E>(e: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Error {
            message: e.to_string(),
            source: Some(Box::new(e)),
        }
    }

    /// Wrap any Display into a library Error.
    pub fn from_display<E>(e: E) -> Self
    where
        E: Display,
    {
        Error {
            message: e.to_string(),
            source: None,
        }
    }

    /// Prefix the message with what was being attempted, keeping the source.
    pub fn context<C: Display>(self, context: C) -> Self {
        Error {
            message: format!("{}: {}", context, self.message),
            source: self.source,
        }
    }
}

/// Represents an attempt to unwrap a None value from an Option.
///
/// ```rs
/// let value = Some(x).ok_or(NoneError)?;
/// ```
#[derive(Debug)]
pub struct NoneError;
impl Display for NoneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "called unwrap() on None")
    }
}
impl std::error::Error for NoneError {}

impl From<NoneError> for Error {
    fn from(e: NoneError) -> Self {
        Error::from_std(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::from_std(e)
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::from_std(e)
    }
}

impl From<xcap::XCapError> for Error {
    fn from(e: xcap::XCapError) -> Self {
        // Some platform variants wrap handles that are not `Send`.
        Error::from_display(e)
    }
}

impl From<ctrlc::Error> for Error {
    fn from(e: ctrlc::Error) -> Self {
        Error::from_std(e)
    }
}

impl From<MonitorConfigBuilderError> for Error {
    fn from(e: MonitorConfigBuilderError) -> Self {
        Error::from_display(e)
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::from_display(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::from_display(e)
    }
}

#[cfg(feature = "tesseract")]
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::from_std(e)
    }
}

#[cfg(feature = "tesseract")]
impl From<tesseract::InitializeError> for Error {
    fn from(e: tesseract::InitializeError) -> Self {
        Error::from_std(e)
    }
}

#[cfg(feature = "tesseract")]
impl From<tesseract::plumbing::TessBaseApiSetImageSafetyError> for Error {
    fn from(e: tesseract::plumbing::TessBaseApiSetImageSafetyError) -> Self {
        Error::from_std(e)
    }
}

#[cfg(feature = "tesseract")]
impl From<tesseract::plumbing::TessBaseApiGetUtf8TextError> for Error {
    fn from(e: tesseract::plumbing::TessBaseApiGetUtf8TextError) -> Self {
        Error::from_std(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_keeps_source() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "no such file");
        let error = Error::from(io_error).context("probing tesseract");
        assert_eq!(error.to_string(), "probing tesseract: no such file");
        assert!(error.source().is_some());
    }

    #[test]
    fn none_error_converts() {
        fn first(values: &[u8]) -> Result<u8> {
            Ok(*values.first().ok_or(NoneError)?)
        }
        assert_eq!(first(&[7]).ok(), Some(7));
        assert!(first(&[]).is_err());
    }
}
