#[macro_use]
extern crate derive_builder;
#[macro_use]
extern crate lazy_static;

pub mod bounded;
pub mod capture;
pub mod config;
pub mod debug;
pub mod error;
pub mod extract;
pub mod keywords;
pub mod logging;
pub mod monitor;
pub mod notify;
pub mod region;
pub mod tesseract;
pub mod threshold;
pub mod util;
