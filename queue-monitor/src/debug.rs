use std::fs;
use std::path::{Path, PathBuf};

use image::GrayImage;

use crate::error::Result;

/// How many dumped frames are kept before the oldest file is overwritten.
pub const DEBUG_IMAGE_SLOTS: u64 = 60;

/// Write the image OCR is about to see to `dir`, so the threshold can be
/// checked by eye. Files cycle through [`DEBUG_IMAGE_SLOTS`] names, which at
/// the default scan rate keeps the last minute.
pub fn save_debug_image(dir: &Path, frame_num: u64, image: &GrayImage) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("frame-{:02}.png", frame_num % DEBUG_IMAGE_SLOTS));
    image.save(&path)?;
    Ok(path)
}
