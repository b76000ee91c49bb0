use std::fmt::{Display, Formatter};

use log::info;
use xcap::Monitor;

use crate::error::{Error, Result};

/// Defines the rectangle of the screen that gets scanned.
/// - Units are pixels
/// - Origin is the top-left corner of the primary display
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CaptureRegion {
    pub top: u32,
    pub left: u32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    /// Top half of the screen, middle third of its width. That's where the
    /// queue pop dialog appears.
    pub fn from_display_size(width: u32, height: u32) -> Self {
        Self {
            top: 0,
            left: width / 3,
            width: width / 3,
            height: height / 2,
        }
    }

    /// Query the primary display once and derive the region from it.
    pub fn for_primary_display() -> Result<Self> {
        let (width, height) = primary_display_size()?;
        let region = Self::from_display_size(width, height);
        info!(
            "Monitoring region: {} (Based on {}x{} resolution)",
            region, width, height
        );
        Ok(region)
    }

    /// Map a region measured against `display` onto an image of size `image`.
    ///
    /// Some platforms report the display size in logical points while the
    /// screenshot is in physical pixels (2x on a Retina panel).
    pub fn scaled(&self, display: (u32, u32), image: (u32, u32)) -> Self {
        if display == image || display.0 == 0 || display.1 == 0 {
            return *self;
        }
        let scale = |value: u32, from: u32, to: u32| (value as u64 * to as u64 / from as u64) as u32;
        Self {
            top: scale(self.top, display.1, image.1),
            left: scale(self.left, display.0, image.0),
            width: scale(self.width, display.0, image.0),
            height: scale(self.height, display.1, image.1),
        }
    }

    /// Whether the region fits inside an image of the given size.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.left.saturating_add(self.width) <= width
            && self.top.saturating_add(self.height) <= height
    }
}

impl Display for CaptureRegion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{top: {}, left: {}, width: {}, height: {}}}",
            self.top, self.left, self.width, self.height
        )
    }
}

/// The display flagged as primary, falling back to the first one enumerated.
pub fn primary_monitor() -> Result<Monitor> {
    let monitors = Monitor::all().map_err(|e| Error::from(e).context("enumerating displays"))?;
    let mut fallback = None;
    for monitor in monitors {
        if monitor.is_primary()? {
            return Ok(monitor);
        }
        if fallback.is_none() {
            fallback = Some(monitor);
        }
    }
    fallback.ok_or_else(|| Error::from("no displays detected"))
}

pub fn primary_display_size() -> Result<(u32, u32)> {
    let monitor = primary_monitor()?;
    Ok((monitor.width()?, monitor.height()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_hd() {
        let region = CaptureRegion::from_display_size(1920, 1080);
        assert_eq!(
            region,
            CaptureRegion {
                top: 0,
                left: 640,
                width: 640,
                height: 540
            }
        );
        assert!(region.fits_within(1920, 1080));
    }

    #[test]
    fn floors_odd_resolutions() {
        for (w, h) in [(1366, 768), (2561, 1441), (1, 1), (0, 0), (3440, 1439)] {
            let region = CaptureRegion::from_display_size(w, h);
            assert_eq!(region.top, 0);
            assert_eq!(region.left, w / 3);
            assert_eq!(region.width, w / 3);
            assert_eq!(region.height, h / 2);
            assert!(region.fits_within(w, h), "{}x{} -> {}", w, h, region);
        }
    }

    #[test]
    fn scales_logical_region_to_physical_pixels() {
        let region = CaptureRegion::from_display_size(1440, 900);
        let scaled = region.scaled((1440, 900), (2880, 1800));
        assert_eq!(scaled, CaptureRegion::from_display_size(2880, 1800));
        assert_eq!(region.scaled((1440, 900), (1440, 900)), region);
        assert_eq!(region.scaled((0, 0), (2880, 1800)), region);
    }

    #[test]
    fn display_format() {
        let region = CaptureRegion::from_display_size(1280, 720);
        assert_eq!(
            region.to_string(),
            "{top: 0, left: 426, width: 426, height: 360}"
        );
    }

    #[test]
    #[ignore = "requires a graphical display"]
    fn primary_display_is_queryable() -> Result<()> {
        let (width, height) = primary_display_size()?;
        assert!(width > 0 && height > 0);
        Ok(())
    }
}
