use image::{imageops, DynamicImage, RgbImage};

use crate::error::{Error, Result};
use crate::region::{primary_monitor, CaptureRegion};

/// A single grab of the capture region, plus where it sits in the run.
#[derive(Clone, Debug)]
pub struct Frame {
    pub image: RgbImage,

    /// Monotonically increasing by 1, starting from 0.
    pub frame_num: u64,
}

/// Anything that can produce the pixels of a screen rectangle.
///
/// Implementations are called from a helper thread (see
/// [`BoundedWorker`](crate::bounded::BoundedWorker)), hence `Send + Sync`.
pub trait FrameSource: Send + Sync {
    fn capture(&self, region: &CaptureRegion) -> Result<RgbImage>;
}

/// Captures the primary display via `xcap` and crops to the region.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScreenCapturer;

impl FrameSource for ScreenCapturer {
    fn capture(&self, region: &CaptureRegion) -> Result<RgbImage> {
        // Monitor handles are not guaranteed `Send`, so look the display up on
        // the calling thread every time.
        let monitor = primary_monitor()?;
        let display = (monitor.width()?, monitor.height()?);
        let screenshot = monitor.capture_image()?;
        let region = region.scaled(display, screenshot.dimensions());
        crop_region(DynamicImage::ImageRgba8(screenshot).to_rgb8(), &region)
    }
}

/// Cut the region out of a full-display image.
pub fn crop_region(screen: RgbImage, region: &CaptureRegion) -> Result<RgbImage> {
    let (width, height) = screen.dimensions();
    if !region.fits_within(width, height) {
        return Err(Error::from_display(format!(
            "capture region {} exceeds screenshot dimensions {}x{}",
            region, width, height
        )));
    }
    if region.width == 0 || region.height == 0 {
        return Err(Error::from_display(format!("capture region {} is empty", region)));
    }
    Ok(imageops::crop_imm(&screen, region.left, region.top, region.width, region.height).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 0]))
    }

    #[test]
    fn crops_middle_third_of_top_half() -> Result<()> {
        let region = CaptureRegion::from_display_size(120, 60);
        let cropped = crop_region(gradient(120, 60), &region)?;
        assert_eq!(cropped.dimensions(), (40, 30));
        assert_eq!(cropped.get_pixel(0, 0), &Rgb([40, 0, 0]));
        assert_eq!(cropped.get_pixel(39, 29), &Rgb([79, 29, 0]));
        Ok(())
    }

    #[test]
    fn crops_the_same_area_of_a_double_density_screenshot() -> Result<()> {
        let region = CaptureRegion::from_display_size(120, 60).scaled((120, 60), (240, 120));
        let cropped = crop_region(gradient(240, 120), &region)?;
        assert_eq!(cropped.dimensions(), (80, 60));
        assert_eq!(cropped.get_pixel(0, 0), &Rgb([80, 0, 0]));
        assert_eq!(cropped.get_pixel(79, 59), &Rgb([159, 59, 0]));
        Ok(())
    }

    #[test]
    fn region_outside_screen_is_an_error() {
        let region = CaptureRegion::from_display_size(1920, 1080);
        assert!(crop_region(gradient(800, 600), &region).is_err());
    }

    #[test]
    fn empty_region_is_an_error() {
        let region = CaptureRegion::from_display_size(2, 1);
        assert!(crop_region(gradient(2, 1), &region).is_err());
    }

    #[test]
    #[ignore = "requires a graphical display and screen recording permission"]
    fn captures_primary_display() -> Result<()> {
        let monitor = primary_monitor()?;
        let display = (monitor.width()?, monitor.height()?);
        let region = CaptureRegion::from_display_size(display.0, display.1);
        let screen = monitor.capture_image()?.dimensions();
        let image = ScreenCapturer.capture(&region)?;
        let expected = region.scaled(display, screen);
        assert_eq!(image.dimensions(), (expected.width, expected.height));
        Ok(())
    }
}
