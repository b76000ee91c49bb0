use image::{imageops, GrayImage, Luma, RgbImage};

/// Luminance-weighted grayscale (Rec. 709 weights, as used by `image`).
pub fn grayscale(image: &RgbImage) -> GrayImage {
    imageops::grayscale(image)
}

/// Fixed-level binarization: values strictly above `threshold` become white
/// (255), everything else black (0).
pub fn binarize(mut image: GrayImage, threshold: u8) -> GrayImage {
    for pixel in image.pixels_mut() {
        let Luma([value]) = *pixel;
        *pixel = Luma([binarize_value(value, threshold)]);
    }
    image
}

#[inline]
pub fn binarize_value(value: u8, threshold: u8) -> u8 {
    if value > threshold {
        255
    } else {
        0
    }
}

/// Grayscale then binarize, the preprocessing applied to every frame before OCR.
pub fn threshold_frame(image: &RgbImage, threshold: u8) -> GrayImage {
    binarize(grayscale(image), threshold)
}
