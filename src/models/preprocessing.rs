//! Image preparation before encoding and mask rendering after decoding.

use image::{DynamicImage, GrayImage, RgbImage};
use ndarray::Array3;
use tracing::debug;

use crate::error::{Result, SegmentError};

/// Background brightness in the overlay preview
const BACKGROUND_FACTOR: f32 = 0.2;

/// Resize an image to the session input size and lay it out as an interleaved BGR raster
///
/// # Arguments
///
/// * `image` - Decoded input image
/// * `input_size` - Session input `(width, height)`
///
/// # Returns
///
/// Array of shape `[height, width, 3]` in BGR channel order
pub fn prepare_image(image: &DynamicImage, input_size: (u32, u32)) -> Result<Array3<u8>> {
    let (width, height) = input_size;
    if width == 0 || height == 0 {
        return Err(SegmentError::InputMismatch(format!(
            "cannot prepare image for degenerate size {}x{}",
            width, height
        )));
    }

    debug!(
        "Preparing image {}x{} for model input {}x{}",
        image.width(),
        image.height(),
        width,
        height
    );

    let rgb = if image.width() == width && image.height() == height {
        image.to_rgb8()
    } else {
        image
            .resize_exact(width, height, image::imageops::FilterType::Triangle)
            .to_rgb8()
    };

    Ok(bgr_from_rgb(&rgb))
}

/// Interleaved BGR raster from an RGB image buffer
pub fn bgr_from_rgb(rgb: &RgbImage) -> Array3<u8> {
    let (width, height) = rgb.dimensions();
    let mut array = Array3::<u8>::zeros((height as usize, width as usize, 3));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let x = x as usize;
        let y = y as usize;
        array[[y, x, 0]] = pixel[2];
        array[[y, x, 1]] = pixel[1];
        array[[y, x, 2]] = pixel[0];
    }

    array
}

/// Keep masked pixels and dim everything else
pub fn overlay_mask(image: &RgbImage, mask: &GrayImage) -> Result<RgbImage> {
    if image.dimensions() != mask.dimensions() {
        return Err(SegmentError::InputMismatch(format!(
            "mask is {}x{}, image is {}x{}",
            mask.width(),
            mask.height(),
            image.width(),
            image.height()
        )));
    }

    let mut out = image.clone();
    for (pixel, m) in out.pixels_mut().zip(mask.pixels()) {
        if m[0] == 0 {
            for channel in pixel.0.iter_mut() {
                *channel = (*channel as f32 * BACKGROUND_FACTOR) as u8;
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    fn create_test_image() -> DynamicImage {
        // Create a simple 100x100 RGB image with red color
        let img = image::ImageBuffer::from_fn(100, 100, |_x, _y| Rgb([255u8, 0u8, 0u8]));
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_prepare_image_resizes() {
        let array = prepare_image(&create_test_image(), (64, 32)).unwrap();
        assert_eq!(array.shape(), &[32, 64, 3]);
    }

    #[test]
    fn test_prepare_image_stores_bgr() {
        let array = prepare_image(&create_test_image(), (100, 100)).unwrap();
        assert_eq!(array[[0, 0, 0]], 0);
        assert_eq!(array[[0, 0, 2]], 255);
    }

    #[test]
    fn test_prepare_image_degenerate_size() {
        let result = prepare_image(&create_test_image(), (0, 0));
        assert!(matches!(result, Err(SegmentError::InputMismatch(_))));
    }

    #[test]
    fn test_bgr_from_rgb() {
        let mut rgb = RgbImage::new(2, 1);
        rgb.put_pixel(1, 0, Rgb([1, 2, 3]));
        let array = bgr_from_rgb(&rgb);
        assert_eq!(array.shape(), &[1, 2, 3]);
        assert_eq!(
            (array[[0, 1, 0]], array[[0, 1, 1]], array[[0, 1, 2]]),
            (3, 2, 1)
        );
    }

    #[test]
    fn test_overlay_dims_background() {
        let image = RgbImage::from_pixel(2, 1, Rgb([100, 200, 50]));
        let mut mask = GrayImage::new(2, 1);
        mask.put_pixel(0, 0, Luma([255]));

        let out = overlay_mask(&image, &mask).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgb([100, 200, 50]));
        assert_eq!(out.get_pixel(1, 0), &Rgb([20, 40, 10]));
    }

    #[test]
    fn test_overlay_size_mismatch() {
        let image = RgbImage::new(4, 4);
        let mask = GrayImage::new(2, 2);
        assert!(overlay_mask(&image, &mask).is_err());
    }
}
