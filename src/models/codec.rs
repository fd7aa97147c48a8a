//! Tensor marshaling between rasters and model tensors.
//!
//! Input side: an interleaved `[H, W, C]` u8 raster stored as BGR is turned into
//! a planar `[1, 3, H, W]` RGB tensor scaled to `[0, 1]`.
//! Output side: a float logit plane is resampled to the target size and
//! thresholded at zero into a 0/255 mask.

use image::GrayImage;
use ndarray::{s, Array2, Array4, ArrayView2, ArrayView3, Axis, Zip};
use tracing::debug;

use crate::error::{Result, SegmentError};

/// Planar normalized RGB image, shape `[1, 3, H, W]`
pub type ImageTensor = Array4<f32>;

/// Build the encoder input tensor from an interleaved BGR raster
///
/// # Arguments
///
/// * `image` - Raster of shape `[H, W, 3]`, channel order BGR
/// * `input_size` - Required `(width, height)`, no resizing is done here
///
/// # Returns
///
/// Array of shape `[1, 3, H, W]` holding RGB values divided by 255
pub fn encode_image(image: ArrayView3<'_, u8>, input_size: (u32, u32)) -> Result<ImageTensor> {
    let (height, width, channels) = image.dim();
    if channels != 3 {
        return Err(SegmentError::InputMismatch(format!(
            "expected a 3-channel image, got {} channels",
            channels
        )));
    }
    if (width, height) != (input_size.0 as usize, input_size.1 as usize) {
        return Err(SegmentError::InputMismatch(format!(
            "image is {}x{}, model expects {}x{}",
            width, height, input_size.0, input_size.1
        )));
    }

    debug!("Encoding {}x{} image into planar tensor", width, height);

    // channel axis reversed turns BGR into RGB, then HWC -> CHW
    let rgb_planar = image.slice(s![.., .., ..;-1]).permuted_axes([2, 0, 1]);

    let mut tensor = ImageTensor::zeros((1, 3, height, width));
    Zip::from(tensor.index_axis_mut(Axis(0), 0))
        .and(rgb_planar)
        .for_each(|dst, &src| *dst = src as f32 / 255.0);

    Ok(tensor)
}

/// Turn a raw mask plane into a binary raster of `target_size` `(width, height)`
///
/// The plane is bilinearly resampled first when its resolution differs.
/// A pixel is 255 exactly when the (resampled) value is above zero.
pub fn decode_mask(raw: ArrayView2<'_, f32>, target_size: (u32, u32)) -> GrayImage {
    let (width, height) = target_size;
    let target_dim = (height as usize, width as usize);

    if raw.dim() == target_dim {
        binarize(raw, width, height)
    } else {
        debug!(
            "Resizing mask from {}x{} to {}x{}",
            raw.ncols(),
            raw.nrows(),
            width,
            height
        );
        let resampled = resample_bilinear(raw, target_dim);
        binarize(resampled.view(), width, height)
    }
}

fn binarize(plane: ArrayView2<'_, f32>, width: u32, height: u32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    for (pixel, &value) in mask.pixels_mut().zip(plane.iter()) {
        pixel[0] = if value > 0.0 { 255 } else { 0 };
    }
    mask
}

/// Bilinear resize of a 2-D plane to `(new_height, new_width)`.
///
/// Sample positions are aligned on pixel centers and clamped at the borders.
pub fn resample_bilinear(input: ArrayView2<'_, f32>, new_shape: (usize, usize)) -> Array2<f32> {
    let (old_height, old_width) = input.dim();
    let (new_height, new_width) = new_shape;
    let mut output = Array2::<f32>::zeros((new_height, new_width));

    if old_height == 0 || old_width == 0 {
        return output;
    }

    let x_taps: Vec<(usize, usize, f32)> = (0..new_width)
        .map(|j| source_taps(j, old_width, new_width))
        .collect();

    for i in 0..new_height {
        let (y0, y1, dy) = source_taps(i, old_height, new_height);
        for (j, &(x0, x1, dx)) in x_taps.iter().enumerate() {
            let p00 = input[[y0, x0]];
            let p01 = input[[y0, x1]];
            let p10 = input[[y1, x0]];
            let p11 = input[[y1, x1]];

            output[[i, j]] = p00 * (1.0 - dx) * (1.0 - dy)
                + p01 * dx * (1.0 - dy)
                + p10 * (1.0 - dx) * dy
                + p11 * dx * dy;
        }
    }

    output
}

/// Neighbouring source indices and weight of the second one for output index `dst`
fn source_taps(dst: usize, old_len: usize, new_len: usize) -> (usize, usize, f32) {
    let scale = old_len as f32 / new_len as f32;
    let src = ((dst as f32 + 0.5) * scale - 0.5).max(0.0);
    let lo = src.floor() as usize;
    if lo >= old_len - 1 {
        return (old_len - 1, old_len - 1, 0.0);
    }
    (lo, lo + 1, src - lo as f32)
}
