//! Input preparation for the detection and recognition models.
//!
//! Both models follow PP-OCR conventions: NCHW float tensors in BGR channel
//! order, normalized with mean/std 0.5. Detection inputs are resized to a
//! multiple of 32 with the long side capped; recognition inputs are fixed
//! 48-pixel-high strips padded to a fixed width.

use image::{imageops, ImageBuffer, Rgb, RgbImage};
use ndarray::{Array3, Array4, Axis};

/// Long-side cap for detection input.
pub const DET_LIMIT_SIDE: u32 = 960;
/// Short-side floor for detection input.
pub const DET_LIMIT_MIN: u32 = 32;

/// Fixed input height of the recognition model.
pub const REC_IMAGE_HEIGHT: u32 = 48;
/// Fixed input width of the recognition model.
pub const REC_IMAGE_WIDTH: u32 = 320;

/// Extra margin applied when cropping a detected word region.
const CROP_PAD_RATIO: f32 = 0.04;

/// Normalization parameters: (x / 255 - mean) / std.
const MEAN: [f32; 3] = [0.5, 0.5, 0.5];
const STD: [f32; 3] = [0.5, 0.5, 0.5];

/// Prepares a page image for the detection model.
///
/// Returns the input tensor and its spatial dimensions, which the detector
/// needs to map boxes back to original page coordinates.
pub fn prepare_det_input(image: &RgbImage) -> (Array4<f32>, u32, u32) {
    let (orig_w, orig_h) = image.dimensions();
    let ratio = det_resize_ratio(orig_w, orig_h);

    // Round down to a multiple of 32, which the DB backbone requires.
    let new_w = ((orig_w as f32 * ratio) as u32 / 32 * 32).max(DET_LIMIT_MIN);
    let new_h = ((orig_h as f32 * ratio) as u32 / 32 * 32).max(DET_LIMIT_MIN);

    let resized = imageops::resize(image, new_w, new_h, imageops::FilterType::Lanczos3);
    let tensor = normalize_image(&resized).insert_axis(Axis(0));

    (tensor, new_w, new_h)
}

/// Prepares cropped word regions for batched recognition.
///
/// Each crop is scaled to the fixed model height, placed on a gray canvas of
/// the fixed model width, and normalized. Crops are batched in input order,
/// `batch_size` at a time.
pub fn prepare_rec_batches(crops: &[RgbImage], batch_size: usize) -> Vec<Array4<f32>> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(crops.len().div_ceil(batch_size));

    for chunk in crops.chunks(batch_size) {
        let tensors: Vec<Array3<f32>> = chunk
            .iter()
            .map(|crop| {
                let (w, h) = crop.dimensions();
                let ratio = REC_IMAGE_HEIGHT as f32 / h.max(1) as f32;
                let new_w = ((w as f32 * ratio) as u32)
                    .clamp(1, REC_IMAGE_WIDTH);

                let resized =
                    imageops::resize(crop, new_w, REC_IMAGE_HEIGHT, imageops::FilterType::Lanczos3);

                let mut padded: RgbImage = ImageBuffer::from_pixel(
                    REC_IMAGE_WIDTH,
                    REC_IMAGE_HEIGHT,
                    Rgb([127, 127, 127]),
                );
                imageops::overlay(&mut padded, &resized, 0, 0);

                normalize_image(&padded)
            })
            .collect();

        let mut batch = Array4::<f32>::zeros((
            tensors.len(),
            3,
            REC_IMAGE_HEIGHT as usize,
            REC_IMAGE_WIDTH as usize,
        ));
        for (i, tensor) in tensors.into_iter().enumerate() {
            batch.slice_mut(ndarray::s![i, .., .., ..]).assign(&tensor);
        }
        batches.push(batch);
    }

    batches
}

/// Crops a detected word region with a small margin, clamped to the page.
pub fn crop_word_region(image: &RgbImage, points: &[[f32; 2]; 4]) -> RgbImage {
    let min_x = points.iter().map(|p| p[0]).fold(f32::INFINITY, f32::min).max(0.0) as i64;
    let min_y = points.iter().map(|p| p[1]).fold(f32::INFINITY, f32::min).max(0.0) as i64;
    let max_x = points.iter().map(|p| p[0]).fold(f32::NEG_INFINITY, f32::max) as i64;
    let max_y = points.iter().map(|p| p[1]).fold(f32::NEG_INFINITY, f32::max) as i64;

    let width = (max_x - min_x).max(1);
    let height = (max_y - min_y).max(1);
    let pad_x = (width as f32 * CROP_PAD_RATIO).round() as i64;
    let pad_y = (height as f32 * CROP_PAD_RATIO).round() as i64;

    let img_w = image.width() as i64;
    let img_h = image.height() as i64;

    let x0 = (min_x - pad_x).clamp(0, img_w.saturating_sub(1));
    let y0 = (min_y - pad_y).clamp(0, img_h.saturating_sub(1));
    let x1 = (max_x + pad_x).clamp(x0, img_w.saturating_sub(1));
    let y1 = (max_y + pad_y).clamp(y0, img_h.saturating_sub(1));

    let crop_w = (x1 - x0).max(1) as u32;
    let crop_h = (y1 - y0).max(1) as u32;

    imageops::crop_imm(image, x0 as u32, y0 as u32, crop_w, crop_h).to_image()
}

/// Detection resize ratio: cap the long side, keep the short side above the
/// minimum.
fn det_resize_ratio(w: u32, h: u32) -> f32 {
    let max_side = w.max(h) as f32;
    let min_side = w.min(h).max(1) as f32;

    let mut ratio = 1.0f32;
    if max_side > DET_LIMIT_SIDE as f32 {
        ratio = DET_LIMIT_SIDE as f32 / max_side;
    }
    if min_side * ratio < DET_LIMIT_MIN as f32 {
        ratio = DET_LIMIT_MIN as f32 / min_side;
    }
    ratio
}

/// Converts an RGB image to a normalized CHW tensor in BGR channel order.
fn normalize_image(image: &RgbImage) -> Array3<f32> {
    let (w, h) = (image.width() as usize, image.height() as usize);
    let mut tensor = Array3::<f32>::zeros((3, h, w));

    for y in 0..h {
        for x in 0..w {
            let pixel = image.get_pixel(x as u32, y as u32);
            tensor[[0, y, x]] = (pixel[2] as f32 / 255.0 - MEAN[0]) / STD[0];
            tensor[[1, y, x]] = (pixel[1] as f32 / 255.0 - MEAN[1]) / STD[1];
            tensor[[2, y, x]] = (pixel[0] as f32 / 255.0 - MEAN[2]) / STD[2];
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn det_input_dimensions_are_multiples_of_32() {
        let image = RgbImage::new(1000, 700);
        let (tensor, w, h) = prepare_det_input(&image);
        assert_eq!(w % 32, 0);
        assert_eq!(h % 32, 0);
        assert!(w <= DET_LIMIT_SIDE && h <= DET_LIMIT_SIDE);
        assert_eq!(tensor.shape(), &[1, 3, h as usize, w as usize]);
    }

    #[test]
    fn small_image_is_scaled_up_to_minimum() {
        let image = RgbImage::new(20, 60);
        let (_, w, h) = prepare_det_input(&image);
        assert!(w >= DET_LIMIT_MIN);
        assert!(h >= DET_LIMIT_MIN);
    }

    #[test]
    fn rec_batches_have_fixed_strip_shape() {
        let crops = vec![RgbImage::new(200, 30), RgbImage::new(90, 25), RgbImage::new(500, 40)];
        let batches = prepare_rec_batches(&crops, 2);
        assert_eq!(batches.len(), 2);
        assert_eq!(
            batches[0].shape(),
            &[2, 3, REC_IMAGE_HEIGHT as usize, REC_IMAGE_WIDTH as usize]
        );
        assert_eq!(batches[1].shape()[0], 1);
    }

    #[test]
    fn crop_is_clamped_to_page_bounds() {
        let image = RgbImage::new(100, 60);
        let crop = crop_word_region(
            &image,
            &[[-20.0, -10.0], [150.0, -10.0], [150.0, 80.0], [-20.0, 80.0]],
        );
        assert!(crop.width() <= 100);
        assert!(crop.height() <= 60);
    }

    #[test]
    fn normalization_maps_extremes_to_unit_range() {
        let mut image = RgbImage::new(2, 1);
        image.put_pixel(0, 0, Rgb([0, 0, 0]));
        image.put_pixel(1, 0, Rgb([255, 255, 255]));
        let tensor = normalize_image(&image);
        assert_eq!(tensor[[0, 0, 0]], -1.0);
        assert_eq!(tensor[[0, 0, 1]], 1.0);
    }
}
