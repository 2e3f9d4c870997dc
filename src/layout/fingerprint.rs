//! Layout fingerprints for receipt pages.
//!
//! A fingerprint is a canonical-size, binarized, blurred structural map of a
//! page. Binarization separates printed structure (text blocks, rule lines)
//! from the background independent of scan lighting; the wide blur makes the
//! comparison tolerant to small misalignment between otherwise-identical
//! layouts. Fingerprints of differently-sized pages are comparable because
//! every page is resized to the same canonical resolution first.

use image::{imageops, GrayImage, RgbImage};
use imageproc::contrast::adaptive_threshold;
use imageproc::filter::gaussian_blur_f32;

/// Canonical fingerprint width in pixels.
pub const FINGERPRINT_WIDTH: u32 = 300;
/// Canonical fingerprint height in pixels.
pub const FINGERPRINT_HEIGHT: u32 = 400;

/// Neighborhood radius for adaptive binarization (11x11 blocks).
const BINARIZE_BLOCK_RADIUS: u32 = 5;

/// Blur strength; sigma equivalent to a 21x21 Gaussian kernel.
const BLUR_SIGMA: f32 = 3.8;

/// Computes the layout fingerprint of a page image.
///
/// Deterministic for a given image: grayscale, resize to the canonical
/// resolution, adaptive local binarization (inverted so ink becomes
/// foreground), then a wide Gaussian blur.
pub fn fingerprint(image: &RgbImage) -> GrayImage {
    let gray = imageops::grayscale(image);
    let resized = imageops::resize(
        &gray,
        FINGERPRINT_WIDTH,
        FINGERPRINT_HEIGHT,
        imageops::FilterType::Triangle,
    );
    let mut binary = adaptive_threshold(&resized, BINARIZE_BLOCK_RADIUS);
    // adaptive_threshold marks bright pixels; receipts are dark ink on a
    // light background, so invert to make the ink the foreground.
    imageops::invert(&mut binary);
    gaussian_blur_f32(&binary, BLUR_SIGMA)
}

/// Zero-mean normalized cross-correlation between two same-size fingerprints.
///
/// Scores range over [-1, 1]; 1.0 is a perfect structural match. Returns 0.0
/// when either image has no intensity variation, since correlation is
/// undefined for a flat signal.
pub fn ncc_score(a: &GrayImage, b: &GrayImage) -> f32 {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    if a.as_raw() == b.as_raw() {
        return 1.0;
    }

    let mut sum_ab = 0.0f64;
    let mut sum_a = 0.0f64;
    let mut sum_b = 0.0f64;
    let mut sum_a2 = 0.0f64;
    let mut sum_b2 = 0.0f64;

    for (pa, pb) in a.pixels().zip(b.pixels()) {
        let va = pa.0[0] as f64;
        let vb = pb.0[0] as f64;
        sum_ab += va * vb;
        sum_a += va;
        sum_b += vb;
        sum_a2 += va * va;
        sum_b2 += vb * vb;
    }

    let n = (a.width() as f64) * (a.height() as f64);
    if n == 0.0 {
        return 0.0;
    }

    let mean_a = sum_a / n;
    let mean_b = sum_b / n;
    let numerator = sum_ab - n * mean_a * mean_b;
    let denominator = ((sum_a2 - n * mean_a * mean_a) * (sum_b2 - n * mean_b * mean_b)).sqrt();

    if denominator < 1e-10 {
        return 0.0;
    }

    ((numerator / denominator) as f32).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn striped_page(offset: u32) -> RgbImage {
        RgbImage::from_fn(60, 80, |x, y| {
            if (y + offset) % 10 < 3 && x > 5 && x < 55 {
                Rgb([20, 20, 20])
            } else {
                Rgb([240, 240, 240])
            }
        })
    }

    #[test]
    fn fingerprint_has_canonical_size() {
        let fp = fingerprint(&striped_page(0));
        assert_eq!(fp.dimensions(), (FINGERPRINT_WIDTH, FINGERPRINT_HEIGHT));
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let page = striped_page(0);
        assert_eq!(fingerprint(&page).as_raw(), fingerprint(&page).as_raw());
    }

    #[test]
    fn identical_fingerprints_score_one() {
        let fp = fingerprint(&striped_page(0));
        assert_eq!(ncc_score(&fp, &fp), 1.0);
    }

    #[test]
    fn different_layouts_score_below_identical() {
        let a = fingerprint(&striped_page(0));
        let b = fingerprint(&striped_page(5));
        let score = ncc_score(&a, &b);
        assert!(score < 1.0, "score: {}", score);
        assert!((-1.0..=1.0).contains(&score));
    }

    #[test]
    fn flat_images_score_zero() {
        let a = GrayImage::from_pixel(10, 10, image::Luma([128]));
        let b = GrayImage::from_pixel(10, 10, image::Luma([200]));
        assert_eq!(ncc_score(&a, &b), 0.0);
    }
}
