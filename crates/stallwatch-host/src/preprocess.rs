//! Raster cleanup ahead of OCR.
//!
//! Chat panels are small antialiased text on flat backgrounds, often dark
//! themed. Tesseract reads them far better as large black-on-white binary
//! images, so frames go through grayscale, contrast stretch, upscale and an
//! Otsu threshold before they reach the engine.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbaImage};

/// Fraction of pixels clipped at each end of the histogram by the stretch.
const STRETCH_CLIP: f64 = 0.01;

pub fn prepare_for_ocr(image: &RgbaImage, upscale: u32) -> GrayImage {
    let mut gray = imageops::grayscale(image);
    stretch_contrast(&mut gray);

    if upscale > 1 {
        gray = imageops::resize(
            &gray,
            gray.width() * upscale,
            gray.height() * upscale,
            FilterType::CatmullRom,
        );
    }

    let threshold = otsu_threshold(&gray);
    binarize(&mut gray, threshold);
    if mostly_dark(&gray) {
        imageops::invert(&mut gray);
    }
    gray
}

fn histogram(image: &GrayImage) -> [u64; 256] {
    let mut hist = [0u64; 256];
    for Luma([v]) in image.pixels() {
        hist[*v as usize] += 1;
    }
    hist
}

/// Linear stretch so the clipped intensity range covers 0..=255.
pub fn stretch_contrast(image: &mut GrayImage) {
    let total = image.width() as u64 * image.height() as u64;
    if total == 0 {
        return;
    }
    let hist = histogram(image);
    let clip = (total as f64 * STRETCH_CLIP) as u64;

    let mut acc = 0;
    let lo = hist
        .iter()
        .position(|&n| {
            acc += n;
            acc > clip
        })
        .unwrap_or(0) as u8;
    acc = 0;
    let hi = 255
        - hist
            .iter()
            .rev()
            .position(|&n| {
                acc += n;
                acc > clip
            })
            .unwrap_or(0) as u8;

    if hi <= lo {
        return;
    }
    let span = (hi - lo) as f32;
    for Luma([v]) in image.pixels_mut() {
        let scaled = (*v as f32 - lo as f32) / span * 255.0;
        *v = scaled.clamp(0.0, 255.0) as u8;
    }
}

/// Threshold maximising between-class variance.
pub fn otsu_threshold(image: &GrayImage) -> u8 {
    let hist = histogram(image);
    let total: u64 = hist.iter().sum();
    if total == 0 {
        return 127;
    }
    let sum_all: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &n)| i as f64 * n as f64)
        .sum();

    let mut sum_bg = 0.0;
    let mut weight_bg = 0u64;
    let mut best = (0.0f64, 0u8);

    for (t, &n) in hist.iter().enumerate() {
        weight_bg += n;
        if weight_bg == 0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0 {
            break;
        }
        sum_bg += t as f64 * n as f64;

        let mean_bg = sum_bg / weight_bg as f64;
        let mean_fg = (sum_all - sum_bg) / weight_fg as f64;
        let between = weight_bg as f64 * weight_fg as f64 * (mean_bg - mean_fg).powi(2);
        if between > best.0 {
            best = (between, t as u8);
        }
    }
    best.1
}

fn binarize(image: &mut GrayImage, threshold: u8) {
    for Luma([v]) in image.pixels_mut() {
        *v = if *v > threshold { 255 } else { 0 };
    }
}

fn mostly_dark(image: &GrayImage) -> bool {
    let dark = image.pixels().filter(|Luma([v])| *v < 128).count();
    dark * 2 > (image.width() * image.height()) as usize
}
