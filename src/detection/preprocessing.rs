use image::{DynamicImage, GrayImage, Luma, RgbImage};
use image::imageops::FilterType;
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{close, open};

use crate::pipeline::BoundingBox;

/// Resize a frame to the working resolution, ignoring aspect ratio
pub fn resize_frame(img: &DynamicImage, width: u32, height: u32) -> RgbImage {
    let rgb = img.to_rgb8();
    if rgb.dimensions() == (width, height) {
        return rgb;
    }
    image::imageops::resize(&rgb, width, height, FilterType::Triangle)
}

/// Central detection zone: a quarter of the height off top and bottom,
/// a third of the width off each side
pub fn central_zone(width: u32, height: u32) -> BoundingBox {
    let margin_y = height / 4;
    let margin_x = width / 3;
    BoundingBox::new(
        margin_x,
        margin_y,
        width - 2 * margin_x,
        height - 2 * margin_y,
    )
}

/// Convert image to grayscale
pub fn to_grayscale(img: &RgbImage) -> GrayImage {
    image::imageops::grayscale(img)
}

/// Gaussian adaptive threshold, inverted: dark-on-light strokes become 255.
///
/// A pixel is set when `pixel <= weighted_mean - c`, the mean taken with a
/// Gaussian sized for a `block_size` neighbourhood.
pub fn adaptive_threshold_inv(gray: &GrayImage, block_size: u32, c: f32) -> GrayImage {
    let sigma = 0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let local_mean = gaussian_blur_f32(gray, sigma);

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let pixel = gray.get_pixel(x, y)[0] as f32;
        let mean = local_mean.get_pixel(x, y)[0] as f32;
        if pixel <= mean - c {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Fixed threshold, inverted: pixels at or below `level` become 255
pub fn binary_threshold_inv(gray: &GrayImage, level: u8) -> GrayImage {
    threshold(gray, level, ThresholdType::BinaryInverted)
}

/// Pixelwise union of two binary masks
pub fn union_masks(a: &GrayImage, b: &GrayImage) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y)[0].max(b.get_pixel(x, y)[0])])
    })
}

/// Open then close with a 3x3 square to drop specks and fill pinholes
pub fn clean_mask(mask: &GrayImage) -> GrayImage {
    let opened = open(mask, Norm::LInf, 1);
    close(&opened, Norm::LInf, 1)
}

/// Lower half of a mask, where the line sits closest to the robot
pub fn lower_half(mask: &GrayImage) -> GrayImage {
    let (w, h) = mask.dimensions();
    let top = h / 2;
    image::imageops::crop_imm(mask, 0, top, w, h - top).to_image()
}
