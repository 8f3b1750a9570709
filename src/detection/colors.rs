use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};

use crate::detection::contours::find_external_contours;
use crate::models::{ColorDetection, ColorName, ColorVerdict};

/// HSV in the 8-bit convention: hue 0..=180 (degrees / 2), saturation and value 0..=255
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub const fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }
}

pub type HsvImage = ImageBuffer<Rgb<u8>, Vec<u8>>;

pub fn rgb_to_hsv(rgb: [u8; 3]) -> Hsv {
    let [r, g, b] = rgb.map(|c| c as f32);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let mut h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    Hsv::new((h / 2.0).round() as u8, s.round() as u8, max as u8)
}

/// Convert an RGB image to HSV, channel order (h, s, v)
pub fn to_hsv(img: &RgbImage) -> HsvImage {
    ImageBuffer::from_fn(img.width(), img.height(), |x, y| {
        let hsv = rgb_to_hsv(img.get_pixel(x, y).0);
        Rgb([hsv.h, hsv.s, hsv.v])
    })
}

/// Inclusive HSV box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsvRange {
    pub low: Hsv,
    pub high: Hsv,
}

impl HsvRange {
    pub const fn new(low: Hsv, high: Hsv) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, hsv: Hsv) -> bool {
        (self.low.h..=self.high.h).contains(&hsv.h)
            && (self.low.s..=self.high.s).contains(&hsv.s)
            && (self.low.v..=self.high.v).contains(&hsv.v)
    }
}

/// A named color and the HSV ranges that select it
#[derive(Debug, Clone, PartialEq)]
pub struct ColorProfile {
    pub color: ColorName,
    pub ranges: Vec<HsvRange>,
}

/// Red wraps around hue 0, so it needs two ranges
pub fn default_palette() -> Vec<ColorProfile> {
    vec![
        ColorProfile {
            color: ColorName::Red,
            ranges: vec![
                HsvRange::new(Hsv::new(0, 100, 100), Hsv::new(10, 255, 255)),
                HsvRange::new(Hsv::new(160, 100, 100), Hsv::new(180, 255, 255)),
            ],
        },
        ColorProfile {
            color: ColorName::Green,
            ranges: vec![HsvRange::new(Hsv::new(40, 50, 50), Hsv::new(90, 255, 255))],
        },
        ColorProfile {
            color: ColorName::Blue,
            ranges: vec![HsvRange::new(Hsv::new(90, 50, 50), Hsv::new(130, 255, 255))],
        },
    ]
}

/// Binary mask of pixels inside any of `ranges`
pub fn hsv_mask(hsv: &HsvImage, ranges: &[HsvRange]) -> GrayImage {
    GrayImage::from_fn(hsv.width(), hsv.height(), |x, y| {
        let [h, s, v] = hsv.get_pixel(x, y).0;
        let pixel = Hsv::new(h, s, v);
        if ranges.iter().any(|r| r.contains(pixel)) {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Boxes of every color blob larger than `min_area`, in the image's own coordinates
pub fn detect_colors(img: &RgbImage, palette: &[ColorProfile], min_area: f64) -> Vec<ColorDetection> {
    let hsv = to_hsv(img);
    let mut detections = Vec::new();

    for profile in palette {
        let mask = hsv_mask(&hsv, &profile.ranges);
        for contour in find_external_contours(&mask) {
            if contour.area() > min_area {
                detections.push(ColorDetection {
                    color: profile.color,
                    bbox: contour.bounding_box(),
                });
            }
        }
    }

    detections
}

/// Fold detections into one reading; red pairs take priority, then single colors
pub fn color_verdict(detections: &[ColorDetection]) -> ColorVerdict {
    let has = |name: ColorName| detections.iter().any(|d| d.color == name);
    let (red, green, blue) = (has(ColorName::Red), has(ColorName::Green), has(ColorName::Blue));

    match (red, green, blue) {
        (true, _, true) => ColorVerdict::RedBlue,
        (true, true, false) => ColorVerdict::RedGreen,
        (true, false, false) => ColorVerdict::Red,
        (false, true, _) => ColorVerdict::Green,
        (false, false, true) => ColorVerdict::Blue,
        (false, false, false) => ColorVerdict::NoColor,
    }
}
