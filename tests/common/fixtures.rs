use std::collections::VecDeque;

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_polygon_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;
use shapepilot::serial::{CommandLink, LinkError};

pub const FRAME_W: u32 = 640;
pub const FRAME_H: u32 = 480;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

/// Plain white 640x480 frame
pub fn blank_frame() -> RgbImage {
    RgbImage::from_pixel(FRAME_W, FRAME_H, WHITE)
}

pub fn with_rect(mut img: RgbImage, x: i32, y: i32, w: u32, h: u32, color: Rgb<u8>) -> RgbImage {
    draw_filled_rect_mut(&mut img, Rect::at(x, y).of_size(w, h), color);
    img
}

pub fn with_circle(mut img: RgbImage, cx: i32, cy: i32, r: i32, color: Rgb<u8>) -> RgbImage {
    draw_filled_circle_mut(&mut img, (cx, cy), r, color);
    img
}

pub fn dynamic(img: RgbImage) -> DynamicImage {
    DynamicImage::ImageRgb8(img)
}

/// Black 200x200 mask
pub fn empty_mask() -> GrayImage {
    GrayImage::new(200, 200)
}

pub fn mask_with_rect(x: i32, y: i32, w: u32, h: u32) -> GrayImage {
    let mut mask = empty_mask();
    draw_filled_rect_mut(&mut mask, Rect::at(x, y).of_size(w, h), Luma([255u8]));
    mask
}

pub fn mask_with_circle(cx: i32, cy: i32, r: i32) -> GrayImage {
    let mut mask = empty_mask();
    draw_filled_circle_mut(&mut mask, (cx, cy), r, Luma([255u8]));
    mask
}

pub fn mask_with_polygon(vertices: &[(i32, i32)]) -> GrayImage {
    let mut mask = empty_mask();
    let points: Vec<Point<i32>> = vertices.iter().map(|&(x, y)| Point::new(x, y)).collect();
    draw_polygon_mut(&mut mask, &points, Luma([255u8]));
    mask
}

/// In-memory link that records what was sent and replays scripted replies
#[derive(Default)]
pub struct RecordingLink {
    /// Every raw write, decoded as text
    pub sent: Vec<String>,
    /// Lines waiting to be read
    pub pending: Vec<String>,
    /// Replies queued in order, one batch per raw write
    pub replies: VecDeque<Vec<String>>,
    pub clears: usize,
    pub fail_sends: bool,
}

impl RecordingLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_sends: true,
            ..Self::default()
        }
    }

    /// Sent payloads with the line terminator stripped
    pub fn commands(&self) -> Vec<&str> {
        self.sent.iter().map(|s| s.trim_end_matches('\n')).collect()
    }
}

impl CommandLink for RecordingLink {
    fn send_raw(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        if self.fail_sends {
            return Err(LinkError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "board unplugged",
            )));
        }
        self.sent.push(String::from_utf8_lossy(bytes).into_owned());
        if let Some(batch) = self.replies.pop_front() {
            self.pending.extend(batch);
        }
        Ok(())
    }

    fn clear_input(&mut self) -> Result<(), LinkError> {
        self.clears += 1;
        self.pending.clear();
        Ok(())
    }

    fn read_available_lines(&mut self) -> Result<Vec<String>, LinkError> {
        Ok(std::mem::take(&mut self.pending))
    }
}
