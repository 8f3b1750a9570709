use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::follower::LineDecision;
use crate::models::{Contour, FrameReport};
use crate::pipeline::BoundingBox;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);
const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

/// Draw a box `thickness` pixels wide, growing inwards
pub fn draw_box(img: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>, thickness: u32) {
    for t in 0..thickness {
        let (w, h) = (bbox.width.saturating_sub(2 * t), bbox.height.saturating_sub(2 * t));
        if w == 0 || h == 0 {
            break;
        }
        let rect = Rect::at((bbox.x + t) as i32, (bbox.y + t) as i32).of_size(w, h);
        draw_hollow_rect_mut(img, rect, color);
    }
}

pub fn draw_contour(img: &mut RgbImage, contour: &Contour, color: Rgb<u8>) {
    let n = contour.points.len();
    for i in 0..n {
        let a = contour.points[i];
        let b = contour.points[(i + 1) % n];
        draw_line_segment_mut(img, (a.x as f32, a.y as f32), (b.x as f32, b.y as f32), color);
    }
}

/// Classifier overlay: zone, color boxes, and the primary shape's outline and box
pub fn annotate_report(frame: &RgbImage, report: &FrameReport) -> RgbImage {
    let mut out = frame.clone();

    draw_box(&mut out, &report.zone, WHITE, 2);

    for detection in &report.colors {
        draw_box(&mut out, &detection.bbox, Rgb(detection.color.draw_color()), 2);
    }

    if let Some(shape) = &report.shape {
        draw_contour(&mut out, &shape.contour, YELLOW);
        draw_box(&mut out, &shape.bbox, BLUE, 2);
    }

    out
}

/// Line follower overlay: center column and line centroid
pub fn annotate_line(frame: &RgbImage, decision: &LineDecision) -> RgbImage {
    let mut out = frame.clone();
    let x = decision.center_x as f32;
    let height = out.height() as f32;
    draw_line_segment_mut(&mut out, (x, 0.0), (x, height), WHITE);

    if let Some(line) = &decision.line {
        draw_filled_circle_mut(&mut out, (line.x, line.y), 8, BLUE);
    }

    out
}
