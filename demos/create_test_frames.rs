use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_polygon_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;
use std::path::PathBuf;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

fn main() -> anyhow::Result<()> {
    let out = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("frames"));
    let shapes_dir = out.join("shapes");
    let line_dir = out.join("line");
    std::fs::create_dir_all(&shapes_dir)?;
    std::fs::create_dir_all(&line_dir)?;

    // Shapes inside the central detection zone of a 640x480 frame
    let mut square = RgbImage::from_pixel(640, 480, WHITE);
    draw_filled_rect_mut(&mut square, Rect::at(270, 190).of_size(100, 100), Rgb([255, 0, 0]));
    square.save(shapes_dir.join("01_red_square.png"))?;

    let mut disc = RgbImage::from_pixel(640, 480, WHITE);
    draw_filled_circle_mut(&mut disc, (320, 240), 70, Rgb([0, 0, 255]));
    disc.save(shapes_dir.join("02_blue_circle.png"))?;

    let mut triangle = RgbImage::from_pixel(640, 480, WHITE);
    let points = [Point::new(320, 150), Point::new(400, 330), Point::new(240, 330)];
    draw_polygon_mut(&mut triangle, &points, Rgb([0, 0, 0]));
    triangle.save(shapes_dir.join("03_black_triangle.png"))?;

    // A line drifting from left to right across the frame
    for (i, x) in (60..=540).step_by(60).enumerate() {
        let mut frame = RgbImage::from_pixel(640, 480, WHITE);
        draw_filled_rect_mut(&mut frame, Rect::at(x, 0).of_size(40, 480), Rgb([0, 0, 0]));
        frame.save(line_dir.join(format!("{:02}.png", i + 1)))?;
    }

    println!("Wrote test frames to {}", out.display());
    println!("  shapepilot classify {}", shapes_dir.display());
    println!("  shapepilot follow --dry-run {}", line_dir.display());
    Ok(())
}
