use shapepilot::Pipeline;
use shapepilot::detection::contours::find_external_contours;
use shapepilot::detection::shapes::classify_shape;
use shapepilot::detection::steps::*;
use image::ImageReader;
use std::env;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <image_path> [debug_dir]", args[0]);
        std::process::exit(1);
    }

    let img = ImageReader::open(&args[1])?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?;

    println!("Loaded image: {}x{}", img.width(), img.height());

    // Example 1: stricter thresholds than the classifier defaults, whole frame
    println!("\n=== Custom Mask Pipeline (no zone crop) ===");
    let mut pipeline = Pipeline::new()
        .with_verbose(true)
        .add_step_boxed(Box::new(ResizeStep { width: 640, height: 480 }))
        .add_step_boxed(Box::new(GrayscaleStep))
        .add_step_boxed(Box::new(CombinedThresholdStep {
            block_size: 15,
            c: 5.0,
            level: 80,
        }))
        .add_step_boxed(Box::new(CleanMaskStep));

    if let Some(dir) = args.get(2) {
        pipeline = pipeline.with_debug(PathBuf::from(dir))?;
    }

    let masks = pipeline.run(img.clone())?;
    let Some(combined) = masks.iter().find(|m| m.get_string("mask") == Some("combined")) else {
        anyhow::bail!("pipeline produced no combined mask");
    };

    let contours = find_external_contours(&combined.image.to_luma8());
    println!("Found {} external contours", contours.len());
    for (i, contour) in contours.iter().take(10).enumerate() {
        let class = classify_shape(contour);
        let bbox = contour.bounding_box();
        println!("  {}: {} ({} vertices) at ({}, {}) area={:.0}",
                i + 1, class.kind, class.vertices, bbox.x, bbox.y, contour.area());
    }

    // Example 2: only the first two steps (partial execution for debugging)
    println!("\n=== Partial Pipeline (Stop After Grayscale) ===");
    let partial = pipeline.run_partial(img, 2)?;
    if let Some(first) = partial.first() {
        println!("  First item: {}x{} image", first.image.width(), first.image.height());
    }

    Ok(())
}
