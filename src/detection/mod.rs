pub mod preprocessing;
pub mod contours;
pub mod shapes;
pub mod colors;
pub mod steps;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use image::{DynamicImage, GrayImage};
use tracing::{debug, info};

use crate::config::ClassifierConfig;
use crate::models::{ColorDetection, FrameReport};
use crate::pipeline::{BoundingBox, Pipeline};
use colors::ColorProfile;

/// Intermediate masks of one analyzed frame, in zone coordinates
pub struct FrameMasks {
    pub adaptive: GrayImage,
    pub combined: GrayImage,
}

/// Per-frame shape and color classifier
pub struct FrameAnalyzer {
    pub config: ClassifierConfig,
    pub palette: Vec<ColorProfile>,
    pub verbose: bool,
}

impl FrameAnalyzer {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            palette: colors::default_palette(),
            verbose: false,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_palette(mut self, palette: Vec<ColorProfile>) -> Self {
        self.palette = palette;
        self
    }

    /// Steps from raw frame to cleaned shape mask
    pub fn mask_pipeline(&self) -> Pipeline {
        build_mask_pipeline(&self.config, self.verbose)
    }

    /// Classify the primary shape and the colors inside the central zone
    pub fn analyze(&self, frame: &DynamicImage) -> Result<FrameReport> {
        Ok(self.analyze_with_masks(frame)?.0)
    }

    /// Like `analyze`, also returning the threshold masks
    pub fn analyze_with_masks(&self, frame: &DynamicImage) -> Result<(FrameReport, FrameMasks)> {
        self.analyze_with(&self.mask_pipeline(), frame)
    }

    /// Like `analyze_with_masks`, dumping every pipeline stage under `debug_dir`
    pub fn analyze_debug(&self, frame: &DynamicImage, debug_dir: PathBuf) -> Result<(FrameReport, FrameMasks)> {
        let pipeline = self.mask_pipeline().with_debug(debug_dir)?;
        self.analyze_with(&pipeline, frame)
    }

    fn analyze_with(&self, pipeline: &Pipeline, frame: &DynamicImage) -> Result<(FrameReport, FrameMasks)> {
        let outputs = pipeline.run(frame.clone())?;

        let mut adaptive = None;
        let mut combined = None;
        let mut zone = None;
        for item in outputs {
            zone = zone.or(item.bbox);
            match item.get_string("mask") {
                Some("adaptive") => adaptive = Some(item.image.to_luma8()),
                Some("combined") => combined = Some(item.image.to_luma8()),
                _ => {}
            }
        }

        let (Some(adaptive), Some(combined), Some(zone)) = (adaptive, combined, zone) else {
            anyhow::bail!("Mask pipeline did not produce adaptive and combined masks");
        };

        let shape = shapes::find_primary_shape(
            &contours::find_external_contours(&combined),
            self.config.min_shape_area,
        )
        .map(|mut s| {
            s.bbox = s.bbox.offset(zone.x, zone.y);
            s.contour = s.contour.offset(zone.x as i32, zone.y as i32);
            s
        });

        let resized = preprocessing::resize_frame(frame, self.config.frame_width, self.config.frame_height);
        let zone_rgb = image::imageops::crop_imm(&resized, zone.x, zone.y, zone.width, zone.height).to_image();
        let detections: Vec<ColorDetection> = colors::detect_colors(&zone_rgb, &self.palette, self.config.min_color_area)
            .into_iter()
            .map(|d| ColorDetection { bbox: d.bbox.offset(zone.x, zone.y), ..d })
            .collect();
        let verdict = colors::color_verdict(&detections);

        debug!(
            "zone {}x{} at ({}, {}): {} color blobs",
            zone.width, zone.height, zone.x, zone.y, detections.len()
        );

        let report = FrameReport {
            zone,
            shape,
            colors: detections,
            verdict,
        };

        if let Some(shape) = &report.shape {
            info!("DETECTED: {} - Color: {}", shape.kind, report.verdict);
            debug!("shape: {} ({} vertices), area {:.0}", shape.kind, shape.vertices, shape.area);
        }

        Ok((report, FrameMasks { adaptive, combined }))
    }
}

impl Default for FrameAnalyzer {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

/// Detection zone for the configured frame size
pub fn detection_zone(config: &ClassifierConfig) -> BoundingBox {
    preprocessing::central_zone(config.frame_width, config.frame_height)
}

/// Build the standard classifier mask pipeline
pub fn build_mask_pipeline(config: &ClassifierConfig, verbose: bool) -> Pipeline {
    use steps::*;

    Pipeline::new()
        .with_verbose(verbose)
        .add_step(Arc::new(ResizeStep {
            width: config.frame_width,
            height: config.frame_height,
        }))
        .add_step(Arc::new(CropZoneStep))
        .add_step(Arc::new(GrayscaleStep))
        .add_step(Arc::new(CombinedThresholdStep {
            block_size: config.adaptive_block_size,
            c: config.adaptive_c,
            level: config.binary_threshold,
        }))
        .add_step(Arc::new(CleanMaskStep))
}
