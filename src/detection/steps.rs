use crate::pipeline::{PipelineData, PipelineStep, PipelineContext, MetadataValue};
use crate::detection::preprocessing;
use anyhow::Result;
use image::DynamicImage;
use tracing::info;

/// Resize frames to the working resolution
pub struct ResizeStep {
    pub width: u32,
    pub height: u32,
}

impl PipelineStep for ResizeStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .map(|item| {
                let resized = preprocessing::resize_frame(&item.image, self.width, self.height);
                item.with_image(DynamicImage::ImageRgb8(resized))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Resize"
    }
}

/// Crop the central detection zone; `bbox` records the zone for later offsets
pub struct CropZoneStep;

impl PipelineStep for CropZoneStep {
    fn process(&self, data: Vec<PipelineData>, context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();
        for item in data {
            let zone = preprocessing::central_zone(item.image.width(), item.image.height());
            if context.verbose {
                info!("  detection zone {}x{} at ({}, {})", zone.width, zone.height, zone.x, zone.y);
            }
            let cropped = item.image.crop_imm(zone.x, zone.y, zone.width, zone.height);
            let mut new_item = item.with_image(cropped);
            new_item.bbox = Some(zone);
            result.push(new_item);
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "Crop Zone"
    }
}

/// Convert image to grayscale
pub struct GrayscaleStep;

impl PipelineStep for GrayscaleStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .map(|item| {
                let gray = preprocessing::to_grayscale(&item.image.to_rgb8());
                item.with_image(DynamicImage::ImageLuma8(gray))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Grayscale"
    }
}

/// Gaussian adaptive threshold (inverted), kept alongside the union for inspection.
///
/// Emits two items per input: the adaptive mask tagged `mask = "adaptive"`, then
/// the union of adaptive and fixed thresholds tagged `mask = "combined"`.
pub struct CombinedThresholdStep {
    pub block_size: u32,
    pub c: f32,
    pub level: u8,
}

impl PipelineStep for CombinedThresholdStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();
        for item in data {
            let gray = item.image.to_luma8();
            let adaptive = preprocessing::adaptive_threshold_inv(&gray, self.block_size, self.c);
            let simple = preprocessing::binary_threshold_inv(&gray, self.level);
            let combined = preprocessing::union_masks(&adaptive, &simple);

            result.push(
                item.with_image(DynamicImage::ImageLuma8(adaptive))
                    .with_metadata("mask", MetadataValue::String("adaptive".to_string())),
            );
            result.push(
                item.with_image(DynamicImage::ImageLuma8(combined))
                    .with_metadata("mask", MetadataValue::String("combined".to_string())),
            );
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "Combined Threshold"
    }
}

/// Fixed inverted threshold; dark line on a light floor becomes 255
pub struct BinaryThresholdStep {
    pub level: u8,
}

impl PipelineStep for BinaryThresholdStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .map(|item| {
                let mask = preprocessing::binary_threshold_inv(&item.image.to_luma8(), self.level);
                item.with_image(DynamicImage::ImageLuma8(mask))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Binary Threshold"
    }
}

/// Morphological open + close on "combined" masks; other items pass through untouched
pub struct CleanMaskStep;

impl PipelineStep for CleanMaskStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .map(|item| {
                if item.get_string("mask") == Some("adaptive") {
                    return item;
                }
                let cleaned = preprocessing::clean_mask(&item.image.to_luma8());
                item.with_image(DynamicImage::ImageLuma8(cleaned))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Clean Mask"
    }
}

/// Keep the lower half of each mask; records the row offset
pub struct LowerHalfStep;

impl PipelineStep for LowerHalfStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .map(|item| {
                let top = item.image.height() / 2;
                let roi = preprocessing::lower_half(&item.image.to_luma8());
                item.with_image(DynamicImage::ImageLuma8(roi))
                    .with_metadata("roi_y", MetadataValue::Int(top as i32))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Lower Half"
    }
}
