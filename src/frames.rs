use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{DynamicImage, ImageReader};

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// A stream of frames; `None` marks the end of the feed
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<DynamicImage>>;
}

enum Frame {
    File(PathBuf),
    Decoded(DynamicImage),
}

/// Frames read from image files, or held in memory
pub struct ImageSequence {
    frames: VecDeque<Frame>,
    current: Option<PathBuf>,
}

impl ImageSequence {
    /// A single image file, or every image in a directory in file-name order
    pub fn open(path: &Path) -> Result<Self> {
        let files = if path.is_dir() {
            let mut files: Vec<PathBuf> = std::fs::read_dir(path)
                .with_context(|| format!("Failed to list frames in {}", path.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_frame_file(p))
                .collect();
            files.sort();
            if files.is_empty() {
                anyhow::bail!("No image files found in {}", path.display());
            }
            files
        } else if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            anyhow::bail!("Input not found: {}", path.display());
        };

        Ok(Self {
            frames: files.into_iter().map(Frame::File).collect(),
            current: None,
        })
    }

    pub fn from_images(images: Vec<DynamicImage>) -> Self {
        Self {
            frames: images.into_iter().map(Frame::Decoded).collect(),
            current: None,
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    /// File the last returned frame came from, if it came from disk
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_deref()
    }
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> Result<Option<DynamicImage>> {
        match self.frames.pop_front() {
            None => Ok(None),
            Some(Frame::Decoded(img)) => {
                self.current = None;
                Ok(Some(img))
            }
            Some(Frame::File(path)) => {
                let img = ImageReader::open(&path)?
                    .decode()
                    .map_err(|e| anyhow::anyhow!("Failed to decode {}: {}", path.display(), e))?;
                self.current = Some(path);
                Ok(Some(img))
            }
        }
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
