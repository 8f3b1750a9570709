//! Line following: find the line in the lower half of the frame and turn its
//! horizontal offset into a motion command for the board.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::thread;

use anyhow::Result;
use image::DynamicImage;
use tracing::{debug, error, info, warn};

use crate::config::FollowerConfig;
use crate::detection::contours::find_external_contours;
use crate::detection::steps::{BinaryThresholdStep, GrayscaleStep, LowerHalfStep};
use crate::frames::FrameSource;
use crate::models::Contour;
use crate::pipeline::Pipeline;
use crate::serial::CommandLink;

/// Motion commands understood by the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Command {
    Forward,
    Left1,
    Left2,
    Right1,
    Right2,
    Stop,
}

impl Command {
    /// Token written on the wire
    pub fn token(&self) -> &'static str {
        match self {
            Command::Forward => "FS",
            Command::Left1 => "L1",
            Command::Left2 => "L2",
            Command::Right1 => "R1",
            Command::Right2 => "R2",
            Command::Stop => "S",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "FS" => Some(Command::Forward),
            "L1" => Some(Command::Left1),
            "L2" => Some(Command::Left2),
            "R1" => Some(Command::Right1),
            "R2" => Some(Command::Right2),
            "S" => Some(Command::Stop),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Negative deviation means the line is left of center
pub fn command_for_deviation(deviation: i32, dead_band: i32, hard_turn: i32) -> Command {
    if deviation.abs() < dead_band {
        Command::Forward
    } else if deviation < -hard_turn {
        Command::Left2
    } else if deviation < 0 {
        Command::Left1
    } else if deviation > hard_turn {
        Command::Right2
    } else {
        Command::Right1
    }
}

/// Centroid of the detected line in full-frame coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinePosition {
    pub x: i32,
    pub y: i32,
    pub area: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineDecision {
    /// None when no blob passed the area filter; steering then assumes center
    pub line: Option<LinePosition>,
    pub center_x: i32,
    pub deviation: i32,
    pub command: Command,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowSummary {
    pub frames: usize,
    pub commands: BTreeMap<Command, usize>,
    pub failed_sends: usize,
}

pub struct LineFollower {
    pub config: FollowerConfig,
    pipeline: Pipeline,
}

impl LineFollower {
    pub fn new(config: FollowerConfig) -> Self {
        let pipeline = Pipeline::new()
            .add_step(Arc::new(GrayscaleStep))
            .add_step(Arc::new(BinaryThresholdStep { level: config.binary_threshold }))
            .add_step(Arc::new(LowerHalfStep));
        Self { config, pipeline }
    }

    /// Locate the largest dark blob in the lower half of the frame
    pub fn locate_line(&self, frame: &DynamicImage) -> Result<Option<LinePosition>> {
        let Some(roi) = self.pipeline.run(frame.clone())?.into_iter().next() else {
            return Ok(None);
        };
        let roi_y = roi.get_int("roi_y").unwrap_or(0);

        // ties keep the first contour in scan order
        let largest = find_external_contours(&roi.image.to_luma8())
            .into_iter()
            .map(|c| (c.area(), c))
            .fold(None, |best: Option<(f64, Contour)>, cur| match best {
                Some(b) if b.0 >= cur.0 => Some(b),
                _ => Some(cur),
            });

        let Some((area, contour)) = largest else {
            return Ok(None);
        };
        if area <= self.config.min_line_area {
            return Ok(None);
        }

        Ok(contour.centroid().map(|(x, y)| LinePosition { x, y: y + roi_y, area }))
    }

    pub fn decide(&self, frame: &DynamicImage) -> Result<LineDecision> {
        let center_x = (frame.width() / 2) as i32;
        let line = self.locate_line(frame)?;
        let cx = line.map(|l| l.x).unwrap_or(center_x);
        let deviation = cx - center_x;
        let command = command_for_deviation(deviation, self.config.dead_band, self.config.hard_turn);

        Ok(LineDecision {
            line,
            center_x,
            deviation,
            command,
        })
    }

    /// Drive from every frame of `source`; see `run_with`
    pub fn run<S, L>(&self, source: &mut S, link: &mut L) -> Result<FollowSummary>
    where
        S: FrameSource + ?Sized,
        L: CommandLink + ?Sized,
    {
        self.run_with(source, link, |_, _| Ok(()))
    }

    /// Send a stop, then one command per frame, then a final stop.
    ///
    /// Failed sends are logged and counted without stopping the loop. Any other
    /// error ends the loop; the final stop is still sent before it is returned.
    pub fn run_with<S, L, F>(&self, source: &mut S, link: &mut L, mut on_frame: F) -> Result<FollowSummary>
    where
        S: FrameSource + ?Sized,
        L: CommandLink + ?Sized,
        F: FnMut(&DynamicImage, &LineDecision) -> Result<()>,
    {
        let mut summary = FollowSummary::default();

        info!("starting line follower");
        send_logged(link, Command::Stop, &mut summary);

        let outcome = self.drive(source, link, &mut on_frame, &mut summary);

        if let Err(e) = &outcome {
            error!("line follower stopped: {:#}", e);
        }

        info!("stopping");
        send_logged(link, Command::Stop, &mut summary);
        thread::sleep(self.config.stop_delay());

        outcome.map(|_| summary)
    }

    fn drive<S, L, F>(&self, source: &mut S, link: &mut L, on_frame: &mut F, summary: &mut FollowSummary) -> Result<()>
    where
        S: FrameSource + ?Sized,
        L: CommandLink + ?Sized,
        F: FnMut(&DynamicImage, &LineDecision) -> Result<()>,
    {
        while let Some(frame) = source.next_frame()? {
            let decision = self.decide(&frame)?;
            summary.frames += 1;
            debug!(
                "frame {}: deviation {} -> {}",
                summary.frames, decision.deviation, decision.command
            );

            send_logged(link, decision.command, summary);
            on_frame(&frame, &decision)?;
        }
        Ok(())
    }
}

fn send_logged<L: CommandLink + ?Sized>(link: &mut L, command: Command, summary: &mut FollowSummary) {
    match link.send_command(command.token()) {
        Ok(()) => *summary.commands.entry(command).or_insert(0) += 1,
        Err(e) => {
            warn!("failed to send '{}': {}", command, e);
            summary.failed_sends += 1;
        }
    }
}
