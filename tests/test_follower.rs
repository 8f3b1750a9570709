//! Line location, steering decisions and the command loop.

mod common;

use anyhow::Result;
use image::DynamicImage;
use shapepilot::follower::{command_for_deviation, Command, LineFollower};
use shapepilot::frames::{FrameSource, ImageSequence};

use common::*;

fn follower() -> LineFollower {
    LineFollower::new(FollowerConfig {
        stop_delay_ms: 0,
        ..FollowerConfig::default()
    })
}

/// Full-height dark stripe starting at column `x`
fn stripe(x: i32) -> DynamicImage {
    dynamic(with_rect(blank_frame(), x, 0, 40, FRAME_H, BLACK))
}

#[test]
fn test_deviation_thresholds() {
    let cases = [
        (0, Command::Forward),
        (49, Command::Forward),
        (-49, Command::Forward),
        (50, Command::Right1),
        (100, Command::Right1),
        (101, Command::Right2),
        (-50, Command::Left1),
        (-100, Command::Left1),
        (-101, Command::Left2),
    ];
    for (deviation, expected) in cases {
        assert_eq!(command_for_deviation(deviation, 50, 100), expected, "deviation {}", deviation);
    }
}

#[test]
fn test_command_tokens() {
    let all = [
        Command::Forward,
        Command::Left1,
        Command::Left2,
        Command::Right1,
        Command::Right2,
        Command::Stop,
    ];
    let tokens: Vec<&str> = all.iter().map(|c| c.token()).collect();
    assert_eq!(tokens, ["FS", "L1", "L2", "R1", "R2", "S"]);

    for command in all {
        assert_eq!(Command::from_token(command.token()), Some(command));
    }
    assert_eq!(Command::from_token("X"), None);
}

#[test]
fn test_centered_line_goes_forward() -> Result<()> {
    let decision = follower().decide(&stripe(300))?;

    let line = decision.line.expect("line should be found");
    // columns 300..=339, rows 240..=479
    assert_eq!(line.x, 319);
    assert_eq!(line.y, 359);
    assert_eq!(decision.center_x, 320);
    assert_eq!(decision.deviation, -1);
    assert_eq!(decision.command, Command::Forward);

    Ok(())
}

#[test]
fn test_steering_by_line_position() -> Result<()> {
    let f = follower();
    assert_eq!(f.decide(&stripe(80))?.command, Command::Left2);
    assert_eq!(f.decide(&stripe(230))?.command, Command::Left1);
    assert_eq!(f.decide(&stripe(400))?.command, Command::Right1);
    assert_eq!(f.decide(&stripe(500))?.command, Command::Right2);
    Ok(())
}

#[test]
fn test_no_line_assumes_center() -> Result<()> {
    let decision = follower().decide(&dynamic(blank_frame()))?;

    assert!(decision.line.is_none());
    assert_eq!(decision.deviation, 0);
    assert_eq!(decision.command, Command::Forward);

    Ok(())
}

#[test]
fn test_line_in_upper_half_is_ignored() -> Result<()> {
    let frame = dynamic(with_rect(blank_frame(), 50, 0, 40, 200, BLACK));
    assert!(follower().decide(&frame)?.line.is_none());
    Ok(())
}

#[test]
fn test_small_blob_is_not_a_line() -> Result<()> {
    let frame = dynamic(with_rect(blank_frame(), 50, 400, 10, 10, BLACK));
    assert!(follower().locate_line(&frame)?.is_none());
    Ok(())
}

#[test]
fn test_largest_blob_wins() -> Result<()> {
    let frame = with_rect(blank_frame(), 50, 300, 30, 30, BLACK);
    let frame = dynamic(with_rect(frame, 500, 240, 40, 240, BLACK));

    let line = follower().locate_line(&frame)?.expect("line should be found");
    assert_eq!(line.x, 519);

    Ok(())
}

#[test]
fn test_equal_blobs_pick_the_first_found() -> Result<()> {
    let frame = with_rect(blank_frame(), 100, 0, 40, FRAME_H, BLACK);
    let frame = dynamic(with_rect(frame, 460, 0, 40, FRAME_H, BLACK));

    let decision = follower().decide(&frame)?;
    let line = decision.line.expect("line should be found");
    assert_eq!(line.x, 119);
    assert_eq!(decision.command, Command::Left2);

    Ok(())
}

#[test]
fn test_run_brackets_commands_with_stop() -> Result<()> {
    let mut frames = ImageSequence::from_images(vec![stripe(300), stripe(80), dynamic(blank_frame())]);
    let mut link = RecordingLink::new();

    let summary = follower().run(&mut frames, &mut link)?;

    assert_eq!(link.commands(), ["S", "FS", "L2", "FS", "S"]);
    assert!(link.sent.iter().all(|s| s.ends_with('\n')));
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.commands.get(&Command::Stop), Some(&2));
    assert_eq!(summary.commands.get(&Command::Forward), Some(&2));
    assert_eq!(summary.commands.get(&Command::Left2), Some(&1));
    assert_eq!(summary.failed_sends, 0);

    Ok(())
}

#[test]
fn test_send_failures_do_not_stop_the_loop() -> Result<()> {
    let mut frames = ImageSequence::from_images(vec![stripe(300), stripe(500)]);
    let mut link = RecordingLink::failing();

    let summary = follower().run(&mut frames, &mut link)?;

    assert_eq!(summary.frames, 2);
    assert_eq!(summary.failed_sends, 4);
    assert!(summary.commands.is_empty());

    Ok(())
}

/// Yields one good frame, then fails
struct BrokenCamera {
    served: bool,
}

impl FrameSource for BrokenCamera {
    fn next_frame(&mut self) -> Result<Option<DynamicImage>> {
        if self.served {
            anyhow::bail!("camera disconnected");
        }
        self.served = true;
        Ok(Some(stripe(300)))
    }
}

#[test]
fn test_source_error_still_sends_final_stop() {
    let mut camera = BrokenCamera { served: false };
    let mut link = RecordingLink::new();

    let result = follower().run(&mut camera, &mut link);

    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("camera disconnected"));
    assert_eq!(link.commands(), ["S", "FS", "S"]);
}

#[test]
fn test_frame_callback_sees_every_decision() -> Result<()> {
    let mut frames = ImageSequence::from_images(vec![stripe(80), stripe(500)]);
    let mut link = RecordingLink::new();
    let mut seen = Vec::new();

    follower().run_with(&mut frames, &mut link, |_, decision| {
        seen.push(decision.command);
        Ok(())
    })?;

    assert_eq!(seen, [Command::Left2, Command::Right2]);
    Ok(())
}
