use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use shapepilot::config::AppConfig;
use shapepilot::frames::{FrameSource, ImageSequence};
use shapepilot::handshake::{run_handshake, TROUBLESHOOTING_HINTS};
use shapepilot::serial::{CommandLink, DryRunLink, SerialLink};
use shapepilot::{overlay, FrameAnalyzer, LineFollower};

#[derive(Parser)]
#[command(name = "shapepilot")]
#[command(about = "Classify shapes and colors in frames, and steer a line-following robot over serial")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML file overriding the default thresholds and serial settings
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the main shape and the colors in each frame
    Classify {
        /// Image file or directory of frames
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Save every mask stage per frame to this directory (must be empty)
        #[arg(long, value_name = "DIR")]
        debug_out: Option<PathBuf>,

        /// Save annotated frames to this directory
        #[arg(long, value_name = "DIR")]
        annotate_out: Option<PathBuf>,
    },

    /// Follow a dark line and send steering commands to the board
    Follow {
        /// Image file or directory of frames
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[command(flatten)]
        serial: SerialArgs,

        /// Log commands instead of opening the serial port
        #[arg(long)]
        dry_run: bool,

        /// Save annotated frames to this directory
        #[arg(long, value_name = "DIR")]
        annotate_out: Option<PathBuf>,
    },

    /// Send test commands to the board and report its replies
    Handshake {
        #[command(flatten)]
        serial: SerialArgs,
    },
}

#[derive(Args)]
struct SerialArgs {
    /// Serial port (e.g. COM4 or /dev/ttyUSB0)
    #[arg(long)]
    port: Option<String>,

    /// Baud rate
    #[arg(long)]
    baud: Option<u32>,
}

impl SerialArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(port) = &self.port {
            config.serial.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    let mut config = AppConfig::load_or_default(args.config.as_deref())?;

    match args.command {
        Commands::Classify { input, debug_out, annotate_out } => {
            classify(&config, args.verbose, &input, debug_out, annotate_out)
        }
        Commands::Follow { input, serial, dry_run, annotate_out } => {
            serial.apply(&mut config);
            config.validate()?;
            follow(&config, &input, dry_run, annotate_out)
        }
        Commands::Handshake { serial } => {
            serial.apply(&mut config);
            config.validate()?;
            handshake(&config)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn classify(
    config: &AppConfig,
    verbose: bool,
    input: &Path,
    debug_out: Option<PathBuf>,
    annotate_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let analyzer = FrameAnalyzer::new(config.classifier.clone()).with_verbose(verbose);
    let mut frames = ImageSequence::open(input)?;

    if let Some(dir) = &annotate_out {
        std::fs::create_dir_all(dir)?;
    }

    println!("\n=== Shape and Color Classification ===");

    let mut index = 0;
    let mut with_shape = 0;
    while let Some(frame) = frames.next_frame()? {
        index += 1;

        let report = match &debug_out {
            Some(root) => analyzer.analyze_debug(&frame, root.join(format!("frame_{:04}", index)))?.0,
            None => analyzer.analyze(&frame)?,
        };
        if report.shape.is_some() {
            with_shape += 1;
        }

        let name = frames
            .current_path()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("frame {}", index));
        println!("  {}: {}", name, report.summary());

        if verbose {
            if let Some(shape) = &report.shape {
                println!("    {} vertices at ({}, {}) {}x{}",
                        shape.vertices, shape.bbox.x, shape.bbox.y, shape.bbox.width, shape.bbox.height);
            }
            for detection in &report.colors {
                println!("    {} blob at ({}, {}) {}x{}",
                        detection.color, detection.bbox.x, detection.bbox.y,
                        detection.bbox.width, detection.bbox.height);
            }
        }

        if let Some(dir) = &annotate_out {
            let resized = shapepilot::detection::preprocessing::resize_frame(
                &frame,
                config.classifier.frame_width,
                config.classifier.frame_height,
            );
            let annotated = overlay::annotate_report(&resized, &report);
            annotated.save(dir.join(format!("{:04}.png", index)))
                .map_err(|e| anyhow::anyhow!("Failed to save annotated frame: {}", e))?;
        }
    }

    println!("\nFrames analyzed: {}", index);
    println!("Frames with a geometric shape: {}", with_shape);

    Ok(())
}

fn follow(config: &AppConfig, input: &Path, dry_run: bool, annotate_out: Option<PathBuf>) -> anyhow::Result<()> {
    let follower = LineFollower::new(config.follower.clone());
    let mut frames = ImageSequence::open(input)?;

    let mut link: Box<dyn CommandLink> = if dry_run {
        Box::new(DryRunLink::default())
    } else {
        Box::new(SerialLink::open(&config.serial)?)
    };

    if let Some(dir) = &annotate_out {
        std::fs::create_dir_all(dir)?;
    }

    let mut index = 0;
    let summary = follower.run_with(&mut frames, link.as_mut(), |frame, decision| {
        index += 1;
        println!("  frame {}: CMD: {}  DEV: {}", index, decision.command, decision.deviation);

        if let Some(dir) = &annotate_out {
            let annotated = overlay::annotate_line(&frame.to_rgb8(), decision);
            annotated.save(dir.join(format!("{:04}.png", index)))
                .map_err(|e| anyhow::anyhow!("Failed to save annotated frame: {}", e))?;
        }
        Ok(())
    })?;

    println!("\n=== Line Follower Summary ===");
    println!("Frames processed: {}", summary.frames);
    for (command, count) in &summary.commands {
        println!("  {}: {}", command, count);
    }
    if summary.failed_sends > 0 {
        println!("Failed sends: {}", summary.failed_sends);
    }

    Ok(())
}

fn handshake(config: &AppConfig) -> anyhow::Result<()> {
    println!("=== Serial Handshake Test ===");
    println!("Connect the board and close any serial monitor using {}", config.serial.port);

    let mut link = match SerialLink::open(&config.serial) {
        Ok(link) => link,
        Err(e) => {
            println!("Error: {}", e);
            println!("Possible fixes:");
            for (i, hint) in TROUBLESHOOTING_HINTS.iter().enumerate() {
                println!("  {}. {}", i + 1, hint);
            }
            return Err(e.into());
        }
    };

    let report = run_handshake(&mut link, &config.handshake)?;

    if !report.boot_lines.is_empty() {
        println!("\nBoard output at startup:");
        for line in &report.boot_lines {
            println!("  {}", line);
        }
    }

    println!();
    for probe in &report.probes {
        if probe.answered() {
            println!("  {} -> {:?}", probe.command, probe.responses);
        } else {
            println!("  {} -> NO RESPONSE", probe.command);
        }
    }

    if report.all_answered() {
        println!("\nAll commands answered");
    } else {
        println!("\nSilent commands: {}", report.silent_commands().join(", "));
    }

    Ok(())
}
