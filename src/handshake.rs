//! Serial round-trip diagnostic: probe the board with single-letter commands
//! and record what it answers.

use std::thread;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::HandshakeConfig;
use crate::serial::CommandLink;

/// Printed when the port cannot be opened
pub const TROUBLESHOOTING_HINTS: &[&str] = &[
    "Close any other program holding the port (IDE serial monitor, terminal)",
    "Check that the port name is the one the board enumerated as",
    "Check the USB-serial driver (e.g. CH340, CP210x) is installed",
    "Try another USB cable",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub command: String,
    pub responses: Vec<String>,
}

impl ProbeResult {
    pub fn answered(&self) -> bool {
        !self.responses.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakeReport {
    /// Lines the board printed before the first probe
    pub boot_lines: Vec<String>,
    pub probes: Vec<ProbeResult>,
}

impl HandshakeReport {
    pub fn all_answered(&self) -> bool {
        self.probes.iter().all(ProbeResult::answered)
    }

    pub fn silent_commands(&self) -> Vec<&str> {
        self.probes
            .iter()
            .filter(|p| !p.answered())
            .map(|p| p.command.as_str())
            .collect()
    }
}

/// Probe each configured command once; commands go out without a line terminator
pub fn run_handshake<L: CommandLink + ?Sized>(link: &mut L, config: &HandshakeConfig) -> Result<HandshakeReport> {
    let mut report = HandshakeReport::default();

    thread::sleep(Duration::from_millis(config.initial_wait_ms));
    report.boot_lines = link.read_available_lines()?;
    for line in &report.boot_lines {
        info!("board: {}", line);
    }

    for command in &config.commands {
        info!("probing '{}'", command);

        link.clear_input()?;
        link.send_raw(command.as_bytes())?;
        thread::sleep(Duration::from_millis(config.response_wait_ms));

        let responses = link.read_available_lines()?;
        if responses.is_empty() {
            warn!("no response to '{}'", command);
        } else {
            info!("responses to '{}': {:?}", command, responses);
        }

        report.probes.push(ProbeResult {
            command: command.clone(),
            responses,
        });

        thread::sleep(Duration::from_millis(config.gap_ms));
    }

    Ok(report)
}
