//! Text command link to the motor controller board.

use std::io::{Read, Write};
use std::thread;

use serialport::{ClearBuffer, SerialPort};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::SerialConfig;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("Serial port error: {0}")]
    Port(#[from] serialport::Error),

    #[error("Serial I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Anything that carries commands to the board and hands back its replies
pub trait CommandLink {
    /// Write raw bytes and flush
    fn send_raw(&mut self, bytes: &[u8]) -> Result<(), LinkError>;

    /// Discard anything the board sent that has not been read yet
    fn clear_input(&mut self) -> Result<(), LinkError>;

    /// Drain pending input as trimmed, non-empty text lines
    fn read_available_lines(&mut self) -> Result<Vec<String>, LinkError>;

    /// Send one newline-terminated command
    fn send_command(&mut self, command: &str) -> Result<(), LinkError> {
        let mut line = Vec::with_capacity(command.len() + 1);
        line.extend_from_slice(command.as_bytes());
        line.push(b'\n');
        self.send_raw(&line)?;
        debug!("sent '{}'", command);
        Ok(())
    }
}

/// Split received bytes into lines, decoding lossily and dropping blanks
pub fn split_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .split('\n')
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Command link over a real serial port
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialLink {
    /// Open the port, then wait for the board to come out of reset
    pub fn open(config: &SerialConfig) -> Result<Self, LinkError> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.timeout())
            .open()
            .map_err(|source| LinkError::Open {
                port: config.port.clone(),
                source,
            })?;

        info!("opened {} at {} baud", config.port, config.baud_rate);
        thread::sleep(config.settle());

        Ok(Self {
            port,
            name: config.port.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl CommandLink for SerialLink {
    fn send_raw(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    fn clear_input(&mut self) -> Result<(), LinkError> {
        self.port.clear(ClearBuffer::Input)?;
        Ok(())
    }

    fn read_available_lines(&mut self) -> Result<Vec<String>, LinkError> {
        let mut received = Vec::new();
        loop {
            let pending = self.port.bytes_to_read()? as usize;
            if pending == 0 {
                break;
            }
            let mut chunk = vec![0u8; pending];
            let n = self.port.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            received.extend_from_slice(&chunk[..n]);
        }
        Ok(split_lines(&received))
    }
}

/// Logs commands instead of sending them; for running without hardware
#[derive(Debug, Default)]
pub struct DryRunLink {
    pub sent: Vec<String>,
}

impl CommandLink for DryRunLink {
    fn send_raw(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let text = String::from_utf8_lossy(bytes).trim_end().to_string();
        info!("dry run: would send '{}'", text);
        self.sent.push(text);
        Ok(())
    }

    fn clear_input(&mut self) -> Result<(), LinkError> {
        Ok(())
    }

    fn read_available_lines(&mut self) -> Result<Vec<String>, LinkError> {
        Ok(Vec::new())
    }
}
