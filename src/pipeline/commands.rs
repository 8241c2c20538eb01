//! Control command sources
//!
//! The control surface reaches the tracker as a stream of commands. The
//! canonical transport is JSON lines on stdin (one command per line), the
//! same channel an operator console or a supervising process would drive.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::types::WellGeometryParameters;

/// A control-surface operation.
///
/// Wire format (one JSON object per line):
///
/// ```json
/// {"cmd": "update_pump_speed", "speed": 75.0, "at": "2026-08-07 10:00:00"}
/// {"cmd": "add_sample", "depth": 5150.0, "at": "2026-08-07 10:05:00"}
/// {"cmd": "start_tracking", "name": "sample_5000", "params": {...}}
/// {"cmd": "view"}
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ControlCommand {
    /// Apply a new rig-wide pump speed to all non-completed samples.
    UpdatePumpSpeed { speed: f64, at: String },
    /// Add a new depth sample, copying the latest sample's parameters.
    AddSample {
        #[serde(default)]
        name: Option<String>,
        depth: f64,
        at: String,
    },
    /// Begin tracking a sample from a full parameter set.
    StartTracking {
        name: String,
        params: WellGeometryParameters,
    },
    /// Log a snapshot of every tracked sample.
    View,
}

/// Events produced by a command source.
#[derive(Debug)]
pub enum CommandEvent {
    /// A valid control command was read.
    Command(ControlCommand),
    /// Source reached end of data; no further commands will arrive.
    Eof,
}

/// Trait abstracting where control commands come from.
///
/// Implementations handle transport and framing internally. The tracker
/// loop calls [`next_command`](CommandSource::next_command) in a `select!`
/// with cancellation and the tick interval.
#[async_trait]
pub trait CommandSource: Send + 'static {
    /// Read the next command from the source.
    ///
    /// Returns `CommandEvent::Eof` when no more commands can arrive.
    async fn next_command(&mut self) -> Result<CommandEvent>;

    /// Human-readable name for logging (e.g. "stdin", "none").
    fn source_name(&self) -> &str;
}

// ============================================================================
// Stdin Source (JSON commands, one per line)
// ============================================================================

/// Reads JSON-formatted control commands from stdin.
pub struct StdinSource {
    reader: tokio::io::BufReader<tokio::io::Stdin>,
    line_buffer: String,
}

impl StdinSource {
    pub fn new() -> Self {
        Self {
            reader: tokio::io::BufReader::new(tokio::io::stdin()),
            line_buffer: String::with_capacity(512),
        }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandSource for StdinSource {
    async fn next_command(&mut self) -> Result<CommandEvent> {
        use tokio::io::AsyncBufReadExt;
        loop {
            self.line_buffer.clear();
            let bytes = self.reader.read_line(&mut self.line_buffer).await?;
            if bytes == 0 {
                return Ok(CommandEvent::Eof);
            }
            let line = self.line_buffer.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<ControlCommand>(line) {
                Ok(command) => return Ok(CommandEvent::Command(command)),
                Err(e) => {
                    tracing::warn!("[StdinSource] Failed to parse command: {}", e);
                    // Skip malformed lines and keep reading
                }
            }
        }
    }

    fn source_name(&self) -> &str {
        "stdin"
    }
}

// ============================================================================
// Null Source (no control surface attached)
// ============================================================================

/// A source that never yields — used when the tracker runs unattended.
pub struct NullSource;

#[async_trait]
impl CommandSource for NullSource {
    async fn next_command(&mut self) -> Result<CommandEvent> {
        std::future::pending().await
    }

    fn source_name(&self) -> &str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_deserialize_from_wire_format() {
        let cmd: ControlCommand = serde_json::from_str(
            r#"{"cmd": "update_pump_speed", "speed": 75.0, "at": "2026-08-07 10:00:00"}"#,
        )
        .unwrap();
        assert!(matches!(
            cmd,
            ControlCommand::UpdatePumpSpeed { speed, .. } if speed == 75.0
        ));

        let cmd: ControlCommand =
            serde_json::from_str(r#"{"cmd": "add_sample", "depth": 5150.0, "at": "x"}"#).unwrap();
        assert!(matches!(
            cmd,
            ControlCommand::AddSample { name: None, depth, .. } if depth == 5150.0
        ));

        let cmd: ControlCommand = serde_json::from_str(r#"{"cmd": "view"}"#).unwrap();
        assert!(matches!(cmd, ControlCommand::View));
    }

    #[test]
    fn null_source_never_yields() {
        let mut source = NullSource;
        let mut fut = tokio_test::task::spawn(source.next_command());
        tokio_test::assert_pending!(fut.poll());
    }
}
