use std::io::{self, Write};

use dlnotify_core::event::DeviceEvent;
use dlnotify_core::telemetry::NotificationStats;

/// 事件输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human readable lines on stderr
    #[default]
    Text,
    /// One JSON object per line on stdout
    Json,
}

/// Writes device events and the final summary.
///
/// Text goes to the diagnostic stream alongside the status messages; JSON goes
/// to the data stream so it can be piped.
#[derive(Debug)]
pub struct EventPrinter<O, E> {
    format: OutputFormat,
    out: O,
    err: E,
}

impl EventPrinter<io::Stdout, io::Stderr> {
    pub fn stdio(format: OutputFormat) -> Self {
        Self::new(format, io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> EventPrinter<O, E> {
    pub fn new(format: OutputFormat, out: O, err: E) -> Self {
        Self { format, out, err }
    }

    pub fn event(&mut self, event: &DeviceEvent) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(self.err, "{event}")?,
            OutputFormat::Json => {
                writeln!(self.out, "{}", event.to_json()?)?;
                self.out.flush()?;
            }
        }
        Ok(())
    }

    pub fn summary(&mut self, stats: &NotificationStats) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Text => {
                writeln!(self.err, "Summary: {stats} (session {})", stats.assess())?
            }
            OutputFormat::Json => {
                let line = serde_json::json!({
                    "event": "summary",
                    "arrivals": stats.arrivals,
                    "duplicate_arrivals": stats.duplicate_arrivals,
                    "removals": stats.removals,
                    "unknown_removals": stats.unknown_removals,
                    "live_devices": stats.live_devices,
                    "handler_panics": stats.handler_panics,
                    "health": stats.assess().to_string(),
                });
                writeln!(self.out, "{line}")?;
                self.out.flush()?;
            }
        }
        Ok(())
    }

    /// Status lines always go to stderr.
    pub fn status(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.err, "{message}")
    }

    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}
