use anyhow::{Context, Result};
use serde::Serialize;
use std::io::{BufRead, BufWriter, Write};

use super::complement::complement_strand;
use crate::parallel::{CancellationToken, FileTally};

/// Marker prepended to strands that contain a symbol without a complement
pub const DEFAULT_INVALID_MARKER: &str = "****FITA INVALIDA - ";

/// Result of classifying one input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrandOutcome {
    /// Every symbol resolved; carries the complement strand
    Valid(String),
    /// At least one symbol had no complement; carries the original line
    Invalid(String),
}

/// How a single file's task ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Completed,
    Cancelled,
    Failed(String),
}

/// Everything one task reports back to the coordinator
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub input: String,
    pub tally: FileTally,
    pub status: FileStatus,
}

impl FileReport {
    pub fn failed(input: &str, tally: FileTally, error: &anyhow::Error) -> Self {
        Self {
            input: input.to_string(),
            tally,
            status: FileStatus::Failed(format!("{error:#}")),
        }
    }
}

/// Turns a stream of strands into a stream of complement lines.
#[derive(Debug, Clone)]
pub struct StrandProcessor {
    invalid_marker: String,
}

impl Default for StrandProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_INVALID_MARKER)
    }
}

impl StrandProcessor {
    pub fn new(invalid_marker: impl Into<String>) -> Self {
        Self {
            invalid_marker: invalid_marker.into(),
        }
    }

    pub fn invalid_marker(&self) -> &str {
        &self.invalid_marker
    }

    pub fn classify(&self, line: &str) -> StrandOutcome {
        match complement_strand(line) {
            Some(complement) => StrandOutcome::Valid(complement),
            None => StrandOutcome::Invalid(line.to_string()),
        }
    }

    /// Output line for an outcome
    pub fn render(&self, outcome: StrandOutcome) -> String {
        match outcome {
            StrandOutcome::Valid(complement) => complement,
            StrandOutcome::Invalid(original) => format!("{}{}", self.invalid_marker, original),
        }
    }

    /// Read every line of `reader`, tallying into `tally` as it goes.
    ///
    /// Returns the rendered output lines in input order, or `None` when the
    /// token was cancelled before the input was exhausted. On a read error the
    /// lines already seen stay in `tally`.
    pub fn process_lines<R: BufRead>(
        &self,
        input_name: &str,
        reader: R,
        tally: &mut FileTally,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<String>>> {
        let mut rendered = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            if cancel.is_cancelled() {
                return Ok(None);
            }

            let line_number = index + 1;
            let line = line.with_context(|| format!("Failed to read line {line_number} of {input_name}"))?;

            let outcome = self.classify(&line);
            match &outcome {
                StrandOutcome::Valid(_) => tally.record_valid(),
                StrandOutcome::Invalid(original) => {
                    tracing::info!(input = input_name, line = line_number, "Invalid strand: {}", original);
                    tally.record_invalid(line_number);
                }
            }
            rendered.push(self.render(outcome));
        }

        Ok(Some(rendered))
    }

    /// Write buffered lines to `sink`, newline-terminated, then flush.
    pub fn write_lines<W: Write>(lines: &[String], sink: W) -> Result<()> {
        let mut writer = BufWriter::new(sink);
        for line in lines {
            writeln!(writer, "{line}")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Process one input end to end.
    ///
    /// The sink is only opened once the whole input has been read, so a
    /// cancelled or unreadable input never leaves an output file behind.
    /// Errors are folded into the returned report rather than propagated.
    pub fn process<R, W, F>(&self, input_name: &str, reader: R, open_sink: F, cancel: &CancellationToken) -> FileReport
    where
        R: BufRead,
        W: Write,
        F: FnOnce() -> Result<W>,
    {
        let mut tally = FileTally::default();

        let lines = match self.process_lines(input_name, reader, &mut tally, cancel) {
            Ok(Some(lines)) => lines,
            Ok(None) => {
                tracing::warn!(input = input_name, lines = tally.total, "Task cancelled before completion");
                return FileReport {
                    input: input_name.to_string(),
                    tally,
                    status: FileStatus::Cancelled,
                };
            }
            Err(e) => {
                tracing::error!(input = input_name, "{:#}", e);
                return FileReport::failed(input_name, tally, &e);
            }
        };

        let written = open_sink()
            .and_then(|sink| Self::write_lines(&lines, sink))
            .with_context(|| format!("Failed to write complement of {input_name}"));

        match written {
            Ok(()) => FileReport {
                input: input_name.to_string(),
                tally,
                status: FileStatus::Completed,
            },
            Err(e) => {
                tracing::error!(input = input_name, "{:#}", e);
                FileReport::failed(input_name, tally, &e)
            }
        }
    }
}
