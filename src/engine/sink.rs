//! Output sinks: where responses go.
//!
//! The engine pushes either ordered chunks (streaming) or one complete
//! string (batch or cache hit). Rendering is the sink's business.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{HuginnError, Result};

/// How a complete response is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Plain,
    /// `{"response": "..."}` on a single line.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Plain => write!(f, "plain"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = HuginnError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "plain" => Ok(OutputFormat::Plain),
            "json" => Ok(OutputFormat::Json),
            other => Err(HuginnError::InvalidInput(format!(
                "unknown output format: {other}"
            ))),
        }
    }
}

/// Receiver of engine output.
pub trait OutputSink: Send {
    /// One filtered chunk of a streamed response, in provider order.
    fn chunk(&mut self, text: &str) -> Result<()>;

    /// A complete response (batch generation or cache hit).
    fn complete(&mut self, text: &str, format: OutputFormat) -> Result<()>;

    /// Called once after the last chunk of a stream.
    fn end_stream(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Records everything it receives. Used by tests and library callers that
/// want the text without printing it.
#[derive(Debug, Default, Clone)]
pub struct BufferSink {
    pub chunks: Vec<String>,
    pub completed: Option<(String, OutputFormat)>,
    pub stream_ended: bool,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concatenated chunks, or the completed text.
    pub fn text(&self) -> String {
        match &self.completed {
            Some((text, _)) => text.clone(),
            None => self.chunks.concat(),
        }
    }
}

impl OutputSink for BufferSink {
    fn chunk(&mut self, text: &str) -> Result<()> {
        self.chunks.push(text.to_string());
        Ok(())
    }

    fn complete(&mut self, text: &str, format: OutputFormat) -> Result<()> {
        self.completed = Some((text.to_string(), format));
        Ok(())
    }

    fn end_stream(&mut self) -> Result<()> {
        self.stream_ended = true;
        Ok(())
    }
}

/// Writes to any `io::Write` (stdout in the CLI).
///
/// Chunks are flushed immediately so the terminal shows them as they
/// arrive. Streamed output is always plain text.
pub struct WriterSink<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> OutputSink for WriterSink<W> {
    fn chunk(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }

    fn complete(&mut self, text: &str, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Plain => writeln!(self.out, "{text}")?,
            OutputFormat::Json => {
                let line = serde_json::to_string(&serde_json::json!({ "response": text }))?;
                writeln!(self.out, "{line}")?;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    fn end_stream(&mut self) -> Result<()> {
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}
