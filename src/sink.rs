//! Sinks for normalized positions

use std::io::{self, Stdout, Write};

use async_trait::async_trait;

use crate::{
    config::{AppConfig, OutputFormat, SinkKind},
    database::DatabaseSink,
    errors::{IssRecorderError, Result},
    models::{NormalizedPosition, StoredRecord},
};

/// Destination of normalized positions, one call per poll cycle
#[async_trait]
pub trait PositionSink: Send {
    async fn store(&mut self, position: &NormalizedPosition) -> Result<()>;

    /// Release any held resources
    async fn close(&mut self) {}

    fn name(&self) -> &'static str;
}

/// Build the sink selected in configuration
///
/// For the database sink this connects and prepares the table.
pub async fn from_config(config: &AppConfig) -> Result<Box<dyn PositionSink>> {
    let sink: Box<dyn PositionSink> = match config.sink.kind {
        SinkKind::Database => Box::new(DatabaseSink::connect(&config.database).await?),
        SinkKind::Console => Box::new(ConsoleSink::stdout(config.sink.format)),
    };
    Ok(sink)
}

/// Writes one line per position
pub struct ConsoleSink<W> {
    writer: W,
    format: OutputFormat,
}

impl ConsoleSink<Stdout> {
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(io::stdout(), format)
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self { writer, format }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Write a position as WKT or JSON
    pub fn emit(&mut self, position: &NormalizedPosition) -> Result<()> {
        let line = match self.format {
            OutputFormat::Wkt => position.to_wkt(),
            OutputFormat::Json => to_json(position)?,
        };
        self.write_line(&line)
    }

    /// Write a stored record; the WKT line is prefixed by the timestamp
    pub fn emit_record(&mut self, record: &StoredRecord) -> Result<()> {
        let line = match self.format {
            OutputFormat::Wkt => format!(
                "{}\t{}",
                record.timestamp.to_rfc3339(),
                record.position.to_wkt()
            ),
            OutputFormat::Json => to_json(record)?,
        };
        self.write_line(&line)
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "{}", line).map_err(IssRecorderError::EmitError)?;
        self.writer.flush().map_err(IssRecorderError::EmitError)
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| IssRecorderError::EmitError(e.into()))
}

#[async_trait]
impl<W: Write + Send> PositionSink for ConsoleSink<W> {
    async fn store(&mut self, position: &NormalizedPosition) -> Result<()> {
        self.emit(position)
    }

    fn name(&self) -> &'static str {
        "console"
    }
}
