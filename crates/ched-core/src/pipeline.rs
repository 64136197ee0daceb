use crate::plugin::{ExportContext, PluginError, ScoreBookExportPlugin};
use crate::timeline::{Timeline, TimelineError};
use ched_domain_score::ScoreBook;
use ched_ports::types::Seconds;
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Timeline(#[from] TimelineError),
    #[error("{plugin}: {source}")]
    Plugin {
        plugin: String,
        #[source]
        source: PluginError,
    },
}

/// Summary of a finished export.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExportReport {
    pub plugin: String,
    pub bytes_written: u64,
    pub notes: usize,
    pub bars: i64,
    pub length_seconds: Seconds,
}

impl fmt::Display for ExportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} notes over {} bars ({:.3}s), {} bytes",
            self.plugin, self.notes, self.bars, self.length_seconds, self.bytes_written
        )
    }
}

/// Validates a book's timeline and hands it to one export plugin.
pub struct ExportPipeline {
    plugin: Box<dyn ScoreBookExportPlugin>,
}

impl ExportPipeline {
    pub fn new(plugin: Box<dyn ScoreBookExportPlugin>) -> Self {
        Self { plugin }
    }

    pub fn plugin(&self) -> &dyn ScoreBookExportPlugin {
        self.plugin.as_ref()
    }

    /// The timeline is checked before the plugin runs, so a book with a
    /// broken tempo or signature list never reaches the writer.
    pub fn run(
        &self,
        book: &mut ScoreBook,
        writer: &mut dyn Write,
        is_quick: bool,
    ) -> Result<ExportReport, PipelineError> {
        let timeline = Timeline::build(&book.score)?;

        let last_tick = book
            .score
            .notes
            .bts
            .iter()
            .map(|n| n.start_tick + n.duration)
            .chain(book.score.notes.fxs.iter().map(|n| n.start_tick + n.duration))
            .chain(book.score.notes.lasers.iter().map(|n| n.start_tick + n.duration))
            .max()
            .unwrap_or(0);
        let end = timeline.locate_tick(last_tick)?;
        let notes = book.score.notes.len();

        let mut counter = CountingWriter::new(writer);
        {
            let mut context = ExportContext::new(book, &mut counter, is_quick, self.plugin.name());
            self.plugin
                .export(&mut context)
                .map_err(|source| PipelineError::Plugin {
                    plugin: self.plugin.display_name().to_string(),
                    source,
                })?;
        }

        let report = ExportReport {
            plugin: self.plugin.display_name().to_string(),
            bytes_written: counter.written,
            notes,
            bars: end.bar_index + 1,
            length_seconds: end.seconds,
        };
        log::info!("{report}");
        Ok(report)
    }
}

struct CountingWriter<'a> {
    inner: &'a mut dyn Write,
    written: u64,
}

impl<'a> CountingWriter<'a> {
    fn new(inner: &'a mut dyn Write) -> Self {
        Self { inner, written: 0 }
    }
}

impl Write for CountingWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
