use ched_domain_eval::ComboCalculator;
use ched_domain_score::{Score, ScoreBook};
use ched_export_sus::{SusExportError, SusExporter};
use ched_ports::config::SusArgs;
use std::io::Write;

#[derive(thiserror::Error, Debug)]
pub enum PluginError {
    #[error("export failed: {0}")]
    Export(#[from] SusExportError),
    #[error("invalid custom data for {plugin}: {message}")]
    CustomData { plugin: String, message: String },
}

/// Runs against the current score and returns a report for the user.
pub trait ScorePlugin {
    fn display_name(&self) -> &str;
    fn run(&self, score: &Score) -> Result<String, PluginError>;
}

/// Writes a whole book to a stream in some external format.
pub trait ScoreBookExportPlugin {
    /// Stable key under which the plugin's settings are kept in the book.
    fn name(&self) -> &str;
    fn display_name(&self) -> &str;
    /// `Description (*.ext)|*.ext`
    fn file_filter(&self) -> &str;
    fn export(&self, context: &mut ExportContext<'_>) -> Result<(), PluginError>;
}

/// What an export plugin sees of the book being exported.
pub struct ExportContext<'a> {
    book: &'a mut ScoreBook,
    writer: &'a mut dyn Write,
    is_quick: bool,
    key: String,
}

impl<'a> ExportContext<'a> {
    pub fn new(
        book: &'a mut ScoreBook,
        writer: &'a mut dyn Write,
        is_quick: bool,
        key: impl Into<String>,
    ) -> Self {
        Self {
            book,
            writer,
            is_quick,
            key: key.into(),
        }
    }

    pub fn book(&self) -> &ScoreBook {
        self.book
    }

    /// Quick exports reuse stored settings without asking for new ones.
    pub fn is_quick(&self) -> bool {
        self.is_quick
    }

    pub fn custom_data(&self) -> Option<&str> {
        self.book.export_args.get(&self.key).map(String::as_str)
    }

    pub fn set_custom_data(&mut self, data: impl Into<String>) {
        self.book.export_args.insert(self.key.clone(), data.into());
    }

    pub fn book_and_writer(&mut self) -> (&ScoreBook, &mut dyn Write) {
        (&*self.book, &mut *self.writer)
    }
}

/// Exports books as SUS documents.
///
/// Settings come from the book's stored custom data, falling back to
/// `defaults`. A non-quick export with `overrides` set uses those instead.
/// Whatever was used is stored back into the book afterwards.
#[derive(Clone, Debug, Default)]
pub struct SusExportPlugin {
    pub defaults: SusArgs,
    pub overrides: Option<SusArgs>,
}

impl SusExportPlugin {
    pub const NAME: &'static str = "sus";

    pub fn new(defaults: SusArgs) -> Self {
        Self {
            defaults,
            overrides: None,
        }
    }

    pub fn with_overrides(mut self, overrides: SusArgs) -> Self {
        self.overrides = Some(overrides);
        self
    }

    fn resolve_args(&self, context: &ExportContext<'_>) -> Result<SusArgs, PluginError> {
        if !context.is_quick() {
            if let Some(overrides) = &self.overrides {
                return Ok(overrides.clone());
            }
        }
        match context.custom_data() {
            Some(data) if !data.trim().is_empty() => {
                serde_json::from_str(data).map_err(|e| PluginError::CustomData {
                    plugin: Self::NAME.to_string(),
                    message: e.to_string(),
                })
            }
            _ => Ok(self.defaults.clone()),
        }
    }
}

impl ScoreBookExportPlugin for SusExportPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn display_name(&self) -> &str {
        "Sliding Universal Score (*.sus)"
    }

    fn file_filter(&self) -> &str {
        "Sliding Universal Score (*.sus)|*.sus"
    }

    fn export(&self, context: &mut ExportContext<'_>) -> Result<(), PluginError> {
        let args = self.resolve_args(context)?;
        let stored = serde_json::to_string(&args).map_err(|e| PluginError::CustomData {
            plugin: Self::NAME.to_string(),
            message: e.to_string(),
        })?;

        {
            let (book, writer) = context.book_and_writer();
            SusExporter::new(book, args)?.export(writer)?;
        }

        context.set_custom_data(stored);
        Ok(())
    }
}

pub struct ComboPlugin;

impl ScorePlugin for ComboPlugin {
    fn display_name(&self) -> &str {
        "Combo Calculator"
    }

    fn run(&self, score: &Score) -> Result<String, PluginError> {
        Ok(ComboCalculator::calculate(score).to_string())
    }
}
