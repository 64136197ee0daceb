use std::io::Write;

/// Bar indices written in a data line are three digits wide.
pub const MEASURE_BLOCK: i64 = 1000;

#[derive(thiserror::Error, Debug)]
pub enum DataLineError {
    #[error("bar index {0} cannot be written in a data line")]
    BarIndexOutOfRange(i64),
    #[error("io error: {0}")]
    Io(String),
}

/// One `#BBBcc: data` line whose bar index is resolved at write time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SusDataLine {
    pub bar_index: i64,
    /// Events at the head of the score ignore the padding bar offset.
    pub is_initial_event: bool,
    pub channel: String,
    pub data: String,
}

impl SusDataLine {
    pub fn new(bar_index: i64, channel: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            bar_index,
            is_initial_event: false,
            channel: channel.into(),
            data: data.into(),
        }
    }

    pub fn initial(mut self, is_initial_event: bool) -> Self {
        self.is_initial_event = is_initial_event;
        self
    }

    pub fn resolve_with_bar_index(&self, bar_index: i64) -> Result<String, DataLineError> {
        if !(0..MEASURE_BLOCK).contains(&bar_index) {
            return Err(DataLineError::BarIndexOutOfRange(bar_index));
        }
        Ok(format!("#{:03}{}: {}", bar_index, self.channel, self.data))
    }
}

/// Writes lines grouped into blocks of 1000 bars. Every block past the first
/// is preceded by `#MEASUREBS n`, and `#MEASUREBS 0` closes the section if
/// any shift was emitted.
pub fn write_lines_with_offset<W: Write>(
    writer: &mut W,
    lines: Vec<SusDataLine>,
    bar_index_offset: i64,
) -> Result<(), DataLineError> {
    let actual_bar_index = |line: &SusDataLine| {
        line.bar_index + if line.is_initial_event { 0 } else { bar_index_offset }
    };

    let mut lines: Vec<(i64, SusDataLine)> = lines
        .into_iter()
        .map(|line| (actual_bar_index(&line), line))
        .collect();
    if let Some((bar_index, _)) = lines.iter().find(|(bar_index, _)| *bar_index < 0) {
        return Err(DataLineError::BarIndexOutOfRange(*bar_index));
    }
    lines.sort_by_key(|(bar_index, _)| bar_index / MEASURE_BLOCK);

    let mut current_block = 0;
    let mut shifted = false;
    for (bar_index, line) in &lines {
        let block = bar_index / MEASURE_BLOCK;
        if block != current_block {
            current_block = block;
            shifted = true;
            writeln!(writer, "#MEASUREBS {}", block * MEASURE_BLOCK).map_err(io_error)?;
        }
        let text = line.resolve_with_bar_index(bar_index % MEASURE_BLOCK)?;
        writeln!(writer, "{text}").map_err(io_error)?;
    }

    if shifted {
        writeln!(writer, "#MEASUREBS 0").map_err(io_error)?;
    }
    Ok(())
}

fn io_error(err: std::io::Error) -> DataLineError {
    DataLineError::Io(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_three_digit_bar_index() {
        let line = SusDataLine::new(7, "02", "4");
        assert_eq!(line.resolve_with_bar_index(7).unwrap(), "#00702: 4");
        assert!(matches!(
            line.resolve_with_bar_index(1000),
            Err(DataLineError::BarIndexOutOfRange(1000))
        ));
        assert!(line.resolve_with_bar_index(-1).is_err());
    }
}
