use crate::data_line::{write_lines_with_offset, DataLineError, SusDataLine};
use crate::identifier::{
    base36_alphabet, enumerate_identifiers, IdentifierAllocationManager, IdentifierError,
};
use crate::line_data::{generate_line_data, to_lane_width_string, to_position_char, LineDataError};
use ched_domain_score::{
    BarIndexCalculator, BarPosition, LaserNote, ScoreBook, TimeSignatureError, TimedNote,
};
use ched_ports::config::SusArgs;
use ched_ports::types::Tick;
use std::collections::HashMap;
use std::hash::Hash;
use std::io::Write;

/// `#BPMxx` keys are two base-36 digits and `00` is reserved.
pub const MAX_BPM_DEFINITIONS: usize = 36 * 36 - 1;

const BT_WIDTH: u32 = 1;
const FX_WIDTH: u32 = 2;

#[derive(thiserror::Error, Debug)]
pub enum SusExportError {
    #[error(transparent)]
    TimeSignature(#[from] TimeSignatureError),
    #[error("invalid line data: {0}")]
    LineData(#[from] LineDataError),
    #[error(transparent)]
    Identifier(#[from] IdentifierError),
    #[error("bar index {0} cannot be written in a data line")]
    BarIndexOutOfRange(i64),
    #[error("{0} distinct BPM values exceed the 1295 definitions available")]
    TooManyBpmDefinitions(usize),
    #[error("invalid note: {0}")]
    InvalidNote(String),
    #[error("io error: {0}")]
    Io(String),
}

impl From<DataLineError> for SusExportError {
    fn from(err: DataLineError) -> Self {
        match err {
            DataLineError::BarIndexOutOfRange(bar_index) => Self::BarIndexOutOfRange(bar_index),
            DataLineError::Io(message) => Self::Io(message),
        }
    }
}

impl From<std::io::Error> for SusExportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// A note endpoint waiting to be placed on the bar grid.
#[derive(Clone, Debug)]
struct NoteItem {
    tick: Tick,
    lane: u8,
    data: String,
}

impl NoteItem {
    fn new(tick: Tick, lane: u8, data: String) -> Self {
        Self { tick, lane, data }
    }
}

struct PlacedItem {
    position: BarPosition,
    item: NoteItem,
}

pub struct SusExporter<'a> {
    book: &'a ScoreBook,
    args: SusArgs,
    bar_index_calculator: BarIndexCalculator,
}

impl<'a> SusExporter<'a> {
    pub fn new(book: &'a ScoreBook, args: SusArgs) -> Result<Self, SusExportError> {
        let score = &book.score;
        let bar_index_calculator = BarIndexCalculator::new(
            score.ticks_per_beat,
            score.events.time_signature_change_events.iter().copied(),
        )?;
        Ok(Self {
            book,
            args,
            bar_index_calculator,
        })
    }

    pub fn args(&self) -> &SusArgs {
        &self.args
    }

    fn bar_index_offset(&self) -> i64 {
        if self.args.has_padding_bar {
            1
        } else {
            0
        }
    }

    /// Writes the complete document. Nothing is written past the first error.
    pub fn export<W: Write>(&self, mut writer: W) -> Result<(), SusExportError> {
        let w = &mut writer;
        self.write_header(w)?;

        self.write_block(w, self.time_signature_lines())?;
        writeln!(w)?;

        let (definitions, bpm_lines) = self.bpm_lines()?;
        for (key, bpm) in &definitions {
            writeln!(w, "#BPM{key}: {bpm}")?;
        }
        self.write_block(w, bpm_lines)?;
        writeln!(w)?;

        writeln!(w, "#TIL00: \"{}\"", self.high_speed_definitions()?)?;
        writeln!(w, "#HISPEED 00")?;
        writeln!(w, "#MEASUREHS 00")?;
        writeln!(w)?;

        let short_notes = self.short_note_lines()?;
        let short_count = short_notes.len();
        self.write_block(w, short_notes)?;
        writeln!(w)?;

        self.write_block(w, self.slam_lines()?)?;
        writeln!(w)?;

        let mut identifiers = IdentifierAllocationManager::new();
        let holds = self.hold_lines(&mut identifiers)?;
        let hold_count = holds.len();
        self.write_block(w, holds)?;
        writeln!(w)?;

        identifiers.clear();
        let lasers = self.laser_lines(&mut identifiers)?;
        let laser_count = lasers.len();
        self.write_block(w, lasers)?;

        w.flush()?;
        log::info!(
            "sus export finished: {short_count} short note lines, {hold_count} hold lines, {laser_count} laser lines"
        );
        Ok(())
    }

    fn write_header<W: Write>(&self, w: &mut W) -> Result<(), SusExportError> {
        let book = self.book;
        let args = &self.args;

        writeln!(w, "This file was generated by Ched {}.", env!("CARGO_PKG_VERSION"))?;
        writeln!(w, "#TITLE \"{}\"", book.title)?;
        writeln!(w, "#ARTIST \"{}\"", book.artist_name)?;
        writeln!(w, "#DESIGNER \"{}\"", book.effector)?;
        if args.extended_difficulty.is_empty() {
            writeln!(w, "#DIFFICULTY {}", args.play_difficulty.as_index())?;
        } else {
            writeln!(
                w,
                "#DIFFICULTY {}:{}",
                args.play_difficulty.as_index(),
                args.extended_difficulty
            )?;
        }
        writeln!(w, "#PLAYLEVEL {}", args.play_level)?;
        writeln!(w, "#SONGID \"{}\"", args.song_id)?;
        writeln!(w, "#WAVE \"{}\"", args.sound_file_name)?;
        writeln!(w, "#WAVEOFFSET {}", args.sound_offset)?;
        writeln!(w, "#JACKET \"{}\"", args.jacket_file_path)?;
        writeln!(w)?;

        if !args.additional_data.is_empty() {
            writeln!(w, "{}", args.additional_data)?;
            writeln!(w)?;
        }

        writeln!(w, "#REQUEST \"ticks_per_beat {}\"", book.score.ticks_per_beat)?;
        writeln!(w)?;
        Ok(())
    }

    fn write_block<W: Write>(&self, w: &mut W, lines: Vec<SusDataLine>) -> Result<(), SusExportError> {
        write_lines_with_offset(w, lines, self.bar_index_offset())?;
        Ok(())
    }

    fn time_signature_lines(&self) -> Vec<SusDataLine> {
        self.bar_index_calculator
            .time_signatures()
            .iter()
            .map(|item| {
                SusDataLine::new(
                    item.start_bar_index,
                    "02",
                    item.time_signature.beats_per_bar().to_string(),
                )
                .initial(item.start_bar_index == 0)
            })
            .collect()
    }

    /// `#BPMxx` definitions, one per distinct value, and the `#BBB08` lines
    /// referencing them. Changes at tick 0 form their own line so the padding
    /// bar never shifts the initial tempo.
    fn bpm_lines(&self) -> Result<(Vec<(String, f64)>, Vec<SusDataLine>), SusExportError> {
        let mut changes = self.book.score.events.bpm_change_events.clone();
        changes.sort_by_key(|change| change.tick);

        let mut values: Vec<f64> = Vec::new();
        let mut indexed = Vec::with_capacity(changes.len());
        for change in &changes {
            let index = match values.iter().position(|v| v.to_bits() == change.bpm.to_bits()) {
                Some(index) => index,
                None => {
                    values.push(change.bpm);
                    values.len() - 1
                }
            };
            let position = self.bar_index_calculator.get_bar_position_from_tick(change.tick)?;
            indexed.push((change.tick == 0, position, index));
        }

        if values.len() > MAX_BPM_DEFINITIONS {
            return Err(SusExportError::TooManyBpmDefinitions(values.len()));
        }
        let keys: Vec<String> = enumerate_identifiers(2, &base36_alphabet())
            .into_iter()
            .skip(1)
            .take(values.len())
            .collect();

        let mut lines = Vec::new();
        for (is_initial, group) in group_in_order(indexed, |(initial, _, _)| *initial) {
            for (bar_index, in_bar) in group_in_order(group, |(_, position, _)| position.bar_index) {
                let bar_length = self.bar_index_calculator.bar_length(bar_index)?;
                let items: Vec<(Tick, &str)> = in_bar
                    .iter()
                    .map(|(_, position, index)| (position.tick_offset, keys[*index].as_str()))
                    .collect();
                let data = generate_line_data(bar_length, &items)?;
                lines.push(SusDataLine::new(bar_index, "08", data).initial(is_initial));
            }
        }

        let definitions = keys.into_iter().zip(values).collect();
        Ok((definitions, lines))
    }

    fn high_speed_definitions(&self) -> Result<String, SusExportError> {
        let offset = self.bar_index_offset();
        let speeds = self
            .book
            .score
            .events
            .high_speed_change_events
            .iter()
            .map(|change| -> Result<String, SusExportError> {
                let position = self.bar_index_calculator.get_bar_position_from_tick(change.tick)?;
                let bar_index = position.bar_index + if change.tick == 0 { 0 } else { offset };
                Ok(format!(
                    "{}'{}:{}",
                    bar_index, position.tick_offset, change.speed_ratio
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(speeds.join(", "))
    }

    /// BT chips as `1` + width, FX chips as `2` + width.
    fn short_note_lines(&self) -> Result<Vec<SusDataLine>, SusExportError> {
        let notes = &self.book.score.notes;
        let mut items = Vec::new();
        for note in notes.bts.iter().filter(|n| n.is_chip()) {
            items.push(NoteItem::new(
                note.start_tick,
                lane_of(note)?,
                format!("1{}", to_lane_width_string(BT_WIDTH)),
            ));
        }
        for note in notes.fxs.iter().filter(|n| n.is_chip()) {
            items.push(NoteItem::new(
                note.start_tick,
                lane_of(note)?,
                format!("2{}", to_lane_width_string(FX_WIDTH)),
            ));
        }
        items.sort_by_key(|item| (item.tick, item.lane));
        self.short_lines("1", items)
    }

    /// Laser slams: `1` straight, `3` to the left, `4` to the right, followed
    /// by the landing position.
    fn slam_lines(&self) -> Result<Vec<SusDataLine>, SusExportError> {
        let mut items = Vec::new();
        for laser in self.book.score.notes.lasers.iter().filter(|n| n.is_slam()) {
            let direction = if laser.end_position > laser.start_position {
                '4'
            } else if laser.end_position < laser.start_position {
                '3'
            } else {
                '1'
            };
            items.push(NoteItem::new(
                laser.start_tick,
                lane_of(laser)?,
                format!("{direction}{}", to_position_char(laser.end_position)),
            ));
        }
        items.sort_by_key(|item| (item.tick, item.lane));
        self.short_lines("5", items)
    }

    fn hold_lines(
        &self,
        identifiers: &mut IdentifierAllocationManager,
    ) -> Result<Vec<SusDataLine>, SusExportError> {
        let notes = &self.book.score.notes;
        let mut holds: Vec<(&dyn TimedNote, u32)> = notes
            .bts
            .iter()
            .filter(|n| !n.is_chip())
            .map(|n| (n as &dyn TimedNote, BT_WIDTH))
            .chain(
                notes
                    .fxs
                    .iter()
                    .filter(|n| !n.is_chip())
                    .map(|n| (n as &dyn TimedNote, FX_WIDTH)),
            )
            .collect();
        holds.sort_by_key(|(note, _)| note.start_tick());

        let mut lines = Vec::new();
        for (note, width) in holds {
            check_duration(note)?;
            let key = identifiers.allocate(note.start_tick(), note.duration())?;
            let lane = lane_of(note)?;
            let width = to_lane_width_string(width);
            let items = vec![
                NoteItem::new(note.start_tick(), lane, format!("1{width}")),
                NoteItem::new(note.end_tick(), lane, format!("2{width}")),
            ];
            lines.extend(self.long_lines("2", key, items)?);
        }
        Ok(lines)
    }

    fn laser_lines(
        &self,
        identifiers: &mut IdentifierAllocationManager,
    ) -> Result<Vec<SusDataLine>, SusExportError> {
        let mut lasers: Vec<&LaserNote> = self
            .book
            .score
            .notes
            .lasers
            .iter()
            .filter(|n| !n.is_slam())
            .collect();
        lasers.sort_by_key(|laser| laser.start_tick);

        let mut lines = Vec::new();
        for laser in lasers {
            check_duration(laser)?;
            let key = identifiers.allocate(laser.start_tick, laser.duration)?;
            let lane = lane_of(laser)?;
            let items = vec![
                NoteItem::new(
                    laser.start_tick,
                    lane,
                    format!("1{}", to_position_char(laser.start_position)),
                ),
                NoteItem::new(
                    laser.end_tick(),
                    lane,
                    format!("2{}", to_position_char(laser.end_position)),
                ),
            ];
            lines.extend(self.long_lines("3", key, items)?);
        }
        Ok(lines)
    }

    fn place(&self, items: Vec<NoteItem>) -> Result<Vec<PlacedItem>, SusExportError> {
        items
            .into_iter()
            .map(|item| -> Result<PlacedItem, SusExportError> {
                let position = self.bar_index_calculator.get_bar_position_from_tick(item.tick)?;
                Ok(PlacedItem { position, item })
            })
            .collect()
    }

    /// Items sharing a bar and lane go on one line, except that items at the
    /// same offset are spread over as many lines as the largest pile-up.
    fn short_lines(&self, note_type: &str, items: Vec<NoteItem>) -> Result<Vec<SusDataLine>, SusExportError> {
        let mut lines = Vec::new();
        for (bar_index, in_bar) in group_in_order(self.place(items)?, |p| p.position.bar_index) {
            let bar_length = self.bar_index_calculator.bar_length(bar_index)?;
            for (lane, in_lane) in group_in_order(in_bar, |p| p.item.lane) {
                let offset_groups = group_in_order(in_lane, |p| p.position.tick_offset);
                let depth = offset_groups
                    .iter()
                    .map(|(_, group)| group.len())
                    .max()
                    .unwrap_or(0);

                for occurrence in 0..depth {
                    let line_items: Vec<(Tick, &str)> = offset_groups
                        .iter()
                        .filter_map(|(offset, group)| {
                            group.get(occurrence).map(|p| (*offset, p.item.data.as_str()))
                        })
                        .collect();
                    let data = generate_line_data(bar_length, &line_items)?;
                    lines.push(SusDataLine::new(
                        bar_index,
                        format!("{note_type}{lane:x}"),
                        data,
                    ));
                }
            }
        }
        Ok(lines)
    }

    fn long_lines(
        &self,
        note_type: &str,
        key: char,
        items: Vec<NoteItem>,
    ) -> Result<Vec<SusDataLine>, SusExportError> {
        let mut lines = Vec::new();
        for (bar_index, in_bar) in group_in_order(self.place(items)?, |p| p.position.bar_index) {
            let bar_length = self.bar_index_calculator.bar_length(bar_index)?;
            for (lane, in_lane) in group_in_order(in_bar, |p| p.item.lane) {
                let line_items: Vec<(Tick, &str)> = in_lane
                    .iter()
                    .map(|p| (p.position.tick_offset, p.item.data.as_str()))
                    .collect();
                let data = generate_line_data(bar_length, &line_items)?;
                lines.push(SusDataLine::new(
                    bar_index,
                    format!("{note_type}{lane:x}{key}"),
                    data,
                ));
            }
        }
        Ok(lines)
    }
}

fn lane_of(note: &dyn TimedNote) -> Result<u8, SusExportError> {
    note.track().map(|track| track.id()).ok_or_else(|| {
        SusExportError::InvalidNote(format!(
            "lane {} at tick {} has no track",
            note.lane_index(),
            note.start_tick()
        ))
    })
}

fn check_duration(note: &dyn TimedNote) -> Result<(), SusExportError> {
    if note.duration() < 0 {
        return Err(SusExportError::InvalidNote(format!(
            "negative duration {} at tick {}",
            note.duration(),
            note.start_tick()
        )));
    }
    Ok(())
}

/// Groups by key, keeping groups in order of first appearance and items in
/// input order. Data lines are emitted in group order, so a lane first seen
/// at an earlier tick keeps its line ahead of lanes with smaller ids.
fn group_in_order<T, K, F>(items: Vec<T>, key: F) -> Vec<(K, Vec<T>)>
where
    K: Copy + Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<T>)> = Vec::new();
    for item in items {
        let k = key(&item);
        match index.get(&k) {
            Some(&i) => groups[i].1.push(item),
            None => {
                index.insert(k, groups.len());
                groups.push((k, vec![item]));
            }
        }
    }
    groups
}
