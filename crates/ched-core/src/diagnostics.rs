use crate::timeline::{Location, Timeline, TimelineError};
use ched_domain_score::{Score, TimedNote};
use ched_ports::storage::StorageError;
use ched_ports::types::{Seconds, Tick};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SignatureEntry {
    pub start_bar_index: i64,
    pub start_tick: Tick,
    pub numerator: u32,
    pub denominator: i64,
    pub bar_length: Tick,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    Bt,
    Fx,
    Laser,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NoteEntry {
    pub kind: NoteKind,
    pub lane_index: u8,
    pub start: Location,
    pub end: Location,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimelineReport {
    pub ticks_per_beat: u32,
    pub signatures: Vec<SignatureEntry>,
    pub tempos: Vec<Location>,
    pub notes: Vec<NoteEntry>,
    /// End of the last note, or 0 for an empty chart.
    pub length_seconds: Seconds,
}

/// Resolves every signature, tempo change and note of `score` to bar
/// positions and seconds. Notes are listed by start tick.
pub fn timeline_report(score: &Score) -> Result<TimelineReport, TimelineError> {
    let timeline = Timeline::build(score)?;
    let tpb = score.ticks_per_beat;

    let signatures = timeline
        .bars()
        .time_signatures()
        .iter()
        .map(|item| SignatureEntry {
            start_bar_index: item.start_bar_index,
            start_tick: item.start_tick(),
            numerator: item.time_signature.numerator,
            denominator: item.time_signature.denominator(),
            bar_length: item.time_signature.bar_length(tpb),
        })
        .collect();

    let tempos = timeline
        .time()
        .bpm_definitions()
        .iter()
        .map(|def| timeline.locate_tick(def.tick))
        .collect::<Result<Vec<_>, _>>()?;

    let notes = &score.notes;
    let tagged = notes
        .bts
        .iter()
        .map(|n| (NoteKind::Bt, n as &dyn TimedNote))
        .chain(notes.fxs.iter().map(|n| (NoteKind::Fx, n as &dyn TimedNote)))
        .chain(notes.lasers.iter().map(|n| (NoteKind::Laser, n as &dyn TimedNote)));

    let mut entries = Vec::with_capacity(notes.len());
    for (kind, note) in tagged {
        entries.push(NoteEntry {
            kind,
            lane_index: note.lane_index(),
            start: timeline.locate_tick(note.start_tick())?,
            end: timeline.locate_tick(note.end_tick())?,
        });
    }
    entries.sort_by_key(|entry| entry.start.tick);

    let length_seconds = entries
        .iter()
        .map(|entry| entry.end.seconds)
        .fold(0.0, f64::max);

    Ok(TimelineReport {
        ticks_per_beat: tpb,
        signatures,
        tempos,
        notes: entries,
        length_seconds,
    })
}

pub fn write_report(path: &Path, report: &TimelineReport) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
    }
    let data = serde_json::to_vec_pretty(report).map_err(|e| StorageError::Serde(e.to_string()))?;
    fs::write(path, data).map_err(|e| StorageError::Io(e.to_string()))
}
