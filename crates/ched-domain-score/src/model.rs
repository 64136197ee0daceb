use crate::events::{BpmChange, EventCollection, TimeSignatureChange};
use crate::notes::NoteCollection;
use ched_ports::types::{FileVersion, DEFAULT_TICKS_PER_BEAT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_BPM: f64 = 120.0;

fn default_ticks_per_beat() -> u32 {
    DEFAULT_TICKS_PER_BEAT
}

/// Version of the running crate, stamped on every book it writes.
pub fn current_version() -> FileVersion {
    FileVersion::parse(env!("CARGO_PKG_VERSION")).unwrap_or_default()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Score {
    #[serde(default = "default_ticks_per_beat")]
    pub ticks_per_beat: u32,
    pub notes: NoteCollection,
    pub events: EventCollection,
}

impl Default for Score {
    fn default() -> Self {
        Self::new(DEFAULT_TICKS_PER_BEAT)
    }
}

impl Score {
    /// An empty score with 4/4 and 120 BPM at tick 0.
    pub fn new(ticks_per_beat: u32) -> Self {
        Self {
            ticks_per_beat,
            notes: NoteCollection::default(),
            events: EventCollection {
                bpm_change_events: vec![BpmChange::new(0, DEFAULT_BPM)],
                time_signature_change_events: vec![TimeSignatureChange::common_time()],
                high_speed_change_events: Vec::new(),
            },
        }
    }

    /// Ticks in a 4/4 bar at this resolution.
    pub fn standard_bar_tick(&self) -> i64 {
        self.ticks_per_beat as i64 * 4
    }

    /// Rescales every note and event to a new resolution. Positions are
    /// truncated, so converting to a coarser grid can move off-grid notes.
    pub fn update_ticks_per_beat(&mut self, ticks_per_beat: u32) {
        if ticks_per_beat == self.ticks_per_beat || self.ticks_per_beat == 0 {
            self.ticks_per_beat = ticks_per_beat;
            return;
        }
        let factor = ticks_per_beat as f64 / self.ticks_per_beat as f64;
        self.notes.rescale(factor);
        self.events.rescale(factor);
        self.ticks_per_beat = ticks_per_beat;
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreBook {
    pub version: FileVersion,
    pub title: String,
    pub artist_name: String,
    pub effector: String,
    pub illustrator: String,
    pub volume: u32,
    pub bpm_max: u32,
    pub bpm_min: u32,
    pub dist_date: u32,
    pub level: u32,
    pub background_id: u32,
    pub score: Score,
    /// Per-plugin export settings, keyed by plugin name.
    pub export_args: BTreeMap<String, String>,
}

impl Default for ScoreBook {
    fn default() -> Self {
        Self {
            version: current_version(),
            title: String::new(),
            artist_name: String::new(),
            effector: String::new(),
            illustrator: String::new(),
            volume: 0,
            bpm_max: 0,
            bpm_min: 0,
            dist_date: 0,
            level: 0,
            background_id: 0,
            score: Score::default(),
            export_args: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Migration {
    DefaultTimeSignature,
    DefaultBpm,
    VersionStamp { from: FileVersion },
}

impl ScoreBook {
    pub fn new(ticks_per_beat: u32) -> Self {
        Self {
            score: Score::new(ticks_per_beat),
            ..Self::default()
        }
    }

    /// Brings a book loaded from an older file up to the current layout.
    /// Returns what was changed.
    pub fn migrate(&mut self) -> Vec<Migration> {
        let mut applied = Vec::new();
        let events = &mut self.score.events;

        if events.time_signature_change_events.is_empty() {
            events
                .time_signature_change_events
                .push(TimeSignatureChange::common_time());
            applied.push(Migration::DefaultTimeSignature);
        }

        if events.bpm_change_events.is_empty() {
            events
                .bpm_change_events
                .push(BpmChange::new(0, DEFAULT_BPM));
            applied.push(Migration::DefaultBpm);
        }

        let current = current_version();
        if self.version != current {
            applied.push(Migration::VersionStamp { from: self.version });
            self.version = current;
        }

        for migration in &applied {
            match migration {
                Migration::VersionStamp { from } => {
                    log::debug!("score book version {from} restamped as {current}")
                }
                other => log::warn!("score book migrated: {other:?}"),
            }
        }
        applied
    }

    pub fn is_compatible(version: FileVersion) -> bool {
        version.major <= current_version().major
    }
}
