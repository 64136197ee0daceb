use crate::events::BpmChange;
use ched_ports::types::{Seconds, Tick};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TempoError {
    #[error("initial BPM change was not found")]
    MissingInitialTempo,
    #[error("BPM must be a positive finite number (tick: {tick}, bpm: {bpm})")]
    InvalidBpm { tick: Tick, bpm: f64 },
}

/// A tempo segment and the wall-clock time at which it begins.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BpmDefinition {
    pub tick: Tick,
    pub bpm: f64,
    pub time: Seconds,
}

/// Converts between ticks and seconds under piecewise-constant tempo.
///
/// Tick results are truncated toward zero, so `tick -> time -> tick` can lose
/// a tick at sub-tick precision.
#[derive(Clone, Debug)]
pub struct TimeCalculator {
    ticks_per_beat: u32,
    // Sorted by tick; never empty, first entry is at tick 0.
    definitions: Vec<BpmDefinition>,
}

impl TimeCalculator {
    pub fn new<I>(ticks_per_beat: u32, bpms: I) -> Result<Self, TempoError>
    where
        I: IntoIterator<Item = BpmChange>,
    {
        let mut ordered: Vec<BpmChange> = bpms.into_iter().collect();
        ordered.sort_by_key(|change| change.tick);

        match ordered.first() {
            Some(first) if first.tick == 0 => {}
            _ => return Err(TempoError::MissingInitialTempo),
        }
        if let Some(bad) = ordered
            .iter()
            .find(|change| !(change.bpm.is_finite() && change.bpm > 0.0))
        {
            return Err(TempoError::InvalidBpm {
                tick: bad.tick,
                bpm: bad.bpm,
            });
        }

        let mut definitions = Vec::with_capacity(ordered.len());
        let mut time = 0.0;
        for (i, change) in ordered.iter().enumerate() {
            if i > 0 {
                let prev = &ordered[i - 1];
                time += duration(ticks_per_beat, prev.bpm, change.tick - prev.tick);
            }
            definitions.push(BpmDefinition {
                tick: change.tick,
                bpm: change.bpm,
                time,
            });
        }

        log::debug!(
            "time calculator built: {} tempo segments at {} ticks/beat",
            definitions.len(),
            ticks_per_beat
        );

        Ok(Self {
            ticks_per_beat,
            definitions,
        })
    }

    pub fn ticks_per_beat(&self) -> u32 {
        self.ticks_per_beat
    }

    pub fn bpm_definitions(&self) -> &[BpmDefinition] {
        &self.definitions
    }

    /// Ticks before 0 play back at the initial tempo and yield negative time.
    pub fn get_time_from_tick(&self, tick: Tick) -> Seconds {
        match self.definitions.iter().rev().find(|def| def.tick <= tick) {
            Some(def) => def.time + duration(self.ticks_per_beat, def.bpm, tick - def.tick),
            None => duration(self.ticks_per_beat, self.initial().bpm, tick),
        }
    }

    pub fn get_tick_from_time(&self, time: Seconds) -> Tick {
        match self.definitions.iter().rev().find(|def| def.time <= time) {
            Some(def) => def.tick + duration_in_tick(self.ticks_per_beat, def.bpm, time - def.time),
            None => duration_in_tick(self.ticks_per_beat, self.initial().bpm, time),
        }
    }

    /// Tempo in effect at `tick`.
    pub fn bpm_at(&self, tick: Tick) -> f64 {
        self.definitions
            .iter()
            .rev()
            .find(|def| def.tick <= tick)
            .unwrap_or(self.initial())
            .bpm
    }

    fn initial(&self) -> &BpmDefinition {
        &self.definitions[0]
    }
}

// ticks * (60 / bpm) / ticks_per_beat
fn duration(ticks_per_beat: u32, bpm: f64, ticks: Tick) -> Seconds {
    (ticks * 60) as f64 / bpm / ticks_per_beat as f64
}

// ticks_per_beat * seconds * (bpm / 60)
fn duration_in_tick(ticks_per_beat: u32, bpm: f64, seconds: Seconds) -> Tick {
    (ticks_per_beat as f64 * seconds * bpm / 60.0) as Tick
}
