use ched_domain_score::{
    BarIndexCalculator, BarPosition, Score, TempoError, TimeCalculator, TimeSignatureError,
};
use ched_ports::types::{Seconds, Tick};
use serde::Serialize;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TimelineError {
    #[error("tempo error: {0}")]
    Tempo(#[from] TempoError),
    #[error("time signature error: {0}")]
    TimeSignature(#[from] TimeSignatureError),
}

/// A tick resolved against both the bar grid and the tempo map.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Location {
    pub tick: Tick,
    pub bar_index: i64,
    pub tick_offset: Tick,
    pub seconds: Seconds,
    pub bpm: f64,
}

/// Both calculators built from one snapshot of a score.
#[derive(Clone, Debug)]
pub struct Timeline {
    bars: BarIndexCalculator,
    time: TimeCalculator,
}

impl Timeline {
    pub fn build(score: &Score) -> Result<Self, TimelineError> {
        let events = &score.events;
        let time = TimeCalculator::new(score.ticks_per_beat, events.bpm_change_events.iter().copied())?;
        let bars = BarIndexCalculator::new(
            score.ticks_per_beat,
            events.time_signature_change_events.iter().copied(),
        )?;
        Ok(Self { bars, time })
    }

    pub fn bars(&self) -> &BarIndexCalculator {
        &self.bars
    }

    pub fn time(&self) -> &TimeCalculator {
        &self.time
    }

    pub fn locate_tick(&self, tick: Tick) -> Result<Location, TimelineError> {
        let BarPosition {
            bar_index,
            tick_offset,
        } = self.bars.get_bar_position_from_tick(tick)?;
        Ok(Location {
            tick,
            bar_index,
            tick_offset,
            seconds: self.time.get_time_from_tick(tick),
            bpm: self.time.bpm_at(tick),
        })
    }

    /// The reported tick is truncated, so `seconds` is recomputed from it.
    pub fn locate_time(&self, seconds: Seconds) -> Result<Location, TimelineError> {
        self.locate_tick(self.time.get_tick_from_time(seconds))
    }
}
