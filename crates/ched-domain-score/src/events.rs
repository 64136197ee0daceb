use ched_ports::types::Tick;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BpmChange {
    pub tick: Tick,
    pub bpm: f64,
    /// Editor flag kept so books round-trip; timing ignores it.
    #[serde(default)]
    pub is_stop: bool,
}

impl BpmChange {
    pub fn new(tick: Tick, bpm: f64) -> Self {
        Self {
            tick,
            bpm,
            is_stop: false,
        }
    }
}

/// A time signature taking effect at `tick`; the denominator is `2^denominator_exponent`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSignatureChange {
    pub tick: Tick,
    pub numerator: u32,
    pub denominator_exponent: u32,
}

impl TimeSignatureChange {
    pub fn new(tick: Tick, numerator: u32, denominator_exponent: u32) -> Self {
        Self {
            tick,
            numerator,
            denominator_exponent,
        }
    }

    /// 4/4 at the head of the score.
    pub fn common_time() -> Self {
        Self::new(0, 4, 2)
    }

    /// Returns 0 when the exponent does not fit a positive `i64`.
    pub fn denominator(&self) -> i64 {
        1i64.checked_shl(self.denominator_exponent)
            .filter(|d| *d > 0)
            .unwrap_or(0)
    }

    /// Ticks in one bar of this signature. Integer division truncates, so a
    /// signature that does not divide the whole-note length evenly loses the
    /// remainder; 0 means the signature cannot hold a single tick, or that
    /// the bar does not fit in a `Tick`.
    pub fn bar_length(&self, ticks_per_beat: u32) -> Tick {
        let denominator = self.denominator();
        if denominator == 0 {
            return 0;
        }
        (ticks_per_beat as Tick * 4)
            .checked_mul(self.numerator as Tick)
            .map_or(0, |ticks| ticks / denominator)
    }

    /// Bar length in quarter notes, as written to `#BBB02` lines.
    pub fn beats_per_bar(&self) -> f32 {
        let denominator = self.denominator();
        if denominator == 0 {
            return 0.0;
        }
        4f32 * self.numerator as f32 / denominator as f32
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HighSpeedChange {
    pub tick: Tick,
    pub speed_ratio: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventCollection {
    pub bpm_change_events: Vec<BpmChange>,
    pub time_signature_change_events: Vec<TimeSignatureChange>,
    pub high_speed_change_events: Vec<HighSpeedChange>,
}

impl EventCollection {
    pub(crate) fn rescale(&mut self, factor: f64) {
        for event in &mut self.bpm_change_events {
            event.tick = scale_tick(event.tick, factor);
        }
        for event in &mut self.time_signature_change_events {
            event.tick = scale_tick(event.tick, factor);
        }
        for event in &mut self.high_speed_change_events {
            event.tick = scale_tick(event.tick, factor);
        }
    }
}

pub(crate) fn scale_tick(tick: Tick, factor: f64) -> Tick {
    (tick as f64 * factor) as Tick
}
