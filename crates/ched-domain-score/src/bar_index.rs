use crate::events::TimeSignatureChange;
use ched_ports::types::Tick;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidSignatureReason {
    /// The change does not start on a bar line of the preceding signature.
    Misaligned,
    /// Another change already exists at the same tick.
    Duplicated,
    /// The signature's bar length truncates to zero ticks.
    EmptyBar,
}

impl fmt::Display for InvalidSignatureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            InvalidSignatureReason::Misaligned => "does not align at the head of a bar",
            InvalidSignatureReason::Duplicated => "duplicated",
            InvalidSignatureReason::EmptyBar => "bar length is zero",
        };
        f.write_str(text)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeSignatureError {
    #[error("time signature change {reason} (tick: {tick})")]
    InvalidTimeSignature {
        tick: Tick,
        reason: InvalidSignatureReason,
    },
    #[error("no time signature applies to tick {0}")]
    NoSignatureForTick(Tick),
    #[error("no time signature applies to bar {0}")]
    NoSignatureForBar(i64),
}

impl TimeSignatureError {
    /// Tick of the offending change, for invalid signature lists.
    pub fn invalid_tick(&self) -> Option<Tick> {
        match self {
            TimeSignatureError::InvalidTimeSignature { tick, .. } => Some(*tick),
            _ => None,
        }
    }
}

/// Position of a tick within the bar grid. Both fields are 0-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BarPosition {
    pub bar_index: i64,
    pub tick_offset: Tick,
}

impl BarPosition {
    pub fn new(bar_index: i64, tick_offset: Tick) -> Self {
        Self {
            bar_index,
            tick_offset,
        }
    }
}

/// A time signature change together with the bar it opens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignatureItem {
    pub start_bar_index: i64,
    pub time_signature: TimeSignatureChange,
}

impl TimeSignatureItem {
    pub fn start_tick(&self) -> Tick {
        self.time_signature.tick
    }
}

/// Maps ticks to bar positions under piecewise-constant time signatures.
///
/// Built once from a snapshot of the score's signature list; any edit to the
/// list requires building a new calculator.
#[derive(Clone, Debug)]
pub struct BarIndexCalculator {
    ticks_per_beat: u32,
    // Sorted by tick.
    items: Vec<TimeSignatureItem>,
}

impl BarIndexCalculator {
    pub fn new<I>(ticks_per_beat: u32, signatures: I) -> Result<Self, TimeSignatureError>
    where
        I: IntoIterator<Item = TimeSignatureChange>,
    {
        let mut ordered: Vec<TimeSignatureChange> = signatures.into_iter().collect();
        ordered.sort_by_key(|sig| sig.tick);

        let mut items: Vec<TimeSignatureItem> = Vec::with_capacity(ordered.len());
        let mut pos: Tick = 0;
        let mut bar_index: i64 = 0;

        for (i, sig) in ordered.iter().enumerate() {
            if pos != sig.tick {
                return Err(invalid(sig.tick, InvalidSignatureReason::Misaligned));
            }
            if items.last().is_some_and(|item| item.start_tick() == pos) {
                return Err(invalid(sig.tick, InvalidSignatureReason::Duplicated));
            }

            let bar_length = sig.bar_length(ticks_per_beat);
            if bar_length <= 0 {
                return Err(invalid(sig.tick, InvalidSignatureReason::EmptyBar));
            }

            items.push(TimeSignatureItem {
                start_bar_index: bar_index,
                time_signature: *sig,
            });

            if let Some(next) = ordered.get(i + 1) {
                let bars = (next.tick - pos) / bar_length;
                pos += bars * bar_length;
                bar_index += bars;
            }
        }

        log::debug!(
            "bar index calculator built: {} signatures at {} ticks/beat",
            items.len(),
            ticks_per_beat
        );

        Ok(Self {
            ticks_per_beat,
            items,
        })
    }

    pub fn ticks_per_beat(&self) -> u32 {
        self.ticks_per_beat
    }

    /// Valid time signature changes, sorted by tick.
    pub fn time_signatures(&self) -> &[TimeSignatureItem] {
        &self.items
    }

    pub fn get_bar_position_from_tick(&self, tick: Tick) -> Result<BarPosition, TimeSignatureError> {
        let item = self
            .items
            .iter()
            .rev()
            .find(|item| item.start_tick() <= tick)
            .ok_or(TimeSignatureError::NoSignatureForTick(tick))?;

        let bar_length = item.time_signature.bar_length(self.ticks_per_beat);
        let ticks_from_signature = tick - item.start_tick();
        let bars_count = ticks_from_signature / bar_length;
        Ok(BarPosition {
            bar_index: item.start_bar_index + bars_count,
            tick_offset: ticks_from_signature - bars_count * bar_length,
        })
    }

    pub fn get_time_signature_from_bar_index(
        &self,
        bar_index: i64,
    ) -> Result<&TimeSignatureChange, TimeSignatureError> {
        self.item_for_bar(bar_index).map(|item| &item.time_signature)
    }

    /// Ticks in the given bar.
    pub fn bar_length(&self, bar_index: i64) -> Result<Tick, TimeSignatureError> {
        self.get_time_signature_from_bar_index(bar_index)
            .map(|sig| sig.bar_length(self.ticks_per_beat))
    }

    /// Inverse of [`Self::get_bar_position_from_tick`]. The offset is not
    /// bounded by the bar length, so an overlong offset spills into later bars
    /// of the same signature.
    pub fn get_tick_from_bar_position(&self, position: BarPosition) -> Result<Tick, TimeSignatureError> {
        let item = self.item_for_bar(position.bar_index)?;
        let bar_length = item.time_signature.bar_length(self.ticks_per_beat);
        Ok(item.start_tick()
            + (position.bar_index - item.start_bar_index) * bar_length
            + position.tick_offset)
    }

    fn item_for_bar(&self, bar_index: i64) -> Result<&TimeSignatureItem, TimeSignatureError> {
        self.items
            .iter()
            .rev()
            .find(|item| item.start_bar_index <= bar_index)
            .ok_or(TimeSignatureError::NoSignatureForBar(bar_index))
    }
}

fn invalid(tick: Tick, reason: InvalidSignatureReason) -> TimeSignatureError {
    TimeSignatureError::InvalidTimeSignature { tick, reason }
}
