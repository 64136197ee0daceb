use ched_domain_score::{BpmChange, Score, DEFAULT_BPM};
use ched_ports::types::Tick;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Above this tempo long notes tick half as often.
pub const FAST_BPM_THRESHOLD: f64 = 255.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboDetails {
    pub chip: u32,
    pub long: u32,
    pub vol: u32,
}

impl ComboDetails {
    pub fn total(&self) -> u32 {
        self.chip + self.long + self.vol
    }
}

impl fmt::Display for ComboDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total Combo: {}", self.total())?;
        writeln!(f, "CHIP: {}", self.chip)?;
        writeln!(f, "LONG: {}", self.long)?;
        writeln!(f, "VOL: {}", self.vol)
    }
}

/// Counts the combo a chart yields.
///
/// Chips and slams count once. Holds and lasers count once per combo tick,
/// a sixteenth of a 4/4 bar (an eighth at fast tempos), measured from the
/// note's head using the tempo in effect at the running position.
pub struct ComboCalculator<'a> {
    bar_tick: Tick,
    bpm_changes: Vec<&'a BpmChange>,
}

impl<'a> ComboCalculator<'a> {
    pub fn new(score: &'a Score) -> Self {
        let mut bpm_changes: Vec<&BpmChange> = score.events.bpm_change_events.iter().collect();
        bpm_changes.sort_by_key(|change| change.tick);
        Self {
            bar_tick: score.standard_bar_tick(),
            bpm_changes,
        }
    }

    pub fn calculate(score: &Score) -> ComboDetails {
        let calculator = ComboCalculator::new(score);
        let notes = &score.notes;

        let chip = notes.chips().count();
        let long: usize = notes
            .holds()
            .map(|hold| calculator.combo_ticks(hold.start_tick(), hold.duration()).len())
            .sum();
        let laser_ticks: usize = notes
            .lasers
            .iter()
            .filter(|laser| !laser.is_slam())
            .map(|laser| calculator.combo_ticks(laser.start_tick, laser.duration).len())
            .sum();
        let slams = notes.lasers.iter().filter(|laser| laser.is_slam()).count();

        ComboDetails {
            chip: chip as u32,
            long: long as u32,
            vol: (laser_ticks + slams) as u32,
        }
    }

    /// Offsets from `start_tick` at which a long note adds to the combo. The
    /// last offset may overshoot the note's tail.
    pub fn combo_ticks(&self, start_tick: Tick, duration: Tick) -> BTreeSet<Tick> {
        let mut ticks = BTreeSet::new();
        let mut head: Tick = 0;
        let mut bpm_index = 0;

        while head < duration {
            while self
                .bpm_changes
                .get(bpm_index + 1)
                .is_some_and(|next| start_tick + head >= next.tick)
            {
                bpm_index += 1;
            }
            let bpm = self
                .bpm_changes
                .get(bpm_index)
                .map_or(DEFAULT_BPM, |change| change.bpm);
            head += self.interval(bpm);
            ticks.insert(head);
        }
        ticks
    }

    // Never 0, so very coarse resolutions still terminate.
    fn interval(&self, bpm: f64) -> Tick {
        let divider = if bpm < FAST_BPM_THRESHOLD { 16 } else { 8 };
        (self.bar_tick / divider).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_halves_at_fast_tempos() {
        let score = Score::new(480);
        let calculator = ComboCalculator::new(&score);
        assert_eq!(calculator.interval(254.9), 120);
        assert_eq!(calculator.interval(255.0), 240);
    }

    #[test]
    fn tiny_resolutions_still_advance() {
        let score = Score::new(2);
        let calculator = ComboCalculator::new(&score);
        assert_eq!(calculator.combo_ticks(0, 3).len(), 3);
    }
}
