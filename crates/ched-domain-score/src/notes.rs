use crate::events::scale_tick;
use ched_ports::types::Tick;
use serde::{Deserialize, Serialize};

pub const BT_LANES: u8 = 4;
pub const FX_LANES: u8 = 2;
pub const LASER_LANES: u8 = 2;

/// Physical track a note is drawn on, left to right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Track {
    LaserL = 1,
    FxL = 2,
    A = 3,
    B = 4,
    C = 5,
    D = 6,
    FxR = 7,
    LaserR = 8,
}

impl Track {
    pub fn id(self) -> u8 {
        self as u8
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Easing {
    #[default]
    Linear,
    SineIn,
    SineOut,
    Bezier,
}

/// Common view over every placed note. A note with zero duration is a chip
/// (or a slam, for lasers).
pub trait TimedNote {
    fn start_tick(&self) -> Tick;
    fn duration(&self) -> Tick;
    fn lane_index(&self) -> u8;
    fn track(&self) -> Option<Track>;

    fn end_tick(&self) -> Tick {
        self.start_tick() + self.duration()
    }

    fn is_chip(&self) -> bool {
        self.duration() == 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BtNote {
    pub start_tick: Tick,
    pub duration: Tick,
    pub lane_index: u8,
}

impl BtNote {
    pub fn chip(start_tick: Tick, lane_index: u8) -> Self {
        Self::hold(start_tick, 0, lane_index)
    }

    pub fn hold(start_tick: Tick, duration: Tick, lane_index: u8) -> Self {
        Self {
            start_tick,
            duration,
            lane_index,
        }
    }
}

impl TimedNote for BtNote {
    fn start_tick(&self) -> Tick {
        self.start_tick
    }

    fn duration(&self) -> Tick {
        self.duration
    }

    fn lane_index(&self) -> u8 {
        self.lane_index
    }

    fn track(&self) -> Option<Track> {
        match self.lane_index {
            0 => Some(Track::A),
            1 => Some(Track::B),
            2 => Some(Track::C),
            3 => Some(Track::D),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FxNote {
    pub start_tick: Tick,
    pub duration: Tick,
    pub lane_index: u8,
}

impl FxNote {
    pub fn chip(start_tick: Tick, lane_index: u8) -> Self {
        Self::hold(start_tick, 0, lane_index)
    }

    pub fn hold(start_tick: Tick, duration: Tick, lane_index: u8) -> Self {
        Self {
            start_tick,
            duration,
            lane_index,
        }
    }
}

impl TimedNote for FxNote {
    fn start_tick(&self) -> Tick {
        self.start_tick
    }

    fn duration(&self) -> Tick {
        self.duration
    }

    fn lane_index(&self) -> u8 {
        self.lane_index
    }

    fn track(&self) -> Option<Track> {
        match self.lane_index {
            0 => Some(Track::FxL),
            1 => Some(Track::FxR),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaserNote {
    pub start_tick: Tick,
    pub duration: Tick,
    pub lane_index: u8,
    /// Horizontal position in `[0, 1]`; values above 1 are allowed for joke charts.
    pub start_position: f32,
    pub end_position: f32,
    #[serde(default)]
    pub easing: Easing,
    #[serde(default = "default_laser_scale")]
    pub scale: u8,
}

fn default_laser_scale() -> u8 {
    1
}

impl LaserNote {
    pub fn new(
        start_tick: Tick,
        duration: Tick,
        lane_index: u8,
        start_position: f32,
        end_position: f32,
    ) -> Self {
        Self {
            start_tick,
            duration,
            lane_index,
            start_position,
            end_position,
            easing: Easing::Linear,
            scale: 1,
        }
    }

    pub fn is_slam(&self) -> bool {
        self.is_chip()
    }

    pub fn switch_color(&mut self) {
        self.lane_index = if self.lane_index == 0 { 1 } else { 0 };
    }

    pub fn flip(&mut self) {
        std::mem::swap(&mut self.start_position, &mut self.end_position);
    }

    pub fn mirror(&mut self) {
        self.start_position = 1.0 - self.start_position;
        self.end_position = 1.0 - self.end_position;
        self.switch_color();
    }
}

impl TimedNote for LaserNote {
    fn start_tick(&self) -> Tick {
        self.start_tick
    }

    fn duration(&self) -> Tick {
        self.duration
    }

    fn lane_index(&self) -> u8 {
        self.lane_index
    }

    fn track(&self) -> Option<Track> {
        match self.lane_index {
            0 => Some(Track::LaserL),
            1 => Some(Track::LaserR),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteCollection {
    pub bts: Vec<BtNote>,
    pub fxs: Vec<FxNote>,
    pub lasers: Vec<LaserNote>,
}

impl NoteCollection {
    /// BT and FX notes; lasers are kept apart because they are scored separately.
    pub fn buttons(&self) -> impl Iterator<Item = &dyn TimedNote> + '_ {
        self.bts
            .iter()
            .map(|n| n as &dyn TimedNote)
            .chain(self.fxs.iter().map(|n| n as &dyn TimedNote))
    }

    pub fn chips(&self) -> impl Iterator<Item = &dyn TimedNote> + '_ {
        self.buttons().filter(|n| n.is_chip())
    }

    pub fn holds(&self) -> impl Iterator<Item = &dyn TimedNote> + '_ {
        self.buttons().filter(|n| !n.is_chip())
    }

    pub fn len(&self) -> usize {
        self.bts.len() + self.fxs.len() + self.lasers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn rescale(&mut self, factor: f64) {
        for note in &mut self.bts {
            note.start_tick = scale_tick(note.start_tick, factor);
            note.duration = scale_tick(note.duration, factor);
        }
        for note in &mut self.fxs {
            note.start_tick = scale_tick(note.start_tick, factor);
            note.duration = scale_tick(note.duration, factor);
        }
        for note in &mut self.lasers {
            note.start_tick = scale_tick(note.start_tick, factor);
            note.duration = scale_tick(note.duration, factor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_follow_lane_layout() {
        assert_eq!(BtNote::chip(0, 0).track(), Some(Track::A));
        assert_eq!(BtNote::chip(0, 3).track(), Some(Track::D));
        assert_eq!(BtNote::chip(0, 4).track(), None);
        assert_eq!(FxNote::chip(0, 1).track(), Some(Track::FxR));
        assert_eq!(LaserNote::new(0, 0, 0, 0.0, 1.0).track(), Some(Track::LaserL));
    }

    #[test]
    fn mirror_swaps_color_and_reflects_positions() {
        let mut laser = LaserNote::new(0, 480, 0, 0.25, 1.0);
        laser.mirror();
        assert_eq!(laser.lane_index, 1);
        assert_eq!(laser.start_position, 0.75);
        assert_eq!(laser.end_position, 0.0);
    }

    #[test]
    fn flip_swaps_endpoints_and_keeps_lane() {
        let mut laser = LaserNote::new(0, 480, 1, 0.25, 1.0);
        laser.flip();
        assert_eq!(laser.lane_index, 1);
        assert_eq!(laser.start_position, 1.0);
        assert_eq!(laser.end_position, 0.25);
    }

    #[test]
    fn chips_and_holds_partition_buttons() {
        let notes = NoteCollection {
            bts: vec![BtNote::chip(0, 0), BtNote::hold(0, 480, 1)],
            fxs: vec![FxNote::hold(960, 240, 0)],
            lasers: vec![LaserNote::new(0, 0, 0, 0.0, 1.0)],
        };
        assert_eq!(notes.chips().count(), 1);
        assert_eq!(notes.holds().count(), 2);
        assert_eq!(notes.len(), 4);
    }
}
