use crate::types::DEFAULT_TICKS_PER_BEAT;
use serde::{Deserialize, Serialize};
use std::fmt;

fn default_ticks_per_beat() -> u32 {
    DEFAULT_TICKS_PER_BEAT
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    #[default]
    Basic,
    Advanced,
    Expert,
    Master,
    WorldsEnd,
}

impl Difficulty {
    /// Numeric value written to `#DIFFICULTY`.
    pub fn as_index(self) -> u8 {
        match self {
            Difficulty::Basic => 0,
            Difficulty::Advanced => 1,
            Difficulty::Expert => 2,
            Difficulty::Master => 3,
            Difficulty::WorldsEnd => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Basic => "BASIC",
            Difficulty::Advanced => "ADVANCED",
            Difficulty::Expert => "EXPERT",
            Difficulty::Master => "MASTER",
            Difficulty::WorldsEnd => "WORLD'S END",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Header values and layout switches for SUS export.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SusArgs {
    pub play_level: String,
    pub play_difficulty: Difficulty,
    pub extended_difficulty: String,
    pub song_id: String,
    pub sound_file_name: String,
    pub sound_offset: f64,
    pub jacket_file_path: String,
    pub has_padding_bar: bool,
    pub additional_data: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChedConfig {
    #[serde(default = "default_ticks_per_beat")]
    pub default_ticks_per_beat: u32,
    pub sus: SusArgs,
    pub log_level: Option<String>,
}

impl Default for ChedConfig {
    fn default() -> Self {
        Self {
            default_ticks_per_beat: DEFAULT_TICKS_PER_BEAT,
            sus: SusArgs::default(),
            log_level: None,
        }
    }
}
