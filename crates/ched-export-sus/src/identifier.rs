use ched_ports::types::Tick;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

pub const NUM_CHARS: [char; 10] = ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
pub const ALPHA_CHARS: [char; 26] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R',
    'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
];

/// Every `digits`-long word over `alphabet`, in lexicographic order of the
/// alphabet's sequence.
pub fn enumerate_identifiers(digits: usize, alphabet: &[char]) -> Vec<String> {
    let mut words = vec![String::new()];
    for _ in 0..digits {
        words = words
            .iter()
            .flat_map(|prefix| alphabet.iter().map(move |c| format!("{prefix}{c}")))
            .collect();
    }
    words
}

/// Base-36 alphabet used for BPM definition keys: digits first.
pub fn base36_alphabet() -> Vec<char> {
    NUM_CHARS.iter().chain(ALPHA_CHARS.iter()).copied().collect()
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("no identifier is free at tick {start_tick}; too many long notes overlap")]
    Exhausted { start_tick: Tick },
    #[error("start tick {start_tick} must not be less than last called value {last_start_tick}")]
    OutOfOrder { start_tick: Tick, last_start_tick: Tick },
}

/// Hands out one-character keys to long notes so that no two notes alive at
/// the same time share a key.
///
/// Calls must come in non-decreasing start tick order. A key returns to the
/// pool once its note ended strictly before the next start.
#[derive(Debug)]
pub struct IdentifierAllocationManager {
    last_start_tick: Tick,
    available: Vec<char>,
    // (end tick, key), soonest end first
    in_use: BinaryHeap<Reverse<(Tick, char)>>,
}

impl Default for IdentifierAllocationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentifierAllocationManager {
    pub fn new() -> Self {
        let mut manager = Self {
            last_start_tick: 0,
            available: Vec::new(),
            in_use: BinaryHeap::new(),
        };
        manager.clear();
        manager
    }

    pub fn capacity() -> usize {
        ALPHA_CHARS.len() + NUM_CHARS.len()
    }

    /// Restores the full pool; used between passes over unrelated note kinds.
    pub fn clear(&mut self) {
        self.last_start_tick = 0;
        // Popped from the back, so `A` is handed out first.
        self.available = ALPHA_CHARS
            .iter()
            .chain(NUM_CHARS.iter())
            .rev()
            .copied()
            .collect();
        self.in_use.clear();
    }

    pub fn allocate(&mut self, start_tick: Tick, duration: Tick) -> Result<char, IdentifierError> {
        if start_tick < self.last_start_tick {
            return Err(IdentifierError::OutOfOrder {
                start_tick,
                last_start_tick: self.last_start_tick,
            });
        }

        while let Some(Reverse((end_tick, key))) = self.in_use.peek().copied() {
            if end_tick >= start_tick {
                break;
            }
            self.in_use.pop();
            self.available.push(key);
        }

        let key = self
            .available
            .pop()
            .ok_or(IdentifierError::Exhausted { start_tick })?;
        self.in_use.push(Reverse((start_tick + duration, key)));
        self.last_start_tick = start_tick;
        Ok(key)
    }

    pub fn in_use(&self) -> usize {
        self.in_use.len()
    }
}
