use ched_ports::types::Tick;
use std::collections::HashMap;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LineDataError {
    #[error("bar length must be positive (got {0})")]
    InvalidBarLength(Tick),
    #[error("tick offset {tick_offset} is outside the bar of {bar_tick} ticks")]
    TickOffsetOutOfRange { tick_offset: Tick, bar_tick: Tick },
    #[error("data string {0:?} is not 2 characters long")]
    InvalidDataLength(String),
    #[error("more than one item at tick offset {0}")]
    DuplicateTickOffset(Tick),
}

/// Packs `(tick_offset, code)` pairs into one bar of 2-character slots.
///
/// The slot width is the gcd of the bar length and every offset, which is the
/// coarsest grid that still places each item exactly. Empty slots are `00`.
pub fn generate_line_data<S: AsRef<str>>(
    bar_tick: Tick,
    items: &[(Tick, S)],
) -> Result<String, LineDataError> {
    if bar_tick <= 0 {
        return Err(LineDataError::InvalidBarLength(bar_tick));
    }
    if let Some((tick_offset, _)) = items
        .iter()
        .find(|(offset, _)| *offset < 0 || *offset >= bar_tick)
    {
        return Err(LineDataError::TickOffsetOutOfRange {
            tick_offset: *tick_offset,
            bar_tick,
        });
    }
    if let Some((_, data)) = items.iter().find(|(_, data)| data.as_ref().chars().count() != 2) {
        return Err(LineDataError::InvalidDataLength(data.as_ref().to_string()));
    }

    let step = items
        .iter()
        .fold(bar_tick, |acc, (offset, _)| gcd(acc, *offset));

    let mut slots: HashMap<Tick, &str> = HashMap::with_capacity(items.len());
    for (offset, data) in items {
        if slots.insert(*offset, data.as_ref()).is_some() {
            return Err(LineDataError::DuplicateTickOffset(*offset));
        }
    }

    let mut line = String::with_capacity((bar_tick / step * 2) as usize);
    for i in 0..bar_tick / step {
        line.push_str(slots.get(&(i * step)).copied().unwrap_or("00"));
    }
    Ok(line)
}

pub fn gcd(a: Tick, b: Tick) -> Tick {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Lane width as one character: hex digits, with 16 written as `g`.
pub fn to_lane_width_string(width: u32) -> String {
    if width == 16 {
        "g".to_string()
    } else {
        format!("{width:x}")
    }
}

/// Quantizes a laser position to one of 36 base-36 digits. Positions above 1
/// (joke charts) saturate at `Z`.
pub fn to_position_char(position: f32) -> char {
    let step = (position * 35.0).round().clamp(0.0, 35.0) as u32;
    char::from_digit(step, 36)
        .unwrap_or('0')
        .to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gcd_handles_zero() {
        assert_eq!(gcd(1920, 0), 1920);
        assert_eq!(gcd(0, 480), 480);
        assert_eq!(gcd(1920, 720), 240);
    }

    #[test]
    fn lane_width_uses_g_for_sixteen() {
        assert_eq!(to_lane_width_string(1), "1");
        assert_eq!(to_lane_width_string(12), "c");
        assert_eq!(to_lane_width_string(16), "g");
    }

    #[test]
    fn positions_map_onto_base36() {
        assert_eq!(to_position_char(0.0), '0');
        assert_eq!(to_position_char(1.0), 'Z');
        assert_eq!(to_position_char(0.5), 'I');
        assert_eq!(to_position_char(2.0), 'Z');
        assert_eq!(to_position_char(-1.0), '0');
    }
}
