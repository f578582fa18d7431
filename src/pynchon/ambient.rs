use super::data::{AMBIENT_DAWN, AMBIENT_DAY, AMBIENT_DUSK, AMBIENT_MICRO_EVENTS, AMBIENT_NIGHT};
use chrono::{DateTime, Timelike, Utc};

/// Deterministic time-of-day bucket selection (§4.6). Selection is a
/// pure function of the timestamp, not a random draw, so the same
/// invocation at the same instant always yields the same line.
fn time_of_day_lines(now: DateTime<Utc>) -> &'static [&'static str] {
    match now.hour() {
        0..=4 => AMBIENT_NIGHT,
        5..=8 => AMBIENT_DAWN,
        9..=17 => AMBIENT_DAY,
        18..=21 => AMBIENT_DUSK,
        _ => AMBIENT_NIGHT,
    }
}

fn pick(lines: &'static [&'static str], seed: u64) -> &'static str {
    lines[(seed as usize) % lines.len()]
}

/// Deterministic-per-input-time ambient prose, blended with the current
/// entropy level (§4.6). Returns `None` when entropy is near zero and
/// there is no micro-event roll — "returns null when no events".
pub fn generate(now: DateTime<Utc>, entropy_level: f64) -> Option<String> {
    let seed = now.timestamp() as u64;
    let time_line = pick(time_of_day_lines(now), seed);

    // Micro-events fire on a deterministic slice of the minute, scaled
    // by entropy so a calmer world is a quieter one.
    let micro_event_roll = seed % 10;
    let micro_event_threshold = 2 + (entropy_level * 6.0) as u64;

    if micro_event_roll >= micro_event_threshold && entropy_level < 0.05 {
        return None;
    }

    let micro_event = pick(AMBIENT_MICRO_EVENTS, seed / 7);

    if entropy_level < 0.2 {
        Some(time_line.to_string())
    } else {
        Some(format!("{time_line} {micro_event}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn same_timestamp_and_entropy_yields_same_line() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 3, 0, 0).unwrap();
        assert_eq!(generate(now, 0.5), generate(now, 0.5));
    }

    #[test]
    fn low_entropy_omits_micro_event_suffix() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap();
        let line = generate(now, 0.1).unwrap();
        assert!(AMBIENT_DAY.contains(&line.as_str()));
    }

    #[test]
    fn night_hours_pick_night_bucket() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 2, 0, 0).unwrap();
        let line = generate(now, 0.6).unwrap();
        assert!(AMBIENT_NIGHT.iter().any(|l| line.starts_with(*l)));
    }
}
