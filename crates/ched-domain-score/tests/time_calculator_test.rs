use approx::assert_relative_eq;
use ched_domain_score::{BpmChange, TempoError, TimeCalculator};

#[test]
fn constant_tempo_maps_beats_to_seconds() {
    let calc = TimeCalculator::new(480, vec![BpmChange::new(0, 120.0)]).unwrap();

    assert_relative_eq!(calc.get_time_from_tick(480), 0.5);
    assert_relative_eq!(calc.get_time_from_tick(1920), 2.0);
    assert_eq!(calc.get_tick_from_time(0.5), 480);
    assert_eq!(calc.get_tick_from_time(2.0), 1920);
}

#[test]
fn tempo_changes_accumulate_segment_start_times() {
    let calc = TimeCalculator::new(
        480,
        vec![BpmChange::new(1920, 240.0), BpmChange::new(0, 120.0)],
    )
    .unwrap();

    let starts: Vec<f64> = calc.bpm_definitions().iter().map(|def| def.time).collect();
    assert_eq!(starts, vec![0.0, 2.0]);
    assert_relative_eq!(calc.get_time_from_tick(1920), 2.0);
    assert_relative_eq!(calc.get_time_from_tick(2400), 2.25);
    assert_eq!(calc.get_tick_from_time(2.25), 2400);
    assert_eq!(calc.get_tick_from_time(1.0), 960);
    assert_eq!(calc.bpm_at(1919), 120.0);
    assert_eq!(calc.bpm_at(1920), 240.0);
}

#[test]
fn ticks_before_zero_extrapolate_at_initial_tempo() {
    let calc = TimeCalculator::new(
        480,
        vec![BpmChange::new(0, 120.0), BpmChange::new(960, 60.0)],
    )
    .unwrap();

    assert_relative_eq!(calc.get_time_from_tick(-480), -0.5);
    assert_eq!(calc.get_tick_from_time(-0.5), -480);
}

#[test]
fn missing_initial_tempo_is_rejected() {
    let err = TimeCalculator::new(480, vec![BpmChange::new(480, 120.0)]).unwrap_err();
    assert_eq!(err, TempoError::MissingInitialTempo);

    let err = TimeCalculator::new(480, Vec::new()).unwrap_err();
    assert_eq!(err, TempoError::MissingInitialTempo);
}

#[test]
fn non_positive_bpm_is_rejected() {
    let err = TimeCalculator::new(
        480,
        vec![BpmChange::new(0, 120.0), BpmChange::new(960, 0.0)],
    )
    .unwrap_err();
    assert_eq!(err, TempoError::InvalidBpm { tick: 960, bpm: 0.0 });
}

#[test]
fn later_definition_wins_at_a_shared_tick() {
    let calc = TimeCalculator::new(
        480,
        vec![BpmChange::new(0, 120.0), BpmChange::new(0, 60.0)],
    )
    .unwrap();

    assert_relative_eq!(calc.get_time_from_tick(480), 1.0);
}

#[test]
fn time_round_trips_are_lossy_at_sub_tick_precision() {
    let calc = TimeCalculator::new(
        480,
        vec![BpmChange::new(0, 150.0), BpmChange::new(1920, 173.0)],
    )
    .unwrap();

    for tick in (0..10_000).step_by(13) {
        let back = calc.get_tick_from_time(calc.get_time_from_tick(tick));
        assert!(back == tick || back == tick - 1, "tick {tick} came back as {back}");
    }

    let just_before_beat = TimeCalculator::new(480, vec![BpmChange::new(0, 120.0)]).unwrap();
    assert_eq!(just_before_beat.get_tick_from_time(0.5 - 1e-9), 479);
}
