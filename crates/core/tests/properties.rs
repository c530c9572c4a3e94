//! End-to-end behaviour of the tempo engine on synthetic onset streams.

use tempo_tracker_core::{
    BeatKind, Engine, EngineConfig, EngineSnapshot, OnsetStream, Phase, MAX_SANE_BPM,
};

fn run(engine: &mut Engine, stream: &OnsetStream) -> Vec<EngineSnapshot> {
    stream
        .triggers()
        .map(|(timestamp, trigger)| engine.update(timestamp, trigger))
        .collect()
}

fn run_frames(engine: &mut Engine, stream: &OnsetStream, frame_ms: u64) -> Vec<EngineSnapshot> {
    stream
        .frames(frame_ms)
        .map(|(timestamp, trigger)| engine.update(timestamp, trigger))
        .collect()
}

/// Intervals shrinking by `step` ms per beat, starting at `first`.
fn ramp(first: u64, step: u64, beats: u64) -> Vec<u64> {
    (0..beats).map(|k| first - step * k).collect()
}

#[test]
fn converges_on_periodic_input() {
    for period in [300, 400, 500, 517, 600, 750, 1_000] {
        let mut engine = Engine::default();
        let snapshots = run(&mut engine, &OnsetStream::periodic(2_000, period, 40));
        let expected = (60_000.0 / period as f64).round() as i32;

        for snapshot in &snapshots[15..] {
            assert!(
                (snapshot.bpm - expected).abs() <= 1,
                "period {period}: got {} expected {expected}",
                snapshot.bpm
            );
        }
    }
}

#[test]
fn converges_on_jittered_input() {
    let stream = OnsetStream::periodic(2_000, 500, 80).jitter(10, 42);
    let mut engine = Engine::default();
    let snapshots = run(&mut engine, &stream);

    for snapshot in &snapshots[40..] {
        assert!((snapshot.bpm - 120).abs() <= 3, "got {}", snapshot.bpm);
    }
}

#[test]
fn converges_when_updated_every_frame() {
    let stream = OnsetStream::periodic(1_000, 500, 48);
    let mut engine = Engine::default();
    let snapshots = run_frames(&mut engine, &stream, 16);

    let last = snapshots.last().unwrap();
    assert!((last.bpm - 120).abs() <= 2, "got {}", last.bpm);
    assert_eq!(last.phase, Phase::Guessing);

    let beats = snapshots.iter().filter(|s| s.beat).count();
    assert!((46..=48).contains(&beats), "got {beats} beats");
}

#[test]
fn survives_every_other_beat_missing() {
    let stream = OnsetStream::periodic(1_000, 500, 32).then_periodic(1_000, 24);
    let mut engine = Engine::default();
    let snapshots = run(&mut engine, &stream);

    for snapshot in &snapshots[15..] {
        assert!((snapshot.bpm - 120).abs() <= 2, "got {}", snapshot.bpm);
    }
    let guessed = engine.history().count_kind(BeatKind::Guessed);
    assert_eq!(guessed, engine.history().capacity() / 2);
}

#[test]
fn slow_tempi_are_doubled_into_range() {
    let config = EngineConfig::default();
    for period in [1_200, 1_333, 1_500] {
        let mut engine = Engine::new(config.clone());
        let snapshots = run(&mut engine, &OnsetStream::periodic(1_000, period, 30));
        let slow = (60_000.0 / period as f64).round() as i32;

        assert!(snapshots[15..20].iter().all(|s| s.bpm == slow), "period {period}");
        assert_eq!(snapshots[20].bpm, slow * 2, "period {period}");
        let last = snapshots.last().unwrap();
        assert!((config.min_bpm..=config.max_bpm).contains(&last.bpm));
        assert!((last.bpm - slow * 2).abs() <= 2, "period {period}: got {}", last.bpm);
    }
}

#[test]
fn sticky_lock_engages_after_three_confident_changes() {
    let stream = OnsetStream::from_intervals(1_000, ramp(600, 6, 30));
    let mut engine = Engine::new(EngineConfig::sticky_defaults());
    let snapshots = run(&mut engine, &stream);

    assert!(!snapshots[16].is_locked);
    assert!(snapshots[17].is_locked);
    assert_eq!(snapshots[17].phase, Phase::Locked);

    let locked_bpm = snapshots[17].bpm;
    assert!(snapshots[17..].iter().all(|s| s.is_locked && s.bpm == locked_bpm));
}

#[test]
fn an_unconfident_cycle_delays_the_lock() {
    let mut intervals = ramp(600, 6, 40);
    intervals[15] = 350;
    let stream = OnsetStream::from_intervals(1_000, intervals);
    let mut engine = Engine::new(EngineConfig::sticky_defaults());
    let snapshots = run(&mut engine, &stream);

    let first_lock = snapshots
        .iter()
        .position(|s| s.is_locked)
        .expect("lock should engage once the outlier leaves the history");
    assert!(first_lock > 17, "locked at {first_lock}");
}

#[test]
fn sticky_disabled_never_locks() {
    let stream = OnsetStream::from_intervals(1_000, ramp(600, 6, 30));
    let mut engine = Engine::default();
    let snapshots = run(&mut engine, &stream);

    assert!(snapshots.iter().all(|s| !s.is_locked));
}

#[test]
fn reset_replays_like_a_fresh_engine() {
    let stream = OnsetStream::periodic(1_000, 480, 60)
        .drop_every(7)
        .jitter(25, 3);
    let config = EngineConfig::sticky_defaults();

    let mut fresh = Engine::new(config.clone());
    let expected = run_frames(&mut fresh, &stream, 10);

    let mut reused = Engine::new(config);
    run(&mut reused, &OnsetStream::periodic(0, 700, 30));
    reused.reset();
    let replayed = run_frames(&mut reused, &stream, 10);

    assert_eq!(replayed, expected);
}

#[test]
fn interpolates_a_triple_gap() {
    let stream = OnsetStream::periodic(1_000, 500, 20);
    let gap_beat = stream.last().unwrap() + 1_490;
    let mut engine = Engine::default();
    run(&mut engine, &stream);

    engine.update(gap_beat, true);

    let guessed: Vec<u64> = engine
        .history()
        .iter()
        .filter(|event| event.kind == BeatKind::Guessed)
        .map(|event| event.timestamp_ms)
        .collect();
    assert_eq!(guessed, vec![gap_beat - 1_000, gap_beat - 500]);
}

#[test]
fn confidence_stays_within_bounds() {
    for seed in 1..=12u64 {
        let main = OnsetStream::at_bpm(500, 90.0 + seed as f64 * 7.0, 120)
            .drop_every(2 + seed as usize % 5)
            .jitter(40 + seed * 10, seed);
        let noise = OnsetStream::periodic(777, 331 + seed * 17, 90).jitter(120, seed * 31);
        let mut onsets = main.onsets().to_vec();
        onsets.extend_from_slice(noise.onsets());
        let stream = OnsetStream::from_onsets(onsets);

        let mut engine = Engine::new(EngineConfig::sticky_defaults());
        for snapshot in run_frames(&mut engine, &stream, 16) {
            assert!((0..=100).contains(&snapshot.confidence), "seed {seed}: {snapshot:?}");
            assert!((0..=MAX_SANE_BPM).contains(&snapshot.bpm), "seed {seed}: {snapshot:?}");
        }
    }
}

#[test]
fn predicted_beat_follows_the_last_accepted_beat() {
    let stream = OnsetStream::periodic(1_000, 400, 30);
    let mut engine = Engine::default();
    let snapshots = run(&mut engine, &stream);

    let last = snapshots.last().unwrap();
    assert_eq!(last.bpm, 150);
    assert_eq!(last.predicted_next_beat_ms, Some(stream.last().unwrap() + 400));
}

#[test]
fn independent_channels_use_independent_engines() {
    let bass = OnsetStream::periodic(1_000, 500, 30);
    let hats = OnsetStream::periodic(1_000, 250, 60);

    let mut bass_engine = Engine::default();
    let mut hats_engine = Engine::new(EngineConfig {
        max_bpm: 300,
        ..EngineConfig::default()
    });

    assert_eq!(run(&mut bass_engine, &bass).last().unwrap().bpm, 120);
    assert_eq!(run(&mut hats_engine, &hats).last().unwrap().bpm, 240);
}
