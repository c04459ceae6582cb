//! Long-horizon pedal plausibility scenarios at the 1 ms tick rate.

use rstest::rstest;
use vcu_config::{PedalCfg, PedalFilter};
use vcu_core::pedal::{Pedal, PedalFault};

fn pedal() -> Pedal {
    let cfg = PedalCfg {
        filter: PedalFilter::None,
        ..PedalCfg::default()
    };
    Pedal::new(&cfg, 1).unwrap()
}

/// ADC count on the 5 V channel for a travel percentage.
fn apps_5v(pct: u32) -> u16 {
    (30 + (950 - 30) * pct / 100) as u16
}

/// 3.3 V channel count that rescales onto the same travel percentage.
fn apps_3v3(pct: u32) -> u16 {
    (u32::from(apps_5v(pct)) * 33 / 50) as u16
}

#[test]
fn disagreement_held_150_ticks_trips_and_stays_tripped() {
    let mut p = pedal();
    let mut faults = Vec::new();
    for tick in 1..=150 {
        faults.push(p.evaluate(apps_5v(80), apps_3v3(20), 100, tick).fault);
    }
    assert_eq!(faults[0], PedalFault::DiffStart);
    assert!(
        faults[1..99]
            .iter()
            .all(|f| *f == PedalFault::DiffContinuing)
    );
    // Tick 100 is the hundredth offending tick; latched from there on.
    assert!(
        faults[99..]
            .iter()
            .all(|f| *f == PedalFault::DiffExceeded)
    );
    assert!(p.latched());
}

#[test]
fn clean_drive_500_ticks_never_faults() {
    let mut p = pedal();
    for tick in 1..=500 {
        // Pedal sweeps up and down; both channels track.
        let pct = (tick % 100).min(95) as u32;
        let s = p.evaluate(apps_5v(pct), apps_3v3(pct), 100, tick);
        assert_eq!(s.fault, PedalFault::None, "tick {tick}");
    }
    assert!(!p.latched());
}

#[rstest]
#[case::just_under_window(99)]
#[case::two_ticks(2)]
fn disagreement_shorter_than_window_never_latches(#[case] bad_ticks: u64) {
    let mut p = pedal();
    for tick in 1..=bad_ticks {
        let f = p.evaluate(apps_5v(80), apps_3v3(20), 100, tick).fault;
        assert_ne!(f, PedalFault::DiffExceeded);
    }
    let s = p.evaluate(apps_5v(80), apps_3v3(80), 100, bad_ticks + 1);
    assert_eq!(s.fault, PedalFault::DiffResolved);
    assert!(!p.latched());
    assert!(s.torque > 0);
    let s = p.evaluate(apps_5v(80), apps_3v3(80), 100, bad_ticks + 2);
    assert_eq!(s.fault, PedalFault::None);
}

#[test]
fn trip_recover_and_trip_again() {
    let mut p = pedal();
    for tick in 1..=100 {
        p.evaluate(apps_5v(80), apps_3v3(20), 100, tick);
    }
    assert!(p.latched());

    // Two compliant ticks release the latch.
    p.evaluate(apps_5v(50), apps_3v3(50), 100, 101);
    let s = p.evaluate(apps_5v(50), apps_3v3(50), 100, 102);
    assert_eq!(s.fault, PedalFault::DiffResolved);

    // A fresh disagreement needs a fresh full window.
    for tick in 103..202 {
        let f = p.evaluate(apps_5v(80), apps_3v3(20), 100, tick).fault;
        assert_ne!(f, PedalFault::DiffExceeded, "tick {tick}");
    }
    assert_eq!(
        p.evaluate(apps_5v(80), apps_3v3(20), 100, 202).fault,
        PedalFault::DiffExceeded
    );
}

#[test]
fn slow_tick_rate_shrinks_the_window_in_ticks() {
    // 10 ms ticks, 100 ms window: trips on the 10th offending tick.
    let cfg = PedalCfg {
        filter: PedalFilter::None,
        ..PedalCfg::default()
    };
    let mut p = Pedal::new(&cfg, 10).unwrap();
    for tick in 1..10 {
        let f = p.evaluate(apps_5v(80), apps_3v3(20), 100, tick).fault;
        assert_ne!(f, PedalFault::DiffExceeded, "tick {tick}");
    }
    assert_eq!(
        p.evaluate(apps_5v(80), apps_3v3(20), 100, 10).fault,
        PedalFault::DiffExceeded
    );
}

#[test]
fn diff_exactly_at_threshold_is_compliant() {
    // Threshold is strict: a 10.0 % disagreement does not count as over.
    let cfg = PedalCfg {
        filter: PedalFilter::None,
        diff_threshold_tenths: 100,
        ..PedalCfg::default()
    };
    let mut p = Pedal::new(&cfg, 1).unwrap();
    // 490 counts is exactly 50.0 % travel; 263 counts rescales to 398,
    // exactly 40.0 % travel. The disagreement is exactly 100 tenths.
    for tick in 1..=300 {
        let s = p.evaluate(490, 263, 100, tick);
        assert_eq!(s.fault, PedalFault::None, "tick {tick}");
    }
}

#[test]
fn torque_zero_for_entire_latched_stretch() {
    let mut p = pedal();
    for tick in 1..=100 {
        p.evaluate(apps_5v(80), apps_3v3(20), 100, tick);
    }
    for tick in 101..=200 {
        let s = p.evaluate(apps_5v(80), apps_3v3(20), 100, tick);
        assert_eq!(s.torque, 0, "tick {tick}");
    }
}
