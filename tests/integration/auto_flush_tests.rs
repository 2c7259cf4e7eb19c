//! Background auto-flush arbitration against user runs.

use super::mock_hw::Rig;

use rofilter::app::events::AppEvent;
use rofilter::config::FilterConfig;
use rofilter::fsm::context::{Cue, RunEnd, RunKind};
use rofilter::fsm::StateId;
use rofilter::valves::{ValveId, ValveSet};

fn quick_flush_config() -> FilterConfig {
    FilterConfig {
        flush_sec: 10,
        disposal_sec: 10,
        filter_sec: 300,
        auto_flush_sec: 60,
        water_clean_sec: 30,
    }
}

#[test]
fn idle_auto_flush_runs_flush_and_disposal_only() {
    let mut rig = Rig::boot(quick_flush_config());

    rig.run_until(59_980);
    assert_eq!(rig.state(), StateId::Idle);

    rig.run_until(60_000);
    assert_eq!(rig.state(), StateId::Flushing);
    assert_eq!(rig.hw.open_set(), ValveSet::of(&[ValveId::Feed, ValveId::Flush]));

    rig.run_until(70_000);
    assert_eq!(rig.state(), StateId::Disposing);

    rig.run_until(80_000);
    assert_eq!(rig.state(), StateId::Idle);
    assert!(rig.hw.open_set().is_closed());
    assert_eq!(rig.hw.cues.last(), Some(&Cue::FlushDone));

    let filtering_entries = rig.sink.count(|e| {
        matches!(e, AppEvent::StateChanged { to: StateId::Filtering, .. })
    });
    assert_eq!(filtering_entries, 0);

    let last = rig.control.app().history().last().copied().unwrap();
    assert_eq!((last.kind, last.end), (RunKind::AutoFlush, RunEnd::Completed));
    assert_eq!(last.filtered_secs, 0);
}

#[test]
fn timer_restarts_after_each_run() {
    let mut rig = Rig::boot(quick_flush_config());
    rig.run_until(80_000);
    assert_eq!(rig.control.scheduler().fire_count(), 1);

    // Next one is a full period after the flush ended.
    rig.run_until(139_980);
    assert_eq!(rig.state(), StateId::Idle);
    rig.run_until(140_000);
    assert_eq!(rig.state(), StateId::Flushing);
    assert_eq!(rig.control.scheduler().fire_count(), 2);
}

#[test]
fn auto_flush_while_busy_is_dropped() {
    let mut rig = Rig::boot(quick_flush_config());
    rig.run_until(30_000);
    let t0 = rig.short_press();

    // The scheduler fires every minute during the 320 s run.
    let mut states = Vec::new();
    for t in (t0..t0 + 320_000).step_by(1_000) {
        rig.run_until(t);
        states.push((rig.state(), rig.hw.open_set()));
    }
    let skipped = rig
        .sink
        .count(|e| matches!(e, AppEvent::AutoFlushSkipped(_)));
    assert!(skipped >= 4, "expected skipped auto-flushes, got {skipped}");

    // The user run was never disturbed.
    let run_starts = rig
        .sink
        .count(|e| matches!(e, AppEvent::RunStarted(_)));
    assert_eq!(run_starts, 1);
    for (state, valves) in states {
        assert_eq!(valves, ValveSet::for_phase(state));
    }

    rig.run_until(t0 + 320_000);
    assert_eq!(rig.state(), StateId::Idle);
    let last = rig.control.app().history().last().copied().unwrap();
    assert_eq!((last.kind, last.end), (RunKind::Standard, RunEnd::Completed));
}

#[test]
fn auto_flush_counts_as_a_rinse() {
    let mut rig = Rig::boot(quick_flush_config());
    rig.run_until(80_000);
    assert_eq!(rig.state(), StateId::Idle);

    rig.run_for(5_000);
    rig.short_press();
    assert_eq!(rig.state(), StateId::Filtering);
}

#[test]
fn timer_expiring_as_a_run_ends_does_not_start_a_flush() {
    let mut rig = Rig::boot(FilterConfig {
        filter_sec: 30,
        ..quick_flush_config()
    });

    // 10 s flush + 10 s disposal + 30 s filtration ends at 60 s, the
    // same step the boot-time auto-flush period runs out.
    rig.press_delivered_at(10_000, 200);
    assert_eq!(rig.state(), StateId::Flushing);

    rig.run_until(60_000);
    assert_eq!(rig.state(), StateId::Idle);
    assert!(rig.hw.open_set().is_closed());
    let auto_starts = rig
        .sink
        .count(|e| matches!(e, AppEvent::RunStarted(RunKind::AutoFlush)));
    assert_eq!(auto_starts, 0);
    let last = rig.control.app().history().last().copied().unwrap();
    assert_eq!((last.kind, last.end), (RunKind::Standard, RunEnd::Completed));

    // The timer restarted when the run ended.
    rig.run_until(119_980);
    assert_eq!(rig.state(), StateId::Idle);
    rig.run_until(120_000);
    assert_eq!(rig.state(), StateId::Flushing);
}
