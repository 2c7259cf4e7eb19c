//! Full button-driven runs through `ControlLoop` → `AppService` → valves.

use super::mock_hw::Rig;

use rofilter::app::events::AppEvent;
use rofilter::config::FilterConfig;
use rofilter::fsm::context::{Cue, RunEnd, RunKind};
use rofilter::fsm::StateId;
use rofilter::valves::{ValveId, ValveSet};

fn example_config() -> FilterConfig {
    FilterConfig {
        flush_sec: 60,
        disposal_sec: 60,
        filter_sec: 300,
        auto_flush_sec: 28_800,
        water_clean_sec: 30,
    }
}

const FLUSH: ValveSet = ValveSet::of(&[ValveId::Feed, ValveId::Flush]);
const DISPOSE: ValveSet = ValveSet::of(&[ValveId::Feed, ValveId::Disposal]);
const FILTER: ValveSet = ValveSet::of(&[ValveId::Feed, ValveId::Output]);

#[test]
fn boot_closes_everything_and_greets() {
    let rig = Rig::boot(example_config());
    assert_eq!(rig.state(), StateId::Idle);
    assert!(rig.hw.open_set().is_closed());
    assert_eq!(rig.hw.calls.len(), ValveId::COUNT);
    assert!(rig.hw.calls.iter().all(|(_, open)| !open));
    assert_eq!(rig.hw.cues, vec![Cue::Greeting]);
    assert!(matches!(rig.sink.events[0], AppEvent::Started(StateId::Idle)));
}

#[test]
fn short_press_runs_flush_dispose_filter_then_idle() {
    let mut rig = Rig::boot(example_config());
    let t0 = rig.short_press();

    assert_eq!(rig.state(), StateId::Flushing);
    assert_eq!(rig.hw.open_set(), FLUSH);

    // Sample each phase just inside its boundaries.
    let checks = [
        (t0 + 59_980, StateId::Flushing, FLUSH),
        (t0 + 60_000, StateId::Disposing, DISPOSE),
        (t0 + 119_980, StateId::Disposing, DISPOSE),
        (t0 + 120_000, StateId::Filtering, FILTER),
        (t0 + 419_980, StateId::Filtering, FILTER),
        (t0 + 420_000, StateId::Idle, ValveSet::CLOSED),
    ];
    for (t, state, valves) in checks {
        rig.run_until(t);
        assert_eq!(rig.state(), state, "state at t0+{}ms", t - t0);
        assert_eq!(rig.hw.open_set(), valves, "valves at t0+{}ms", t - t0);
        assert_eq!(rig.control.app().valves(), valves);
    }

    assert_eq!(rig.hw.route_overlaps, 0);
    assert!(rig.hw.cues.contains(&Cue::ShortAck));
    assert_eq!(rig.hw.cues.last(), Some(&Cue::Completed));

    let last = rig.control.app().history().last().copied().unwrap();
    assert_eq!(last.kind, RunKind::Standard);
    assert_eq!(last.end, RunEnd::Completed);
    assert_eq!(last.filtered_secs, 300);
    assert_eq!(last.duration_ms(), 420_000);
}

#[test]
fn each_phase_change_commands_each_valve_once() {
    let mut rig = Rig::boot(example_config());
    let boot_calls = rig.hw.calls.len();
    let t0 = rig.short_press();
    rig.run_until(t0 + 420_000);

    // Four transitions (Idle→Flushing→Disposing→Filtering→Idle), one
    // command per valve each.
    assert_eq!(rig.hw.calls.len() - boot_calls, 4 * ValveId::COUNT);
}

#[test]
fn presses_during_pre_filtration_are_ignored() {
    let mut rig = Rig::boot(example_config());
    let t0 = rig.short_press();

    rig.run_until(t0 + 10_000);
    rig.short_press();
    assert_eq!(rig.state(), StateId::Flushing);

    rig.run_until(t0 + 70_000);
    rig.long_press();
    assert_eq!(rig.state(), StateId::Disposing);
    assert_eq!(rig.hw.open_set(), DISPOSE);

    let ignored = rig
        .sink
        .count(|e| matches!(e, AppEvent::PressIgnored { .. }));
    assert_eq!(ignored, 2);

    // Timeline is unaffected.
    rig.run_until(t0 + 120_000);
    assert_eq!(rig.state(), StateId::Filtering);
}

#[test]
fn short_press_while_filtering_aborts() {
    let mut rig = Rig::boot(example_config());
    let t0 = rig.short_press();
    rig.run_until(t0 + 200_000);
    assert_eq!(rig.state(), StateId::Filtering);

    rig.short_press();
    assert_eq!(rig.state(), StateId::Idle);
    assert!(rig.hw.open_set().is_closed());

    let last = rig.control.app().history().last().copied().unwrap();
    assert_eq!(last.end, RunEnd::Aborted);
    // Config untouched by an abort.
    assert_eq!(rig.control.app().config().filter_sec, 300);
}

#[test]
fn long_press_from_idle_runs_extended() {
    let mut rig = Rig::boot(example_config());
    let t0 = rig.long_press();
    assert_eq!(rig.state(), StateId::Flushing);
    assert!(rig.hw.cues.contains(&Cue::LongAck));

    // Well past filter_sec the extended run keeps filtering.
    rig.run_until(t0 + 120_000 + 1_000_000);
    assert_eq!(rig.state(), StateId::Filtering);

    rig.run_until(t0 + 120_000 + 3_600_000);
    assert_eq!(rig.state(), StateId::Idle);
    let last = rig.control.app().history().last().copied().unwrap();
    assert_eq!((last.kind, last.end), (RunKind::Extended, RunEnd::Completed));
    assert_eq!(last.filtered_secs, 3_600);
}

#[test]
fn press_soon_after_a_run_skips_the_flush() {
    let mut rig = Rig::boot(example_config());
    let t0 = rig.short_press();
    rig.run_until(t0 + 420_000);
    assert_eq!(rig.state(), StateId::Idle);

    // Within water_clean_sec (30 s): straight to filtering.
    rig.run_for(10_000);
    rig.short_press();
    assert_eq!(rig.state(), StateId::Filtering);
    assert_eq!(rig.hw.open_set(), FILTER);
    assert_eq!(rig.hw.route_overlaps, 0);
}

#[test]
fn press_after_clean_window_flushes_again() {
    let mut rig = Rig::boot(example_config());
    let t0 = rig.short_press();
    rig.run_until(t0 + 420_000);

    rig.run_for(31_000);
    rig.short_press();
    assert_eq!(rig.state(), StateId::Flushing);
}
