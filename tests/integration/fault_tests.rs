//! Valve actuator failures: the run stops and everything is closed.

use super::mock_hw::{MemStorage, MockValves, Rig};

use rofilter::app::events::AppEvent;
use rofilter::config::FilterConfig;
use rofilter::error::{ActuatorError, ActuatorErrorKind};
use rofilter::fsm::context::{Cue, RunEnd};
use rofilter::fsm::StateId;
use rofilter::valves::ValveId;

fn config() -> FilterConfig {
    FilterConfig {
        flush_sec: 60,
        disposal_sec: 60,
        filter_sec: 300,
        auto_flush_sec: 28_800,
        water_clean_sec: 30,
    }
}

fn stuck(valve: ValveId) -> MockValves {
    MockValves {
        fail_on: Some((valve, true)),
        ..MockValves::default()
    }
}

#[test]
fn stuck_disposal_valve_ends_run_closed() {
    let mut rig = Rig::boot_with(config(), stuck(ValveId::Disposal), MemStorage::new());
    let t0 = rig.short_press();
    assert_eq!(rig.state(), StateId::Flushing);

    rig.run_until(t0 + 60_000);
    assert_eq!(rig.state(), StateId::Idle);
    assert!(rig.hw.open_set().is_closed());
    assert_eq!(rig.hw.cues.last(), Some(&Cue::Fault));

    let fault = ActuatorError::new(ValveId::Disposal, ActuatorErrorKind::NoResponse);
    assert!(rig.sink.events.contains(&AppEvent::ActuatorFault(fault)));

    let last = rig.control.app().history().last().copied().unwrap();
    assert_eq!(last.end, RunEnd::Faulted);
}

#[test]
fn faulted_run_does_not_count_as_rinse() {
    let mut rig = Rig::boot_with(config(), stuck(ValveId::Output), MemStorage::new());
    let t0 = rig.short_press();
    rig.run_until(t0 + 120_000);
    assert_eq!(rig.state(), StateId::Idle);

    // Repair the valve and press again right away.
    rig.hw.fail_on = None;
    rig.short_press();
    assert_eq!(rig.state(), StateId::Flushing);
}

#[test]
fn rig_keeps_working_after_a_fault() {
    let mut rig = Rig::boot_with(config(), stuck(ValveId::Flush), MemStorage::new());
    rig.short_press();
    assert_eq!(rig.state(), StateId::Idle);
    assert!(rig.hw.open_set().is_closed());

    rig.hw.fail_on = None;
    let t0 = rig.short_press();
    rig.run_until(t0 + 420_000);
    let last = rig.control.app().history().last().copied().unwrap();
    assert_eq!(last.end, RunEnd::Completed);
}
