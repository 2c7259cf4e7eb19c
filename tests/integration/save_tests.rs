//! Long-press-to-save: the filtered time becomes the new `filter_sec`.

use super::mock_hw::{MemStorage, MockValves, Rig};

use rofilter::adapters::config_store::ConfigStore;
use rofilter::app::events::AppEvent;
use rofilter::app::ports::{ConfigError, ConfigPort};
use rofilter::app::service::SAVE_RETRY_MS;
use rofilter::config::FilterConfig;
use rofilter::fsm::context::{Cue, RunEnd};
use rofilter::fsm::StateId;

fn example_config() -> FilterConfig {
    FilterConfig {
        flush_sec: 60,
        disposal_sec: 60,
        filter_sec: 300,
        auto_flush_sec: 28_800,
        water_clean_sec: 30,
    }
}

#[test]
fn long_press_at_150s_saves_30s_and_reloads() {
    let mut rig = Rig::boot(example_config());
    let t0 = rig.short_press();

    // Filtering starts at t0+120s; deliver the long press at t0+150s.
    rig.press_delivered_at(t0 + 150_000, 1_600);

    assert_eq!(rig.state(), StateId::Idle);
    assert!(rig.hw.open_set().is_closed());
    assert_eq!(rig.control.app().config().filter_sec, 30);
    assert!(!rig.control.app().is_config_dirty());
    assert!(rig.sink.events.contains(&AppEvent::ConfigSaved { filter_sec: 30 }));

    // Save cue follows the long-press acknowledgement.
    let tail: Vec<Cue> = rig.hw.cues.iter().rev().take(2).rev().copied().collect();
    assert_eq!(tail, vec![Cue::LongAck, Cue::Saved]);

    let last = rig.control.app().history().last().copied().unwrap();
    assert_eq!(last.end, RunEnd::Saved);
    assert_eq!(last.filtered_secs, 30);

    // Round trip through a fresh store over the same storage.
    let mut reopened = ConfigStore::new(rig.store.into_inner());
    let loaded = reopened.load().unwrap();
    assert_eq!(loaded.filter_sec, 30);
    assert_eq!(loaded.flush_sec, 60);
    assert_eq!(loaded.water_clean_sec, 30);
}

#[test]
fn saved_length_drives_the_next_run() {
    let mut rig = Rig::boot(example_config());
    let t0 = rig.short_press();
    rig.press_delivered_at(t0 + 165_000, 1_600);
    assert_eq!(rig.control.app().config().filter_sec, 45);

    // Outside the clean window so the next run flushes again.
    rig.run_for(60_000);
    let t1 = rig.short_press();
    rig.run_until(t1 + 120_000 + 44_980);
    assert_eq!(rig.state(), StateId::Filtering);
    rig.run_until(t1 + 120_000 + 45_000);
    assert_eq!(rig.state(), StateId::Idle);
}

#[test]
fn long_press_under_minimum_aborts_without_saving() {
    let mut rig = Rig::boot(example_config());
    let t0 = rig.short_press();
    rig.press_delivered_at(t0 + 140_000, 1_600);

    assert_eq!(rig.state(), StateId::Idle);
    assert_eq!(rig.control.app().config().filter_sec, 300);
    assert!(!rig.sink.events.iter().any(|e| matches!(e, AppEvent::ConfigSaved { .. })));
    let last = rig.control.app().history().last().copied().unwrap();
    assert_eq!(last.end, RunEnd::Aborted);
}

#[test]
fn failed_save_is_retried_until_storage_recovers() {
    let mut rig = Rig::boot_with(example_config(), MockValves::new(), MemStorage::new());
    // Create the initial record, then break the storage.
    rig.store.load().unwrap();
    rig.store.storage_mut().fail_writes = true;

    let t0 = rig.short_press();
    rig.press_delivered_at(t0 + 150_000, 1_600);

    // Run ends anyway, value held in memory, failure reported.
    assert_eq!(rig.state(), StateId::Idle);
    assert!(rig.hw.open_set().is_closed());
    assert_eq!(rig.control.app().config().filter_sec, 30);
    assert!(rig.control.app().is_config_dirty());
    assert!(rig.sink.events.contains(&AppEvent::ConfigSaveFailed(ConfigError::Io)));
    assert!(rig.hw.cues.contains(&Cue::SaveFailed));

    // Still failing: stays dirty.
    rig.run_for(SAVE_RETRY_MS as u32 + 100);
    assert!(rig.control.app().is_config_dirty());

    rig.store.storage_mut().fail_writes = false;
    rig.run_for(SAVE_RETRY_MS as u32 + 100);
    assert!(!rig.control.app().is_config_dirty());
    assert!(rig.sink.events.contains(&AppEvent::ConfigSaved { filter_sec: 30 }));

    let mut reopened = ConfigStore::new(rig.store.into_inner());
    assert_eq!(reopened.load().unwrap().filter_sec, 30);
}
