//! RO filter rig firmware — main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  HardwareAdapter     LogEventSink   ConfigStore<NvsAdapter>  │
//! │  (Valve + Cue)       (EventSink)    (ConfigPort)             │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ─────────────────       │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │  ControlLoop: button · auto-flush · event queue    │      │
//! │  │      └─▶ AppService: FSM · run history · saves     │      │
//! │  └────────────────────────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use log::{error, info, warn};

use rofilter::adapters::config_store::ConfigStore;
use rofilter::adapters::hardware::HardwareAdapter;
use rofilter::adapters::log_sink::LogEventSink;
use rofilter::adapters::nvs::NvsAdapter;
use rofilter::adapters::time::UptimeClock;
use rofilter::app::ports::ConfigPort;
use rofilter::config::{FilterConfig, POLL_INTERVAL_MS};
use rofilter::control::ControlLoop;
use rofilter::drivers::button::ButtonDriver;
use rofilter::drivers::{hw_init, watchdog::Watchdog};
use rofilter::pins;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("RO filter v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Outputs first: every valve latched closed ──────────
    if let Err(e) = hw_init::init_peripherals() {
        // No watchdog yet; halt with the valves at their pulled-up level.
        error!("HAL init failed: {}, halting", e);
        loop {
            FreeRtos::delay_ms(1000);
        }
    }
    let mut watchdog = Watchdog::arm().unwrap_or_else(|e| {
        warn!("{}, running without stall reset", e);
        Watchdog::disarmed()
    });

    // ── 3. Load config (defaults on any failure) ──────────────
    let nvs = NvsAdapter::new().map_err(|e| anyhow::anyhow!("NVS init failed: {}", e))?;
    let mut store = ConfigStore::new(nvs);
    let config = store.load().unwrap_or_else(|e| {
        warn!("Config load failed ({}), running with defaults", e);
        FilterConfig::default()
    });
    info!(
        "Config: flush={}s disposal={}s filter={}s auto_flush={}s water_clean={}s",
        config.flush_sec,
        config.disposal_sec,
        config.filter_sec,
        config.auto_flush_sec,
        config.water_clean_sec
    );

    // ── 4. Construct adapters and the control loop ────────────
    let mut hw = HardwareAdapter::from_pins();
    let mut sink = LogEventSink::new();
    let clock = UptimeClock::new();

    let mut control = ControlLoop::new(config, ButtonDriver::new(pins::BUTTON_GPIO));
    control.start(&mut hw, &mut sink);

    info!("System ready. Entering control loop.");

    // ── 5. Control loop ───────────────────────────────────────
    let mut last_ms = clock.now_ms();
    loop {
        let now_ms = clock.now_ms();
        let pressed = control.button().read_pressed();
        control.step(now_ms, pressed, &mut hw, &mut store, &mut sink);

        hw.tick(now_ms.wrapping_sub(last_ms));
        last_ms = now_ms;

        watchdog.feed(now_ms);
        FreeRtos::delay_ms(POLL_INTERVAL_MS);
    }
}
