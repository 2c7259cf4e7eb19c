//! RO filter rig firmware library.
//!
//! Exposes the pure-logic modules for integration testing and fuzzing.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module, so the whole crate builds and tests on the host.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod events;
pub mod fsm;
pub mod history;
pub mod pins;
pub mod scheduler;
pub mod valves;

pub mod adapters;
pub mod drivers;
