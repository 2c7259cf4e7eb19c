//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the business rules of the rig: FSM orchestration,
//! save handling and actuator-fault recovery.  All interaction with
//! hardware happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
