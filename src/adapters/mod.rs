//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to              |
//! |----------------|--------------------|--------------------------|
//! | `hardware`     | ValvePort          | Relay lines (GPIO)       |
//! |                | CuePort            | Piezo buzzer (GPIO)      |
//! | `log_sink`     | EventSink          | Serial log output        |
//! | `nvs`          | StoragePort        | NVS / in-memory store    |
//! | `config_store` | ConfigPort         | A/B slots on StoragePort |
//! | `time`         | —                  | ESP32 system timer       |

pub mod config_store;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
