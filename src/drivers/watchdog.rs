//! Control-loop stall guard on the ESP-IDF task watchdog (TWDT).
//!
//! If the loop stops calling [`Watchdog::feed`] for [`TIMEOUT_MS`] the
//! chip panics and reboots.  Relay lines are pulled up across the reset,
//! so a hung controller ends with every valve closed.
//!
//! On top of the hardware timer the guard tracks the longest gap between
//! feeds and warns when the loop gets within half of the timeout.

use log::{info, warn};

/// Stall budget.  Far above one 20 ms loop iteration.
pub const TIMEOUT_MS: u32 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogError {
    /// `esp_task_wdt_add` rejected the current task.
    SubscribeFailed(i32),
}

impl core::fmt::Display for WatchdogError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SubscribeFailed(rc) => write!(f, "TWDT subscribe failed (rc={})", rc),
        }
    }
}

pub struct Watchdog {
    armed: bool,
    last_feed_ms: Option<u32>,
    worst_gap_ms: u32,
}

impl Watchdog {
    /// Subscribe the calling task to the TWDT with [`TIMEOUT_MS`].
    #[cfg(target_os = "espidf")]
    pub fn arm() -> Result<Self, WatchdogError> {
        use esp_idf_svc::sys::{
            esp_task_wdt_add, esp_task_wdt_config_t, esp_task_wdt_reconfigure, ESP_OK,
        };

        let cfg = esp_task_wdt_config_t {
            timeout_ms: TIMEOUT_MS,
            idle_core_mask: 0,
            trigger_panic: true,
        };
        // SAFETY: called once from main() before the loop starts.
        let rc = unsafe { esp_task_wdt_reconfigure(&cfg) };
        if rc != ESP_OK {
            // The bootloader config stays in force.
            warn!("Watchdog: reconfigure returned {}", rc);
        }
        // SAFETY: a null handle subscribes the current task.
        let rc = unsafe { esp_task_wdt_add(core::ptr::null_mut()) };
        if rc != ESP_OK {
            return Err(WatchdogError::SubscribeFailed(rc));
        }
        info!("Watchdog: armed, {}ms", TIMEOUT_MS);
        Ok(Self::with_armed(true))
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn arm() -> Result<Self, WatchdogError> {
        info!("Watchdog(sim): stall tracking only");
        Ok(Self::with_armed(true))
    }

    /// A guard that tracks stalls but never resets the chip.
    pub fn disarmed() -> Self {
        Self::with_armed(false)
    }

    fn with_armed(armed: bool) -> Self {
        Self {
            armed,
            last_feed_ms: None,
            worst_gap_ms: 0,
        }
    }

    /// Reset the TWDT.  `now_ms` is the loop clock.
    pub fn feed(&mut self, now_ms: u32) {
        if let Some(last) = self.last_feed_ms {
            let gap = now_ms.wrapping_sub(last);
            if gap > self.worst_gap_ms {
                self.worst_gap_ms = gap;
                if gap >= TIMEOUT_MS / 2 {
                    warn!("Watchdog: loop stalled {}ms (timeout {}ms)", gap, TIMEOUT_MS);
                }
            }
        }
        self.last_feed_ms = Some(now_ms);

        #[cfg(target_os = "espidf")]
        {
            if self.armed {
                // SAFETY: the current task was subscribed in `arm()`.
                unsafe {
                    esp_idf_svc::sys::esp_task_wdt_reset();
                }
            }
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Longest interval seen between two feeds.
    pub fn worst_gap_ms(&self) -> u32 {
        self.worst_gap_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_worst_gap() {
        let mut wd = Watchdog::arm().unwrap();
        assert!(wd.is_armed());
        wd.feed(100);
        wd.feed(120);
        wd.feed(3_120);
        wd.feed(3_140);
        assert_eq!(wd.worst_gap_ms(), 3_000);
    }

    #[test]
    fn gap_survives_clock_wrap() {
        let mut wd = Watchdog::disarmed();
        wd.feed(u32::MAX - 10);
        wd.feed(10);
        assert_eq!(wd.worst_gap_ms(), 21);
        assert!(!wd.is_armed());
    }
}
