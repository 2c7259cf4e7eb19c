//! One-shot GPIO initialisation and raw pin access.
//!
//! Configures the valve, buzzer and button pins using raw ESP-IDF sys
//! calls.  Called once from `main()` before the control loop starts.
//! On host builds every function is a no-op that reports success, and
//! [`gpio_read`] returns the idle (pulled-up) level.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    GpioWriteFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::GpioWriteFailed(rc) => write!(f, "GPIO write failed (rc={})", rc),
        }
    }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the control loop; single-threaded.
    unsafe {
        init_gpio_outputs()?;
        init_gpio_inputs()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO Inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    let btn_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::BUTTON_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&btn_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }

    info!("hw_init: button input configured (GPIO{})", pins::BUTTON_GPIO);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin; safe to call from main context.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    true
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    // Relay inputs idle HIGH (valve closed); the buzzer idles LOW.
    let valve_idle = u32::from(pins::VALVE_ACTIVE_LOW);
    let outputs = [
        (pins::VALVE_FEED_GPIO, valve_idle),
        (pins::VALVE_FLUSH_GPIO, valve_idle),
        (pins::VALVE_DISPOSAL_GPIO, valve_idle),
        (pins::VALVE_OUTPUT_GPIO, valve_idle),
        (pins::BUZZER_GPIO, 0),
    ];

    for &(pin, idle) in &outputs {
        // Latch the idle level before the pin becomes an output so the
        // relays never see a glitch.
        unsafe { gpio_set_level(pin, idle) };
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
    }

    info!("hw_init: valve and buzzer outputs configured (all valves closed)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) -> Result<(), HwInitError> {
    // SAFETY: gpio_set_level writes to an already-configured output pin;
    // pin was validated during init_gpio_outputs(). Main-loop only.
    let ret = unsafe { gpio_set_level(pin, u32::from(high)) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioWriteFailed(ret));
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) -> Result<(), HwInitError> {
    Ok(())
}

// ── embedded-hal pin ────────────────────────────────────────

/// An output pin configured by [`init_peripherals`], exposed through the
/// `embedded-hal` digital traits so drivers stay generic over the pin.
///
/// The pin is configured input+output on the target, so
/// `is_set_high` reads the real pad level back.  On host the last
/// written level is remembered instead.
#[derive(Debug)]
pub struct RawPin {
    gpio: i32,
    #[cfg(not(target_os = "espidf"))]
    level: bool,
}

impl RawPin {
    /// Wrap an already-configured output.  `idle_high` must match the
    /// level latched during init.
    pub fn new(gpio: i32, idle_high: bool) -> Self {
        #[cfg(target_os = "espidf")]
        {
            let _ = idle_high;
            Self { gpio }
        }
        #[cfg(not(target_os = "espidf"))]
        {
            Self { gpio, level: idle_high }
        }
    }
}

impl embedded_hal::digital::Error for HwInitError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

impl embedded_hal::digital::ErrorType for RawPin {
    type Error = HwInitError;
}

impl embedded_hal::digital::OutputPin for RawPin {
    fn set_high(&mut self) -> Result<(), Self::Error> {
        gpio_write(self.gpio, true)?;
        #[cfg(not(target_os = "espidf"))]
        {
            self.level = true;
        }
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        gpio_write(self.gpio, false)?;
        #[cfg(not(target_os = "espidf"))]
        {
            self.level = false;
        }
        Ok(())
    }
}

impl embedded_hal::digital::StatefulOutputPin for RawPin {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        #[cfg(target_os = "espidf")]
        {
            Ok(gpio_read(self.gpio))
        }
        #[cfg(not(target_os = "espidf"))]
        {
            Ok(self.level)
        }
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        self.is_set_high().map(|high| !high)
    }
}
