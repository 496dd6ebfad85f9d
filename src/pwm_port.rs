//! The PWM hardware channel a [`ServoController`](crate::servo::ServoController) drives.
//!
//! The controller never discovers hardware itself. It is handed a [`PwmPort`] and owns
//! it until it is dropped. Three ports ship with the crate:
//!
//! - [`DutyCyclePwm`] — any `embedded-hal` 1.0 [`SetDutyCycle`](embedded_hal::pwm::SetDutyCycle) channel.
//! - [`RpPwm`](rp::RpPwm) — an RP2040/RP235x PWM slice channel (`pico1`/`pico2` features).
//! - [`HostPwm`](host::HostPwm) — a recording stand-in for tests (`host` feature).

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

mod duty_cycle;
#[cfg(feature = "host")]
pub mod host;
#[cfg(any(feature = "pico1", feature = "pico2"))]
pub mod rp;

pub use duty_cycle::DutyCyclePwm;

/// Errors reported by a [`PwmPort`].
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(feature = "host"), derive(defmt::Format))]
pub enum PwmError {
    /// The duty/period pair is not a valid PWM configuration (zero period, or duty longer than the period).
    #[display("invalid PWM configuration")]
    InvalidConfig,
    /// The hardware cannot represent the requested period or duty.
    #[display("PWM configuration not supported by hardware")]
    Unsupported,
    /// The generator rejected the write.
    #[display("PWM generator fault")]
    Fault,
}

/// Output signal polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(not(feature = "host"), derive(defmt::Format))]
pub enum Polarity {
    /// The signal is high for the duty portion of each cycle.
    #[default]
    Normal,
    /// The signal is low for the duty portion of each cycle.
    Inverted,
}

/// A PWM generator channel.
///
/// Calls are expected to complete in bounded time (a register or bus write). The
/// controller holds its lock across each call.
pub trait PwmPort {
    /// Program the generator with a pulse of `duty_ns` every `period_ns`.
    ///
    /// Callers pass `duty_ns <= period_ns`. Reprogramming does not change whether the output is enabled.
    ///
    /// # Errors
    ///
    /// Returns a [`PwmError`] if the generator rejects the configuration.
    fn configure(&mut self, duty_ns: u32, period_ns: u32) -> Result<(), PwmError>;

    /// Set the output polarity. Called once, while the output is disabled.
    ///
    /// # Errors
    ///
    /// Returns a [`PwmError`] if the generator rejects the change.
    fn set_polarity(&mut self, polarity: Polarity) -> Result<(), PwmError>;

    /// Start driving the output with the programmed duty and period.
    ///
    /// # Errors
    ///
    /// Returns a [`PwmError`] if the output could not be enabled.
    fn enable(&mut self) -> Result<(), PwmError>;

    /// Stop driving the output.
    ///
    /// # Errors
    ///
    /// Returns a [`PwmError`] if the output could not be disabled.
    fn disable(&mut self) -> Result<(), PwmError>;
}

/// Clock divider that turns `clk_hz` into 1 µs counter ticks, in sixteenths
/// (the 8.4 fixed-point format of an RP2040/RP235x PWM slice divider).
///
/// Rounded to the nearest 1/16, carrying into the integer part, and clamped to the
/// `1.0..=255.9375` range the slice accepts.
///
/// ```rust
/// use pwm_servo::pwm_port::microsecond_divider;
///
/// assert_eq!(microsecond_divider(125_000_000), 125 * 16);
/// assert_eq!(microsecond_divider(12_500_000), 12 * 16 + 8); // 12.5
/// ```
#[must_use]
pub const fn microsecond_divider(clk_hz: u32) -> u16 {
    const TICKS_PER_SECOND: u64 = 1_000_000;
    const MIN: u64 = 16;
    const MAX: u64 = 255 * 16 + 15;

    let sixteenths = (clk_hz as u64 * 16 + TICKS_PER_SECOND / 2) / TICKS_PER_SECOND;
    let sixteenths = if sixteenths < MIN {
        MIN
    } else if sixteenths > MAX {
        MAX
    } else {
        sixteenths
    };
    // <= MAX, which fits in u16
    sixteenths as u16
}
