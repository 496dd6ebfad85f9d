//! Angle-addressed control for hobby positional servos driven by a PWM output.
//!
//! The crate turns a requested angle (0–180°) into a PWM pulse width, keeps a
//! standby switch for the output, and exposes both as `angle`/`standby` attributes
//! for a file-like control surface. See [`servo::ServoController`] for usage.
//!
//! # Glossary
//!
//! - **Duty (ns):** length of the high part of each PWM cycle, in nanoseconds. Hobby
//!   servos read the pulse width, typically 0.5 ms (0°) to 2.5 ms (180°).
//! - **Period (ns):** total PWM cycle length. 20 ms (50 Hz) for most servos.
//! - **Standby:** PWM output disabled. The servo relaxes and can be moved by hand.
//! - **[PWM port](pwm_port::PwmPort):** the hardware channel the controller drives.
#![cfg_attr(not(feature = "host"), no_std)]

// Compile-time checks: at most one board, and never a board together with host
#[cfg(all(feature = "pico1", feature = "pico2"))]
compile_error!("Cannot enable both 'pico1' and 'pico2' features simultaneously");

#[cfg(all(feature = "host", any(feature = "pico1", feature = "pico2")))]
compile_error!(
    "The 'host' feature cannot be combined with a board feature; build with --no-default-features"
);

#[macro_use]
mod log;

pub mod attribute;
pub mod calibration;
pub mod duty;
mod error;
pub mod pwm_port;
pub mod servo;

// Re-export error types and result (used throughout)
pub use crate::error::{Error, Result};
