//! A file-like attribute surface for a [`ServoController`].
//!
//! Two attributes, each read and written as short decimal text:
//!
//! | name      | read                        | write                                       |
//! |-----------|-----------------------------|---------------------------------------------|
//! | `angle`   | commanded angle, `0`..`180` | decimal angle, delegates to `set_angle`     |
//! | `standby` | `1` in Standby, `0` Active  | `1` = `set_enabled(false)`, `0` = `set_enabled(true)` |
//!
//! Writes accept an optional leading `+` and one trailing newline (so `echo 90 >`
//! style writes work). Nothing else is trimmed.
//!
//! # Example
//!
//! ```rust
//! use pwm_servo::{attribute::Attribute, calibration::CalibrationProfile, pwm_port::host::HostPwm, servo::ServoController};
//!
//! let (pwm, _log) = HostPwm::new();
//! let servo = ServoController::new(pwm, CalibrationProfile::DEFAULT)?;
//!
//! assert_eq!(servo.store(Attribute::Angle, "45\n")?, 3);
//! assert_eq!(servo.store(Attribute::Standby, "0")?, 1);
//! assert_eq!(servo.show(Attribute::Angle), "45\n");
//! assert_eq!(servo.show(Attribute::Standby), "0\n");
//! # Ok::<(), pwm_servo::Error>(())
//! ```

use core::fmt::Write;

use heapless::String;

use crate::pwm_port::PwmPort;
use crate::servo::ServoController;
use crate::{Error, Result};

/// Capacity of the text returned by [`ServoController::show`].
pub const SHOW_MAX_LEN: usize = 8;

/// The attributes a [`ServoController`] exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(feature = "host"), derive(defmt::Format))]
pub enum Attribute {
    /// Commanded angle in degrees.
    Angle,
    /// Standby switch: `1` when the output is off.
    Standby,
}

impl Attribute {
    /// Every attribute, in listing order.
    pub const ALL: [Self; 2] = [Self::Angle, Self::Standby];

    /// File name of the attribute.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Angle => "angle",
            Self::Standby => "standby",
        }
    }

    /// Look an attribute up by file name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|attribute| attribute.name() == name)
    }
}

impl<P: PwmPort> ServoController<P> {
    /// Read an attribute as decimal text with a trailing newline. No side effects.
    #[must_use]
    pub fn show(&self, attribute: Attribute) -> String<SHOW_MAX_LEN> {
        let state = self.read();
        let value = match attribute {
            Attribute::Angle => state.angle(),
            Attribute::Standby => u8::from(state.standby()),
        };
        let mut text = String::new();
        // At most "255\n"
        if writeln!(text, "{value}").is_err() {
            text.clear();
        }
        text
    }

    /// Write an attribute from text and return the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] if the text is not a decimal integer, or `standby` gets anything but `0`/`1`.
    /// - [`Error::OutOfRange`] if `angle` gets a number outside `0..=180`.
    /// - [`Error::Hardware`] if the port rejects the change.
    ///
    /// The controller is unchanged on error.
    pub fn store(&self, attribute: Attribute, input: &str) -> Result<usize> {
        let text = input.strip_suffix('\n').unwrap_or(input);
        match attribute {
            Attribute::Angle => {
                let degrees = text.parse::<i32>().map_err(|_| Error::InvalidInput)?;
                self.set_angle(degrees)?;
            }
            Attribute::Standby => match text.parse::<u32>() {
                Ok(0) => self.set_enabled(true)?,
                Ok(1) => self.set_enabled(false)?,
                _ => return Err(Error::InvalidInput),
            },
        }
        Ok(input.len())
    }
}
