use derive_more::{Display, Error, From};

use crate::pwm_port::PwmError;

/// Crate-wide result type.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors reported by servo control operations.
///
/// Every failed operation leaves the controller exactly as it was before the call.
#[derive(Debug, Display, Error, From, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(feature = "host"), derive(defmt::Format))]
pub enum Error {
    /// The requested angle is outside `0..=180` degrees.
    #[display("angle {degrees} is outside 0..=180 degrees")]
    OutOfRange {
        /// The rejected request.
        degrees: i32,
    },

    /// An attribute write could not be parsed.
    #[display("invalid attribute input")]
    InvalidInput,

    /// The PWM port rejected a call.
    #[display("PWM hardware error: {_0}")]
    #[from]
    Hardware(#[error(source)] PwmError),

    /// Calibration values violate `0 < min_duty_ns < max_duty_ns < period_ns`.
    #[display("calibration must satisfy 0 < min_duty_ns < max_duty_ns < period_ns")]
    InvalidCalibration,

    /// A calibration record could not be encoded or decoded.
    #[display("calibration record format error")]
    FormatError,

    /// A calibration record failed its magic or checksum check.
    #[display("calibration record is corrupted")]
    StorageCorrupted,
}
