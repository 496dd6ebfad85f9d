//! Pulse-width calibration for a servo, and its checksummed binary record.
//!
//! A [`CalibrationProfile`] fixes the PWM period and the pulse widths that correspond
//! to 0° and 180°. Build one with [`CalibrationProfile::new`] or the keyword-driven
//! [`calibration!`] macro.
//!
//! Profiles can be stored as a small record (magic, length, `postcard` payload,
//! CRC-32) with [`CalibrationProfile::to_record`] and read back with
//! [`CalibrationProfile::from_record`]. Decoding re-checks the profile invariant.
//!
//! Only the profile is stored. A controller's angle and enable flag are never
//! persisted: every [`ServoController`](crate::servo::ServoController) starts at 0°
//! in Standby.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::pwm_port::Polarity;
use crate::{Error, Result};

/// Default PWM period (nanoseconds): 20 ms, 50 Hz.
pub const DEFAULT_PERIOD_NS: u32 = 20_000_000;

/// Default pulse width at 0° (nanoseconds).
pub const DEFAULT_MIN_DUTY_NS: u32 = 500_000;

/// Default pulse width at 180° (nanoseconds).
pub const DEFAULT_MAX_DUTY_NS: u32 = 2_500_000;

const MAGIC: u32 = 0x5352_564F; // 'SRVO'
const HEADER_SIZE: usize = 4 + 2; // Magic + PayloadLen
const CRC_SIZE: usize = 4;
const MAX_PAYLOAD_SIZE: usize = 3 * 5 + 1; // three varint u32s + polarity tag

/// Largest encoded calibration record, in bytes.
pub const RECORD_MAX_LEN: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE + CRC_SIZE;

/// Create a [`CalibrationProfile`] with keyword arguments and default values.
///
/// All fields are optional: `period_ns`, `min_duty_ns`, `max_duty_ns` (defaults
/// [`DEFAULT_PERIOD_NS`], [`DEFAULT_MIN_DUTY_NS`], [`DEFAULT_MAX_DUTY_NS`]) and
/// `polarity: Normal` / `polarity: Inverted`.
///
/// Expands to a `Result<CalibrationProfile>` and can be used in `const` items.
///
/// # Example
///
/// ```rust
/// use pwm_servo::{calibration, calibration::CalibrationProfile, Result};
///
/// // An MG996R-style servo: 1.0 ms..2.0 ms pulses in a 20 ms frame.
/// const MG996R: Result<CalibrationProfile> = calibration! {
///     min_duty_ns: 1_000_000,
///     max_duty_ns: 2_000_000,
/// };
///
/// let profile = MG996R?;
/// assert_eq!(profile.period_ns(), 20_000_000);
/// # Ok::<(), pwm_servo::Error>(())
/// ```
#[macro_export]
macro_rules! calibration {
    ($($tt:tt)*) => { $crate::__calibration_impl! {
        @__fill_defaults
        period_ns: $crate::calibration::DEFAULT_PERIOD_NS,
        min_duty_ns: $crate::calibration::DEFAULT_MIN_DUTY_NS,
        max_duty_ns: $crate::calibration::DEFAULT_MAX_DUTY_NS,
        polarity: Normal,
        fields: [ $($tt)* ]
    } };
}
#[doc(inline)]
pub use calibration;

// Public for macro expansion in downstream crates.
#[doc(hidden)]
#[macro_export]
macro_rules! __calibration_impl {
    (@__fill_defaults
        period_ns: $period_ns:expr,
        min_duty_ns: $min_duty_ns:expr,
        max_duty_ns: $max_duty_ns:expr,
        polarity: $polarity:ident,
        fields: [ ]
    ) => {
        match $crate::calibration::CalibrationProfile::new($period_ns, $min_duty_ns, $max_duty_ns) {
            ::core::result::Result::Ok(profile) => ::core::result::Result::Ok(
                profile.with_polarity($crate::pwm_port::Polarity::$polarity),
            ),
            ::core::result::Result::Err(err) => ::core::result::Result::Err(err),
        }
    };

    (@__fill_defaults
        period_ns: $period_ns:expr,
        min_duty_ns: $min_duty_ns:expr,
        max_duty_ns: $max_duty_ns:expr,
        polarity: $polarity:ident,
        fields: [ period_ns: $value:expr $(, $($rest:tt)*)? ]
    ) => {
        $crate::__calibration_impl! {
            @__fill_defaults
            period_ns: $value,
            min_duty_ns: $min_duty_ns,
            max_duty_ns: $max_duty_ns,
            polarity: $polarity,
            fields: [ $($($rest)*)? ]
        }
    };

    (@__fill_defaults
        period_ns: $period_ns:expr,
        min_duty_ns: $min_duty_ns:expr,
        max_duty_ns: $max_duty_ns:expr,
        polarity: $polarity:ident,
        fields: [ min_duty_ns: $value:expr $(, $($rest:tt)*)? ]
    ) => {
        $crate::__calibration_impl! {
            @__fill_defaults
            period_ns: $period_ns,
            min_duty_ns: $value,
            max_duty_ns: $max_duty_ns,
            polarity: $polarity,
            fields: [ $($($rest)*)? ]
        }
    };

    (@__fill_defaults
        period_ns: $period_ns:expr,
        min_duty_ns: $min_duty_ns:expr,
        max_duty_ns: $max_duty_ns:expr,
        polarity: $polarity:ident,
        fields: [ max_duty_ns: $value:expr $(, $($rest:tt)*)? ]
    ) => {
        $crate::__calibration_impl! {
            @__fill_defaults
            period_ns: $period_ns,
            min_duty_ns: $min_duty_ns,
            max_duty_ns: $value,
            polarity: $polarity,
            fields: [ $($($rest)*)? ]
        }
    };

    (@__fill_defaults
        period_ns: $period_ns:expr,
        min_duty_ns: $min_duty_ns:expr,
        max_duty_ns: $max_duty_ns:expr,
        polarity: $polarity:ident,
        fields: [ polarity: Normal $(, $($rest:tt)*)? ]
    ) => {
        $crate::__calibration_impl! {
            @__fill_defaults
            period_ns: $period_ns,
            min_duty_ns: $min_duty_ns,
            max_duty_ns: $max_duty_ns,
            polarity: Normal,
            fields: [ $($($rest)*)? ]
        }
    };

    (@__fill_defaults
        period_ns: $period_ns:expr,
        min_duty_ns: $min_duty_ns:expr,
        max_duty_ns: $max_duty_ns:expr,
        polarity: $polarity:ident,
        fields: [ polarity: Inverted $(, $($rest:tt)*)? ]
    ) => {
        $crate::__calibration_impl! {
            @__fill_defaults
            period_ns: $period_ns,
            min_duty_ns: $min_duty_ns,
            max_duty_ns: $max_duty_ns,
            polarity: Inverted,
            fields: [ $($($rest)*)? ]
        }
    };

    (@__fill_defaults
        period_ns: $period_ns:expr,
        min_duty_ns: $min_duty_ns:expr,
        max_duty_ns: $max_duty_ns:expr,
        polarity: $polarity:ident,
        fields: [ $($unknown:tt)* ]
    ) => {
        compile_error!(
            "calibration! accepts only `period_ns`, `min_duty_ns`, `max_duty_ns`, and `polarity: Normal | Inverted`"
        )
    };
}

/// PWM timing for one servo.
///
/// Invariant: `0 < min_duty_ns < max_duty_ns < period_ns`. Every constructor
/// (including record decoding) enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(not(feature = "host"), derive(defmt::Format))]
pub struct CalibrationProfile {
    period_ns: u32,
    min_duty_ns: u32,
    max_duty_ns: u32,
    polarity: Polarity,
}

impl CalibrationProfile {
    /// 20 ms period, 0.5 ms at 0°, 2.5 ms at 180°, normal polarity.
    pub const DEFAULT: Self = Self {
        period_ns: DEFAULT_PERIOD_NS,
        min_duty_ns: DEFAULT_MIN_DUTY_NS,
        max_duty_ns: DEFAULT_MAX_DUTY_NS,
        polarity: Polarity::Normal,
    };

    /// Create a profile with normal polarity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCalibration`] unless `0 < min_duty_ns < max_duty_ns < period_ns`.
    pub const fn new(period_ns: u32, min_duty_ns: u32, max_duty_ns: u32) -> Result<Self> {
        if 0 < min_duty_ns && min_duty_ns < max_duty_ns && max_duty_ns < period_ns {
            Ok(Self {
                period_ns,
                min_duty_ns,
                max_duty_ns,
                polarity: Polarity::Normal,
            })
        } else {
            Err(Error::InvalidCalibration)
        }
    }

    /// The same timing with a different output polarity.
    #[must_use]
    pub const fn with_polarity(self, polarity: Polarity) -> Self {
        Self { polarity, ..self }
    }

    /// Total PWM cycle length (nanoseconds).
    #[must_use]
    pub const fn period_ns(&self) -> u32 {
        self.period_ns
    }

    /// Pulse width at 0° (nanoseconds).
    #[must_use]
    pub const fn min_duty_ns(&self) -> u32 {
        self.min_duty_ns
    }

    /// Pulse width at 180° (nanoseconds).
    #[must_use]
    pub const fn max_duty_ns(&self) -> u32 {
        self.max_duty_ns
    }

    /// Output polarity applied when the controller acquires its port.
    #[must_use]
    pub const fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Encode as a checksummed record. The record holds the timing and polarity only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FormatError`] if the profile cannot be serialized.
    pub fn to_record(&self) -> Result<Vec<u8, RECORD_MAX_LEN>> {
        let mut payload_buf = [0_u8; MAX_PAYLOAD_SIZE];
        let payload =
            postcard::to_slice(self, &mut payload_buf).map_err(|_| Error::FormatError)?;
        let payload_len = u16::try_from(payload.len()).map_err(|_| Error::FormatError)?;

        let mut record = Vec::new();
        record
            .extend_from_slice(&MAGIC.to_le_bytes())
            .and_then(|()| record.extend_from_slice(&payload_len.to_le_bytes()))
            .and_then(|()| record.extend_from_slice(payload))
            .map_err(|()| Error::FormatError)?;
        let crc = crc32fast::hash(&record);
        record
            .extend_from_slice(&crc.to_le_bytes())
            .map_err(|()| Error::FormatError)?;
        Ok(record)
    }

    /// Decode a record written by [`to_record`](Self::to_record).
    ///
    /// # Errors
    ///
    /// - [`Error::StorageCorrupted`] if the magic, length, or checksum do not match.
    /// - [`Error::FormatError`] if the payload does not decode.
    /// - [`Error::InvalidCalibration`] if the decoded values break the profile invariant.
    pub fn from_record(record: &[u8]) -> Result<Self> {
        let body_len = record
            .len()
            .checked_sub(CRC_SIZE)
            .ok_or(Error::StorageCorrupted)?;
        let (body, crc_bytes) = record
            .split_at_checked(body_len)
            .ok_or(Error::StorageCorrupted)?;
        let (header, payload) = body
            .split_at_checked(HEADER_SIZE)
            .ok_or(Error::StorageCorrupted)?;
        let (magic_bytes, len_bytes) = header.split_at_checked(4).ok_or(Error::StorageCorrupted)?;

        let magic = u32::from_le_bytes(le_array(magic_bytes)?);
        if magic != MAGIC {
            return Err(Error::StorageCorrupted);
        }
        if usize::from(u16::from_le_bytes(le_array(len_bytes)?)) != payload.len() {
            return Err(Error::StorageCorrupted);
        }
        if crc32fast::hash(body) != u32::from_le_bytes(le_array(crc_bytes)?) {
            return Err(Error::StorageCorrupted);
        }

        let decoded: Self = postcard::from_bytes(payload).map_err(|_| Error::FormatError)?;
        Ok(Self::new(decoded.period_ns, decoded.min_duty_ns, decoded.max_duty_ns)?
            .with_polarity(decoded.polarity))
    }
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn le_array<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| Error::StorageCorrupted)
}
