//! Angle to pulse-width conversion.

use crate::calibration::CalibrationProfile;

/// Largest commandable angle (degrees). The smallest is 0.
pub const MAX_DEGREES: u8 = 180;

/// Pulse width (nanoseconds) for `degrees` under `profile`.
///
/// `min_duty_ns + (max_duty_ns - min_duty_ns) * degrees / 180`, in integer arithmetic
/// with the multiplication before the (flooring) division, so no per-degree step is
/// truncated. Callers validate `degrees <= 180`; larger values are clamped.
///
/// # Example
///
/// ```rust
/// use pwm_servo::{calibration::CalibrationProfile, duty::duty_for_angle};
///
/// let profile = CalibrationProfile::DEFAULT;
/// assert_eq!(duty_for_angle(0, &profile), 500_000);
/// assert_eq!(duty_for_angle(90, &profile), 1_500_000);
/// assert_eq!(duty_for_angle(180, &profile), 2_500_000);
/// ```
#[must_use]
pub const fn duty_for_angle(degrees: u8, profile: &CalibrationProfile) -> u32 {
    let degrees = if degrees > MAX_DEGREES {
        MAX_DEGREES
    } else {
        degrees
    };
    let min = profile.min_duty_ns() as u64;
    let span = profile.max_duty_ns() as u64 - min;
    let duty = min + span * degrees as u64 / MAX_DEGREES as u64;
    // duty <= max_duty_ns, which is a u32
    duty as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coarse_step_is_not_truncated() {
        // 1_000_001 ns over 180° is not a whole number of ns per degree.
        let profile = CalibrationProfile::new(20_000_000, 1, 1_000_002).unwrap();
        assert_eq!(duty_for_angle(1, &profile), 1 + 1_000_001 / 180);
        assert_eq!(duty_for_angle(179, &profile), 1 + 1_000_001 * 179 / 180);
        assert_eq!(duty_for_angle(180, &profile), 1_000_002);
    }

    #[test]
    fn angles_past_the_range_clamp_to_max() {
        let profile = CalibrationProfile::DEFAULT;
        assert_eq!(duty_for_angle(u8::MAX, &profile), profile.max_duty_ns());
    }
}
