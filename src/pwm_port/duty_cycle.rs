use embedded_hal::pwm::SetDutyCycle;

use super::{Polarity, PwmError, PwmPort};

/// A [`PwmPort`] over any `embedded-hal` 1.0 [`SetDutyCycle`] channel.
///
/// `SetDutyCycle` only knows the duty as a fraction of the channel's own period, so
/// the channel must already run at the servo frame rate (typically 50 Hz).
/// `configure` scales `duty_ns / period_ns` onto [`SetDutyCycle::max_duty_cycle`].
///
/// The channel has no enable bit: a disabled port holds the channel fully off and
/// re-applies the stored duty when enabled again. Every call on a disabled port
/// drives the channel off, so a channel handed over mid-pulse stops on the first
/// `configure`.
///
/// # Example
///
/// ```rust,no_run
/// use embedded_hal::pwm::SetDutyCycle;
/// use pwm_servo::{Result, calibration::CalibrationProfile, pwm_port::DutyCyclePwm, servo::ServoController};
///
/// fn example<P: SetDutyCycle>(channel: P) -> Result<()> {
///     let servo = ServoController::new(DutyCyclePwm::new(channel), CalibrationProfile::DEFAULT)?;
///     servo.set_angle(45)?;
///     servo.set_enabled(true)?;
///     Ok(())
/// }
/// ```
pub struct DutyCyclePwm<P> {
    pwm: P,
    duty_ns: u32,
    period_ns: u32,
    polarity: Polarity,
    enabled: bool,
}

impl<P: SetDutyCycle> DutyCyclePwm<P> {
    /// Wrap a channel. The port starts disabled; the channel is forced off by the first call.
    #[must_use]
    pub const fn new(pwm: P) -> Self {
        Self {
            pwm,
            duty_ns: 0,
            period_ns: 0,
            polarity: Polarity::Normal,
            enabled: false,
        }
    }

    /// Borrow the wrapped channel.
    #[must_use]
    pub const fn channel(&self) -> &P {
        &self.pwm
    }

    /// Mutably borrow the wrapped channel.
    pub const fn channel_mut(&mut self) -> &mut P {
        &mut self.pwm
    }

    /// Give back the wrapped channel.
    #[must_use]
    pub fn into_channel(self) -> P {
        self.pwm
    }

    /// Channel duty level for the stored duty/period, after polarity.
    fn level(&self) -> Result<u16, PwmError> {
        if self.period_ns == 0 {
            return Err(PwmError::InvalidConfig);
        }
        let max = u64::from(self.pwm.max_duty_cycle());
        // duty_ns <= period_ns, so the quotient never exceeds max
        let high = u64::from(self.duty_ns) * max / u64::from(self.period_ns);
        let level = match self.polarity {
            Polarity::Normal => high,
            Polarity::Inverted => max.saturating_sub(high),
        };
        u16::try_from(level).map_err(|_| PwmError::Unsupported)
    }

    fn apply(&mut self) -> Result<(), PwmError> {
        let level = self.level()?;
        self.pwm
            .set_duty_cycle(level)
            .map_err(|_| PwmError::Fault)
    }

    fn off(&mut self) -> Result<(), PwmError> {
        self.pwm
            .set_duty_cycle_fully_off()
            .map_err(|_| PwmError::Fault)
    }

    /// Drive the channel to match `enabled`: the stored level, or fully off.
    fn sync(&mut self) -> Result<(), PwmError> {
        if self.enabled {
            self.apply()
        } else {
            self.off()
        }
    }
}

impl<P: SetDutyCycle> PwmPort for DutyCyclePwm<P> {
    fn configure(&mut self, duty_ns: u32, period_ns: u32) -> Result<(), PwmError> {
        if period_ns == 0 || duty_ns > period_ns {
            return Err(PwmError::InvalidConfig);
        }
        let previous = (self.duty_ns, self.period_ns);
        self.duty_ns = duty_ns;
        self.period_ns = period_ns;
        self.sync().inspect_err(|_| {
            (self.duty_ns, self.period_ns) = previous;
        })
    }

    fn set_polarity(&mut self, polarity: Polarity) -> Result<(), PwmError> {
        let previous = self.polarity;
        self.polarity = polarity;
        self.sync().inspect_err(|_| self.polarity = previous)
    }

    fn enable(&mut self) -> Result<(), PwmError> {
        self.apply()?;
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<(), PwmError> {
        self.off()?;
        self.enabled = false;
        Ok(())
    }
}
