//! A [`PwmPort`] on an RP2040/RP235x PWM slice channel.
//!
//! Each slice has two channels (A and B) sharing one counter, so the slice runs a
//! single servo. Calculate which slice a pin uses: `slice = pin / 2`.

use embassy_rp::clocks::clk_sys_freq;
use embassy_rp::pwm::{Config, Pwm};
use fixed::FixedU16;
use fixed::types::extra::U4;

use super::{Polarity, PwmError, PwmPort, microsecond_divider};

// One counter tick per microsecond.
const TICK_NS: u32 = 1_000;

#[derive(Debug, Clone, Copy, defmt::Format)]
enum RpChannel {
    A,
    B,
}

/// A [`PwmPort`] on one channel of an `embassy-rp` PWM slice.
///
/// The slice counts in 1 µs ticks, so periods up to 65 536 µs and duties with
/// microsecond resolution are supported. Nanosecond remainders are truncated.
///
/// # Example
/// ```rust,no_run
/// # #![no_std]
/// # #![no_main]
/// use pwm_servo::{Result, calibration::CalibrationProfile, pwm_port::rp::RpPwm, servo::ServoController};
/// # use core::panic::PanicInfo;
/// # #[panic_handler]
/// # fn panic(_info: &PanicInfo) -> ! { loop {} }
/// fn example(p: embassy_rp::Peripherals) -> Result<()> {
///     // GPIO 15 is channel B of PWM slice 7.
///     let pwm = embassy_rp::pwm::Pwm::new_output_b(p.PWM_SLICE7, p.PIN_15, Default::default());
///     let servo = ServoController::new(RpPwm::new_output_b(pwm), CalibrationProfile::DEFAULT)?;
///     servo.set_angle(90)?;
///     servo.set_enabled(true)?;
///     Ok(())
/// }
/// ```
pub struct RpPwm<'d> {
    pwm: Pwm<'d>,
    cfg: Config, // Keep the divider; a default Config would reset it
    channel: RpChannel,
}

impl<'d> RpPwm<'d> {
    /// Use the A channel of a PWM slice.
    #[must_use]
    pub fn new_output_a(pwm: Pwm<'d>) -> Self {
        Self::init(pwm, RpChannel::A)
    }

    /// Use the B channel of a PWM slice.
    #[must_use]
    pub fn new_output_b(pwm: Pwm<'d>) -> Self {
        Self::init(pwm, RpChannel::B)
    }

    fn init(mut pwm: Pwm<'d>, channel: RpChannel) -> Self {
        let clk = clk_sys_freq(); // Hz
        // Aim for tick = 1 µs: divider = clk_sys / 1_000_000 (with /16 fractional)
        let divider = microsecond_divider(clk);

        let mut cfg = Config::default();
        cfg.phase_correct = false; // edge-aligned => exact 1 µs steps
        cfg.divider = FixedU16::<U4>::from_bits(divider);
        cfg.enable = false; // Standby until the controller enables it
        pwm.set_config(&cfg);

        info!(
            "RpPwm {:?} clk={}Hz div={}.{}/16",
            channel,
            clk,
            divider >> 4,
            divider & 0xF
        );

        Self { pwm, cfg, channel }
    }

    fn apply(&mut self) {
        self.pwm.set_config(&self.cfg);
    }
}

impl PwmPort for RpPwm<'_> {
    fn configure(&mut self, duty_ns: u32, period_ns: u32) -> Result<(), PwmError> {
        if period_ns == 0 || duty_ns > period_ns {
            return Err(PwmError::InvalidConfig);
        }
        let period_ticks = period_ns / TICK_NS;
        let top = period_ticks
            .checked_sub(1)
            .and_then(|top| u16::try_from(top).ok())
            .ok_or(PwmError::Unsupported)?;
        let compare = u16::try_from(duty_ns / TICK_NS).map_err(|_| PwmError::Unsupported)?;

        self.cfg.top = top;
        match self.channel {
            RpChannel::A => self.cfg.compare_a = compare,
            RpChannel::B => self.cfg.compare_b = compare,
        }
        self.apply();
        Ok(())
    }

    fn set_polarity(&mut self, polarity: Polarity) -> Result<(), PwmError> {
        let invert = polarity == Polarity::Inverted;
        match self.channel {
            RpChannel::A => self.cfg.invert_a = invert,
            RpChannel::B => self.cfg.invert_b = invert,
        }
        self.apply();
        Ok(())
    }

    fn enable(&mut self) -> Result<(), PwmError> {
        self.cfg.enable = true;
        self.apply();
        Ok(())
    }

    fn disable(&mut self) -> Result<(), PwmError> {
        self.cfg.enable = false;
        self.apply();
        Ok(())
    }
}
