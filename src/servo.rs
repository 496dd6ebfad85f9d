//! A device abstraction for hobby positional servos (SG90 and similar).
//!
//! [`ServoController`] owns a [`PwmPort`] and the servo's commanded angle, pulse
//! width, and enable flag. Every operation is validated, drives the port, and
//! commits the new state only after the port accepted the change, all inside one
//! critical section. See [`ServoController`] for usage.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::calibration::CalibrationProfile;
use crate::duty::{MAX_DEGREES, duty_for_angle};
use crate::pwm_port::PwmPort;
use crate::{Error, Result};

/// Snapshot of a servo's committed state, returned by [`ServoController::read`].
///
/// `duty_ns` always equals [`duty_for_angle`]`(angle)` under the controller's profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(feature = "host"), derive(defmt::Format))]
pub struct ServoState {
    angle: u8,
    duty_ns: u32,
    enabled: bool,
}

impl ServoState {
    const fn initial(profile: &CalibrationProfile) -> Self {
        Self {
            angle: 0,
            duty_ns: profile.min_duty_ns(),
            enabled: false,
        }
    }

    /// Commanded angle (degrees, `0..=180`).
    #[must_use]
    pub const fn angle(&self) -> u8 {
        self.angle
    }

    /// Pulse width for [`angle`](Self::angle) (nanoseconds).
    #[must_use]
    pub const fn duty_ns(&self) -> u32 {
        self.duty_ns
    }

    /// Whether the PWM output is driven (Active).
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the PWM output is off (Standby). Always `!enabled()`.
    #[must_use]
    pub const fn standby(&self) -> bool {
        !self.enabled
    }
}

struct Inner<P> {
    state: ServoState,
    port: P,
}

/// A device abstraction for a servo on a PWM output.
///
/// The controller starts in Standby at 0° with the output disabled, so the servo
/// does not move until [`set_enabled(true)`](Self::set_enabled). Angles set while in
/// Standby are stored and programmed into the port, and take effect on enable.
///
/// All methods take `&self`; the controller is `Sync` when the port is `Send`, so it
/// can be shared between threads or tasks. Each call is one critical section: a
/// failed call leaves the state exactly as it was.
///
/// Dropping the controller disables the output and then releases the port.
///
/// # Example
///
/// ```rust
/// use pwm_servo::{Error, calibration::CalibrationProfile, pwm_port::host::HostPwm, servo::ServoController};
///
/// let (pwm, log) = HostPwm::new();
/// let servo = ServoController::new(pwm, CalibrationProfile::DEFAULT)?;
///
/// servo.set_angle(90)?; // stored and programmed, output still off
/// assert_eq!(servo.read().duty_ns(), 1_500_000);
/// assert!(!log.is_enabled());
///
/// servo.set_enabled(true)?; // servo moves to 90°
/// assert!(log.is_enabled());
///
/// assert_eq!(servo.set_angle(181), Err(Error::OutOfRange { degrees: 181 }));
/// assert_eq!(servo.read().angle(), 90);
/// # Ok::<(), Error>(())
/// ```
pub struct ServoController<P: PwmPort> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Inner<P>>>,
    profile: CalibrationProfile,
}

impl<P: PwmPort> ServoController<P> {
    /// Take ownership of `port` and program it for 0° in Standby.
    ///
    /// The port is configured with the 0° pulse and `profile`'s polarity; the output stays disabled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Hardware`] if the port rejects the initial configuration. The
    /// port is disabled and released before returning.
    pub fn new(port: P, profile: CalibrationProfile) -> Result<Self> {
        let controller = Self {
            inner: Mutex::new(RefCell::new(Inner {
                state: ServoState::initial(&profile),
                port,
            })),
            profile,
        };

        controller
            .with_inner(|inner| {
                inner
                    .port
                    .configure(inner.state.duty_ns, profile.period_ns())?;
                inner.port.set_polarity(profile.polarity())
            })
            .inspect_err(|err| warn!("servo: port setup failed: {}", err))?;

        info!(
            "servo: ready, period={}ns duty={}..{}ns",
            profile.period_ns(),
            profile.min_duty_ns(),
            profile.max_duty_ns()
        );
        Ok(controller)
    }

    fn with_inner<R>(&self, f: impl FnOnce(&mut Inner<P>) -> R) -> R {
        self.inner.lock(|inner| f(&mut *inner.borrow_mut()))
    }

    /// Move to `degrees` (`0..=180`).
    ///
    /// The new pulse is programmed into the port immediately. In Standby the output
    /// stays off and the servo moves on the next enable.
    ///
    /// See the [struct-level example](Self) for usage.
    ///
    /// # Errors
    ///
    /// - [`Error::OutOfRange`] if `degrees` is outside `0..=180`.
    /// - [`Error::Hardware`] if the port rejects the new pulse width.
    ///
    /// The stored angle and pulse width are unchanged on error.
    pub fn set_angle(&self, degrees: i32) -> Result<()> {
        self.with_inner(|inner| {
            let angle = u8::try_from(degrees)
                .ok()
                .filter(|angle| *angle <= MAX_DEGREES)
                .ok_or(Error::OutOfRange { degrees })?;
            let duty_ns = duty_for_angle(angle, &self.profile);

            inner
                .port
                .configure(duty_ns, self.profile.period_ns())
                .inspect_err(|err| warn!("servo: set_angle({}) failed: {}", angle, err))?;

            inner.state.angle = angle;
            inner.state.duty_ns = duty_ns;
            info!("servo: set_angle({}) -> {}ns", angle, duty_ns);
            Ok(())
        })
    }

    /// Move to 90°.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Hardware`] if the port rejects the new pulse width.
    pub fn center(&self) -> Result<()> {
        self.set_angle(i32::from(MAX_DEGREES / 2))
    }

    /// Switch between Active (`true`, output driven) and Standby (`false`, output off).
    ///
    /// Requesting the current mode does nothing and makes no port call. Enabling
    /// reprograms the stored pulse width before turning the output on.
    ///
    /// See the [struct-level example](Self) for usage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Hardware`] if the port fails; the mode is unchanged.
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.with_inner(|inner| {
            if inner.state.enabled == enabled {
                return Ok(());
            }

            let result = if enabled {
                inner
                    .port
                    .configure(inner.state.duty_ns, self.profile.period_ns())
                    .and_then(|()| inner.port.enable())
            } else {
                inner.port.disable()
            };
            result.inspect_err(|err| warn!("servo: set_enabled({}) failed: {}", enabled, err))?;

            inner.state.enabled = enabled;
            info!("servo: {}", if enabled { "active" } else { "standby" });
            Ok(())
        })
    }

    /// Snapshot of the last committed state.
    #[must_use]
    pub fn read(&self) -> ServoState {
        self.with_inner(|inner| inner.state)
    }

    /// The calibration this controller converts angles with.
    #[must_use]
    pub const fn profile(&self) -> CalibrationProfile {
        self.profile
    }
}

impl<P: PwmPort> Drop for ServoController<P> {
    fn drop(&mut self) {
        self.with_inner(|inner| {
            if let Err(err) = inner.port.disable() {
                warn!("servo: disable on release failed: {}", err);
            }
            inner.state.enabled = false;
        });
    }
}
