//! A recording [`PwmPort`] for running servo code on a development machine.
//!
//! [`HostPwm`] hands out a cloneable [`HostPwmLog`] so a test can keep watching the
//! port after the controller has taken ownership of it (and after the controller is
//! dropped).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Polarity, PwmError, PwmPort};

/// One call made on a [`HostPwm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmCall {
    /// `configure(duty_ns, period_ns)`
    Configure {
        /// Requested duty in nanoseconds.
        duty_ns: u32,
        /// Requested period in nanoseconds.
        period_ns: u32,
    },
    /// `set_polarity(polarity)`
    SetPolarity(Polarity),
    /// `enable()`
    Enable,
    /// `disable()`
    Disable,
}

/// Which [`PwmPort`] method a fault is injected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmOp {
    /// [`PwmPort::configure`]
    Configure,
    /// [`PwmPort::set_polarity`]
    SetPolarity,
    /// [`PwmPort::enable`]
    Enable,
    /// [`PwmPort::disable`]
    Disable,
}

#[derive(Debug, Default)]
struct Recorded {
    calls: Vec<PwmCall>,
    duty_ns: u32,
    period_ns: u32,
    polarity: Polarity,
    enabled: bool,
    faults: Vec<(PwmOp, PwmError)>,
}

/// Shared view of everything a [`HostPwm`] has been asked to do.
#[derive(Debug, Clone, Default)]
pub struct HostPwmLog(Arc<Mutex<Recorded>>);

impl HostPwmLog {
    fn recorded(&self) -> MutexGuard<'_, Recorded> {
        // A test thread that panicked mid-call leaves the log usable.
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every call accepted or rejected so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<PwmCall> {
        self.recorded().calls.clone()
    }

    /// Number of recorded calls to `op`, failed ones included.
    #[must_use]
    pub fn count(&self, op: PwmOp) -> usize {
        self.recorded()
            .calls
            .iter()
            .filter(|call| PwmOp::of(call) == op)
            .count()
    }

    /// Whether the simulated output is currently driven.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.recorded().enabled
    }

    /// Last successfully programmed `(duty_ns, period_ns)`.
    #[must_use]
    pub fn config(&self) -> (u32, u32) {
        let recorded = self.recorded();
        (recorded.duty_ns, recorded.period_ns)
    }

    /// Last successfully applied polarity.
    #[must_use]
    pub fn polarity(&self) -> Polarity {
        self.recorded().polarity
    }

    /// Make the next call to `op` fail with `error`. Faults queue up and are consumed in order.
    pub fn fail_next(&self, op: PwmOp, error: PwmError) {
        self.recorded().faults.push((op, error));
    }

    /// Drop any faults not yet consumed.
    pub fn clear_faults(&self) {
        self.recorded().faults.clear();
    }
}

impl PwmOp {
    const fn of(call: &PwmCall) -> Self {
        match call {
            PwmCall::Configure { .. } => Self::Configure,
            PwmCall::SetPolarity(_) => Self::SetPolarity,
            PwmCall::Enable => Self::Enable,
            PwmCall::Disable => Self::Disable,
        }
    }
}

/// A simulated PWM channel that records calls instead of touching hardware.
///
/// # Example
///
/// ```rust
/// use pwm_servo::{calibration::CalibrationProfile, pwm_port::host::{HostPwm, PwmOp}, servo::ServoController};
///
/// let (pwm, log) = HostPwm::new();
/// let servo = ServoController::new(pwm, CalibrationProfile::DEFAULT).unwrap();
/// servo.set_enabled(true).unwrap();
/// assert!(log.is_enabled());
///
/// drop(servo);
/// assert!(!log.is_enabled());
/// assert_eq!(log.count(PwmOp::Disable), 1);
/// ```
#[derive(Debug)]
pub struct HostPwm {
    log: HostPwmLog,
}

impl HostPwm {
    /// Create a port and the log handle that watches it.
    #[must_use]
    pub fn new() -> (Self, HostPwmLog) {
        let log = HostPwmLog::default();
        (Self { log: log.clone() }, log)
    }

    fn record(
        &self,
        call: PwmCall,
        apply: impl FnOnce(&mut Recorded) -> Result<(), PwmError>,
    ) -> Result<(), PwmError> {
        let mut recorded = self.log.recorded();
        recorded.calls.push(call);
        let op = PwmOp::of(&call);
        if let Some(index) = recorded.faults.iter().position(|(fault_op, _)| *fault_op == op) {
            let (_, error) = recorded.faults.remove(index);
            return Err(error);
        }
        apply(&mut *recorded)
    }
}

impl PwmPort for HostPwm {
    fn configure(&mut self, duty_ns: u32, period_ns: u32) -> Result<(), PwmError> {
        self.record(PwmCall::Configure { duty_ns, period_ns }, |recorded| {
            if period_ns == 0 || duty_ns > period_ns {
                return Err(PwmError::InvalidConfig);
            }
            recorded.duty_ns = duty_ns;
            recorded.period_ns = period_ns;
            Ok(())
        })
    }

    fn set_polarity(&mut self, polarity: Polarity) -> Result<(), PwmError> {
        self.record(PwmCall::SetPolarity(polarity), |recorded| {
            recorded.polarity = polarity;
            Ok(())
        })
    }

    fn enable(&mut self) -> Result<(), PwmError> {
        self.record(PwmCall::Enable, |recorded| {
            recorded.enabled = true;
            Ok(())
        })
    }

    fn disable(&mut self) -> Result<(), PwmError> {
        self.record(PwmCall::Disable, |recorded| {
            recorded.enabled = false;
            Ok(())
        })
    }
}
