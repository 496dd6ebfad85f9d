#![allow(missing_docs)]
//! Host-level tests for the servo controller state machine.

use std::sync::Arc;
use std::thread;

use pwm_servo::Error;
use pwm_servo::calibration::CalibrationProfile;
use pwm_servo::duty::duty_for_angle;
use pwm_servo::pwm_port::host::{HostPwm, HostPwmLog, PwmCall, PwmOp};
use pwm_servo::pwm_port::{Polarity, PwmError};
use pwm_servo::servo::ServoController;

const PERIOD_NS: u32 = 20_000_000;

fn controller() -> (ServoController<HostPwm>, HostPwmLog) {
    let (pwm, log) = HostPwm::new();
    let servo = ServoController::new(pwm, CalibrationProfile::DEFAULT).unwrap();
    (servo, log)
}

#[test]
fn starts_in_standby_at_zero_degrees() {
    let (servo, log) = controller();
    let state = servo.read();
    assert_eq!(state.angle(), 0);
    assert_eq!(state.duty_ns(), 500_000);
    assert!(!state.enabled());
    assert!(state.standby());

    assert_eq!(
        log.calls(),
        [
            PwmCall::Configure {
                duty_ns: 500_000,
                period_ns: PERIOD_NS
            },
            PwmCall::SetPolarity(Polarity::Normal),
        ]
    );
    assert!(!log.is_enabled());
}

#[test]
fn applies_profile_polarity_on_setup() {
    let (pwm, log) = HostPwm::new();
    let profile = CalibrationProfile::DEFAULT.with_polarity(Polarity::Inverted);
    let _servo = ServoController::new(pwm, profile).unwrap();
    assert_eq!(log.polarity(), Polarity::Inverted);
}

#[test]
fn set_angle_programs_port_and_commits() {
    let (servo, log) = controller();
    servo.set_angle(90).unwrap();

    let state = servo.read();
    assert_eq!(state.angle(), 90);
    assert_eq!(state.duty_ns(), 1_500_000);
    assert_eq!(log.config(), (1_500_000, PERIOD_NS));
}

#[test]
fn set_angle_while_active_reprograms_port() {
    let (servo, log) = controller();
    servo.set_enabled(true).unwrap();
    let enables = log.count(PwmOp::Enable);

    servo.set_angle(150).unwrap();

    let duty_ns = duty_for_angle(150, &CalibrationProfile::DEFAULT);
    assert_eq!(servo.read().duty_ns(), duty_ns);
    assert_eq!(log.config(), (duty_ns, PERIOD_NS));
    assert_eq!(
        log.calls().last(),
        Some(&PwmCall::Configure {
            duty_ns,
            period_ns: PERIOD_NS
        })
    );
    // Still Active, without another enable.
    assert!(log.is_enabled());
    assert_eq!(log.count(PwmOp::Enable), enables);
}

#[test]
fn set_angle_in_standby_does_not_enable() {
    let (servo, log) = controller();
    servo.set_angle(120).unwrap();

    assert!(!servo.read().enabled());
    assert!(!log.is_enabled());
    assert_eq!(log.count(PwmOp::Enable), 0);
}

#[test]
fn out_of_range_angles_leave_state_unchanged() {
    let (servo, log) = controller();
    servo.set_angle(30).unwrap();
    let before = servo.read();
    let calls_before = log.calls().len();

    for degrees in [181, -1, 256, i32::MIN, i32::MAX] {
        assert_eq!(servo.set_angle(degrees), Err(Error::OutOfRange { degrees }));
    }

    assert_eq!(servo.read(), before);
    assert_eq!(log.calls().len(), calls_before);
}

#[test]
fn boundary_angles_are_accepted() {
    let (servo, _log) = controller();
    servo.set_angle(180).unwrap();
    assert_eq!(servo.read().duty_ns(), 2_500_000);
    servo.set_angle(0).unwrap();
    assert_eq!(servo.read().duty_ns(), 500_000);
}

#[test]
fn configure_failure_keeps_previous_angle() {
    let (servo, log) = controller();
    servo.set_angle(45).unwrap();
    let before = servo.read();

    log.fail_next(PwmOp::Configure, PwmError::Fault);
    assert_eq!(
        servo.set_angle(135),
        Err(Error::Hardware(PwmError::Fault))
    );

    assert_eq!(servo.read(), before);
    assert_eq!(servo.read().angle(), 45);
    assert_eq!(servo.read().duty_ns(), duty_for_angle(45, &CalibrationProfile::DEFAULT));
}

#[test]
fn enabling_twice_calls_port_once() {
    let (servo, log) = controller();
    servo.set_enabled(true).unwrap();
    servo.set_enabled(true).unwrap();

    assert_eq!(log.count(PwmOp::Enable), 1);
    assert!(servo.read().enabled());
    assert!(log.is_enabled());
}

#[test]
fn disabling_in_standby_makes_no_port_call() {
    let (servo, log) = controller();
    let calls_before = log.calls();
    servo.set_enabled(false).unwrap();
    assert_eq!(log.calls(), calls_before);
}

#[test]
fn enable_programs_stored_duty_first() {
    let (servo, log) = controller();
    servo.set_angle(60).unwrap();
    let calls_before = log.calls().len();

    servo.set_enabled(true).unwrap();

    let calls = log.calls();
    assert_eq!(
        calls.get(calls_before..),
        Some(
            &[
                PwmCall::Configure {
                    duty_ns: duty_for_angle(60, &CalibrationProfile::DEFAULT),
                    period_ns: PERIOD_NS,
                },
                PwmCall::Enable,
            ][..]
        )
    );
}

#[test]
fn enable_failure_stays_in_standby() {
    let (servo, log) = controller();
    log.fail_next(PwmOp::Enable, PwmError::Fault);

    assert_eq!(servo.set_enabled(true), Err(Error::Hardware(PwmError::Fault)));
    assert!(servo.read().standby());
    assert!(!log.is_enabled());

    // A retry goes through to the port again.
    servo.set_enabled(true).unwrap();
    assert!(servo.read().enabled());
    assert_eq!(log.count(PwmOp::Enable), 2);
}

#[test]
fn disable_failure_stays_active() {
    let (servo, log) = controller();
    servo.set_enabled(true).unwrap();
    log.fail_next(PwmOp::Disable, PwmError::Fault);

    assert_eq!(servo.set_enabled(false), Err(Error::Hardware(PwmError::Fault)));
    assert!(servo.read().enabled());

    servo.set_enabled(false).unwrap();
    assert!(servo.read().standby());
    assert!(!log.is_enabled());
}

#[test]
fn center_moves_to_ninety_degrees() {
    let (servo, _log) = controller();
    servo.center().unwrap();
    assert_eq!(servo.read().angle(), 90);
}

#[test]
fn drop_disables_exactly_once() {
    let (servo, log) = controller();
    servo.set_enabled(true).unwrap();
    drop(servo);

    assert!(!log.is_enabled());
    assert_eq!(log.count(PwmOp::Disable), 1);
    assert_eq!(log.calls().last(), Some(&PwmCall::Disable));
}

#[test]
fn failed_setup_releases_a_disabled_port() {
    let (pwm, log) = HostPwm::new();
    log.fail_next(PwmOp::SetPolarity, PwmError::Unsupported);

    let result = ServoController::new(pwm, CalibrationProfile::DEFAULT);

    assert!(matches!(result, Err(Error::Hardware(PwmError::Unsupported))));
    assert_eq!(log.count(PwmOp::Disable), 1);
    assert!(!log.is_enabled());
}

#[test]
fn failed_teardown_disable_is_not_retried() {
    let (servo, log) = controller();
    servo.set_enabled(true).unwrap();
    log.fail_next(PwmOp::Disable, PwmError::Fault);
    drop(servo);

    assert_eq!(log.count(PwmOp::Disable), 1);
}

#[test]
fn concurrent_writers_never_expose_mismatched_duty() {
    let (pwm, log) = HostPwm::new();
    let profile = CalibrationProfile::DEFAULT;
    let servo = Arc::new(ServoController::new(pwm, profile).unwrap());

    let writers: Vec<_> = (0..4_i32)
        .map(|writer| {
            let servo = Arc::clone(&servo);
            thread::spawn(move || {
                for step in 0..500_i32 {
                    let degrees = (step * 7 + writer * 45) % 181;
                    servo.set_angle(degrees).unwrap();
                    if step % 50 == 0 {
                        servo.set_enabled(step % 100 == 0).unwrap();
                    }
                }
            })
        })
        .collect();

    let reader = {
        let servo = Arc::clone(&servo);
        thread::spawn(move || {
            for _ in 0..2_000 {
                let state = servo.read();
                assert_eq!(state.duty_ns(), duty_for_angle(state.angle(), &profile));
            }
        })
    };

    for writer in writers {
        writer.join().unwrap();
    }
    reader.join().unwrap();

    // The last programmed pulse is the committed one.
    let state = servo.read();
    assert_eq!(state.duty_ns(), duty_for_angle(state.angle(), &profile));
    assert_eq!(log.config(), (state.duty_ns(), PERIOD_NS));
}
