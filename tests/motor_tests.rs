// End-to-end motor scenarios against a fake device arena.
//
// Every test builds its own device tree, drives the public API, and then
// asserts on the attribute files the way the motor driver would see them.

mod common;

use std::time::{Duration, Instant};

use common::{Arena, read_attr, read_attr_int, write_attr};
use tachodrive::motor::{
    MotorKind, MotorOptions, MotorSet, Polarity, StateFlag, StopAction, TachoMotor,
};
use tachodrive::{DriveError, OutputPort, SpeedValue};

const LARGE: &str = "lego-ev3-l-motor";
const MEDIUM: &str = "lego-ev3-m-motor";

#[test]
fn test_construction_caches_static_attributes() {
    let arena = Arena::new();
    arena.add_motor(0, "outA", LARGE);
    let platform = arena.platform();

    let motor = TachoMotor::large(&platform, OutputPort::A).unwrap();
    let spec = motor.spec();
    assert_eq!(spec.address, "outA");
    assert_eq!(spec.driver_name, LARGE);
    assert_eq!(spec.count_per_rot, 360);
    assert_eq!(spec.max_speed, 1050);
    assert!((spec.max_rps() - 1050.0 / 360.0).abs() < 1e-5);
}

#[test]
fn test_driver_class_must_match() {
    let arena = Arena::new();
    arena.add_motor(0, "outA", MEDIUM);
    let platform = arena.platform();

    // The medium motor on outA satisfies Medium and Generic, not Large
    assert!(TachoMotor::medium(&platform, OutputPort::A).is_ok());
    assert!(TachoMotor::new(&platform, OutputPort::A, MotorKind::Generic).is_ok());
    let err = TachoMotor::large(&platform, OutputPort::A).unwrap_err();
    assert!(matches!(err, DriveError::DeviceNotFound { .. }));

    // Nothing is plugged into outB at all
    let err = TachoMotor::medium(&platform, OutputPort::B).unwrap_err();
    assert!(matches!(err, DriveError::DeviceNotFound { .. }));
}

#[test]
fn test_on_for_rotations_sets_rel_position_setpoints() {
    let arena = Arena::new();
    let dir = arena.add_motor(0, "outA", LARGE);
    let platform = arena.platform();

    let mut motor = TachoMotor::large(&platform, OutputPort::A).unwrap();
    motor.on_for_rotations(75, 5.0, true, false).unwrap();

    assert_eq!(read_attr_int(&dir, "speed_sp"), 788); // round(0.75 * 1050)
    assert_eq!(read_attr_int(&dir, "position_sp"), 1800); // 5 * 360
    assert_eq!(read_attr(&dir, "stop_action"), "hold");
    assert_eq!(read_attr(&dir, "command"), "run-to-rel-pos");
}

#[test]
fn test_negative_speed_flips_direction_not_speed() {
    let arena = Arena::new();
    let dir = arena.add_motor(0, "outA", LARGE);
    let platform = arena.platform();

    let mut motor = TachoMotor::large(&platform, OutputPort::A).unwrap();
    motor.on_for_degrees(-75, 90.0, false, false).unwrap();

    assert_eq!(read_attr_int(&dir, "speed_sp"), 788);
    assert_eq!(read_attr_int(&dir, "position_sp"), -90);
    assert_eq!(read_attr(&dir, "stop_action"), "coast");
}

#[test]
fn test_on_to_position_is_absolute_with_magnitude_speed() {
    let arena = Arena::new();
    let dir = arena.add_motor(0, "outA", LARGE);
    let platform = arena.platform();

    let mut motor = TachoMotor::large(&platform, OutputPort::A).unwrap();
    write_attr(&dir, "position", "5000");

    // Target behind the current position; the setpoint is still written
    // as given and the speed is a magnitude
    motor.on_to_position(-50, 1200, true, false).unwrap();
    assert_eq!(read_attr_int(&dir, "position_sp"), 1200);
    assert_eq!(read_attr_int(&dir, "speed_sp"), 525);
    assert_eq!(read_attr(&dir, "command"), "run-to-abs-pos");
}

#[test]
fn test_on_for_seconds() {
    let arena = Arena::new();
    let dir = arena.add_motor(0, "outA", LARGE);
    let platform = arena.platform();

    let mut motor = TachoMotor::large(&platform, OutputPort::A).unwrap();
    motor.on_for_seconds(SpeedValue::Percent(-20.0), 2.5, false, false).unwrap();

    // run-timed keeps the sign on the speed setpoint
    assert_eq!(read_attr_int(&dir, "speed_sp"), -210);
    assert_eq!(read_attr_int(&dir, "time_sp"), 2500);
    assert_eq!(read_attr(&dir, "command"), "run-timed");

    let err = motor.on_for_seconds(20, -1.0, false, false).unwrap_err();
    assert!(matches!(err, DriveError::Precondition(_)));
}

#[test]
fn test_on_runs_forever() {
    let arena = Arena::new();
    let dir = arena.add_motor(0, "outA", LARGE);
    let platform = arena.platform();

    let mut motor = TachoMotor::large(&platform, OutputPort::A).unwrap();
    motor.on(SpeedValue::rpm(40.0), true, false).unwrap();

    // 40 rpm of a 360-count motor is 240 counts/sec
    assert_eq!(read_attr_int(&dir, "speed_sp"), 240);
    assert_eq!(read_attr(&dir, "command"), "run-forever");

    motor.off(false).unwrap();
    assert_eq!(read_attr(&dir, "stop_action"), "coast");
    assert_eq!(read_attr(&dir, "command"), "stop");
}

#[test]
fn test_zero_speed_sets_brake_and_skips_command() {
    let arena = Arena::new();
    let dir = arena.add_motor(0, "outA", LARGE);
    let platform = arena.platform();

    let mut motor = TachoMotor::large(&platform, OutputPort::A).unwrap();
    motor.on_for_degrees(SpeedValue::Percent(0.0), 100.0, true, true).unwrap();

    assert_eq!(read_attr(&dir, "stop_action"), "hold");
    assert_eq!(read_attr(&dir, "command"), "");
    assert_eq!(read_attr_int(&dir, "position_sp"), 0);
}

#[test]
fn test_duty_cycle_sp_boundaries() {
    let arena = Arena::new();
    let dir = arena.add_motor(0, "outA", LARGE);
    let platform = arena.platform();

    let mut motor = TachoMotor::large(&platform, OutputPort::A).unwrap();
    motor.set_duty_cycle_sp(100).unwrap();
    assert_eq!(read_attr_int(&dir, "duty_cycle_sp"), 100);
    motor.set_duty_cycle_sp(-100).unwrap();
    assert_eq!(read_attr_int(&dir, "duty_cycle_sp"), -100);

    for bad in [101, -101] {
        let err = motor.set_duty_cycle_sp(bad).unwrap_err();
        match err {
            DriveError::OutOfRange { attribute, value, min, max } => {
                assert_eq!(attribute, "duty_cycle_sp");
                assert_eq!(value, bad);
                assert_eq!((min, max), (-100, 100));
            }
            other => panic!("expected range error, got {other:?}"),
        }
    }
    // The rejected writes left the attribute untouched
    assert_eq!(read_attr_int(&dir, "duty_cycle_sp"), -100);
}

#[test]
fn test_speed_sp_rejects_beyond_rated_max() {
    let arena = Arena::new();
    let dir = arena.add_motor(0, "outA", LARGE);
    let platform = arena.platform();

    let mut motor = TachoMotor::large(&platform, OutputPort::A).unwrap();
    motor.set_speed_sp(1050).unwrap();
    assert_eq!(read_attr_int(&dir, "speed_sp"), 1050);
    motor.set_speed_sp(-1050).unwrap();

    let err = motor.set_speed_sp(1051).unwrap_err();
    match err {
        DriveError::OutOfRange { attribute, value, min, max } => {
            assert_eq!(attribute, "speed_sp");
            assert_eq!(value, 1051);
            assert_eq!((min, max), (-1050, 1050));
        }
        other => panic!("expected range error, got {other:?}"),
    }
}

#[test]
fn test_run_direct_duty_cycle_updates() {
    let arena = Arena::new();
    let dir = arena.add_motor(0, "outA", LARGE);
    let platform = arena.platform();

    let mut motor = TachoMotor::large(&platform, OutputPort::A).unwrap();
    motor.run_direct(&MotorOptions::new().duty_cycle_sp(30)).unwrap();
    assert_eq!(read_attr(&dir, "command"), "run-direct");
    assert_eq!(read_attr_int(&dir, "duty_cycle_sp"), 30);

    // Duty-cycle writes take effect immediately in this mode
    motor.set_duty_cycle_sp(-45).unwrap();
    assert_eq!(read_attr_int(&dir, "duty_cycle_sp"), -45);
}

#[test]
fn test_options_applied_before_command() {
    let arena = Arena::new();
    let dir = arena.add_motor(0, "outA", LARGE);
    let platform = arena.platform();

    let mut motor = TachoMotor::large(&platform, OutputPort::A).unwrap();
    let options = MotorOptions::new()
        .polarity(Polarity::Inversed)
        .stop_action(StopAction::Brake)
        .ramp_up_sp(200)
        .ramp_down_sp(300)
        .speed_sp(500)
        .position_sp(720);
    motor.run_to_abs_pos(&options).unwrap();

    assert_eq!(read_attr(&dir, "polarity"), "inversed");
    assert_eq!(read_attr(&dir, "stop_action"), "brake");
    assert_eq!(read_attr_int(&dir, "ramp_up_sp"), 200);
    assert_eq!(read_attr_int(&dir, "ramp_down_sp"), 300);
    assert_eq!(read_attr_int(&dir, "speed_sp"), 500);
    assert_eq!(read_attr_int(&dir, "position_sp"), 720);
    assert_eq!(read_attr(&dir, "command"), "run-to-abs-pos");

    assert_eq!(motor.polarity().unwrap(), Polarity::Inversed);
    assert_eq!(motor.stop_action().unwrap(), StopAction::Brake);
}

#[test]
fn test_pid_gain_triples() {
    let arena = Arena::new();
    let dir = arena.add_motor(0, "outA", LARGE);
    let platform = arena.platform();

    let mut motor = TachoMotor::large(&platform, OutputPort::A).unwrap();
    motor.set_hold_pid(100, 25, 5).unwrap();
    assert_eq!(read_attr_int(&dir, "hold_pid/Kp"), 100);
    assert_eq!(read_attr_int(&dir, "hold_pid/Ki"), 25);
    assert_eq!(read_attr_int(&dir, "hold_pid/Kd"), 5);
    assert_eq!(motor.hold_pid().unwrap(), (100, 25, 5));

    assert_eq!(motor.speed_pid().unwrap(), (1000, 60, 0));
}

#[test]
fn test_wait_predicates_observe_state() {
    let arena = Arena::new();
    let dir = arena.add_motor(0, "outA", LARGE);
    let platform = arena.platform();
    let mut motor = TachoMotor::large(&platform, OutputPort::A).unwrap();

    // Predicate already true: returns immediately without blocking
    write_attr(&dir, "state", "running ramping");
    assert!(motor.wait_until(StateFlag::Running, Some(Duration::from_millis(5000))).unwrap());
    assert!(motor.wait_until(StateFlag::Ramping, None).unwrap());
    assert!(motor.is_running().unwrap());
    assert!(!motor.is_stalled().unwrap());

    // Predicate false: the timeout expires and reports false
    let start = Instant::now();
    assert!(!motor.wait_until(StateFlag::Holding, Some(Duration::from_millis(50))).unwrap());
    assert!(start.elapsed() >= Duration::from_millis(50));

    // Stall completes a not-moving wait even while `running` persists
    write_attr(&dir, "state", "running stalled");
    assert!(motor.wait_until_not_moving(Some(Duration::from_millis(5000))).unwrap());

    // So does holding
    write_attr(&dir, "state", "holding");
    assert!(motor.wait_until_not_moving(None).unwrap());

    write_attr(&dir, "state", "running");
    assert!(!motor.wait_while(StateFlag::Running, Some(Duration::from_millis(50))).unwrap());
    write_attr(&dir, "state", "");
    assert!(motor.wait_while(StateFlag::Running, Some(Duration::from_millis(50))).unwrap());
}

#[test]
fn test_blocking_drive_completes_when_never_running() {
    let arena = Arena::new();
    let dir = arena.add_motor(0, "outA", LARGE);
    let platform = arena.platform();
    let mut motor = TachoMotor::large(&platform, OutputPort::A).unwrap();

    // An idle state file means the run wait times out after ~100 ms and
    // the not-moving wait finishes instantly
    let start = Instant::now();
    motor.on_for_degrees(50, 360.0, true, true).unwrap();
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(90), "returned too early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(2000), "blocked too long: {elapsed:?}");
    assert_eq!(read_attr(&dir, "command"), "run-to-rel-pos");
}

#[test]
fn test_motor_set_fans_out() {
    let arena = Arena::new();
    let dir_a = arena.add_motor(0, "outA", LARGE);
    let dir_b = arena.add_motor(1, "outB", MEDIUM);
    let platform = arena.platform();

    let mut set = MotorSet::new(
        &platform,
        &[
            (OutputPort::A, MotorKind::Large),
            (OutputPort::B, MotorKind::Medium),
        ],
    )
    .unwrap();
    assert_eq!(set.len(), 2);

    // Construction resets every member
    assert_eq!(read_attr(&dir_a, "command"), "reset");
    assert_eq!(read_attr(&dir_b, "command"), "reset");

    set.run_to_rel_pos(&MotorOptions::new().speed_sp(400).position_sp(-720)).unwrap();
    for dir in [&dir_a, &dir_b] {
        assert_eq!(read_attr_int(dir, "speed_sp"), 400);
        assert_eq!(read_attr_int(dir, "position_sp"), -720);
        assert_eq!(read_attr(dir, "command"), "run-to-rel-pos");
    }

    set.off(true).unwrap();
    for dir in [&dir_a, &dir_b] {
        assert_eq!(read_attr(dir, "stop_action"), "hold");
        assert_eq!(read_attr(dir, "command"), "stop");
    }
}

#[test]
fn test_motor_set_predicates_require_every_member() {
    let arena = Arena::new();
    let dir_a = arena.add_motor(0, "outA", LARGE);
    let dir_b = arena.add_motor(1, "outB", LARGE);
    let platform = arena.platform();

    let mut set = MotorSet::new(
        &platform,
        &[
            (OutputPort::A, MotorKind::Large),
            (OutputPort::B, MotorKind::Large),
        ],
    )
    .unwrap();

    write_attr(&dir_a, "state", "running");
    write_attr(&dir_b, "state", "");
    assert!(!set.is_running().unwrap());

    write_attr(&dir_b, "state", "running");
    assert!(set.is_running().unwrap());

    write_attr(&dir_a, "state", "running stalled");
    assert!(!set.is_stalled().unwrap());
    write_attr(&dir_b, "state", "stalled");
    assert!(set.is_stalled().unwrap());
}
