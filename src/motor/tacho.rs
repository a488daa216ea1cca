// Closed-loop tachometer motor.
//
// The driver accepts one command at a time (run-forever, run-to-abs-pos,
// run-to-rel-pos, run-timed, run-direct, stop, reset); setpoint writes
// only take effect at the next command, except duty_cycle_sp while in
// run-direct mode. Completion is observed through the `state` flag set.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::{CLASS_TACHO_MOTOR, OutputPort, Platform};
use crate::device::Device;
use crate::error::{DriveError, Result};
use crate::units::SpeedValue;

use super::options::MotorOptions;

/// How long the blocking helpers wait for `running` to appear after a
/// command before waiting for it to clear again, in milliseconds.
pub const WAIT_RUNNING_TIMEOUT_MS: u64 = 100;

/// The driver's command grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorCommand {
    /// Run until another command is sent
    RunForever,
    /// Run to the absolute position in `position_sp`, then apply the stop
    /// action
    RunToAbsPos,
    /// Run to current position + `position_sp`, then apply the stop action
    RunToRelPos,
    /// Run for `time_sp` milliseconds, then apply the stop action
    RunTimed,
    /// Drive the duty cycle directly; `duty_cycle_sp` writes take effect
    /// immediately while this mode is active
    RunDirect,
    /// Interrupt the current command, applying the stop action
    Stop,
    /// Reset every setpoint to its driver default; also stops the motor
    Reset,
}

impl MotorCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            MotorCommand::RunForever => "run-forever",
            MotorCommand::RunToAbsPos => "run-to-abs-pos",
            MotorCommand::RunToRelPos => "run-to-rel-pos",
            MotorCommand::RunTimed => "run-timed",
            MotorCommand::RunDirect => "run-direct",
            MotorCommand::Stop => "stop",
            MotorCommand::Reset => "reset",
        }
    }
}

/// Rotation sense of a positive duty cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Normal,
    Inversed,
}

impl Polarity {
    pub fn as_str(self) -> &'static str {
        match self {
            Polarity::Normal => "normal",
            Polarity::Inversed => "inversed",
        }
    }

    fn parse(text: &str) -> Result<Self> {
        match text {
            "normal" => Ok(Polarity::Normal),
            "inversed" => Ok(Polarity::Inversed),
            other => Err(DriveError::precondition(format!("unknown polarity {other:?}"))),
        }
    }
}

/// What the driver does when a command completes or is stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopAction {
    /// Remove power and coast to a stop
    Coast,
    /// Short the terminals for a passive electrical load
    Brake,
    /// Actively hold the current position under closed-loop control
    Hold,
}

impl StopAction {
    pub fn as_str(self) -> &'static str {
        match self {
            StopAction::Coast => "coast",
            StopAction::Brake => "brake",
            StopAction::Hold => "hold",
        }
    }

    fn parse(text: &str) -> Result<Self> {
        match text {
            "coast" => Ok(StopAction::Coast),
            "brake" => Ok(StopAction::Brake),
            "hold" => Ok(StopAction::Hold),
            other => Err(DriveError::precondition(format!("unknown stop action {other:?}"))),
        }
    }
}

/// Map the drive-layer brake flag to a stop action
pub(crate) fn brake_action(brake: bool) -> StopAction {
    if brake { StopAction::Hold } else { StopAction::Coast }
}

/// One flag of the driver's state set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFlag {
    Running,
    Ramping,
    Holding,
    Overloaded,
    Stalled,
}

/// Snapshot of the driver's state flag set
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MotorState {
    /// Power is being sent to the motor
    pub running: bool,
    /// Output has not yet reached a constant level
    pub ramping: bool,
    /// Holding position under closed-loop control
    pub holding: bool,
    /// Turning, but cannot reach `speed_sp`
    pub overloaded: bool,
    /// Not turning although it should be
    pub stalled: bool,
}

impl MotorState {
    pub(crate) fn parse(flags: &[String]) -> Self {
        let mut state = MotorState::default();
        for flag in flags {
            match flag.as_str() {
                "running" => state.running = true,
                "ramping" => state.ramping = true,
                "holding" => state.holding = true,
                "overloaded" => state.overloaded = true,
                "stalled" => state.stalled = true,
                other => debug!("ignoring unknown state flag {other:?}"),
            }
        }
        state
    }

    pub fn contains(self, flag: StateFlag) -> bool {
        match flag {
            StateFlag::Running => self.running,
            StateFlag::Ramping => self.ramping,
            StateFlag::Holding => self.holding,
            StateFlag::Overloaded => self.overloaded,
            StateFlag::Stalled => self.stalled,
        }
    }
}

/// Which motor product a handle will bind to.
///
/// The variants differ only in the driver names accepted at construction;
/// binding a port whose device reports a different driver fails with
/// `DeviceNotFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorKind {
    /// Any rotational tachometer motor
    Generic,
    /// Large servo motor (also matches the older NXT-era unit)
    Large,
    /// Medium servo motor
    Medium,
    /// 50 mm linear actuator
    LinearL1250,
    /// 100 mm linear actuator
    LinearL12100,
}

impl MotorKind {
    pub(crate) fn drivers(self) -> &'static [&'static str] {
        match self {
            MotorKind::Generic => &[],
            MotorKind::Large => &["lego-ev3-l-motor", "lego-nxt-motor"],
            MotorKind::Medium => &["lego-ev3-m-motor"],
            MotorKind::LinearL1250 => &["act-l12-ev3-50"],
            MotorKind::LinearL12100 => &["act-l12-ev3-100"],
        }
    }
}

/// Static description of a bound motor, read once at construction
#[derive(Debug, Clone, PartialEq)]
pub struct MotorSpec {
    pub address: String,
    pub driver_name: String,
    /// Tacho counts per full rotation; positive
    pub count_per_rot: i32,
    /// Rated maximum speed in counts/sec; positive
    pub max_speed: i32,
}

impl MotorSpec {
    pub fn max_rps(&self) -> f32 {
        self.max_speed as f32 / self.count_per_rot as f32
    }

    pub fn max_rpm(&self) -> f32 {
        self.max_rps() * 60.0
    }

    pub fn max_dps(&self) -> f32 {
        self.max_rps() * 360.0
    }

    pub fn max_dpm(&self) -> f32 {
        self.max_rpm() * 360.0
    }
}

/// Sign-canonicalize a relative move: the travel direction comes from the
/// speed's sign, the setpoint speed is always a magnitude.
///
/// Returns `(position_sp counts, speed_sp counts/sec)`.
pub(crate) fn canonical_rel_target(degrees: f32, native_speed: f32, count_per_rot: i32) -> (i32, i32) {
    let degrees = if native_speed >= 0.0 { degrees } else { -degrees };
    let position_delta = (degrees * count_per_rot as f32 / 360.0).round() as i32;
    let speed_sp = native_speed.abs().round() as i32;
    (position_delta, speed_sp)
}

/// Handle to one tachometer motor bound at an output port.
///
/// Dropping the handle releases the attribute files but leaves the
/// physical motor exactly as it was; nothing is stopped or reset.
#[derive(Debug)]
pub struct TachoMotor {
    device: Device,
    spec: MotorSpec,
}

impl TachoMotor {
    /// Bind the motor plugged into `port`, requiring a driver accepted by
    /// `kind`.
    pub fn new(platform: &Platform, port: OutputPort, kind: MotorKind) -> Result<Self> {
        let address = platform.output_address(port);
        let mut device = Device::find(platform, CLASS_TACHO_MOTOR, address, kind.drivers())?;

        let spec = MotorSpec {
            address: device.get_attr_string("address")?,
            driver_name: device.get_attr_string("driver_name")?,
            count_per_rot: device.get_attr_int("count_per_rot")?,
            max_speed: device.get_attr_int("max_speed")?,
        };
        debug!(
            "bound {} at {}: count_per_rot={}, max_speed={}",
            spec.driver_name, spec.address, spec.count_per_rot, spec.max_speed
        );

        Ok(Self { device, spec })
    }

    pub fn large(platform: &Platform, port: OutputPort) -> Result<Self> {
        Self::new(platform, port, MotorKind::Large)
    }

    pub fn medium(platform: &Platform, port: OutputPort) -> Result<Self> {
        Self::new(platform, port, MotorKind::Medium)
    }

    pub fn linear_l12_50(platform: &Platform, port: OutputPort) -> Result<Self> {
        Self::new(platform, port, MotorKind::LinearL1250)
    }

    pub fn linear_l12_100(platform: &Platform, port: OutputPort) -> Result<Self> {
        Self::new(platform, port, MotorKind::LinearL12100)
    }

    /// Static attributes read at construction
    pub fn spec(&self) -> &MotorSpec {
        &self.spec
    }

    /// The underlying device directory, for auxiliary attribute handles
    pub fn device(&self) -> &Device {
        &self.device
    }

    // === observables ===

    /// Signed encoder count; increases with clockwise rotation
    pub fn position(&mut self) -> Result<i32> {
        self.device.get_attr_int("position")
    }

    /// Overwrite the encoder count
    pub fn set_position(&mut self, counts: i32) -> Result<()> {
        self.device.set_attr_int("position", counts)
    }

    /// Current speed in counts/sec
    pub fn speed(&mut self) -> Result<i32> {
        self.device.get_attr_int("speed")
    }

    /// Current duty cycle, -100..=100
    pub fn duty_cycle(&mut self) -> Result<i32> {
        self.device.get_attr_int("duty_cycle")
    }

    pub fn state(&mut self) -> Result<MotorState> {
        Ok(MotorState::parse(&self.device.get_attr_set("state")?))
    }

    /// Commands advertised by the driver
    pub fn commands(&mut self) -> Result<Vec<String>> {
        self.device.get_attr_set("commands")
    }

    /// Stop actions advertised by the driver
    pub fn stop_actions(&mut self) -> Result<Vec<String>> {
        self.device.get_attr_set("stop_actions")
    }

    /// Position expressed in full rotations
    pub fn rotations(&mut self) -> Result<f32> {
        Ok(self.position()? as f32 / self.spec.count_per_rot as f32)
    }

    /// Position expressed in degrees
    pub fn degrees(&mut self) -> Result<f32> {
        Ok(self.rotations()? * 360.0)
    }

    pub fn is_running(&mut self) -> Result<bool> {
        Ok(self.state()?.running)
    }

    pub fn is_ramping(&mut self) -> Result<bool> {
        Ok(self.state()?.ramping)
    }

    pub fn is_holding(&mut self) -> Result<bool> {
        Ok(self.state()?.holding)
    }

    pub fn is_overloaded(&mut self) -> Result<bool> {
        Ok(self.state()?.overloaded)
    }

    pub fn is_stalled(&mut self) -> Result<bool> {
        Ok(self.state()?.stalled)
    }

    // === setpoints ===

    pub fn speed_sp(&mut self) -> Result<i32> {
        self.device.get_attr_int("speed_sp")
    }

    /// Target speed in counts/sec for the run commands (except
    /// run-direct). Magnitudes above the rated maximum are rejected.
    pub fn set_speed_sp(&mut self, counts_per_sec: i32) -> Result<()> {
        let max = self.spec.max_speed;
        if counts_per_sec.abs() > max {
            return Err(DriveError::OutOfRange {
                attribute: "speed_sp",
                value: counts_per_sec,
                min: -max,
                max,
            });
        }
        self.device
            .set_attr_int("speed_sp", counts_per_sec)
            .map_err(|e| map_einval(e, "speed_sp", counts_per_sec, -max, max))
    }

    pub fn position_sp(&mut self) -> Result<i32> {
        self.device.get_attr_int("position_sp")
    }

    /// Target position in counts for run-to-abs-pos / run-to-rel-pos
    pub fn set_position_sp(&mut self, counts: i32) -> Result<()> {
        self.device
            .set_attr_int("position_sp", counts)
            .map_err(|e| map_einval(e, "position_sp", counts, i32::MIN, i32::MAX))
    }

    pub fn duty_cycle_sp(&mut self) -> Result<i32> {
        self.device.get_attr_int("duty_cycle_sp")
    }

    /// Target duty cycle for run-direct, -100..=100
    pub fn set_duty_cycle_sp(&mut self, percent: i32) -> Result<()> {
        if !(-100..=100).contains(&percent) {
            return Err(DriveError::OutOfRange {
                attribute: "duty_cycle_sp",
                value: percent,
                min: -100,
                max: 100,
            });
        }
        self.device
            .set_attr_int("duty_cycle_sp", percent)
            .map_err(|e| map_einval(e, "duty_cycle_sp", percent, -100, 100))
    }

    pub fn time_sp(&mut self) -> Result<i32> {
        self.device.get_attr_int("time_sp")
    }

    /// Run duration in milliseconds for run-timed
    pub fn set_time_sp(&mut self, ms: i32) -> Result<()> {
        if ms < 0 {
            return Err(DriveError::OutOfRange {
                attribute: "time_sp",
                value: ms,
                min: 0,
                max: i32::MAX,
            });
        }
        self.device
            .set_attr_int("time_sp", ms)
            .map_err(|e| map_einval(e, "time_sp", ms, 0, i32::MAX))
    }

    pub fn ramp_up_sp(&mut self) -> Result<i32> {
        self.device.get_attr_int("ramp_up_sp")
    }

    pub fn set_ramp_up_sp(&mut self, ms: i32) -> Result<()> {
        if ms < 0 {
            return Err(DriveError::OutOfRange {
                attribute: "ramp_up_sp",
                value: ms,
                min: 0,
                max: i32::MAX,
            });
        }
        self.device
            .set_attr_int("ramp_up_sp", ms)
            .map_err(|e| map_einval(e, "ramp_up_sp", ms, 0, i32::MAX))
    }

    pub fn ramp_down_sp(&mut self) -> Result<i32> {
        self.device.get_attr_int("ramp_down_sp")
    }

    pub fn set_ramp_down_sp(&mut self, ms: i32) -> Result<()> {
        if ms < 0 {
            return Err(DriveError::OutOfRange {
                attribute: "ramp_down_sp",
                value: ms,
                min: 0,
                max: i32::MAX,
            });
        }
        self.device
            .set_attr_int("ramp_down_sp", ms)
            .map_err(|e| map_einval(e, "ramp_down_sp", ms, 0, i32::MAX))
    }

    pub fn polarity(&mut self) -> Result<Polarity> {
        Polarity::parse(&self.device.get_attr_string("polarity")?)
    }

    pub fn set_polarity(&mut self, polarity: Polarity) -> Result<()> {
        self.device.set_attr_string("polarity", polarity.as_str())
    }

    pub fn stop_action(&mut self) -> Result<StopAction> {
        StopAction::parse(&self.device.get_attr_selected("stop_action")?)
    }

    pub fn set_stop_action(&mut self, stop_action: StopAction) -> Result<()> {
        self.device.set_attr_string("stop_action", stop_action.as_str())
    }

    /// Position-hold PID gains
    pub fn hold_pid(&mut self) -> Result<(i32, i32, i32)> {
        Ok((
            self.device.get_attr_int("hold_pid/Kp")?,
            self.device.get_attr_int("hold_pid/Ki")?,
            self.device.get_attr_int("hold_pid/Kd")?,
        ))
    }

    pub fn set_hold_pid(&mut self, kp: i32, ki: i32, kd: i32) -> Result<()> {
        self.device.set_attr_int("hold_pid/Kp", kp)?;
        self.device.set_attr_int("hold_pid/Ki", ki)?;
        self.device.set_attr_int("hold_pid/Kd", kd)
    }

    /// Speed-regulation PID gains
    pub fn speed_pid(&mut self) -> Result<(i32, i32, i32)> {
        Ok((
            self.device.get_attr_int("speed_pid/Kp")?,
            self.device.get_attr_int("speed_pid/Ki")?,
            self.device.get_attr_int("speed_pid/Kd")?,
        ))
    }

    pub fn set_speed_pid(&mut self, kp: i32, ki: i32, kd: i32) -> Result<()> {
        self.device.set_attr_int("speed_pid/Kp", kp)?;
        self.device.set_attr_int("speed_pid/Ki", ki)?;
        self.device.set_attr_int("speed_pid/Kd", kd)
    }

    // === commands ===

    /// Write the override bundle, then issue the command
    pub fn command(&mut self, command: MotorCommand, options: &MotorOptions) -> Result<()> {
        self.apply_options(options)?;
        debug!("{}: command {}", self.spec.address, command.as_str());
        self.device.set_attr_string("command", command.as_str())
    }

    /// Apply overrides in fixed order: polarity, stop action, ramps, then
    /// the setpoints
    pub fn apply_options(&mut self, options: &MotorOptions) -> Result<()> {
        if let Some(polarity) = options.polarity {
            self.set_polarity(polarity)?;
        }
        if let Some(stop_action) = options.stop_action {
            self.set_stop_action(stop_action)?;
        }
        if let Some(ms) = options.ramp_up_sp {
            self.set_ramp_up_sp(ms)?;
        }
        if let Some(ms) = options.ramp_down_sp {
            self.set_ramp_down_sp(ms)?;
        }
        if let Some(speed) = options.speed_sp {
            self.set_speed_sp(speed)?;
        }
        if let Some(position) = options.position_sp {
            self.set_position_sp(position)?;
        }
        if let Some(duty) = options.duty_cycle_sp {
            self.set_duty_cycle_sp(duty)?;
        }
        if let Some(ms) = options.time_sp {
            self.set_time_sp(ms)?;
        }
        Ok(())
    }

    pub fn run_forever(&mut self, options: &MotorOptions) -> Result<()> {
        self.command(MotorCommand::RunForever, options)
    }

    pub fn run_to_abs_pos(&mut self, options: &MotorOptions) -> Result<()> {
        self.command(MotorCommand::RunToAbsPos, options)
    }

    pub fn run_to_rel_pos(&mut self, options: &MotorOptions) -> Result<()> {
        self.command(MotorCommand::RunToRelPos, options)
    }

    pub fn run_timed(&mut self, options: &MotorOptions) -> Result<()> {
        self.command(MotorCommand::RunTimed, options)
    }

    pub fn run_direct(&mut self, options: &MotorOptions) -> Result<()> {
        self.command(MotorCommand::RunDirect, options)
    }

    pub fn stop(&mut self, options: &MotorOptions) -> Result<()> {
        self.command(MotorCommand::Stop, options)
    }

    pub fn reset(&mut self) -> Result<()> {
        self.command(MotorCommand::Reset, &MotorOptions::new())
    }

    // === waits ===

    /// Block until `cond` holds for the state set. The condition is
    /// re-checked whenever the driver raises an event on the state
    /// attribute. Returns true if the condition held within `timeout`,
    /// false once the timeout expires; `None` waits indefinitely.
    pub fn wait<F>(&mut self, mut cond: F, timeout: Option<Duration>) -> Result<bool>
    where
        F: FnMut(MotorState) -> bool,
    {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            if cond(self.state()?) {
                return Ok(true);
            }

            let remaining = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(false);
                    }
                    Some(deadline - now)
                }
                None => None,
            };
            self.device.wait_attr_ready("state", remaining)?;

            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Ok(cond(self.state()?));
                }
            }
        }
    }

    /// Block until `flag` appears in the state set
    pub fn wait_until(&mut self, flag: StateFlag, timeout: Option<Duration>) -> Result<bool> {
        self.wait(|state| state.contains(flag), timeout)
    }

    /// Block until `flag` leaves the state set
    pub fn wait_while(&mut self, flag: StateFlag, timeout: Option<Duration>) -> Result<bool> {
        self.wait(|state| !state.contains(flag), timeout)
    }

    /// Block until the motor is no longer moving: `running` cleared, or
    /// `stalled`/`holding` set. Stall completes the wait rather than
    /// deadlocking it.
    pub fn wait_until_not_moving(&mut self, timeout: Option<Duration>) -> Result<bool> {
        self.wait(|state| !state.running || state.stalled || state.holding, timeout)
    }

    fn block_until_done(&mut self) -> Result<()> {
        self.wait_until(
            StateFlag::Running,
            Some(Duration::from_millis(WAIT_RUNNING_TIMEOUT_MS)),
        )?;
        self.wait_until_not_moving(None)?;
        Ok(())
    }

    // === high-level operations ===

    fn speed_native(&self, speed: impl Into<SpeedValue>) -> Result<f32> {
        speed.into().to_native(&self.spec)
    }

    /// Rotate at `speed` for `rotations` full turns. Direction follows the
    /// speed's sign.
    pub fn on_for_rotations(
        &mut self,
        speed: impl Into<SpeedValue>,
        rotations: f32,
        brake: bool,
        block: bool,
    ) -> Result<()> {
        self.on_for_degrees(speed, rotations * 360.0, brake, block)
    }

    /// Rotate at `speed` for `degrees`. Direction follows the speed's sign.
    pub fn on_for_degrees(
        &mut self,
        speed: impl Into<SpeedValue>,
        degrees: f32,
        brake: bool,
        block: bool,
    ) -> Result<()> {
        let native = self.speed_native(speed)?;

        if native == 0.0 {
            if degrees != 0.0 {
                warn!(
                    "{}: zero speed requested for {} degrees, not moving",
                    self.spec.address, degrees
                );
            }
            return self.set_stop_action(brake_action(brake));
        }

        let (position_sp, speed_sp) = canonical_rel_target(degrees, native, self.spec.count_per_rot);
        let options = MotorOptions::new()
            .stop_action(brake_action(brake))
            .speed_sp(speed_sp)
            .position_sp(position_sp);
        self.run_to_rel_pos(&options)?;

        if block {
            self.block_until_done()?;
        }
        Ok(())
    }

    /// Rotate at `speed` to the absolute encoder position `position`. The
    /// target is written as given regardless of the current position, and
    /// the speed is always taken as a magnitude.
    pub fn on_to_position(
        &mut self,
        speed: impl Into<SpeedValue>,
        position: i32,
        brake: bool,
        block: bool,
    ) -> Result<()> {
        let native = self.speed_native(speed)?;
        let options = MotorOptions::new()
            .stop_action(brake_action(brake))
            .speed_sp(native.abs().round() as i32)
            .position_sp(position);
        self.run_to_abs_pos(&options)?;

        if block {
            self.block_until_done()?;
        }
        Ok(())
    }

    /// Rotate at `speed` for `seconds`
    pub fn on_for_seconds(
        &mut self,
        speed: impl Into<SpeedValue>,
        seconds: f32,
        brake: bool,
        block: bool,
    ) -> Result<()> {
        if seconds < 0.0 {
            return Err(DriveError::precondition(format!("seconds is negative ({seconds})")));
        }

        let native = self.speed_native(speed)?;
        let options = MotorOptions::new()
            .stop_action(brake_action(brake))
            .speed_sp(native.round() as i32)
            .time_sp((seconds * 1000.0).round() as i32);
        self.run_timed(&options)?;

        if block {
            self.block_until_done()?;
        }
        Ok(())
    }

    /// Start rotating at `speed` and return; pass `block = true` to wait
    /// for the motor to stop on its own (stall or external stop).
    pub fn on(&mut self, speed: impl Into<SpeedValue>, brake: bool, block: bool) -> Result<()> {
        let native = self.speed_native(speed)?;
        let options = MotorOptions::new()
            .stop_action(brake_action(brake))
            .speed_sp(native.round() as i32);
        self.run_forever(&options)?;

        if block {
            self.block_until_done()?;
        }
        Ok(())
    }

    /// Stop, holding position if `brake` is set
    pub fn off(&mut self, brake: bool) -> Result<()> {
        self.set_stop_action(brake_action(brake))?;
        self.stop(&MotorOptions::new())
    }
}

/// Translate a driver EINVAL into the typed range error for `attribute`
fn map_einval(e: DriveError, attribute: &'static str, value: i32, min: i32, max: i32) -> DriveError {
    match e {
        DriveError::Io(io) if io.raw_os_error() == Some(libc::EINVAL) => DriveError::OutOfRange {
            attribute,
            value,
            min,
            max,
        },
        other => other,
    }
}
