// Lock-step motor collection.
//
// Commands fan out across members with all setpoints written before any
// command is issued, so the motors start as close to simultaneously as the
// attribute layer allows.

use std::time::Duration;

use tracing::debug;

use crate::config::{OutputPort, Platform};
use crate::error::Result;

use super::options::MotorOptions;
use super::tacho::{MotorCommand, MotorKind, MotorState, StateFlag, TachoMotor, brake_action};

/// An ordered set of motors driven with identical commands
pub struct MotorSet {
    motors: Vec<(OutputPort, TachoMotor)>,
}

impl MotorSet {
    /// Bind one motor per `(port, kind)` spec. Members are reset to their
    /// driver defaults so leftover setpoints from a previous run cannot
    /// leak into this one.
    pub fn new(platform: &Platform, specs: &[(OutputPort, MotorKind)]) -> Result<Self> {
        let mut specs = specs.to_vec();
        specs.sort_by_key(|(port, _)| *port);

        let mut motors = Vec::with_capacity(specs.len());
        for (port, kind) in specs {
            let mut motor = TachoMotor::new(platform, port, kind)?;
            motor.reset()?;
            motors.push((port, motor));
        }
        debug!("motor set bound on {} ports", motors.len());

        Ok(Self { motors })
    }

    pub fn len(&self) -> usize {
        self.motors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.motors.is_empty()
    }

    pub fn motor(&mut self, port: OutputPort) -> Option<&mut TachoMotor> {
        self.motors.iter_mut().find(|(p, _)| *p == port).map(|(_, m)| m)
    }

    pub fn motors(&mut self) -> impl Iterator<Item = &mut TachoMotor> {
        self.motors.iter_mut().map(|(_, m)| m)
    }

    /// Apply one override bundle to every member
    pub fn set_options(&mut self, options: &MotorOptions) -> Result<()> {
        for (_, motor) in &mut self.motors {
            motor.apply_options(options)?;
        }
        Ok(())
    }

    /// Write `options` to every member, then issue `command` to each in
    /// immediate succession
    pub fn command(&mut self, command: MotorCommand, options: &MotorOptions) -> Result<()> {
        self.set_options(options)?;
        for (_, motor) in &mut self.motors {
            motor.command(command, &MotorOptions::new())?;
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

    pub fn reset(&mut self) -> Result<()> {
        for (_, motor) in &mut self.motors {
            motor.reset()?;
        }
        Ok(())
    }

    /// Stop every member, holding position if `brake` is set. The brake
    /// action is written everywhere before the first stop command goes out.
    pub fn off(&mut self, brake: bool) -> Result<()> {
        for (_, motor) in &mut self.motors {
            motor.set_stop_action(brake_action(brake))?;
        }
        for (_, motor) in &mut self.motors {
            motor.stop(&MotorOptions::new())?;
        }
        Ok(())
    }

    /// Alias of `off`, mirroring the per-motor API
    pub fn stop(&mut self, brake: bool) -> Result<()> {
        self.off(brake)
    }

    // === waits, serialized member by member ===

    pub fn wait<F>(&mut self, mut cond: F, timeout: Option<Duration>) -> Result<bool>
    where
        F: FnMut(MotorState) -> bool,
    {
        let mut all = true;
        for (_, motor) in &mut self.motors {
            all &= motor.wait(&mut cond, timeout)?;
        }
        Ok(all)
    }

    pub fn wait_until(&mut self, flag: StateFlag, timeout: Option<Duration>) -> Result<bool> {
        self.wait(|state| state.contains(flag), timeout)
    }

    pub fn wait_while(&mut self, flag: StateFlag, timeout: Option<Duration>) -> Result<bool> {
        self.wait(|state| !state.contains(flag), timeout)
    }

    pub fn wait_until_not_moving(&mut self, timeout: Option<Duration>) -> Result<bool> {
        self.wait(|state| !state.running || state.stalled || state.holding, timeout)
    }

    // === state predicates, true only when every member agrees ===

    fn all_state<F>(&mut self, f: F) -> Result<bool>
    where
        F: Fn(MotorState) -> bool,
    {
        for (_, motor) in &mut self.motors {
            if !f(motor.state()?) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn is_running(&mut self) -> Result<bool> {
        self.all_state(|s| s.running)
    }

    pub fn is_ramping(&mut self) -> Result<bool> {
        self.all_state(|s| s.ramping)
    }

    pub fn is_holding(&mut self) -> Result<bool> {
        self.all_state(|s| s.holding)
    }

    pub fn is_overloaded(&mut self) -> Result<bool> {
        self.all_state(|s| s.overloaded)
    }

    pub fn is_stalled(&mut self) -> Result<bool> {
        self.all_state(|s| s.stalled)
    }
}
