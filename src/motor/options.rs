// Setpoint override bundle for motor commands.
//
// Every run command can carry a bundle of attribute overrides that are
// written before the command itself is issued. The overrides are applied
// in a fixed order: polarity, stop action, ramps, then the speed /
// position / duty-cycle / time setpoints.

use super::tacho::{Polarity, StopAction};

/// Attribute overrides to apply ahead of a run command
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MotorOptions {
    pub polarity: Option<Polarity>,
    pub stop_action: Option<StopAction>,
    pub ramp_up_sp: Option<i32>,
    pub ramp_down_sp: Option<i32>,
    pub speed_sp: Option<i32>,
    pub position_sp: Option<i32>,
    pub duty_cycle_sp: Option<i32>,
    pub time_sp: Option<i32>,
}

impl MotorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = Some(polarity);
        self
    }

    pub fn stop_action(mut self, stop_action: StopAction) -> Self {
        self.stop_action = Some(stop_action);
        self
    }

    pub fn ramp_up_sp(mut self, ms: i32) -> Self {
        self.ramp_up_sp = Some(ms);
        self
    }

    pub fn ramp_down_sp(mut self, ms: i32) -> Self {
        self.ramp_down_sp = Some(ms);
        self
    }

    pub fn speed_sp(mut self, counts_per_sec: i32) -> Self {
        self.speed_sp = Some(counts_per_sec);
        self
    }

    pub fn position_sp(mut self, counts: i32) -> Self {
        self.position_sp = Some(counts);
        self
    }

    pub fn duty_cycle_sp(mut self, percent: i32) -> Self {
        self.duty_cycle_sp = Some(percent);
        self
    }

    pub fn time_sp(mut self, ms: i32) -> Self {
        self.time_sp = Some(ms);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_accumulates() {
        let options = MotorOptions::new()
            .speed_sp(788)
            .position_sp(1800)
            .stop_action(StopAction::Hold);
        assert_eq!(options.speed_sp, Some(788));
        assert_eq!(options.position_sp, Some(1800));
        assert_eq!(options.stop_action, Some(StopAction::Hold));
        assert_eq!(options.polarity, None);
        assert_eq!(options.time_sp, None);
    }
}
