use bincode::{Decode, Encode};
use config::Config;
use foc::MotorDriver;
use foc::hardware::Inverter;
use foc::pid::{PidController, PidParams};
use crate::CommandError;

/// Raw console parameters: a mode selector and the target followed by kp, ki, kd.
#[derive(Debug, Clone, Copy, PartialEq, Encode, Decode)]
pub struct ControlParams {
    pub mode: u8,
    pub values: [f32; 4],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl Gains {
    fn apply(&self, mut params: PidParams) -> PidParams {
        params.kp = self.kp;
        params.ki = self.ki;
        params.kd = self.kd;
        params
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlCommand {
    Free,
    Torque { q: f32 },
    /// no gains means the configured defaults
    Velocity { target: f32, gains: Option<Gains> },
    AbsPosition { target: f32, gains: Option<Gains> },
    RelPosition { target: f32, gains: Option<Gains> },
    Calibrate,
}

impl TryFrom<ControlParams> for ControlCommand {
    type Error = CommandError;

    fn try_from(p: ControlParams) -> Result<Self, Self::Error> {
        let [target, kp, ki, kd] = p.values;
        if p.values.iter().any(|x| !x.is_finite()) {
            return Err(CommandError::Rejected);
        }
        let gains = if kp == 0.0 && ki == 0.0 && kd == 0.0 {
            None
        } else {
            Some(Gains { kp, ki, kd })
        };

        Ok(match p.mode {
            0 => ControlCommand::Free,
            1 => ControlCommand::Torque { q: target },
            2 => ControlCommand::Velocity { target, gains },
            3 => ControlCommand::AbsPosition { target, gains },
            4 => ControlCommand::RelPosition { target, gains },
            5 => ControlCommand::Calibrate,
            _ => return Err(CommandError::Rejected),
        })
    }
}

impl ControlCommand {
    /// Puts the driver into the requested mode. Calibration needs the sensor and the
    /// commutation timer, so the caller runs it and this returns `Rejected`.
    pub fn apply<I: Inverter>(&self, driver: &mut MotorDriver<I>, config: &Config) -> Result<(), CommandError> {
        let pid = |defaults: PidParams, gains: Option<Gains>| {
            let params = match gains {
                Some(g) => g.apply(defaults),
                None => defaults,
            };
            PidController::new(params, config.tick_period())
        };

        match *self {
            ControlCommand::Free => driver.set_free()?,
            ControlCommand::Torque { q } => driver.set_dq(0.0, q)?,
            ControlCommand::Velocity { target, gains } => {
                driver.set_velocity(target, pid(PidParams::velocity(config), gains))?
            }
            ControlCommand::AbsPosition { target, gains } => {
                driver.set_abs_position(target, pid(PidParams::position(config), gains), None)?
            }
            ControlCommand::RelPosition { target, gains } => {
                driver.set_rel_position(target, pid(PidParams::position(config), gains), None)?
            }
            ControlCommand::Calibrate => return Err(CommandError::Rejected),
        }
        Ok(())
    }
}

/// Switches the bridge. Turning it back on returns the motor to the knob when a knob mode
/// is running and the driver is calibrated, otherwise the driver stays free.
pub fn enable_driver<I: Inverter>(driver: &mut MotorDriver<I>, enable: bool, knob_active: bool) -> Result<(), CommandError> {
    driver.enable(enable);
    if enable && knob_active && driver.calibration().is_some() {
        driver.set_torque_mode()?;
    }
    Ok(())
}
