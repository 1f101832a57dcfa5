use bincode::{Encode, Decode};
use config::Config;
use encoder::AngleSnapshot;
use crate::hardware::Inverter;
use crate::pid::PidController;
use crate::svm::{IterativeSVM, PWMCommand};
use crate::sync::Mailbox;
use crate::transforms::{AlphaBetaVoltages, DQVoltages};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum DriverError {
    /// the bridge is off
    Disabled,
    /// a calibration run owns the hardware
    Calibrating,
    /// no calibration result yet, the electrical angle is unknown
    NotCalibrated,
    /// the active mode has no loop to retune
    OpenLoop,
}

#[derive(Debug, Clone, Copy, PartialEq, Encode, Decode)]
pub struct CalibrationResult {
    pub direction: f32, // +1 or -1
    pub zero_electrical_angle: f32,
}

/// Where a position loop reads its feedback from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionFrame {
    Absolute,
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriverMode {
    Disabled,
    Calibrating,
    Free,
    Torque,
    Velocity {
        target: f32, // rad/s
        pid: PidController,
    },
    Position {
        frame: PositionFrame,
        target: f32, // rad
        pid: PidController,
        /// when present, `pid` produces a velocity target and this loop produces q
        inner: Option<PidController>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum ModeKind {
    Disabled,
    Calibrating,
    Free,
    Torque,
    Velocity,
    AbsPosition,
    RelPosition,
}

impl DriverMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            DriverMode::Disabled => ModeKind::Disabled,
            DriverMode::Calibrating => ModeKind::Calibrating,
            DriverMode::Free => ModeKind::Free,
            DriverMode::Torque => ModeKind::Torque,
            DriverMode::Velocity { .. } => ModeKind::Velocity,
            DriverMode::Position { frame: PositionFrame::Absolute, .. } => ModeKind::AbsPosition,
            DriverMode::Position { frame: PositionFrame::Relative, .. } => ModeKind::RelPosition,
        }
    }

    /// Torque request in the user frame for this tick.
    fn update(&mut self, angle: &AngleSnapshot, torque: &Mailbox<DQVoltages>) -> DQVoltages {
        match self {
            DriverMode::Disabled | DriverMode::Calibrating | DriverMode::Free => DQVoltages::ZERO,
            DriverMode::Torque => torque.read(),
            DriverMode::Velocity { target, pid } => {
                DQVoltages::new(0.0, pid.calculate(*target - angle.velocity_filtered))
            }
            DriverMode::Position { frame, target, pid, inner } => {
                let feedback = match frame {
                    PositionFrame::Absolute => angle.total,
                    PositionFrame::Relative => angle.relative_total,
                };
                let outer = pid.calculate(*target - feedback);
                let q = match inner {
                    Some(velocity_pid) => velocity_pid.calculate(outer - angle.velocity_filtered),
                    None => outer,
                };
                DQVoltages::new(0.0, q)
            }
        }
    }
}

pub struct MotorDriver<'a, I> {
    pub(crate) inverter: I,
    pub(crate) svm: IterativeSVM,
    pub(crate) mode: DriverMode,
    pub(crate) calibration: Option<CalibrationResult>,
    pub(crate) torque: &'a Mailbox<DQVoltages>,
    pub(crate) config: Config,
    last_command: PWMCommand,
}

impl<'a, I: Inverter> MotorDriver<'a, I> {
    pub fn new(mut inverter: I, torque: &'a Mailbox<DQVoltages>, config: &Config) -> MotorDriver<'a, I> {
        inverter.set_enabled(false);
        inverter.set_duty(0, 0, 0);
        let max_duty = inverter.max_duty();

        MotorDriver {
            inverter,
            svm: IterativeSVM::new(max_duty, config.dq_limit),
            mode: DriverMode::Disabled,
            calibration: None,
            torque,
            config: *config,
            last_command: PWMCommand::OFF,
        }
    }

    pub fn enable(&mut self, enable: bool) {
        if matches!(self.mode, DriverMode::Calibrating) {
            warn!("bridge {} ignored during calibration", if enable { "enable" } else { "disable" });
            return;
        }

        info!("{} MOSFET gate", if enable { "Enable" } else { "Disable" });
        self.inverter.set_enabled(enable);
        if enable {
            if matches!(self.mode, DriverMode::Disabled) {
                self.mode = DriverMode::Free;
            }
        } else {
            self.mode = DriverMode::Disabled;
            self.inverter.set_duty(0, 0, 0);
            self.last_command = PWMCommand::OFF;
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.mode, DriverMode::Disabled)
    }

    fn check_ready(&self) -> Result<(), DriverError> {
        match self.mode {
            DriverMode::Disabled => Err(DriverError::Disabled),
            DriverMode::Calibrating => Err(DriverError::Calibrating),
            _ if self.calibration.is_none() => Err(DriverError::NotCalibrated),
            _ => Ok(()),
        }
    }

    /// Open loop torque, also the mode haptics run in.
    pub fn set_dq(&mut self, d: f32, q: f32) -> Result<(), DriverError> {
        self.check_ready()?;
        // a concurrent haptic write wins, its value is just as fresh
        let _ = self.torque.write(DQVoltages::new(d, q));
        self.mode = DriverMode::Torque;
        Ok(())
    }

    /// Hands torque control to whoever writes the mailbox, without touching its content.
    pub fn set_torque_mode(&mut self) -> Result<(), DriverError> {
        self.check_ready()?;
        self.mode = DriverMode::Torque;
        Ok(())
    }

    pub fn set_velocity(&mut self, target: f32, pid: PidController) -> Result<(), DriverError> {
        self.check_ready()?;
        self.mode = DriverMode::Velocity { target, pid };
        Ok(())
    }

    pub fn set_abs_position(&mut self, target: f32, pid: PidController, inner: Option<PidController>) -> Result<(), DriverError> {
        self.check_ready()?;
        self.mode = DriverMode::Position { frame: PositionFrame::Absolute, target, pid, inner };
        Ok(())
    }

    pub fn set_rel_position(&mut self, target: f32, pid: PidController, inner: Option<PidController>) -> Result<(), DriverError> {
        self.check_ready()?;
        self.mode = DriverMode::Position { frame: PositionFrame::Relative, target, pid, inner };
        Ok(())
    }

    /// Zero output, bridge stays enabled.
    pub fn set_free(&mut self) -> Result<(), DriverError> {
        match self.mode {
            DriverMode::Disabled => Err(DriverError::Disabled),
            DriverMode::Calibrating => Err(DriverError::Calibrating),
            _ => {
                self.mode = DriverMode::Free;
                Ok(())
            }
        }
    }

    /// Retunes the loop of the active closed loop mode, keeping its integral.
    pub fn set_gains(&mut self, kp: f32, ki: f32, kd: f32) -> Result<(), DriverError> {
        match &mut self.mode {
            DriverMode::Velocity { pid, .. } | DriverMode::Position { pid, .. } => {
                pid.set_gains(kp, ki, kd);
                Ok(())
            }
            _ => Err(DriverError::OpenLoop),
        }
    }

    pub fn electrical_angle(&self, angle: &AngleSnapshot) -> f32 {
        match self.calibration {
            Some(cal) => angle.radian * self.config.pole_pairs as f32 * cal.direction - cal.zero_electrical_angle,
            None => 0.0,
        }
    }

    /// One commutation tick. Called from the periodic interrupt with the latest angle.
    pub fn commutate(&mut self, angle: &AngleSnapshot) -> PWMCommand {
        let cal = match (self.mode.kind(), self.calibration) {
            (ModeKind::Disabled, _) | (ModeKind::Calibrating, _) => return self.last_command,
            (_, None) => {
                return self.apply_output(DQVoltages::ZERO, 0.0);
            }
            (_, Some(cal)) => cal,
        };

        let request = self.mode.update(angle, self.torque);
        // positive q always turns the sensor angle positive
        let dq = DQVoltages::new(request.d, request.q * cal.direction);
        let theta = self.electrical_angle(angle);
        self.apply_output(dq, theta)
    }

    /// Clamp, modulate and write one voltage vector at the given electrical angle.
    pub(crate) fn apply_output(&mut self, dq: DQVoltages, theta: f32) -> PWMCommand {
        let ab = dq.clamp(self.config.dq_limit).inv_park_transform(theta);
        self.write_alpha_beta(&ab)
    }

    pub(crate) fn write_alpha_beta(&mut self, ab: &AlphaBetaVoltages) -> PWMCommand {
        let command = self.svm.calculate(ab);
        self.inverter.set_duty(command.u_duty, command.v_duty, command.w_duty);
        self.last_command = command;
        command
    }

    pub fn mode(&self) -> &DriverMode {
        &self.mode
    }

    pub fn calibration(&self) -> Option<CalibrationResult> {
        self.calibration
    }

    /// Reuses a result from an earlier run instead of calibrating again.
    pub fn restore_calibration(&mut self, cal: CalibrationResult) -> Result<(), DriverError> {
        if matches!(self.mode, DriverMode::Calibrating) {
            return Err(DriverError::Calibrating);
        }
        if cal.direction != 1.0 && cal.direction != -1.0 {
            return Err(DriverError::NotCalibrated);
        }
        info!("Zero electrical angle restored to {} rad", cal.zero_electrical_angle);
        self.calibration = Some(cal);
        Ok(())
    }

    pub fn last_command(&self) -> PWMCommand {
        self.last_command
    }

    pub fn inverter(&self) -> &I {
        &self.inverter
    }

    pub fn inverter_mut(&mut self) -> &mut I {
        &mut self.inverter
    }
}
