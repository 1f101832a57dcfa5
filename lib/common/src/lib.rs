#![no_std]

#[cfg(test)]
extern crate std;

use bincode::{Decode, Encode};
use bincode::config::{Configuration, LittleEndian, NoLimit, Varint};
use config::Config;
use encoder::AngleSnapshot;
use foc::{CalibrationError, CalibrationResult, DQVoltages, DriverError, ModeKind};
use haptic::{KnobReadout, RegistryError};

pub mod control;
pub mod frame;

pub use crate::control::{enable_driver, ControlCommand, ControlParams, Gains};
pub use crate::frame::{encode_frame, FrameReader, MAX_FRAME};

pub static BINCODE_CFG: Configuration<LittleEndian, Varint, NoLimit> = bincode::config::standard()
    .with_little_endian()
    .with_variable_int_encoding();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum CommandError {
    /// the frame did not hold a valid command
    Decode,
    /// the reply did not fit the output buffer
    Encode,
    UnknownMode,
    Rejected,
    Driver(DriverError),
    Calibration(CalibrationError),
}

impl From<DriverError> for CommandError {
    fn from(e: DriverError) -> Self {
        CommandError::Driver(e)
    }
}

impl From<CalibrationError> for CommandError {
    fn from(e: CalibrationError) -> Self {
        CommandError::Calibration(e)
    }
}

impl From<RegistryError> for CommandError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::UnknownMode => CommandError::UnknownMode,
            RegistryError::Full => CommandError::Rejected,
        }
    }
}

/// One telemetry record, sent from the slow task.
#[derive(Debug, Clone, Copy, PartialEq, Encode, Decode)]
pub struct Telemetry {
    pub id: u32,
    pub angle: AngleSnapshot,
    pub dq: DQVoltages,
    pub driver: ModeKind,
    pub knob_mode: u8,
    pub readout: KnobReadout,
    pub detent: i32,
    pub sensor_faults: u32,
}

#[derive(Encode, Decode, Debug, Clone, Copy, PartialEq)]
pub enum DeviceToHost {
    Sample(Telemetry),
    Ack(Result<(), CommandError>),
    Config(Config),
}

#[derive(Encode, Decode, Debug, Clone, Copy, PartialEq)]
pub enum HostToDevice {
    Control(ControlParams),
    Enable(bool),
    RestoreCalibration(CalibrationResult),
    SelectMode(u8),
    NextMode,
    /// frees the knob and keeps the session for a later resume
    StopMotor,
    ResumeMotor,
    /// slow ticks between samples, 0 turns telemetry off
    TelemetryInterval(u32),
    GetConfig,
}
