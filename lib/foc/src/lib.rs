#![no_std]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

#[macro_use]
pub mod log;

pub mod calibration;
pub mod hardware;
pub mod open_loop_voltage;
pub mod pid;
pub mod state_machine;
pub mod svm;
pub mod sync;
pub mod transforms;

pub use crate::calibration::CalibrationError;
pub use crate::state_machine::{CalibrationResult, DriverError, DriverMode, ModeKind, MotorDriver};
pub use crate::sync::{Mailbox, MailboxError, TorqueCommand};
pub use crate::transforms::DQVoltages;
