use encoder::AngleSnapshot;
use foc::{DQVoltages, Mailbox};

pub mod console;
pub mod hardware;

/// Latest angle, written by the commutation tick.
pub static ANGLE: Mailbox<AngleSnapshot> = Mailbox::new(AngleSnapshot::ZERO);
/// Torque request for the driver, written by the knob or the console.
pub static TORQUE: Mailbox<DQVoltages> = Mailbox::new(DQVoltages::ZERO);
