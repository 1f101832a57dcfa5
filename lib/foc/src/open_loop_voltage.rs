use crate::transforms::{AlphaBetaVoltages, DQVoltages};

/// Spins a fixed voltage vector at a commanded electrical angle, no feedback involved.
#[derive(Debug)]
pub struct OpenLoopVoltageController {
    pub(crate) position: f32, // electrical radians
    voltage: DQVoltages,
}

impl OpenLoopVoltageController {
    pub fn new(voltage: DQVoltages) -> OpenLoopVoltageController {
        OpenLoopVoltageController {
            position: 0.0,
            voltage,
        }
    }

    pub fn get_position(&self) -> f32 {
        self.position
    }

    pub fn set_voltage(&mut self, voltage: DQVoltages) {
        self.voltage = voltage;
    }

    // advance by velocity_req electrical radians, output is for the new position
    pub fn process_velocity(&mut self, velocity_req: f32) -> AlphaBetaVoltages {
        self.process_position(self.position + velocity_req)
    }

    pub fn process_position(&mut self, position_req: f32) -> AlphaBetaVoltages {
        self.position = position_req;
        self.voltage.inv_park_transform(position_req)
    }
}
