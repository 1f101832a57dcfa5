use bincode::{Encode, Decode};
use embedded_hal::blocking::delay::DelayMs;
use encoder::{AngleSensor, AngleSource, SensorError};
use encoder::unwrap::normalize_difference;
use crate::hardware::{CommutationTimer, Inverter};
use crate::open_loop_voltage::OpenLoopVoltageController;
use crate::state_machine::{CalibrationResult, DriverMode, MotorDriver};
use crate::transforms::DQVoltages;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum CalibrationError {
    /// the bridge has to be enabled first
    BridgeDisabled,
    /// already running
    Busy,
    Sensor(SensorError),
    /// the rotor did not follow the open loop sweep
    Stalled,
}

impl From<SensorError> for CalibrationError {
    fn from(e: SensorError) -> Self {
        CalibrationError::Sensor(e)
    }
}

impl<'a, I: Inverter> MotorDriver<'a, I> {
    /// Finds the sensor direction and the electrical zero by driving the motor open loop.
    ///
    /// Blocks for about two seconds. The commutation timer is stopped for the whole run and
    /// restarted afterwards, whatever the outcome. On failure the previous result is kept
    /// and the driver is left in free mode.
    pub fn calibrate<S, D, T>(&mut self, sensor: &mut AngleSensor<S>, delay: &mut D, timer: &mut T) -> Result<CalibrationResult, CalibrationError>
        where S: AngleSource, D: DelayMs<u32>, T: CommutationTimer {
        match self.mode {
            DriverMode::Disabled => {
                warn!("Please enable the motor driver first");
                return Err(CalibrationError::BridgeDisabled);
            }
            DriverMode::Calibrating => return Err(CalibrationError::Busy),
            _ => {}
        }

        timer.stop();
        self.mode = DriverMode::Calibrating;
        self.svm.reset();

        let result = self.run_calibration(sensor, delay);

        self.apply_output(DQVoltages::ZERO, 0.0);
        self.mode = DriverMode::Free;
        match result {
            Ok(cal) => {
                self.calibration = Some(cal);
                info!("Zero electrical angle is set to {} rad", cal.zero_electrical_angle);
                info!("Motor direction calibration done.");
            }
            Err(e) => warn!("calibration failed: {:?}", e),
        }
        timer.start();
        result
    }

    fn run_calibration<S, D>(&mut self, sensor: &mut AngleSensor<S>, delay: &mut D) -> Result<CalibrationResult, CalibrationError>
        where S: AngleSource, D: DelayMs<u32> {
        let c = self.config;
        let test_voltage = c.calibration_voltage;

        info!("Starting motor direction calibration...");
        let mut sweep = OpenLoopVoltageController::new(DQVoltages::new(0.0, test_voltage));
        let ab = sweep.process_position(0.0);
        self.write_alpha_beta(&ab);
        delay.delay_ms(c.calibration_settle_ms);
        let initial_angle = sensor.sample()?;

        for _ in 0..c.calibration_steps {
            let ab = sweep.process_velocity(c.calibration_step_angle);
            self.write_alpha_beta(&ab);
            delay.delay_ms(c.calibration_step_delay_ms);
        }

        let final_angle = sensor.sample();
        self.apply_output(DQVoltages::ZERO, sweep.get_position());
        let final_angle = final_angle?;

        let difference = normalize_difference(final_angle - initial_angle);
        if libm::fabsf(difference) < c.calibration_min_motion {
            warn!("rotor moved {} rad during the sweep, is it blocked?", difference);
            return Err(CalibrationError::Stalled);
        }
        let direction = if difference > 0.0 { 1.0 } else { -1.0 };
        info!("Motor direction is {}", direction);

        delay.delay_ms(c.calibration_pause_ms);
        info!("Setting zero electrical angle...");
        // a d axis vector pulls the rotor onto electrical zero
        self.apply_output(DQVoltages::new(test_voltage, 0.0), 0.0);
        delay.delay_ms(c.calibration_align_ms);
        let mechanical = sensor.sample()?;
        let zero_electrical_angle = mechanical * c.pole_pairs as f32 * direction;
        delay.delay_ms(c.calibration_release_ms);

        Ok(CalibrationResult { direction, zero_electrical_angle })
    }
}
