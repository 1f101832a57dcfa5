use bincode::{Encode, Decode};
use core::f32::consts::{PI, TAU};

#[derive(Debug, Clone, Copy, PartialEq, Encode, Decode)]
pub struct Config {
    // motor and sensor
    pub pole_pairs: u32,
    pub sensor_resolution: u32, // counts per mechanical revolution
    pub velocity_filter_alpha: f32,

    pub control_frequency: f32, // in Hz, shared by commutation and haptic ticks
    pub pwm_frequency: f32, // in Hz
    pub i2c_frequency: u32, // in Hz
    pub ui_period_ms: u32,
    pub telemetry_interval: u32, // in slow ticks, 0 is off

    /// largest |d| or |q| the driver will apply, in PWM counts
    pub dq_limit: f32,
    /// share of dq_limit a haptic mode may use
    pub haptic_torque_fraction: f32,

    // haptics
    pub velocity_deadband: f32, // in rad/s
    pub rebound_kp: f32,
    pub attractor_kp_max: f32,
    pub damping_gain: f32,

    // calibration
    pub calibration_voltage: f32,
    pub calibration_steps: u32,
    pub calibration_step_angle: f32, // electrical radians per step
    pub calibration_step_delay_ms: u32,
    pub calibration_settle_ms: u32,
    pub calibration_pause_ms: u32,
    pub calibration_align_ms: u32,
    pub calibration_release_ms: u32,
    pub calibration_min_motion: f32, // in mechanical radians

    // closed loop
    pub velocity_kp: f32,
    pub velocity_ki: f32,
    pub velocity_kd: f32,
    pub position_kp: f32,
    pub position_ki: f32,
    pub position_kd: f32,
    pub integral_limit: f32,
    pub static_friction_torque: f32,
}

impl Config {
    pub fn new() -> Self {
        // PWM period of 2000 counts, usable amplitude is half of it
        let dq_limit = 2000.0 / 2.0 - 1.0;

        Config {
            pole_pairs: 7,
            sensor_resolution: 4096,
            velocity_filter_alpha: 0.3,

            control_frequency: 1e3,
            pwm_frequency: 20e3,
            i2c_frequency: 400_000,
            ui_period_ms: 20,
            telemetry_interval: 5,

            dq_limit,
            haptic_torque_fraction: 1.0 / 3.0,

            velocity_deadband: 0.1,
            rebound_kp: 150.0,
            attractor_kp_max: 1000.0,
            damping_gain: 20.0,

            calibration_voltage: 2000.0 / 6.0,
            calibration_steps: 30,
            calibration_step_angle: TAU * 0.01,
            calibration_step_delay_ms: 10,
            calibration_settle_ms: 300,
            calibration_pause_ms: 500,
            calibration_align_ms: 1000,
            calibration_release_ms: 100,
            calibration_min_motion: 0.02,

            velocity_kp: 20.0,
            velocity_ki: 100.0,
            velocity_kd: 0.0,
            position_kp: 400.0,
            position_ki: 0.0,
            position_kd: 2.0,
            integral_limit: dq_limit / 2.0,
            static_friction_torque: 20.0,
        }
    }

    /// control loop period in seconds
    pub fn tick_period(&self) -> f32 {
        1.0 / self.control_frequency
    }

    pub fn tick_period_us(&self) -> u32 {
        (1e6 / self.control_frequency) as u32
    }

    pub fn haptic_torque_limit(&self) -> f32 {
        self.dq_limit * self.haptic_torque_fraction
    }

    /// radians per raw sensor count
    pub fn sensor_scale(&self) -> f32 {
        2.0 * PI / self.sensor_resolution as f32
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}
