use bincode::{Encode, Decode};
use config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Encode, Decode)]
pub struct PidParams {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    pub output_limit: f32,
    pub integral_limit: f32,
    /// added in the direction of the output whenever it is nonzero
    pub static_friction_torque: f32,
}

impl PidParams {
    pub fn velocity(config: &Config) -> PidParams {
        PidParams {
            kp: config.velocity_kp,
            ki: config.velocity_ki,
            kd: config.velocity_kd,
            output_limit: config.dq_limit,
            integral_limit: config.integral_limit,
            static_friction_torque: config.static_friction_torque,
        }
    }

    pub fn position(config: &Config) -> PidParams {
        PidParams {
            kp: config.position_kp,
            ki: config.position_ki,
            kd: config.position_kd,
            output_limit: config.dq_limit,
            integral_limit: config.integral_limit,
            static_friction_torque: config.static_friction_torque,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidController {
    params: PidParams,
    ts: f32, // seconds
    integral: f32,
    previous_error: f32,
}

impl PidController {
    pub fn new(params: PidParams, ts: f32) -> PidController {
        PidController {
            params,
            ts,
            integral: 0.0,
            previous_error: 0.0,
        }
    }

    pub fn calculate(&mut self, error: f32) -> f32 {
        let p = &self.params;

        let proportional = p.kp * error;

        self.integral += p.ki * error * self.ts;
        self.integral = clamp(self.integral, p.integral_limit);

        let derivative = p.kd * (error - self.previous_error) / self.ts;
        self.previous_error = error;

        let mut output = proportional + self.integral + derivative;
        if output > 0.0 {
            output += p.static_friction_torque;
        } else if output < 0.0 {
            output -= p.static_friction_torque;
        }

        clamp(output, p.output_limit)
    }

    /// Retunes in place. The accumulated integral is kept.
    pub fn set_gains(&mut self, kp: f32, ki: f32, kd: f32) {
        self.params.kp = kp;
        self.params.ki = ki;
        self.params.kd = kd;
    }

    pub fn params(&self) -> &PidParams {
        &self.params
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }
}

fn clamp(x: f32, limit: f32) -> f32 {
    x.max(-limit).min(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(kp: f32, ki: f32, kd: f32) -> PidParams {
        PidParams {
            kp,
            ki,
            kd,
            output_limit: 900.0,
            integral_limit: 100.0,
            static_friction_torque: 5.0,
        }
    }

    #[test]
    fn test_saturation() {
        let mut pid = PidController::new(params(10.0, 0.0, 0.0), 1e-3);
        assert_eq!(pid.calculate(1000.0), 900.0);
        assert_eq!(pid.calculate(-1000.0), -900.0);
    }

    #[test]
    fn test_no_friction_at_zero() {
        let mut pid = PidController::new(params(10.0, 0.0, 0.0), 1e-3);
        assert_eq!(pid.calculate(0.0), 0.0);
        assert_eq!(pid.calculate(1.0), 15.0);
        assert_eq!(pid.calculate(-1.0), -15.0);
    }

    #[test]
    fn test_integral_clamped() {
        let mut pid = PidController::new(params(0.0, 1000.0, 0.0), 1e-3);
        for _ in 0..1000 {
            pid.calculate(10.0);
        }
        assert_eq!(pid.integral(), 100.0);
        // unwinds as soon as the error flips
        pid.calculate(-10.0);
        assert!(pid.integral() < 100.0);
    }

    #[test]
    fn test_derivative() {
        let mut pid = PidController::new(params(0.0, 0.0, 0.01), 1e-3);
        assert!((pid.calculate(1.0) - (10.0 + 5.0)).abs() < 1e-3);
        // error unchanged, no derivative and no output
        assert_eq!(pid.calculate(1.0), 0.0);
    }

    #[test]
    fn test_set_gains_keeps_integral() {
        let mut pid = PidController::new(params(1.0, 1000.0, 0.0), 1e-3);
        pid.calculate(10.0);
        let integral = pid.integral();
        assert!(integral > 0.0);

        pid.set_gains(2.0, 0.0, 0.0);
        assert_eq!(pid.integral(), integral);
        assert_eq!(pid.params().kp, 2.0);
    }
}
