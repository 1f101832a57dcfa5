use bincode::{Encode, Decode};
use config::Config;
use crate::unwrap::Unwrapper;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum SensorError {
    /// the transfer on the bus failed
    Bus,
    /// the device answered with a code outside its resolution
    OutOfRange,
}

/// Anything that can produce a raw absolute angle code.
pub trait AngleSource {
    fn read_raw(&mut self) -> Result<u16, SensorError>;
}

/// Lets a control mode move the relative origin of the angle it works in.
pub trait RelativeOrigin {
    fn reset_relative_offset(&mut self);
    fn set_relative_total(&mut self, radian: f32);
}

/// Everything a control loop needs from one sensor update, cheap to copy across tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Encode, Decode)]
pub struct AngleSnapshot {
    pub radian: f32, // wrapped, [0, 2pi)
    pub total: f32,
    pub relative_total: f32,
    pub velocity: f32, // rad/s
    pub velocity_filtered: f32,
}

impl AngleSnapshot {
    pub const ZERO: AngleSnapshot = AngleSnapshot {
        radian: 0.0,
        total: 0.0,
        relative_total: 0.0,
        velocity: 0.0,
        velocity_filtered: 0.0,
    };
}

pub struct AngleSensor<S> {
    source: S,
    unwrapper: Unwrapper,
    relative_offset: f32,
    velocity: f32,
    velocity_filtered: f32,

    scale: f32,
    resolution: u32,
    tick_period: f32,
    alpha: f32,
}

impl<S: AngleSource> AngleSensor<S> {
    pub fn new(source: S, config: &Config) -> AngleSensor<S> {
        AngleSensor {
            source,
            unwrapper: Unwrapper::new(),
            relative_offset: 0.0,
            velocity: 0.0,
            velocity_filtered: 0.0,
            scale: config.sensor_scale(),
            resolution: config.sensor_resolution,
            tick_period: config.tick_period(),
            alpha: config.velocity_filter_alpha,
        }
    }

    /// Reads the sensor without touching the accumulated state.
    pub fn sample(&mut self) -> Result<f32, SensorError> {
        let raw = self.source.read_raw()?;
        if raw as u32 >= self.resolution {
            return Err(SensorError::OutOfRange);
        }
        Ok(raw as f32 * self.scale)
    }

    /// Advances the accumulated angle with a fresh sample. On error nothing moves and
    /// the last good state is still available through `snapshot`.
    pub fn update(&mut self) -> Result<AngleSnapshot, SensorError> {
        let radian = self.sample()?;
        self.update_and_get(radian);
        Ok(self.snapshot())
    }

    /// Folds an already sampled wrapped angle into the state and returns the new total.
    pub fn update_and_get(&mut self, radian: f32) -> f32 {
        let delta = self.unwrapper.step(radian);
        self.velocity = delta / self.tick_period;
        self.velocity_filtered = self.alpha * self.velocity + (1.0 - self.alpha) * self.velocity_filtered;
        self.unwrapper.total()
    }

    pub fn snapshot(&self) -> AngleSnapshot {
        AngleSnapshot {
            radian: self.radian(),
            total: self.get_total(),
            relative_total: self.get_relative_total(),
            velocity: self.velocity,
            velocity_filtered: self.velocity_filtered,
        }
    }

    pub fn radian(&self) -> f32 {
        self.unwrapper.previous()
    }

    pub fn get_total(&self) -> f32 {
        self.unwrapper.total()
    }

    pub fn get_relative_total(&self) -> f32 {
        self.unwrapper.total() - self.relative_offset
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn velocity_filtered(&self) -> f32 {
        self.velocity_filtered
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

impl<S: AngleSource> RelativeOrigin for AngleSensor<S> {
    fn reset_relative_offset(&mut self) {
        self.relative_offset = self.unwrapper.total();
    }

    fn set_relative_total(&mut self, radian: f32) {
        self.relative_offset = self.unwrapper.total() - radian;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::{PI, TAU};
    use std::vec::Vec;

    pub struct ScriptedSource {
        codes: Vec<Result<u16, SensorError>>,
        index: usize,
    }

    impl ScriptedSource {
        fn new(codes: Vec<Result<u16, SensorError>>) -> ScriptedSource {
            ScriptedSource { codes, index: 0 }
        }
    }

    impl AngleSource for ScriptedSource {
        fn read_raw(&mut self) -> Result<u16, SensorError> {
            let code = self.codes[self.index.min(self.codes.len() - 1)];
            self.index += 1;
            code
        }
    }

    fn code(radian: f32) -> u16 {
        (radian / TAU * 4096.0) as u16
    }

    #[test]
    fn test_sample_does_not_update() {
        let mut sensor = AngleSensor::new(ScriptedSource::new(vec![Ok(1024), Ok(2048)]), &Config::new());
        let a = sensor.sample().unwrap();
        assert!((a - PI / 2.0).abs() < 1e-5);
        assert_eq!(sensor.get_total(), 0.0);
        let b = sensor.sample().unwrap();
        assert!((b - PI).abs() < 1e-5);
        assert_eq!(sensor.get_total(), 0.0);
    }

    #[test]
    fn test_wrap_crossing() {
        let codes = vec![Ok(code(0.1)), Ok(code(6.2)), Ok(code(0.3))];
        let mut sensor = AngleSensor::new(ScriptedSource::new(codes), &Config::new());

        let mut last = sensor.update().unwrap().total;
        for _ in 0..2 {
            let total = sensor.update().unwrap().total;
            assert!((total - last).abs() < PI);
            last = total;
        }
        assert!((last - 0.3).abs() < 0.01, "{}", last);
    }

    #[test]
    fn test_velocity_filter() {
        let config = Config::new();
        let mut sensor = AngleSensor::new(ScriptedSource::new(vec![Ok(0)]), &config);
        sensor.update_and_get(0.0);

        // 0.01 rad per 1 ms tick
        sensor.update_and_get(0.01);
        assert!((sensor.velocity() - 10.0).abs() < 1e-3);
        assert!((sensor.velocity_filtered() - 3.0).abs() < 1e-3);

        sensor.update_and_get(0.02);
        assert!((sensor.velocity_filtered() - (0.3 * 10.0 + 0.7 * 3.0)).abs() < 1e-3);

        for i in 3..200 {
            sensor.update_and_get(i as f32 * 0.01);
        }
        assert!((sensor.velocity_filtered() - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_failed_read_keeps_last_angle() {
        let codes = vec![Ok(100), Ok(200), Err(SensorError::Bus), Ok(5000), Ok(300)];
        let mut sensor = AngleSensor::new(ScriptedSource::new(codes), &Config::new());

        sensor.update().unwrap();
        let good = sensor.update().unwrap();

        assert_eq!(sensor.update(), Err(SensorError::Bus));
        assert_eq!(sensor.snapshot(), good);
        assert_eq!(sensor.update(), Err(SensorError::OutOfRange));
        assert_eq!(sensor.snapshot(), good);

        let next = sensor.update().unwrap();
        assert!((next.total - 300.0 * TAU / 4096.0).abs() < 1e-5);
    }

    #[test]
    fn test_full_16_bit_resolution() {
        let mut config = Config::new();
        config.sensor_resolution = 65536;
        let mut sensor = AngleSensor::new(ScriptedSource::new(vec![Ok(u16::MAX), Ok(32768)]), &config);

        let a = sensor.sample().unwrap();
        assert!((a - TAU * 65535.0 / 65536.0).abs() < 1e-4);
        let b = sensor.sample().unwrap();
        assert!((b - PI).abs() < 1e-5);
    }

    #[test]
    fn test_relative_origin() {
        let mut sensor = AngleSensor::new(ScriptedSource::new(vec![Ok(0)]), &Config::new());
        sensor.update_and_get(1.0);
        sensor.update_and_get(2.0);

        sensor.reset_relative_offset();
        assert_eq!(sensor.get_relative_total(), 0.0);
        assert_eq!(sensor.get_total(), 2.0);

        sensor.update_and_get(2.5);
        assert!((sensor.get_relative_total() - 0.5).abs() < 1e-6);

        sensor.set_relative_total(-PI / 4.0);
        assert!((sensor.get_relative_total() + PI / 4.0).abs() < 1e-6);
        assert!((sensor.snapshot().relative_total + PI / 4.0).abs() < 1e-6);
    }
}
