use core::f32::consts::{PI, TAU};

/// Tracks a wrapped angle in [0, 2pi) and accumulates it into a continuous one.
#[derive(Debug, Clone, Copy)]
pub struct Unwrapper {
    previous: Option<f32>,
    total: f32,
}

impl Unwrapper {
    pub fn new() -> Unwrapper {
        Unwrapper {
            previous: None,
            total: 0.0,
        }
    }

    /// Feeds a new wrapped sample and returns the step taken since the last one.
    /// The first sample seeds the total and reports no motion.
    pub fn step(&mut self, value: f32) -> f32 {
        let delta = match self.previous {
            Some(previous) => wrap_delta(value - previous),
            None => {
                self.total = value;
                0.0
            }
        };
        self.previous = Some(value);
        self.total += delta;
        delta
    }

    pub fn total(&self) -> f32 {
        self.total
    }

    pub fn previous(&self) -> f32 {
        self.previous.unwrap_or(0.0)
    }
}

impl Default for Unwrapper {
    fn default() -> Self {
        Unwrapper::new()
    }
}

/// Folds a raw difference of two wrapped angles back into [-pi, pi].
pub fn wrap_delta(d: f32) -> f32 {
    if d > PI {
        d - TAU
    } else if d < -PI {
        d + TAU
    } else {
        d
    }
}

/// Like `wrap_delta`, but the result is strictly inside (-pi, pi].
pub fn normalize_difference(d: f32) -> f32 {
    let d = wrap_delta(d);
    if d <= -PI {
        d + TAU
    } else {
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap() {
        use rand_distr::{Uniform, Distribution};

        let step = Uniform::new(-3.0, 3.0);
        let mut rng = rand::thread_rng();

        let mut gt_unwrapped = 1.0f32;
        let mut unwrapper = Unwrapper::new();
        unwrapper.step(gt_unwrapped);

        for i in 0..10000 {
            let x: f32 = step.sample(&mut rng);
            gt_unwrapped += x;

            unwrapper.step(gt_unwrapped.rem_euclid(TAU));
            let unwrapped = unwrapper.total();
            assert!((unwrapped - gt_unwrapped).abs() < 0.05, "{}, unwrapped: {}, gt_unwrapped: {}", i, unwrapped, gt_unwrapped);
        }
    }

    #[test]
    fn test_boundary_crossing() {
        let mut unwrapper = Unwrapper::new();
        let mut previous_total: Option<f32> = None;
        for sample in [0.1f32, 6.2, 0.3] {
            let delta = unwrapper.step(sample);
            assert!(delta.abs() <= PI, "delta {} for sample {}", delta, sample);
            if let Some(previous) = previous_total {
                let total: f32 = unwrapper.total();
                assert!((total - previous).abs() < 0.5);
            }
            previous_total = Some(unwrapper.total());
        }
        // 0.1 -> 6.2 is a step of about -0.183, 6.2 -> 0.3 about +0.383
        assert!((unwrapper.total() - 0.3).abs() < 1e-4);
    }

    #[test]
    fn test_normalize_difference() {
        assert!((normalize_difference(-PI) - PI).abs() < 1e-6);
        assert!((normalize_difference(PI) - PI).abs() < 1e-6);
        assert!((normalize_difference(6.0) - (6.0 - TAU)).abs() < 1e-6);
        assert!((normalize_difference(-6.0) - (TAU - 6.0)).abs() < 1e-6);
        assert_eq!(normalize_difference(0.5), 0.5);
    }
}
