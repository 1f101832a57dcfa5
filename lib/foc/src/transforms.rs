use libm::sincosf;
use bincode::{Encode, Decode};

#[derive(Debug, Clone, Copy, Default, PartialEq, Encode, Decode)]
pub struct DQVoltages {
    pub d: f32, // units of PWM counts
    pub q: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AlphaBetaVoltages {
    pub alpha: f32, // units of PWM counts
    pub beta: f32,
}

impl DQVoltages {
    pub const ZERO: DQVoltages = DQVoltages { d: 0.0, q: 0.0 };

    pub fn new(d: f32, q: f32) -> DQVoltages {
        DQVoltages { d, q }
    }

    pub fn clamp(&self, limit: f32) -> DQVoltages {
        DQVoltages {
            d: self.d.max(-limit).min(limit),
            q: self.q.max(-limit).min(limit),
        }
    }

    pub fn inv_park_transform(&self, angle: f32) -> AlphaBetaVoltages {
        let (s, c) = sincosf(angle);

        AlphaBetaVoltages {
            alpha: self.d * c - self.q * s,
            beta: self.q * c + self.d * s,
        }
    }
}

impl AlphaBetaVoltages {
    pub fn park_transform(&self, angle: f32) -> DQVoltages {
        let (s, c) = sincosf(angle);

        DQVoltages {
            d: self.alpha * c + self.beta * s,
            q: self.beta * c - self.alpha * s,
        }
    }

    pub fn scale(&self, k: f32) -> AlphaBetaVoltages {
        AlphaBetaVoltages {
            alpha: self.alpha * k,
            beta: self.beta * k,
        }
    }
}

pub fn inverse_park(theta: f32, d: f32, q: f32) -> (f32, f32) {
    let ab = DQVoltages { d, q }.inv_park_transform(theta);
    (ab.alpha, ab.beta)
}

pub fn park(theta: f32, alpha: f32, beta: f32) -> (f32, f32) {
    let dq = AlphaBetaVoltages { alpha, beta }.park_transform(theta);
    (dq.d, dq.q)
}
