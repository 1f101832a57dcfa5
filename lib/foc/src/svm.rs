use crate::transforms::AlphaBetaVoltages;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseDuty {
    pub u: f32,
    pub v: f32,
    pub w: f32,
}

impl PhaseDuty {
    pub const OFF: PhaseDuty = PhaseDuty { u: 0.0, v: 0.0, w: 0.0 };
}

const SQRT3: f32 = 1.7320508075688772935;

/// Sextant of an alpha/beta vector, 1 to 6 counter-clockwise from the alpha axis.
/// A vector on a boundary belongs to the lower numbered sextant.
pub fn sextant(alpha: f32, beta: f32) -> u8 {
    if beta >= 0.0f32 {
        if alpha > 0.0f32 {
            //quadrant I
            if beta > alpha * SQRT3 { 2 } else { 1 }
        } else {
            //quadrant II
            if -beta > alpha * SQRT3 { 3 } else { 2 }
        }
    } else {
        if alpha > 0.0f32 {
            //quadrant IV
            if -beta >= alpha * SQRT3 { 5 } else { 6 }
        } else {
            //quadrant III
            if beta >= alpha * SQRT3 { 4 } else { 5 }
        }
    }
}

// alpha and beta are normalized so that a magnitude of 1 is the largest circle the bridge can
// produce without clipping, outputs are duty cycles in [0, 1]
pub fn svpwm(alpha: f32, beta: f32) -> PhaseDuty {
    if !alpha.is_finite() || !beta.is_finite() {
        return PhaseDuty::OFF;
    }

    let (u, v, w) = match sextant(alpha, beta) {
        // sextant v1-v2
        1 => {
            let t_x = (SQRT3 * alpha - beta) / 2.0;
            let t_y = beta;
            let w = (1.0 - t_x - t_y) / 2.0;
            let v = w + t_y;
            (v + t_x, v, w)
        }

        // sextant v2-v3
        2 => {
            let t_x = (SQRT3 * alpha + beta) / 2.0;
            let t_y = (-SQRT3 * alpha + beta) / 2.0;
            let w = (1.0 - t_x - t_y) / 2.0;
            let u = w + t_x;
            (u, u + t_y, w)
        }

        // sextant v3-v4
        3 => {
            let t_x = beta;
            let t_y = (-SQRT3 * alpha - beta) / 2.0;
            let u = (1.0 - t_x - t_y) / 2.0;
            let w = u + t_y;
            (u, w + t_x, w)
        }

        // sextant v4-v5
        4 => {
            let t_x = (-SQRT3 * alpha + beta) / 2.0;
            let t_y = -beta;
            let u = (1.0 - t_x - t_y) / 2.0;
            let v = u + t_x;
            (u, v, v + t_y)
        }

        // sextant v5-v6
        5 => {
            let t_x = (-SQRT3 * alpha - beta) / 2.0;
            let t_y = (SQRT3 * alpha - beta) / 2.0;
            let v = (1.0 - t_x - t_y) / 2.0;
            let u = v + t_y;
            (u, v, u + t_x)
        }

        // sextant v6-v1
        6 => {
            let t_x = -beta;
            let t_y = (SQRT3 * alpha + beta) / 2.0;
            let v = (1.0 - t_x - t_y) / 2.0;
            let w = v + t_x;
            (w + t_y, v, w)
        }

        _ => {
            // Should never happen
            return PhaseDuty::OFF;
        }
    };

    PhaseDuty {
        u: u.max(0.0).min(1.0),
        v: v.max(0.0).min(1.0),
        w: w.max(0.0).min(1.0),
    }
}

fn round(x: f32) -> u16 {
    return (x + 0.5f32) as u16;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PWMCommand {
    pub driver_enable: bool,
    pub u_duty: u16,
    pub v_duty: u16,
    pub w_duty: u16,
}

impl PWMCommand {
    pub const OFF: PWMCommand = PWMCommand { driver_enable: false, u_duty: 0, v_duty: 0, w_duty: 0 };

    pub fn to_array(&self) -> [u16; 3] {
        [self.u_duty, self.v_duty, self.w_duty]
    }
}

/// Turns alpha/beta requests into timer compare values, carrying the rounding
/// error of each phase over to the next period.
#[derive(Debug)]
pub struct IterativeSVM {
    pub residuals: [f32; 3],
    max_duty: u16,
    full_scale: f32, // alpha/beta magnitude that maps onto the unit circle
}

impl IterativeSVM {
    pub fn new(max_duty: u16, full_scale: f32) -> IterativeSVM {
        IterativeSVM {
            residuals: [0.0; 3],
            max_duty,
            full_scale,
        }
    }

    // voltage in, duty cycle out
    pub fn calculate(&mut self, request: &AlphaBetaVoltages) -> PWMCommand {
        let normalized = request.scale(1.0 / self.full_scale);
        let duty = svpwm(normalized.alpha, normalized.beta);

        let cycle_time = self.max_duty as f32;
        let t_a = duty.u * cycle_time;
        let t_b = duty.v * cycle_time;
        let t_c = duty.w * cycle_time;

        let t_a_rounded = round(t_a + self.residuals[0]).min(self.max_duty);
        let t_b_rounded = round(t_b + self.residuals[1]).min(self.max_duty);
        let t_c_rounded = round(t_c + self.residuals[2]).min(self.max_duty);

        self.residuals[0] += t_a - t_a_rounded as f32;
        self.residuals[1] += t_b - t_b_rounded as f32;
        self.residuals[2] += t_c - t_c_rounded as f32;

        PWMCommand {
            driver_enable: true,
            u_duty: t_a_rounded,
            v_duty: t_b_rounded,
            w_duty: t_c_rounded,
        }
    }

    pub fn reset(&mut self) {
        self.residuals = [0.0; 3];
    }
}
