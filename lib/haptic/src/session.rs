use bincode::{Encode, Decode};
use encoder::RelativeOrigin;
use foc::TorqueCommand;
use libm::{fabsf, roundf};
use crate::knob::{Anchor, HapticKnob, HapticMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum KnobBehavior {
    /// free spinning, no resistance
    Unbounded,
    /// limited range, springs back at the ends
    Bounded,
    /// two positions with a snap between them
    Switch,
    /// detents, optionally limited to a range
    Attractor,
    /// limited range with viscous feel inside it
    DampingBound,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnobModeConfig {
    pub name: &'static str,
    pub behavior: KnobBehavior,
    pub min_angle: f32,
    pub max_angle: f32,
    /// values go from start_number to start_number + steps, below 1 the readout is a percentage
    pub steps: i32,
    pub start_number: i32,
    pub use_rebound: bool,
    pub damping_gain: f32,
    pub attractor_kp: f32,
}

impl KnobModeConfig {
    pub fn new(name: &'static str, behavior: KnobBehavior) -> KnobModeConfig {
        KnobModeConfig {
            name,
            behavior,
            min_angle: 0.0,
            max_angle: 0.0,
            steps: 0,
            start_number: 0,
            use_rebound: false,
            damping_gain: 0.0,
            attractor_kp: 800.0,
        }
    }

    pub fn range(mut self, min_angle: f32, max_angle: f32) -> Self {
        self.min_angle = min_angle;
        self.max_angle = max_angle;
        self
    }

    pub fn steps(mut self, steps: i32, start_number: i32) -> Self {
        self.steps = steps;
        self.start_number = start_number;
        self
    }

    pub fn rebound(mut self, use_rebound: bool) -> Self {
        self.use_rebound = use_rebound;
        self
    }

    pub fn damping_gain(mut self, gain: f32) -> Self {
        self.damping_gain = gain;
        self
    }

    pub fn attractor_kp(mut self, kp: f32) -> Self {
        self.attractor_kp = kp;
        self
    }

    pub fn haptic_mode(&self) -> HapticMode {
        let steps = self.steps.max(0) as u16;
        match self.behavior {
            KnobBehavior::Unbounded => HapticMode::Damping { gain: 0.0 },
            KnobBehavior::Bounded => HapticMode::DampingWithRebound {
                gain: 0.0,
                min_angle: self.min_angle,
                max_angle: self.max_angle,
            },
            // one step means two positions
            KnobBehavior::Switch => HapticMode::AttractorWithRebound {
                steps: steps + 1,
                min_angle: self.min_angle,
                max_angle: self.max_angle,
                kp: self.attractor_kp,
            },
            KnobBehavior::Attractor if self.use_rebound => HapticMode::AttractorWithRebound {
                steps,
                min_angle: self.min_angle,
                max_angle: self.max_angle,
                kp: self.attractor_kp,
            },
            KnobBehavior::Attractor => HapticMode::Attractor { steps },
            KnobBehavior::DampingBound => HapticMode::DampingWithRebound {
                gain: self.damping_gain,
                min_angle: self.min_angle,
                max_angle: self.max_angle,
            },
        }
    }
}

/// What the slow task reports for the active mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Encode, Decode)]
pub struct KnobReadout {
    pub angle: f32,
    pub value: i32,
    pub percent: i32,
}

/// One activation of a knob mode: applies its config to the knob and turns the knob
/// angle back into a value for display or telemetry.
pub struct KnobSession {
    config: KnobModeConfig,
    current_angle: f32,
    reset_anchor: bool,
    step_index: i32,
    readout: KnobReadout,
}

impl KnobSession {
    pub fn new(config: KnobModeConfig) -> KnobSession {
        KnobSession {
            config,
            current_angle: 0.0,
            reset_anchor: true,
            step_index: 0,
            readout: KnobReadout::default(),
        }
    }

    pub fn init<O: RelativeOrigin>(&mut self, knob: &mut HapticKnob, origin: &mut O) {
        let mode = self.config.haptic_mode();
        let anchor = match mode {
            // a free detent wheel always restarts on a detent
            HapticMode::Attractor { .. } => Anchor::Reset,
            _ if self.reset_anchor => Anchor::Reset,
            _ => Anchor::Resume(self.current_angle),
        };
        knob.set_mode(mode, anchor, origin);
        self.reset_anchor = false;
        foc::info!("knob mode {}", self.config.name);
    }

    /// Called from the slow task, never from a control tick.
    pub fn update(&mut self, knob: &HapticKnob) -> KnobReadout {
        let c = &self.config;
        let angle = knob.current_radian();
        self.current_angle = angle;

        self.readout = if angle < c.min_angle {
            KnobReadout { angle: c.min_angle, value: c.start_number, percent: 0 }
        } else if angle > c.max_angle {
            KnobReadout { angle: c.max_angle, value: c.start_number + c.steps, percent: 100 }
        } else {
            let range = c.max_angle - c.min_angle;
            let progress = if fabsf(range) > 1e-6 { (angle - c.min_angle) / range } else { 0.0 };

            if c.steps >= 1 {
                let step = roundf(progress * c.steps as f32) as i32;
                self.step_index = c.start_number + step;
                let percent = roundf(step as f32 / c.steps as f32 * 100.0) as i32;
                KnobReadout { angle, value: self.step_index, percent }
            } else {
                let percent = roundf(progress * 100.0) as i32;
                self.step_index = percent;
                KnobReadout { angle, value: percent, percent }
            }
        };
        self.readout
    }

    pub fn destroy<T: TorqueCommand>(&mut self, knob: &mut HapticKnob, out: &T) {
        self.stop_motor(knob, out);
    }

    /// Hands the motor over, e.g. for a click effect, keeping the session.
    pub fn stop_motor<T: TorqueCommand>(&mut self, knob: &mut HapticKnob, out: &T) {
        knob.stop(out);
    }

    /// Takes the motor back without moving the origin.
    pub fn resume_motor<O: RelativeOrigin>(&mut self, knob: &mut HapticKnob, origin: &mut O) {
        knob.set_mode(self.config.haptic_mode(), Anchor::Resume(self.current_angle), origin);
    }

    pub fn current_step_index(&self) -> i32 {
        self.step_index
    }

    pub fn readout(&self) -> KnobReadout {
        self.readout
    }

    pub fn config(&self) -> &KnobModeConfig {
        &self.config
    }
}
