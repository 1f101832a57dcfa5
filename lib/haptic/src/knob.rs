use bincode::{Encode, Decode};
use config::Config;
use core::f32::consts::TAU;
use encoder::{AngleSnapshot, RelativeOrigin};
use foc::TorqueCommand;
use libm::{logf, roundf};

#[derive(Debug, Clone, Copy, PartialEq, Encode, Decode)]
pub enum HapticMode {
    None,
    /// `steps` detents spread evenly over a full turn
    Attractor { steps: u16 },
    /// `steps` detents from `min_angle` to `max_angle`, both ends included
    AttractorWithRebound { steps: u16, min_angle: f32, max_angle: f32, kp: f32 },
    Damping { gain: f32 },
    DampingWithRebound { gain: f32, min_angle: f32, max_angle: f32 },
}

/// How the relative angle origin is placed when a mode starts.
#[derive(Debug, Clone, Copy, PartialEq, Encode, Decode)]
pub enum Anchor {
    /// start from a fresh origin, bounded modes start at their lower bound
    Reset,
    /// keep the knob where it was, at this relative angle
    Resume(f32),
}

pub struct HapticKnob {
    mode: HapticMode,

    torque_limit: f32,
    deadband: f32,
    rebound_kp: f32,
    attractor_kp_max: f32,

    detent_index: i32,
    damping_position: f32,
    current_radian: f32,
}

impl HapticKnob {
    pub fn new(config: &Config) -> HapticKnob {
        HapticKnob {
            mode: HapticMode::None,
            torque_limit: config.haptic_torque_limit(),
            deadband: config.velocity_deadband,
            rebound_kp: config.rebound_kp,
            attractor_kp_max: config.attractor_kp_max,
            detent_index: 0,
            damping_position: 0.0,
            current_radian: 0.0,
        }
    }

    /// Switches behavior and re-anchors the angle the knob works in.
    pub fn set_mode<O: RelativeOrigin>(&mut self, mode: HapticMode, anchor: Anchor, origin: &mut O) {
        let mode = match mode {
            HapticMode::Attractor { steps } => HapticMode::Attractor { steps: steps.max(1) },
            HapticMode::AttractorWithRebound { steps, min_angle, max_angle, kp } => {
                HapticMode::AttractorWithRebound { steps: steps.max(2), min_angle, max_angle, kp }
            }
            m => m,
        };

        match (anchor, &mode) {
            (_, HapticMode::None) => {}
            (Anchor::Resume(radian), _) => origin.set_relative_total(radian),
            (Anchor::Reset, HapticMode::AttractorWithRebound { min_angle, .. })
            | (Anchor::Reset, HapticMode::DampingWithRebound { min_angle, .. }) => {
                origin.set_relative_total(*min_angle)
            }
            (Anchor::Reset, _) => origin.reset_relative_offset(),
        }

        self.mode = mode;
    }

    /// Frees the motor right away. The caller keeps whatever it needs to resume later.
    pub fn stop<T: TorqueCommand>(&mut self, out: &T) {
        self.mode = HapticMode::None;
        let _ = out.set_dq(0.0, 0.0);
    }

    /// One haptic tick. Returns the q command that was sent, zero when idle.
    pub fn tick<T: TorqueCommand>(&mut self, angle: &AngleSnapshot, out: &T) -> f32 {
        let current = angle.relative_total;
        self.current_radian = current;

        let torque = match self.mode {
            HapticMode::None => return 0.0,
            HapticMode::Attractor { steps } => {
                let n = steps as f32;
                let kp = (100.0 * logf(n + 1.0) + 100.0).min(self.attractor_kp_max);
                let distance = TAU / n;
                let index = roundf(current / distance);
                self.detent_index = (index as i32).rem_euclid(steps as i32);
                kp * (index * distance - current)
            }
            HapticMode::AttractorWithRebound { steps, min_angle, max_angle, kp } => {
                let intervals = (steps as i32 - 1).max(1);
                let distance = (max_angle - min_angle) / intervals as f32;
                let index = if distance > 0.0 {
                    (roundf((current - min_angle) / distance) as i32).max(0).min(intervals)
                } else {
                    0
                };
                self.detent_index = index;
                kp * (min_angle + index as f32 * distance - current)
            }
            HapticMode::Damping { gain } => {
                self.damping_position = current;
                self.damping(gain, angle.velocity_filtered)
            }
            HapticMode::DampingWithRebound { gain, min_angle, max_angle } => {
                if current < min_angle {
                    self.rebound_kp * (min_angle - current)
                } else if current > max_angle {
                    self.rebound_kp * (max_angle - current)
                } else {
                    self.damping_position = current;
                    self.damping(gain, angle.velocity_filtered)
                }
            }
        };

        let torque = torque.max(-self.torque_limit).min(self.torque_limit);
        // a busy mailbox means the console is writing, next tick catches up
        let _ = out.set_dq(0.0, torque);
        torque
    }

    fn damping(&self, gain: f32, velocity: f32) -> f32 {
        if velocity > -self.deadband && velocity < self.deadband {
            0.0
        } else {
            -gain * velocity
        }
    }

    pub fn mode(&self) -> &HapticMode {
        &self.mode
    }

    /// Detent the attractor modes last pulled towards.
    /// False once stopped, until a mode is set again.
    pub fn is_active(&self) -> bool {
        !matches!(self.mode, HapticMode::None)
    }

    pub fn detent_index(&self) -> i32 {
        self.detent_index
    }

    pub fn damping_position(&self) -> f32 {
        self.damping_position
    }

    /// Relative angle seen on the last tick.
    pub fn current_radian(&self) -> f32 {
        self.current_radian
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use core::f32::consts::PI;
    use foc::{DQVoltages, Mailbox};

    #[derive(Debug, Default)]
    pub struct RecordingOrigin {
        pub resets: u32,
        pub set_to: Option<f32>,
    }

    impl RelativeOrigin for RecordingOrigin {
        fn reset_relative_offset(&mut self) {
            self.resets += 1;
        }

        fn set_relative_total(&mut self, radian: f32) {
            self.set_to = Some(radian);
        }
    }

    pub fn at(relative_total: f32, velocity_filtered: f32) -> AngleSnapshot {
        AngleSnapshot {
            radian: 0.0,
            total: relative_total,
            relative_total,
            velocity: velocity_filtered,
            velocity_filtered,
        }
    }

    fn knob_in(mode: HapticMode) -> HapticKnob {
        let mut knob = HapticKnob::new(&Config::new());
        knob.set_mode(mode, Anchor::Reset, &mut RecordingOrigin::default());
        knob
    }

    #[test]
    fn test_attractor_detents() {
        let out = Mailbox::new(DQVoltages::ZERO);
        let mut knob = knob_in(HapticMode::Attractor { steps: 4 });

        knob.tick(&at(0.1 * PI, 0.0), &out);
        assert_eq!(knob.detent_index(), 0);
        assert!(out.read().q < 0.0);

        knob.tick(&at(0.9 * PI, 0.0), &out);
        assert_eq!(knob.detent_index(), 2);
        assert!(out.read().q > 0.0);

        // a turn and a quarter backwards is detent 3 of the next turn down
        knob.tick(&at(-1.25 * TAU, 0.0), &out);
        assert_eq!(knob.detent_index(), 3);
    }

    #[test]
    fn test_attractor_gain() {
        let out = Mailbox::new(DQVoltages::ZERO);

        let mut knob = knob_in(HapticMode::Attractor { steps: 8 });
        let torque = knob.tick(&at(0.01, 0.0), &out);
        let kp = 100.0 * (9.0f32).ln() + 100.0;
        assert!((torque + kp * 0.01).abs() < 1e-3, "{} {}", torque, kp);

        // dense detents saturate at the cap
        let mut knob = knob_in(HapticMode::Attractor { steps: 10000 });
        let torque = knob.tick(&at(0.0001, 0.0), &out);
        assert!((torque + 1000.0 * 0.0001).abs() < 1e-4, "{}", torque);
    }

    #[test]
    fn test_attractor_with_rebound() {
        let out = Mailbox::new(DQVoltages::ZERO);
        let mode = HapticMode::AttractorWithRebound { steps: 3, min_angle: -1.0, max_angle: 1.0, kp: 150.0 };
        let mut knob = knob_in(mode);

        knob.tick(&at(-0.2, 0.0), &out);
        assert_eq!(knob.detent_index(), 1);

        knob.tick(&at(0.7, 0.0), &out);
        assert_eq!(knob.detent_index(), 2);

        // past the end, pulled back onto the last detent
        let torque = knob.tick(&at(1.5, 0.0), &out);
        assert_eq!(knob.detent_index(), 2);
        assert!((torque + 150.0 * 0.5).abs() < 1e-3);

        let torque = knob.tick(&at(-1.3, 0.0), &out);
        assert_eq!(knob.detent_index(), 0);
        assert!(torque > 0.0);
    }

    #[test]
    fn test_single_detent_range() {
        let out = Mailbox::new(DQVoltages::ZERO);
        let mode = HapticMode::AttractorWithRebound { steps: 1, min_angle: 0.0, max_angle: 1.0, kp: 150.0 };
        let mut knob = knob_in(mode);
        let torque = knob.tick(&at(0.9, 0.0), &out);
        assert!(torque.is_finite());
        assert_eq!(knob.detent_index(), 1);
    }

    #[test]
    fn test_damping_deadband() {
        let out = Mailbox::new(DQVoltages::ZERO);
        let mut knob = knob_in(HapticMode::Damping { gain: 20.0 });

        assert_eq!(knob.tick(&at(0.5, 0.05), &out), 0.0);
        assert_eq!(knob.tick(&at(0.5, -0.09), &out), 0.0);
        assert!((knob.tick(&at(0.5, 2.0), &out) + 40.0).abs() < 1e-4);
        assert!((knob.tick(&at(0.5, -2.0), &out) - 40.0).abs() < 1e-4);
        assert_eq!(knob.damping_position(), 0.5);
    }

    #[test]
    fn test_torque_budget() {
        let out = Mailbox::new(DQVoltages::ZERO);
        let mut knob = knob_in(HapticMode::Damping { gain: 1000.0 });
        let torque = knob.tick(&at(0.0, 50.0), &out);
        assert!((torque + 333.0).abs() < 1e-3);
        assert_eq!(out.read().q, torque);
        assert_eq!(out.read().d, 0.0);
    }

    #[test]
    fn test_rebound_pulls_back() {
        let out = Mailbox::new(DQVoltages::ZERO);
        let mode = HapticMode::DampingWithRebound { gain: 0.0, min_angle: -0.5, max_angle: 0.5 };
        let mut knob = knob_in(mode);

        // beyond max, even while still moving outwards
        let torque = knob.tick(&at(0.7, 3.0), &out);
        assert!(torque < 0.0);
        assert!((torque + 150.0 * 0.2).abs() < 1e-3);

        let torque = knob.tick(&at(-0.8, -3.0), &out);
        assert!(torque > 0.0);

        // inside the range it is plain damping
        assert_eq!(knob.tick(&at(0.2, 3.0), &out), 0.0);
    }

    #[test]
    fn test_anchoring() {
        let mut knob = HapticKnob::new(&Config::new());

        let mut origin = RecordingOrigin::default();
        knob.set_mode(HapticMode::Damping { gain: 1.0 }, Anchor::Reset, &mut origin);
        assert_eq!((origin.resets, origin.set_to), (1, None));

        let mut origin = RecordingOrigin::default();
        let mode = HapticMode::DampingWithRebound { gain: 1.0, min_angle: -0.7, max_angle: 0.7 };
        knob.set_mode(mode, Anchor::Reset, &mut origin);
        assert_eq!((origin.resets, origin.set_to), (0, Some(-0.7)));

        let mut origin = RecordingOrigin::default();
        knob.set_mode(HapticMode::Attractor { steps: 8 }, Anchor::Resume(1.2), &mut origin);
        assert_eq!((origin.resets, origin.set_to), (0, Some(1.2)));

        let mut origin = RecordingOrigin::default();
        knob.set_mode(HapticMode::None, Anchor::Reset, &mut origin);
        assert_eq!((origin.resets, origin.set_to), (0, None));
    }

    #[test]
    fn test_stop() {
        let out = Mailbox::new(DQVoltages::ZERO);
        let mut knob = knob_in(HapticMode::Damping { gain: 20.0 });
        knob.tick(&at(0.0, 5.0), &out);
        assert!(out.read().q != 0.0);
        assert!(knob.is_active());

        knob.stop(&out);
        assert_eq!(*knob.mode(), HapticMode::None);
        assert!(!knob.is_active());
        assert_eq!(out.read(), DQVoltages::ZERO);

        // idle ticks leave the mailbox alone
        out.set_dq(0.0, 12.0).unwrap();
        assert_eq!(knob.tick(&at(0.0, 5.0), &out), 0.0);
        assert_eq!(out.read().q, 12.0);
    }
}
