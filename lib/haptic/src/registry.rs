use bincode::{Encode, Decode};
use config::Config;
use core::f32::consts::{FRAC_PI_2, FRAC_PI_4, FRAC_PI_6, TAU};
use encoder::RelativeOrigin;
use foc::TorqueCommand;
use heapless::Vec;
use crate::knob::HapticKnob;
use crate::session::{KnobBehavior, KnobModeConfig, KnobSession};

pub const MAX_MODES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum RegistryError {
    Full,
    UnknownMode,
}

/// The modes a user can cycle through, in order.
pub struct ModeRegistry {
    modes: Vec<KnobModeConfig, MAX_MODES>,
    active: usize,
}

impl ModeRegistry {
    pub const fn new() -> ModeRegistry {
        ModeRegistry { modes: Vec::new(), active: 0 }
    }

    pub fn with_presets(config: &Config) -> ModeRegistry {
        let mut registry = ModeRegistry::new();
        let presets = [
            KnobModeConfig::new("Unbounded", KnobBehavior::Unbounded),
            KnobModeConfig::new("Bounded 0-10", KnobBehavior::Bounded)
                .range(-FRAC_PI_4, FRAC_PI_4)
                .steps(10, 0),
            KnobModeConfig::new("On/Off", KnobBehavior::Switch)
                .range(-FRAC_PI_6, FRAC_PI_6)
                .steps(1, 0)
                .attractor_kp(150.0),
            KnobModeConfig::new("Attractor", KnobBehavior::Attractor)
                .range(0.0, TAU)
                .steps(8, 0),
            KnobModeConfig::new("Damped 0-100", KnobBehavior::DampingBound)
                .range(-FRAC_PI_2, FRAC_PI_2)
                .damping_gain(config.damping_gain),
        ];
        for preset in presets {
            // fewer presets than slots
            let _ = registry.register(preset);
        }
        registry
    }

    pub fn register(&mut self, mode: KnobModeConfig) -> Result<usize, RegistryError> {
        self.modes.push(mode).map_err(|_| RegistryError::Full)?;
        Ok(self.modes.len() - 1)
    }

    pub fn get(&self, index: usize) -> Option<&KnobModeConfig> {
        self.modes.get(index)
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn next_index(&self) -> usize {
        if self.modes.is_empty() {
            0
        } else {
            (self.active + 1) % self.modes.len()
        }
    }

    /// Tears down the running session and starts the mode at `index` in its place.
    /// An unknown index leaves everything as it was.
    pub fn switch<O, T>(&mut self, index: usize, session: &mut KnobSession, knob: &mut HapticKnob, origin: &mut O, out: &T) -> Result<(), RegistryError>
        where O: RelativeOrigin, T: TorqueCommand {
        let mode = *self.modes.get(index).ok_or(RegistryError::UnknownMode)?;
        session.destroy(knob, out);
        *session = KnobSession::new(mode);
        session.init(knob, origin);
        self.active = index;
        Ok(())
    }
}

impl Default for ModeRegistry {
    fn default() -> Self {
        ModeRegistry::new()
    }
}
