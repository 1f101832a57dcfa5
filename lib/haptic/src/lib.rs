#![no_std]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

pub mod knob;
pub mod registry;
pub mod session;

pub use crate::knob::{Anchor, HapticKnob, HapticMode};
pub use crate::registry::{ModeRegistry, RegistryError};
pub use crate::session::{KnobBehavior, KnobModeConfig, KnobReadout, KnobSession};
