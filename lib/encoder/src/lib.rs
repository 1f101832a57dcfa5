#![no_std]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

pub mod as5600;
pub mod sensor;
pub mod unwrap;

pub use crate::sensor::{AngleSensor, AngleSnapshot, AngleSource, RelativeOrigin, SensorError};
