#![no_std]

#[cfg(test)]
extern crate std;

mod config;

pub use crate::config::Config;
