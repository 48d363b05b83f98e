//! Zigbee factory production config generator
//!
//! Builds the fixed-layout production config record read by Zigbee firmware
//! at boot and writes one binary artifact per device.

pub mod artifact;
pub mod batch;
pub mod codec;
pub mod config;
pub mod console;
pub mod error;
pub mod record;

pub use error::{Error, Result};
