//! Peripheral drivers.

pub mod indicator;
