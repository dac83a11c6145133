//! Headless testing support.
//!
//! Use the [`MapPilot`] to drive a [`MapControl`](crate::map::MapControl)
//! with simulated input and fixed-length frames.

pub mod pilot;

pub use pilot::{MapPilot, FRAME};
