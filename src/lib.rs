//! Multi-switch library.
//!
//! Combines several switch devices into one composite switch device with a
//! single flat switch namespace, and provides a small scripted task that
//! exercises switch devices.

pub mod config;
pub mod error;
pub mod switch;
pub mod task;
