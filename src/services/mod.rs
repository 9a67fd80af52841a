//! Caller-level policies built on top of the monitor.

pub mod banner;
pub mod supervisor;
