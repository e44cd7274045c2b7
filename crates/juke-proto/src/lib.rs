//! Wire types, configuration and helpers shared by the juke client crates.

pub mod config;
pub mod duration;
pub mod platform;
pub mod protocol;
