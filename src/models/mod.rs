//! Data models

pub mod log;

pub use log::*;
