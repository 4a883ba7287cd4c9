//! Configuration module for mdpress
//!
//! This module handles export preferences, including serialization to and
//! from JSON and persistent storage in platform-specific directories.

mod persistence;
mod settings;

pub use persistence::*;
pub use settings::*;
