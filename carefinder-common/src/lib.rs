//! # Carefinder Common Library
//!
//! Shared code for the carefinder crates:
//! - Error type used by configuration and bootstrap code
//! - TOML configuration loading and secret resolution
//! - Logging initialisation

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
