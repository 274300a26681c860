//! # PlantDoc Common Library
//!
//! Shared code for the PlantDoc services including:
//! - Error and result types
//! - Bootstrap configuration loading (TOML, environment, compiled defaults)
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
