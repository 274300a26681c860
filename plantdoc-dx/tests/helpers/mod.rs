//! Test Helper Utilities
//!
//! Shared utilities for testing plantdoc-dx

#![allow(dead_code, unused_imports)]

pub mod app;
pub mod classifier;

pub use app::{body_json, test_app, test_app_state, tiny_image_base64};
pub use classifier::ScriptedClassifier;
