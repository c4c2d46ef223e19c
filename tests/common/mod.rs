//! Common test utilities for the tapbot CLI.
//!
//! - `cli`: CLI runner with output verification and fluent assertions
//! - `fixtures`: Textured test images, template files and config files
//! - `env`: Environment variable guards
//! - `assertions`: Output assertions
#![allow(dead_code)]

pub mod assertions;
pub mod env;

use tracing_subscriber::EnvFilter;

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
