//! End-to-end tests for tapbot CLI output modes.

#[path = "../common/mod.rs"]
mod common;

mod robot_mode;
