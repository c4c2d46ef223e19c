//! tapbot library - Android icon-tap automation over adb.
//!
//! This library exposes the core functionality of the `tapbot` CLI for use in
//! tests and other applications.
//!
//! # Modules
//!
//! - `device`: Device bridge abstraction over `adb` (plus a recording mock)
//! - `locator`: Icon template matching
//! - `automation`: The launch / open / screenshot / tap loop
//! - `server`: HTTP trigger (`POST /run_bot`) and run registry
//! - `ledger`: Device/package username ledger
//! - `config`: Configuration file handling
//! - `error`: Error types with user-recoverable hints
//! - `output`: Output mode abstraction (robot/human)
#![forbid(unsafe_code)]

pub mod automation;
pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod ledger;
pub mod locator;
pub mod logging;
pub mod output;
pub mod server;
pub mod theme;
