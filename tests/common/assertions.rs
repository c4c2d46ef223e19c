//! Custom assertion helpers for tests.
#![allow(dead_code)]

use tracing::error;

#[must_use]
pub fn assert_json_has_fields(json_str: &str, fields: &[&str]) -> serde_json::Value {
    let value: serde_json::Value = serde_json::from_str(json_str).expect("invalid JSON payload");
    for field in fields {
        if value.get(field).is_none() {
            error!(field, json = %value, "Missing expected JSON field");
            panic!("Missing JSON field: {field}");
        }
    }
    value
}

pub fn assert_no_ansi(output: &str) {
    if output.contains("\u{1b}[") {
        error!("ANSI escape sequence detected");
        panic!("Expected no ANSI escape sequences");
    }
}

pub fn assert_contains_all(output: &str, expected: &[&str]) {
    for needle in expected {
        if !output.contains(needle) {
            error!(needle, "Missing expected substring");
            panic!("Missing expected substring: {needle}\nin:\n{output}");
        }
    }
}

/// Assert a sanitized serial only uses file-name-safe characters.
pub fn assert_safe_serial(serial: &str) {
    let re = regex::Regex::new(r"^[A-Za-z0-9._-]*$").expect("valid regex");
    if !re.is_match(serial) {
        error!(serial, "Unsafe characters in serial");
        panic!("Serial contains characters outside [A-Za-z0-9._-]: {serial}");
    }
}
