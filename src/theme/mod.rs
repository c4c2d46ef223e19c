//! Theme system for human-mode output.

use console::Style;

/// Visual theme for tapbot human-mode output.
///
/// Centralizes colors and styles for consistent rendering.
pub struct TapTheme {
    // Brand colors
    pub accent: Style,
    pub success: Style,
    pub error: Style,
    pub warning: Style,
    pub muted: Style,

    // Component styles
    pub header: Style,
    pub label: Style,
    pub value: Style,
    pub device_serial: Style,
    pub coordinate: Style,
    pub missed: Style,
}

impl Default for TapTheme {
    fn default() -> Self {
        Self {
            accent: Style::new().color256(33),
            success: Style::new().color256(41),
            error: Style::new().color256(203),
            warning: Style::new().color256(214),
            muted: Style::new().color256(245),
            header: Style::new().bold().color256(33),
            label: Style::new().dim(),
            value: Style::new().bold(),
            device_serial: Style::new().italic().color256(245),
            coordinate: Style::new().bold().color256(214),
            missed: Style::new().dim(),
        }
    }
}
