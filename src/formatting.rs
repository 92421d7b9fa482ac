use chrono::{DateTime, Utc};
use yansi::Paint;

use crate::item::Label;

/// Color palette for consistent theming
pub struct ColorPalette {
    pub primary: (u8, u8, u8),   // Numbers, muted text
    pub secondary: (u8, u8, u8), // Headers, titles
    pub timestamp: (u8, u8, u8), // Dates
    pub warning: (u8, u8, u8),   // Fallback notices
}

impl ColorPalette {
    pub const CATPPUCCIN: Self = Self {
        primary: (108, 112, 134),   // Gray
        secondary: (148, 226, 213), // Teal
        timestamp: (137, 180, 250), // Blue
        warning: (249, 226, 175),   // Yellow
    };
}

/// Formatting context passed through terminal output
pub struct FormatContext {
    pub use_color: bool,
    pub palette: ColorPalette,
}

impl FormatContext {
    pub fn new(use_color: bool) -> Self {
        Self { use_color, palette: ColorPalette::CATPPUCCIN }
    }

    /// Color unless `NO_COLOR` is set or `plain` was requested.
    pub fn from_env(plain: bool) -> Self {
        Self::new(!plain && std::env::var_os("NO_COLOR").is_none())
    }

    fn paint(&self, text: &str, (r, g, b): (u8, u8, u8), bold: bool) -> String {
        if !self.use_color {
            return text.to_string();
        }
        let painted = Paint::rgb(text, r, g, b);
        if bold { painted.bold().to_string() } else { painted.to_string() }
    }

    pub fn format_number(&self, number: u64) -> String {
        self.paint(&format!("#{number}"), self.palette.primary, false)
    }

    pub fn format_header(&self, text: &str) -> String {
        self.paint(text, self.palette.secondary, true)
    }

    pub fn format_timestamp(&self, ts: &str) -> String {
        self.paint(ts, self.palette.timestamp, false)
    }

    pub fn format_warning(&self, text: &str) -> String {
        self.paint(text, self.palette.warning, false)
    }

    pub fn format_label(&self, label: &Label) -> String {
        self.paint(&label.name, crate::tags::label_color(label), true)
    }

    /// Labels joined with spaces, skipping the section label.
    pub fn format_labels(&self, labels: &[Label], skip: &str) -> String {
        labels
            .iter()
            .filter(|l| !l.is(skip))
            .map(|l| self.format_label(l))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Date formatting with relative/absolute modes
pub struct TimeFormatter {
    relative_mode: bool,
    now: DateTime<Utc>,
}

impl TimeFormatter {
    pub fn new(relative_mode: bool, now: DateTime<Utc>) -> Self {
        Self { relative_mode, now }
    }

    pub fn format(&self, dt: DateTime<Utc>) -> String {
        if self.relative_mode {
            self.format_relative(dt)
        } else {
            dt.format("%d %b %Y").to_string()
        }
    }

    pub fn format_relative(&self, dt: DateTime<Utc>) -> String {
        let dur = self.now.signed_duration_since(dt);
        let total_hours = dur.num_hours().max(0);
        let total_days = dur.num_days().max(0);

        if total_days == 0 {
            format!("{total_hours}h ago")
        } else if total_days < 30 {
            format!("{total_days}d ago")
        } else if total_days < 365 {
            format!("{}mo ago", total_days / 30)
        } else {
            let years = total_days / 365;
            let months = (total_days % 365) / 30;
            if months > 0 {
                format!("{years}y {months}mo ago")
            } else {
                format!("{years}y ago")
            }
        }
    }
}
