//! Colors and text formatting shared by the prompt and the built-ins.

use chrono::{DateTime, Local};
use crossterm::style::{Color, Stylize};
use std::path::Path;
use std::time::{Duration, SystemTime};

pub type Rgb = (u8, u8, u8);

pub const RED: Rgb = (255, 0, 0);
pub const GREEN: Rgb = (0, 205, 0);
pub const BLUE: Rgb = (55, 125, 190);
pub const PURPLE: Rgb = (159, 60, 230);

/// Top and bottom colors of the `neofetch` gradient.
pub const GRADIENT_TOP: Rgb = (230, 45, 65);
pub const GRADIENT_BOTTOM: Rgb = (55, 125, 235);

pub fn paint(text: &str, (r, g, b): Rgb) -> String {
    text.with(Color::Rgb { r, g, b }).to_string()
}

/// Colors each line with a linear blend from `start` to `end`.
pub fn gradient(lines: &[String], start: Rgb, end: Rgb) -> Vec<String> {
    let size = lines.len() as u32;
    let blend = |from: u8, to: u8, index: u32| {
        ((u32::from(from) * (size - index) + u32::from(to) * index) / size) as u8
    };

    lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            let index = index as u32;
            let color = (
                blend(start.0, end.0, index),
                blend(start.1, end.1, index),
                blend(start.2, end.2, index),
            );
            paint(line, color)
        })
        .collect()
}

/// Human readable size in powers of 1000: `0 b`, `512.0 b`, `1.5 kb`.
pub fn format_size(size: u64) -> String {
    const UNITS: [&str; 7] = ["b", "kb", "mb", "gb", "tb", "pb", "eb"];
    if size == 0 {
        return "0 b".to_string();
    }

    let mut exponent = 0;
    let mut scaled = size;
    while scaled >= 1000 && exponent + 1 < UNITS.len() {
        scaled /= 1000;
        exponent += 1;
    }
    let value = size as f64 / 1000f64.powi(exponent as i32);
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", crate::value::format_float(rounded), UNITS[exponent])
}

/// Modification date as `Jan  5 2024`.
pub fn format_date(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format("%b %e %Y").to_string()
}

/// `path` with the home directory abbreviated to `~/` and `/` separators.
pub fn format_path(path: &Path, home: Option<&Path>) -> String {
    let text = match home.and_then(|h| path.strip_prefix(h).ok()) {
        Some(rest) => format!("~/{}", rest.display()),
        None => path.display().to_string(),
    };
    text.replace('\\', "/")
}

/// A duration broken into calendar-ish parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uptime {
    pub days: u64,
    pub hours: u64,
    pub mins: u64,
    pub secs: u64,
}

impl From<Duration> for Uptime {
    fn from(duration: Duration) -> Self {
        let total = duration.as_secs();
        Uptime {
            days: total / 86_400,
            hours: total / 3_600 % 24,
            mins: total / 60 % 60,
            secs: total % 60,
        }
    }
}

impl std::fmt::Display for Uptime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} days, {} hours, {} minutes and {} seconds",
            self.days, self.hours, self.mins, self.secs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 b");
        assert_eq!(format_size(512), "512.0 b");
        assert_eq!(format_size(1500), "1.5 kb");
        assert_eq!(format_size(1_234_567), "1.23 mb");
        assert_eq!(format_size(999_999), "1000.0 kb");
    }

    #[test]
    fn test_format_path_abbreviates_home() {
        let home = PathBuf::from("/home/pang");
        assert_eq!(
            format_path(&home.join("src/app"), Some(&home)),
            "~/src/app"
        );
        assert_eq!(format_path(&home, Some(&home)), "~/");
        assert_eq!(format_path(Path::new("/etc"), Some(&home)), "/etc");
        assert_eq!(format_path(Path::new("/etc"), None), "/etc");
    }

    #[test]
    fn test_uptime_breakdown() {
        let uptime = Uptime::from(Duration::from_secs(2 * 86_400 + 3 * 3_600 + 4 * 60 + 5));
        assert_eq!(
            uptime,
            Uptime {
                days: 2,
                hours: 3,
                mins: 4,
                secs: 5
            }
        );
        assert_eq!(uptime.to_string(), "2 days, 3 hours, 4 minutes and 5 seconds");
    }

    #[test]
    fn test_format_date_shape() {
        let date = format_date(SystemTime::now());
        let parts: Vec<&str> = date.split_whitespace().collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 3);
        assert_eq!(date.len(), 11);
    }

    #[test]
    fn test_gradient_keeps_text() {
        let lines = vec!["one".to_string(), "two".to_string()];
        let colored = gradient(&lines, GRADIENT_TOP, GRADIENT_BOTTOM);
        assert_eq!(colored.len(), 2);
        assert!(colored[0].contains("one"));
        assert!(colored[1].contains("two"));
    }
}
