//! Time parsing and formatting utilities

use crate::error::{ReviewError, ReviewResult};

/// Parses and formats video offsets
pub struct TimeParser;

impl TimeParser {
    /// Parse an offset given as seconds, `MM:SS[.ms]` or `HH:MM:SS[.ms]`
    pub fn parse_time(time_str: &str) -> ReviewResult<f64> {
        let time_str = time_str.trim();
        let invalid = || ReviewError::invalid_request(format!("Invalid time format: {}", time_str));

        let parts: Vec<&str> = time_str.split(':').collect();
        let seconds = match parts.as_slice() {
            [secs] => secs.parse::<f64>().map_err(|_| invalid())?,
            [mins, secs] => {
                let minutes: u32 = mins.parse().map_err(|_| invalid())?;
                let seconds: f64 = secs.parse().map_err(|_| invalid())?;
                if seconds >= 60.0 {
                    return Err(invalid());
                }
                minutes as f64 * 60.0 + seconds
            }
            [hours, mins, secs] => {
                let hours: u32 = hours.parse().map_err(|_| invalid())?;
                let minutes: u32 = mins.parse().map_err(|_| invalid())?;
                let seconds: f64 = secs.parse().map_err(|_| invalid())?;
                if minutes >= 60 || seconds >= 60.0 {
                    return Err(invalid());
                }
                hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds
            }
            _ => return Err(invalid()),
        };

        if !seconds.is_finite() || seconds < 0.0 {
            return Err(invalid());
        }
        Ok(seconds)
    }

    /// Format seconds as `HH:MM:SS` or `MM:SS`, for listings and the summary
    pub fn format_time(seconds: f64) -> String {
        let total = seconds.max(0.0).floor() as u64;
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let secs = total % 60;

        if hours > 0 {
            format!("{:02}:{:02}:{:02}", hours, minutes, secs)
        } else {
            format!("{:02}:{:02}", minutes, secs)
        }
    }

    /// Filename-safe form, `HHhMMmSSs`
    pub fn format_for_filename(seconds: f64) -> String {
        let total = seconds.max(0.0).floor() as u64;
        format!(
            "{:02}h{:02}m{:02}s",
            total / 3600,
            (total % 3600) / 60,
            total % 60
        )
    }
}
