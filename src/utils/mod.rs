//! Common utilities and helpers

pub mod path;
pub mod time;

pub use path::PathUtils;
pub use time::TimeParser;

/// Formatting helpers for CLI output
pub struct Utils;

impl Utils {
    /// Format file size for display
    pub fn format_file_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size() {
        assert_eq!(Utils::format_file_size(512), "512 B");
        assert_eq!(Utils::format_file_size(1536), "1.50 KB");
        assert_eq!(Utils::format_file_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }
}
