// Domain rules - Business logic and policies

use crate::domain::model::*;
use crate::error::{ReviewError, ReviewResult};

/// Tolerance when comparing a range end against a probed duration
pub const DURATION_EPSILON: f64 = 0.001;

const MAX_GAME_NUMBER_LEN: usize = 64;

/// Rules for game numbers, which double as folder names
pub struct GameNumberRules;

impl GameNumberRules {
    /// Validate a game number before it touches the filesystem
    pub fn validate(game_number: &str) -> ReviewResult<()> {
        if game_number.trim().is_empty() {
            return Err(ReviewError::invalid_request("Game number cannot be empty"));
        }
        if game_number.len() > MAX_GAME_NUMBER_LEN {
            return Err(ReviewError::invalid_request(format!(
                "Game number longer than {} characters",
                MAX_GAME_NUMBER_LEN
            )));
        }
        if game_number != game_number.trim() {
            return Err(ReviewError::invalid_request(
                "Game number cannot start or end with whitespace",
            ));
        }
        if game_number.starts_with('.') {
            return Err(ReviewError::invalid_request(
                "Game number cannot start with '.'",
            ));
        }

        let invalid_chars = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
        if let Some(ch) = game_number
            .chars()
            .find(|c| invalid_chars.contains(c) || c.is_control())
        {
            return Err(ReviewError::invalid_request(format!(
                "Invalid character {:?} in game number",
                ch
            )));
        }

        // Windows reserved device names cannot be folder names
        let upper = game_number.to_uppercase();
        let stem = upper.split('.').next().unwrap_or_default();
        let reserved_names = [
            "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7",
            "COM8", "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8",
            "LPT9",
        ];
        if reserved_names.contains(&stem) {
            return Err(ReviewError::invalid_request(format!(
                "Reserved name '{}' not allowed as game number",
                game_number
            )));
        }

        Ok(())
    }
}

/// Rules applied to actions before they are persisted
pub struct ActionRules;

impl ActionRules {
    /// Validate a new action against the vocabulary and the video duration
    ///
    /// The offset is checked against `duration` only when the duration is
    /// known; negative and non-finite offsets are always rejected.
    pub fn validate(new_action: &NewAction, duration: Option<f64>) -> ReviewResult<()> {
        if !new_action.offset.is_finite() || new_action.offset < 0.0 {
            return Err(ReviewError::invalid_range(format!(
                "Action offset must be a non-negative number of seconds, got {}",
                new_action.offset
            )));
        }

        if let Some(duration) = duration {
            if new_action.offset > duration + DURATION_EPSILON {
                return Err(ReviewError::invalid_range(format!(
                    "Action offset {:.3}s is beyond the video duration {:.3}s",
                    new_action.offset, duration
                )));
            }
        }

        if !new_action.sector.faults().contains(&new_action.fault) {
            return Err(ReviewError::invalid_request(format!(
                "Fault {} is not allowed in sector {}",
                new_action.fault, new_action.sector
            )));
        }

        Ok(())
    }
}

/// Rules for clip time ranges
pub struct RangeRules;

impl RangeRules {
    /// Validate a clip range against the canonical video duration
    pub fn validate(range: &TimeRange, duration: f64) -> ReviewResult<()> {
        if !range.start.is_finite() || !range.end.is_finite() {
            return Err(ReviewError::invalid_range(format!(
                "Range bounds must be finite: {}",
                range
            )));
        }
        if range.start < 0.0 {
            return Err(ReviewError::invalid_range(format!(
                "Range starts before the video: {}",
                range
            )));
        }
        if range.start >= range.end {
            return Err(ReviewError::invalid_range(format!(
                "Start must be less than end: {}",
                range
            )));
        }
        if range.end > duration + DURATION_EPSILON {
            return Err(ReviewError::invalid_range(format!(
                "Range {} exceeds video duration {:.3}s",
                range, duration
            )));
        }
        Ok(())
    }
}

/// A clip window covering one or more actions
#[derive(Debug, Clone, PartialEq)]
pub struct ClipWindow {
    pub range: TimeRange,
    /// Actions covered, in chronological order
    pub action_ids: Vec<String>,
    /// Sector of the first covered action, used for file naming
    pub sector: ActionSector,
}

/// Derives clip windows from tagged actions
pub struct ClipWindowPlanner {
    pre_roll: f64,
    post_roll: f64,
}

impl ClipWindowPlanner {
    pub fn new(pre_roll: f64, post_roll: f64) -> Self {
        Self {
            pre_roll: pre_roll.max(0.0),
            post_roll: post_roll.max(0.0),
        }
    }

    /// Build chronological, non-overlapping windows around each action
    ///
    /// Overlapping windows are merged so one clip may cover several actions.
    /// Windows are clamped to `[0, duration]` when the duration is known and
    /// dropped when nothing of them remains.
    pub fn plan(&self, actions: &[Action], duration: Option<f64>) -> Vec<ClipWindow> {
        let mut sorted: Vec<&Action> = actions.iter().collect();
        sorted.sort_by(|a, b| a.offset.total_cmp(&b.offset));

        let mut windows: Vec<ClipWindow> = Vec::new();
        for action in sorted {
            let start = (action.offset - self.pre_roll).max(0.0);
            let mut end = action.offset + self.post_roll;
            if let Some(duration) = duration {
                end = end.min(duration);
            }
            if end <= start {
                continue;
            }
            let range = TimeRange::new(start, end);

            match windows.last_mut() {
                Some(last) if last.range.overlaps(&range) => {
                    last.range.end = last.range.end.max(range.end);
                    last.action_ids.push(action.id.clone());
                }
                _ => windows.push(ClipWindow {
                    range,
                    action_ids: vec![action.id.clone()],
                    sector: action.sector,
                }),
            }
        }
        windows
    }
}

#[cfg(test)]
mod tests;
