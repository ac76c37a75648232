use crate::error::{PlaybackError, PlaybackResult};

/// Records advanced per tick unless configured otherwise.
pub const DEFAULT_STEP: i64 = 100;

/// Largest step magnitude accepted; larger requests are clamped.
pub const MAX_STEP: i64 = 10_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackMode {
    Play,
    #[default]
    Pause,
}

impl PlaybackMode {
    pub fn toggled(self) -> Self {
        match self {
            PlaybackMode::Play => PlaybackMode::Pause,
            PlaybackMode::Pause => PlaybackMode::Play,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlaybackMode::Play => "play",
            PlaybackMode::Pause => "pause",
        }
    }
}

/// Validate and clamp a requested step.
pub fn normalize_step(step: i64) -> PlaybackResult<i64> {
    if step == 0 {
        return Err(PlaybackError::InvalidStep);
    }
    Ok(step.clamp(-MAX_STEP, MAX_STEP))
}

/// Target of the next PLAY tick.
///
/// Moves `step` records, clamped to `[0, total]`. A cursor already sitting
/// on the bound it is travelling towards wraps to the opposite bound.
pub fn next_target(cursor: u64, total: u64, step: i64) -> u64 {
    let distance = step.unsigned_abs();
    if step > 0 {
        if cursor >= total {
            0
        } else {
            cursor.saturating_add(distance).min(total)
        }
    } else if cursor == 0 {
        total
    } else {
        cursor.saturating_sub(distance)
    }
}

/// Whether `cursor` sits on the bound `step` travels towards.
pub fn at_travel_bound(cursor: u64, total: u64, step: i64) -> bool {
    if step > 0 {
        cursor >= total
    } else {
        cursor == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_step() {
        assert!(matches!(normalize_step(0), Err(PlaybackError::InvalidStep)));
        assert_eq!(normalize_step(250).unwrap(), 250);
        assert_eq!(normalize_step(-50_000).unwrap(), -MAX_STEP);
        assert_eq!(normalize_step(i64::MAX).unwrap(), MAX_STEP);
    }

    #[test]
    fn test_forward_clamps_then_wraps() {
        assert_eq!(next_target(0, 250, 100), 100);
        assert_eq!(next_target(200, 250, 100), 250);
        assert_eq!(next_target(250, 250, 100), 0);
    }

    #[test]
    fn test_backward_clamps_then_wraps() {
        assert_eq!(next_target(250, 250, -100), 150);
        assert_eq!(next_target(50, 250, -100), 0);
        assert_eq!(next_target(0, 250, -100), 250);
    }

    #[test]
    fn test_travel_bound() {
        assert!(at_travel_bound(250, 250, 1));
        assert!(!at_travel_bound(0, 250, 1));
        assert!(at_travel_bound(0, 250, -1));
        assert!(!at_travel_bound(250, 250, -1));
    }

    #[test]
    fn test_toggle() {
        assert_eq!(PlaybackMode::default(), PlaybackMode::Pause);
        assert_eq!(PlaybackMode::Pause.toggled(), PlaybackMode::Play);
    }
}
