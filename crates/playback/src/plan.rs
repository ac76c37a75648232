/// Where a seek starts replaying from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Reset to a virgin canvas (id 0).
    Clear,
    /// Load the snapshot persisted at this id.
    Snapshot(u64),
}

impl Anchor {
    pub fn id(self) -> u64 {
        match self {
            Anchor::Clear => 0,
            Anchor::Snapshot(id) => id,
        }
    }
}

/// Resolved seek: an optional jump, then a replay from the jump point (or
/// the cursor) to `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekPlan {
    pub anchor: Option<Anchor>,
    pub from: u64,
    pub target: u64,
}

impl SeekPlan {
    /// Records that must be replayed after the jump.
    pub fn replay_distance(&self) -> u64 {
        self.from.abs_diff(self.target)
    }
}

/// Plan a seek from `cursor` to `target` given the persisted snapshot ids.
///
/// Seeking to 0 always clears. Otherwise the candidate nearest `target`
/// among 0 and the snapshots is adopted only when it is strictly closer
/// than the cursor; ties between candidates go to the lower id.
pub fn plan_seek(cursor: u64, target: u64, snapshot_ids: &[u64]) -> SeekPlan {
    if target == 0 {
        return SeekPlan { anchor: Some(Anchor::Clear), from: 0, target };
    }

    let mut best = Anchor::Clear;
    let mut best_distance = target;
    for &id in snapshot_ids {
        let distance = id.abs_diff(target);
        if distance < best_distance {
            best = Anchor::Snapshot(id);
            best_distance = distance;
        }
    }

    if best_distance < cursor.abs_diff(target) {
        SeekPlan { anchor: Some(best), from: best.id(), target }
    } else {
        SeekPlan { anchor: None, from: cursor, target }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_zero_always_clears() {
        let plan = plan_seek(1_000_000, 0, &[10, 999_999]);
        assert_eq!(plan.anchor, Some(Anchor::Clear));
        assert_eq!(plan.replay_distance(), 0);
    }

    #[test]
    fn test_walk_when_cursor_is_closest() {
        let plan = plan_seek(90, 100, &[50]);
        assert_eq!(plan.anchor, None);
        assert_eq!(plan.from, 90);
        assert_eq!(plan.replay_distance(), 10);
    }

    #[test]
    fn test_jump_to_nearest_snapshot() {
        let plan = plan_seek(0, 1_050, &[500, 1_000, 2_000]);
        assert_eq!(plan.anchor, Some(Anchor::Snapshot(1_000)));
        assert_eq!(plan.replay_distance(), 50);
    }

    #[test]
    fn test_snapshot_above_target_replays_backward() {
        let plan = plan_seek(0, 990, &[1_000]);
        assert_eq!(plan.anchor, Some(Anchor::Snapshot(1_000)));
        assert_eq!(plan.from, 1_000);
    }

    #[test]
    fn test_equal_distance_does_not_jump() {
        // Snapshot and cursor are both 10 away
        let plan = plan_seek(110, 100, &[90]);
        assert_eq!(plan.anchor, None);
    }

    #[test]
    fn test_clear_when_zero_is_closer_than_cursor() {
        let plan = plan_seek(500, 20, &[]);
        assert_eq!(plan.anchor, Some(Anchor::Clear));
        assert_eq!(plan.from, 0);
    }

    #[test]
    fn test_tie_between_candidates_prefers_lower() {
        let plan = plan_seek(0, 150, &[100, 200]);
        assert_eq!(plan.anchor, Some(Anchor::Snapshot(100)));
    }

    #[test]
    fn test_target_equals_cursor() {
        let plan = plan_seek(40, 40, &[40]);
        assert_eq!(plan.anchor, None);
        assert_eq!(plan.replay_distance(), 0);
    }
}
