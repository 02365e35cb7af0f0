//! Snapshot cadence: decides when a commit stores full content instead of a diff.

/// Facts about a pending commit that a policy can look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CadenceInput {
    /// Diff entries stored since the newest snapshot.
    pub entries_since_snapshot: usize,
    /// Byte length of the encoded diff payload.
    pub patch_len: usize,
    /// Byte length of the content being committed.
    pub content_len: usize,
}

/// Decides whether a commit should be stored as a snapshot.
///
/// Any policy that bounds the number of diffs between snapshots keeps
/// reconstruction cost bounded.
pub trait SnapshotPolicy: Send + Sync {
    fn should_snapshot(&self, input: &CadenceInput) -> bool;
}

/// Snapshot every `interval` commits, or sooner when the diff stops paying off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CadencePolicy {
    /// At most `interval - 1` diffs follow each snapshot.
    pub interval: usize,
    /// Snapshot when the encoded diff is at least this fraction of the content.
    pub max_patch_ratio: f64,
}

impl Default for CadencePolicy {
    fn default() -> Self {
        Self {
            interval: 20,
            max_patch_ratio: 0.75,
        }
    }
}

impl SnapshotPolicy for CadencePolicy {
    fn should_snapshot(&self, input: &CadenceInput) -> bool {
        if input.entries_since_snapshot + 1 >= self.interval.max(1) {
            return true;
        }
        // Patch lengths are far below 2^52, so the casts are exact.
        input.patch_len as f64 >= self.max_patch_ratio * input.content_len as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(since: usize, patch_len: usize, content_len: usize) -> CadenceInput {
        CadenceInput {
            entries_since_snapshot: since,
            patch_len,
            content_len,
        }
    }

    #[test]
    fn test_interval_triggers_snapshot() {
        let policy = CadencePolicy {
            interval: 3,
            max_patch_ratio: 10.0,
        };
        assert!(!policy.should_snapshot(&input(0, 10, 1000)));
        assert!(!policy.should_snapshot(&input(1, 10, 1000)));
        assert!(policy.should_snapshot(&input(2, 10, 1000)));
    }

    #[test]
    fn test_interval_one_always_snapshots() {
        let policy = CadencePolicy {
            interval: 1,
            max_patch_ratio: 10.0,
        };
        assert!(policy.should_snapshot(&input(0, 1, 1000)));

        let zero = CadencePolicy {
            interval: 0,
            max_patch_ratio: 10.0,
        };
        assert!(zero.should_snapshot(&input(0, 1, 1000)));
    }

    #[test]
    fn test_large_patch_triggers_snapshot() {
        let policy = CadencePolicy {
            interval: 100,
            max_patch_ratio: 0.5,
        };
        assert!(!policy.should_snapshot(&input(0, 49, 100)));
        assert!(policy.should_snapshot(&input(0, 50, 100)));
        // Empty content: any patch is at least as big as a snapshot.
        assert!(policy.should_snapshot(&input(0, 80, 0)));
    }
}
