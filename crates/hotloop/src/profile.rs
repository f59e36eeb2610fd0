//! The jump-target execution profile.
//!
//! Counts how often each program counter is entered as the target of an
//! unconditional JUMP. Conditional branches and returns do not count; the
//! only other increment is the fall-through PC of a trace exit. A PC whose
//! count reaches [`HOT_THRESHOLD`] becomes a candidate trace head.

use ahash::AHashMap;

use crate::io::DiagSink;

/// Number of jump-target entries before a PC is considered hot.
pub const HOT_THRESHOLD: u64 = 5;

/// Mapping from program counter to execution count.
#[derive(Debug, Default)]
pub struct Profile {
    counts: AHashMap<usize, u64>,
}

impl Profile {
    /// Creates an empty profile.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counts: AHashMap::new(),
        }
    }

    pub(crate) fn bump(&mut self, pc: usize) {
        *self.counts.entry(pc).or_insert(0) += 1;
    }

    /// The count recorded for `pc` (zero if never entered).
    #[must_use]
    pub fn count(&self, pc: usize) -> u64 {
        self.counts.get(&pc).copied().unwrap_or(0)
    }

    pub(crate) fn is_hot(&self, pc: usize) -> bool {
        self.count(pc) >= HOT_THRESHOLD
    }

    /// Emits the `jump_targets: { … }` dump, sorted by PC.
    pub(crate) fn dump(&self, sink: &mut impl DiagSink) {
        let mut entries: Vec<(usize, u64)> = self.counts.iter().map(|(&pc, &count)| (pc, count)).collect();
        entries.sort_unstable();

        sink.write("jump_targets: {\n");
        for (pc, count) in entries {
            sink.write(&format!("    {pc}: {count}\n"));
        }
        sink.write("}\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::CollectDiag;

    #[test]
    fn hotness_starts_at_the_threshold() {
        let mut profile = Profile::new();
        for _ in 0..HOT_THRESHOLD - 1 {
            profile.bump(8);
        }
        assert!(!profile.is_hot(8));
        profile.bump(8);
        assert!(profile.is_hot(8));
        assert_eq!(profile.count(8), HOT_THRESHOLD);
        assert_eq!(profile.count(9), 0);
    }

    #[test]
    fn dump_is_sorted_by_pc() {
        let mut profile = Profile::new();
        profile.bump(20);
        profile.bump(8);
        profile.bump(8);

        let mut sink = CollectDiag::new();
        profile.dump(&mut sink);
        assert_eq!(sink.output(), "jump_targets: {\n    8: 2\n    20: 1\n}\n");
    }
}
