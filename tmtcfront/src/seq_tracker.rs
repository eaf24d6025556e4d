//! Per-APID sequence continuity tracking
//!
//! One slot per APID, so the whole 11-bit space is allocated up front and
//! never grows. Each slot is a single atomic holding the last observed
//! count, or `UNSET` before the first observation.

use std::sync::atomic::{AtomicU32, Ordering};

use tmtclibgs::{Apid, SeqCount, APID_COUNT};

const UNSET: u32 = u32::MAX;

/// Outcome of observing a sequence count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// First count ever seen for this APID
    First,
    /// Exactly one after the previous count, modulo 16384
    Continuous,
    /// Anything else: gaps, duplicates, resets and reordering
    Discontinuous { previous: SeqCount },
}

/// Continuity monitor for the packets of one link
pub struct SequenceTracker {
    slots: Box<[AtomicU32]>,
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self {
            slots: (0..APID_COUNT).map(|_| AtomicU32::new(UNSET)).collect(),
        }
    }

    /// Record `seq` as the latest count for `apid` and classify it against
    /// the count it replaces
    pub fn observe(&self, apid: Apid, seq: SeqCount) -> Classification {
        let previous = self.slots[apid.index()].swap(u32::from(seq.value()), Ordering::AcqRel);
        if previous == UNSET {
            return Classification::First;
        }

        let previous = SeqCount::new(previous as u16);
        if previous.is_followed_by(seq) {
            Classification::Continuous
        } else {
            Classification::Discontinuous { previous }
        }
    }

    /// Last count observed for `apid`, if any
    pub fn last(&self, apid: Apid) -> Option<SeqCount> {
        match self.slots[apid.index()].load(Ordering::Acquire) {
            UNSET => None,
            value => Some(SeqCount::new(value as u16)),
        }
    }

    /// Number of APIDs observed at least once
    pub fn tracked_apids(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.load(Ordering::Acquire) != UNSET)
            .count()
    }
}

impl Default for SequenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn seq(v: u16) -> SeqCount {
        SeqCount::new(v)
    }

    #[test]
    fn test_first_then_continuous_for_every_apid() {
        let tracker = SequenceTracker::new();
        for raw in 0..APID_COUNT as u16 {
            let apid = Apid::new(raw);
            let start = raw.wrapping_mul(7) & SeqCount::MASK;
            assert_eq!(tracker.observe(apid, seq(start)), Classification::First);
            let mut current = seq(start);
            for _ in 0..4 {
                current = current.next();
                assert_eq!(tracker.observe(apid, current), Classification::Continuous);
            }
        }
        assert_eq!(tracker.tracked_apids(), APID_COUNT);
    }

    #[test]
    fn test_full_cycle_is_continuous() {
        let tracker = SequenceTracker::new();
        let apid = Apid::new(100);
        assert_eq!(tracker.observe(apid, seq(0)), Classification::First);
        let mut current = seq(0);
        for _ in 0..(2 * 16384) {
            current = current.next();
            assert_eq!(tracker.observe(apid, current), Classification::Continuous);
        }
    }

    #[test]
    fn test_duplicate_is_discontinuous() {
        let tracker = SequenceTracker::new();
        let apid = Apid::new(5);
        tracker.observe(apid, seq(42));
        assert_eq!(
            tracker.observe(apid, seq(42)),
            Classification::Discontinuous { previous: seq(42) }
        );
    }

    #[test]
    fn test_wrap_around_is_continuous() {
        let tracker = SequenceTracker::new();
        let apid = Apid::new(2047);
        tracker.observe(apid, seq(16383));
        assert_eq!(tracker.observe(apid, seq(0)), Classification::Continuous);
    }

    #[test]
    fn test_gap_and_reorder_overwrite_last() {
        let tracker = SequenceTracker::new();
        let apid = Apid::new(1);
        tracker.observe(apid, seq(10));
        assert_eq!(
            tracker.observe(apid, seq(12)),
            Classification::Discontinuous { previous: seq(10) }
        );
        assert_eq!(
            tracker.observe(apid, seq(11)),
            Classification::Discontinuous { previous: seq(12) }
        );
        assert_eq!(tracker.last(apid), Some(seq(11)));
        assert_eq!(tracker.observe(apid, seq(12)), Classification::Continuous);
    }

    #[test]
    fn test_apids_are_independent() {
        let tracker = SequenceTracker::new();
        tracker.observe(Apid::new(1), seq(3));
        assert_eq!(tracker.observe(Apid::new(2), seq(9)), Classification::First);
        assert_eq!(tracker.observe(Apid::new(1), seq(4)), Classification::Continuous);
        assert_eq!(tracker.last(Apid::new(3)), None);
    }

    #[test]
    fn test_concurrent_observers_on_distinct_apids() {
        let tracker = SequenceTracker::new();
        thread::scope(|s| {
            for raw in 0..8u16 {
                let tracker = &tracker;
                s.spawn(move || {
                    let apid = Apid::new(raw);
                    assert_eq!(tracker.observe(apid, seq(0)), Classification::First);
                    for v in 1..1000u16 {
                        assert_eq!(tracker.observe(apid, seq(v)), Classification::Continuous);
                    }
                });
            }
        });
        assert_eq!(tracker.tracked_apids(), 8);
        assert_eq!(tracker.last(Apid::new(7)), Some(seq(999)));
    }
}
