//! Stem locality of storage accesses.
//!
//! Classifies every storage read and write by the tree branch it has to open: slots stored next
//! to the account header come for free, the first touch of any other stem opens a new branch, and
//! later touches of that stem are hot.

use alloy_primitives::{Address, B256};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{embedding::is_header_slot, AddressPoint, Stem};

/// How a storage access hits the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BranchAccess {
    /// Write to a stem not written before.
    WriteFirstTime,
    /// Write to a slot in the account header stem.
    WriteFree,
    /// Write to a stem already written.
    WriteHot,
    /// Read from a stem not read before.
    ReadFirstTime,
    /// Read from a slot in the account header stem.
    ReadFree,
    /// Read from a stem already read.
    ReadHot,
}

/// Kind of storage access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessKind {
    /// `SLOAD`
    Read,
    /// `SSTORE`
    Write,
}

/// One recorded storage access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StemAccess {
    /// Contract whose storage was accessed.
    pub contract: Address,
    /// Accessed slot.
    pub slot: B256,
    /// Classification of the access.
    pub access: BranchAccess,
}

/// Tracks which storage stems each contract has touched.
///
/// Reads and writes are tracked separately: a stem that has been written is still a first-time
/// read.
#[derive(Clone, Debug, Default)]
pub struct StemAccessTracker {
    reads: HashMap<Address, HashSet<Stem>>,
    writes: HashMap<Address, HashSet<Stem>>,
    accesses: Vec<StemAccess>,
}

impl StemAccessTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an access of `slot` in the storage of `contract`.
    pub fn record(&mut self, contract: Address, slot: B256, kind: AccessKind) -> BranchAccess {
        let access = if is_header_slot(&slot.0) {
            match kind {
                AccessKind::Read => BranchAccess::ReadFree,
                AccessKind::Write => BranchAccess::WriteFree,
            }
        } else {
            let stem = AddressPoint::new(contract).storage_slot_key(&slot.0).stem;
            let (seen, first, hot) = match kind {
                AccessKind::Read => {
                    (&mut self.reads, BranchAccess::ReadFirstTime, BranchAccess::ReadHot)
                }
                AccessKind::Write => {
                    (&mut self.writes, BranchAccess::WriteFirstTime, BranchAccess::WriteHot)
                }
            };
            if seen.entry(contract).or_default().insert(stem) {
                first
            } else {
                hot
            }
        };
        trace!(%contract, %slot, ?access, "storage access");
        self.accesses.push(StemAccess { contract, slot, access });
        access
    }

    /// All recorded accesses, in order.
    pub fn accesses(&self) -> &[StemAccess] {
        &self.accesses
    }

    /// Number of accesses per classification.
    pub fn counts(&self) -> BTreeMap<BranchAccess, usize> {
        let mut counts = BTreeMap::new();
        for access in &self.accesses {
            *counts.entry(access.access).or_insert(0) += 1;
        }
        counts
    }

    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        self.reads.clear();
        self.writes.clear();
        self.accesses.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;

    fn slot(n: u64) -> B256 {
        B256::from(U256::from(n))
    }

    #[test]
    fn test_header_slots_are_free() {
        let mut tracker = StemAccessTracker::new();
        let contract = Address::repeat_byte(1);
        for n in 0..64 {
            assert_eq!(tracker.record(contract, slot(n), AccessKind::Read), BranchAccess::ReadFree);
        }
        assert_eq!(tracker.record(contract, slot(3), AccessKind::Write), BranchAccess::WriteFree);
        assert_ne!(tracker.record(contract, slot(64), AccessKind::Read), BranchAccess::ReadFree);
    }

    #[test]
    fn test_first_then_hot() {
        let mut tracker = StemAccessTracker::new();
        let contract = Address::repeat_byte(1);

        assert_eq!(
            tracker.record(contract, slot(100), AccessKind::Read),
            BranchAccess::ReadFirstTime
        );
        // 200 shares the stem of 100
        assert_eq!(tracker.record(contract, slot(200), AccessKind::Read), BranchAccess::ReadHot);
        assert_eq!(
            tracker.record(contract, slot(300), AccessKind::Read),
            BranchAccess::ReadFirstTime
        );
        assert_eq!(
            tracker.record(contract, slot(100), AccessKind::Write),
            BranchAccess::WriteFirstTime
        );
        assert_eq!(tracker.record(contract, slot(101), AccessKind::Write), BranchAccess::WriteHot);
    }

    #[test]
    fn test_contracts_tracked_separately() {
        let mut tracker = StemAccessTracker::new();
        let s = slot(1000);
        assert_eq!(
            tracker.record(Address::repeat_byte(1), s, AccessKind::Read),
            BranchAccess::ReadFirstTime
        );
        assert_eq!(
            tracker.record(Address::repeat_byte(2), s, AccessKind::Read),
            BranchAccess::ReadFirstTime
        );
    }

    #[test]
    fn test_counts_and_clear() {
        let mut tracker = StemAccessTracker::new();
        let contract = Address::repeat_byte(1);
        tracker.record(contract, slot(1), AccessKind::Read);
        tracker.record(contract, slot(1000), AccessKind::Read);
        tracker.record(contract, slot(1000), AccessKind::Read);

        let counts = tracker.counts();
        assert_eq!(counts[&BranchAccess::ReadFree], 1);
        assert_eq!(counts[&BranchAccess::ReadFirstTime], 1);
        assert_eq!(counts[&BranchAccess::ReadHot], 1);
        assert_eq!(tracker.accesses().len(), 3);
        assert_eq!(tracker.accesses()[1].slot, slot(1000));

        tracker.clear();
        assert!(tracker.accesses().is_empty());
        assert_eq!(
            tracker.record(contract, slot(1000), AccessKind::Read),
            BranchAccess::ReadFirstTime
        );
    }
}
