//! Versioned guardian sets and the registry that tracks them.

use std::collections::BTreeMap;

use causeway_vaas::GuardianAddress;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::BridgeError;

/// A versioned, ordered set of guardian identities. The position of a key in
/// `keys` is the signing index carried in signatures, so order is part of the
/// set's identity and the vector is never reordered.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GuardianSet {
    pub index: u32,
    pub keys: Vec<GuardianAddress>,
    pub creation_time: u32,
    /// Zero while the set is current. Set to a future timestamp when the set
    /// is superseded, after which it remains usable for verification until
    /// the grace window closes.
    pub expiration_time: u32,
}

impl GuardianSet {
    /// Number of signatures required for consensus. This calculation is in
    /// expanded form to ease auditing.
    pub fn quorum(&self) -> usize {
        let len = self.keys.len();
        // Fixed point number transformation with one decimal to deal with rounding.
        let len = (len * 10) / 3;
        // Multiplication by two to get a 2/3 quorum.
        let len = len * 2;
        // Division to bring number back into range.
        len / 10 + 1
    }

    pub fn is_active(&self, now: u32) -> bool {
        self.expiration_time == 0 || now <= self.expiration_time
    }
}

/// All guardian sets this deployment has ever installed, keyed by index.
/// Superseded sets are retained read-only; nothing is ever removed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GuardianRegistry {
    sets: BTreeMap<u32, GuardianSet>,
    current_index: u32,
}

impl GuardianRegistry {
    /// One-time bootstrap of guardian set 0. Every later set must arrive via
    /// a quorum-verified governance rotation.
    pub(crate) fn bootstrap(keys: Vec<GuardianAddress>, now: u32) -> Self {
        let mut sets = BTreeMap::new();
        let _ = sets.insert(
            0,
            GuardianSet {
                index: 0,
                keys,
                creation_time: now,
                expiration_time: 0,
            },
        );
        GuardianRegistry {
            sets,
            current_index: 0,
        }
    }

    pub fn current_index(&self) -> u32 {
        self.current_index
    }

    pub fn current(&self) -> &GuardianSet {
        // The bootstrap constructor guarantees the current index is present.
        &self.sets[&self.current_index]
    }

    pub fn get(&self, index: u32) -> Result<&GuardianSet, BridgeError> {
        self.sets
            .get(&index)
            .ok_or(BridgeError::InvalidGuardianSetIndex)
    }

    /// Installs the next guardian set and starts the grace window on the old
    /// one. The superseded set keeps verifying until `now + grace`, so
    /// attestations signed shortly before the rotation remain usable.
    pub(crate) fn rotate(
        &mut self,
        new_index: u32,
        keys: Vec<GuardianAddress>,
        now: u32,
        grace: u32,
    ) -> Result<(), BridgeError> {
        if new_index != self.current_index + 1 {
            return Err(BridgeError::InvalidNewGuardianSetIndex);
        }

        let old_index = self.current_index;
        if let Some(old) = self.sets.get_mut(&old_index) {
            old.expiration_time = now.saturating_add(grace);
        }

        let _ = self.sets.insert(
            new_index,
            GuardianSet {
                index: new_index,
                keys,
                creation_time: now,
                expiration_time: 0,
            },
        );
        self.current_index = new_index;

        info!(old = old_index, new = new_index, "guardian set rotated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_guardian_set(length: usize) -> GuardianSet {
        GuardianSet {
            index: 0,
            keys: vec![GuardianAddress([0; 20]); length],
            creation_time: 0,
            expiration_time: 0,
        }
    }

    #[test]
    fn guardian_set_quorum() {
        assert_eq!(build_guardian_set(1).quorum(), 1);
        assert_eq!(build_guardian_set(2).quorum(), 2);
        assert_eq!(build_guardian_set(3).quorum(), 3);
        assert_eq!(build_guardian_set(4).quorum(), 3);
        assert_eq!(build_guardian_set(5).quorum(), 4);
        assert_eq!(build_guardian_set(6).quorum(), 5);
        assert_eq!(build_guardian_set(7).quorum(), 5);
        assert_eq!(build_guardian_set(8).quorum(), 6);
        assert_eq!(build_guardian_set(9).quorum(), 7);
        assert_eq!(build_guardian_set(10).quorum(), 7);
        assert_eq!(build_guardian_set(11).quorum(), 8);
        assert_eq!(build_guardian_set(12).quorum(), 9);
        assert_eq!(build_guardian_set(13).quorum(), 9);
        assert_eq!(build_guardian_set(19).quorum(), 13);
        assert_eq!(build_guardian_set(20).quorum(), 14);
        assert_eq!(build_guardian_set(100).quorum(), 67);
    }

    #[test]
    fn rotation_requires_sequential_index() {
        let mut registry = GuardianRegistry::bootstrap(vec![GuardianAddress([1; 20])], 100);
        assert_eq!(
            registry.rotate(2, vec![GuardianAddress([2; 20])], 200, 3600),
            Err(BridgeError::InvalidNewGuardianSetIndex)
        );
        assert_eq!(
            registry.rotate(0, vec![GuardianAddress([2; 20])], 200, 3600),
            Err(BridgeError::InvalidNewGuardianSetIndex)
        );
        registry
            .rotate(1, vec![GuardianAddress([2; 20])], 200, 3600)
            .unwrap();
        assert_eq!(registry.current_index(), 1);
    }

    #[test]
    fn rotation_starts_grace_window_on_old_set() {
        let mut registry = GuardianRegistry::bootstrap(vec![GuardianAddress([1; 20])], 100);
        registry
            .rotate(1, vec![GuardianAddress([2; 20])], 500, 3600)
            .unwrap();

        let old = registry.get(0).unwrap();
        assert_eq!(old.expiration_time, 4100);
        assert!(old.is_active(4099));
        assert!(old.is_active(4100));
        assert!(!old.is_active(4101));

        // The new set never expires until it is itself superseded.
        let new = registry.get(1).unwrap();
        assert_eq!(new.expiration_time, 0);
        assert!(new.is_active(u32::MAX));
    }

    #[test]
    fn grace_window_saturates_at_the_epoch_limit() {
        let mut registry = GuardianRegistry::bootstrap(vec![GuardianAddress([1; 20])], 100);
        registry
            .rotate(1, vec![GuardianAddress([2; 20])], u32::MAX - 10, 3600)
            .unwrap();

        let old = registry.get(0).unwrap();
        assert_eq!(old.expiration_time, u32::MAX);
        assert!(old.is_active(u32::MAX));
    }

    #[test]
    fn superseded_sets_remain_readable() {
        let mut registry = GuardianRegistry::bootstrap(vec![GuardianAddress([1; 20])], 0);
        registry
            .rotate(1, vec![GuardianAddress([2; 20])], 10, 60)
            .unwrap();
        assert_eq!(registry.get(0).unwrap().keys, vec![GuardianAddress([1; 20])]);
        assert_eq!(registry.get(2), Err(BridgeError::InvalidGuardianSetIndex));
    }
}
