//! The replay registry: an append-only set of consumed-message markers.

use std::collections::BTreeSet;

use causeway_vaas::{Address, Body};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BridgeError;

/// Claim keys identify a message by `(emitter_chain, emitter_address,
/// sequence)`, 42 bytes big-endian. Governance messages go through the same
/// scheme, which is what makes their sequence numbers single-use.
pub fn claim_key(emitter_chain: u16, emitter_address: &Address, sequence: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(42);
    key.extend_from_slice(&emitter_chain.to_be_bytes());
    key.extend_from_slice(&emitter_address.0);
    key.extend_from_slice(&sequence.to_be_bytes());
    key
}

pub fn claim_key_for(body: &Body) -> Vec<u8> {
    claim_key(body.emitter_chain, &body.emitter_address, body.sequence)
}

/// Claims live for the lifetime of the deployment; nothing is ever removed.
/// Registration must be atomic with respect to racing finalizations for the
/// same key, which the host's execution model provides (one state transition
/// per call).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimRegistry {
    posted: BTreeSet<Vec<u8>>,
}

impl ClaimRegistry {
    pub fn register(&mut self, key: Vec<u8>) -> Result<(), BridgeError> {
        if !self.posted.insert(key) {
            return Err(BridgeError::AlreadyPosted);
        }
        debug!("claim registered");
        Ok(())
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.posted.contains(key)
    }
}
