//! The stateful verification core: guardian set registry, quorum
//! verification, resumable VAA ingestion, replay protection and governance
//! dispatch.
//!
//! A host ledger embeds a [`Bridge`] value, persists it however it persists
//! anything else, and drives it one atomic call at a time. The crate holds
//! no locks and spawns nothing; serialization of racing finalization
//! attempts is the host execution model's job (see the field docs on
//! [`claims::ClaimRegistry`]).

#![deny(warnings)]

use std::collections::BTreeMap;

use causeway_vaas::{Address, GuardianAddress};
use serde::{Deserialize, Serialize};

pub mod claims;
pub mod encoded;
pub mod error;
pub mod governance;
pub mod guardians;
pub mod legacy;
pub mod verify;

#[cfg(test)]
pub(crate) mod testutil;

pub use encoded::{EncodedVaa, ProcessingStatus, RecordKey, WriteAuthority};
pub use error::BridgeError;
pub use governance::{GovernanceEffect, Posted};
pub use guardians::{GuardianRegistry, GuardianSet};
pub use legacy::SignatureSet;

/// Deployment-time configuration. The resource ceilings are empirical host
/// limits, not protocol invariants; a different host re-derives them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Chain id of the chain this core is deployed on.
    pub chain_id: u16,

    /// Emitter chain trusted for governance actions. Fixed at deployment,
    /// never rotated.
    pub governance_chain: u16,
    /// Emitter address trusted for governance actions.
    pub governance_address: Address,

    /// Seconds a superseded guardian set keeps verifying after rotation.
    pub guardian_set_expirity: u32,

    /// Fee charged for emitting a message, adjustable via governance.
    pub fee: u128,

    /// Largest chunk a single `write_encoded` call accepts.
    pub max_chunk_size: usize,
    /// Largest application payload `post` accepts.
    pub max_payload_size: usize,
}

/// Room left for the call envelope under a ~1 KB host message ceiling.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 990;
/// Largest payload the reference host can reallocate during finalize.
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 10_145;

impl BridgeConfig {
    pub fn new(chain_id: u16, governance_chain: u16, governance_address: Address) -> Self {
        BridgeConfig {
            chain_id,
            governance_chain,
            governance_address,
            guardian_set_expirity: 86400,
            fee: 0,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}

/// The whole of the core's durable state.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Bridge {
    pub(crate) config: BridgeConfig,
    pub(crate) guardian_sets: GuardianRegistry,
    pub(crate) claims: claims::ClaimRegistry,
    pub(crate) records: BTreeMap<RecordKey, EncodedVaa>,
    pub(crate) registered_emitters: BTreeMap<u16, Address>,
}

impl Bridge {
    /// One-time initialization with the bootstrap guardian set. This is the
    /// only mutation path that does not itself pass through quorum
    /// verification.
    pub fn initialize(config: BridgeConfig, initial_guardians: Vec<GuardianAddress>, now: u32) -> Self {
        Bridge {
            config,
            guardian_sets: GuardianRegistry::bootstrap(initial_guardians, now),
            claims: claims::ClaimRegistry::default(),
            records: BTreeMap::new(),
            registered_emitters: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn message_fee(&self) -> u128 {
        self.config.fee
    }

    pub fn guardian_set(&self, index: u32) -> Result<&GuardianSet, BridgeError> {
        self.guardian_sets.get(index)
    }

    pub fn current_guardian_set(&self) -> &GuardianSet {
        self.guardian_sets.current()
    }

    pub fn current_guardian_set_index(&self) -> u32 {
        self.guardian_sets.current_index()
    }

    pub fn registered_emitter(&self, chain: u16) -> Option<&Address> {
        self.registered_emitters.get(&chain)
    }

    pub fn is_posted(&self, emitter_chain: u16, emitter_address: &Address, sequence: u64) -> bool {
        self.claims
            .contains(&claims::claim_key(emitter_chain, emitter_address, sequence))
    }
}
