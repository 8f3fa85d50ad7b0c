//! One-shot verification profile.
//!
//! Hosts whose call budget fits a full quorum check in a single call skip
//! the chunked upload: one call verifies the raw VAA into a per-attempt
//! `SignatureSet`, a second call posts the message. Because the second call
//! receives the body again, it re-derives the digest from that second copy
//! and cross-checks it against the signature set, so a verified signature
//! set can never be replayed against a body other than the one it was
//! computed over.

use causeway_vaas::{digest, Body, Header};
use serde::{Deserialize, Serialize};

use crate::{error::BridgeError, governance::Posted, verify::verify_quorum, Bridge};

/// The durable result of a successful one-shot signature verification,
/// bound to a specific body hash and guardian set.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SignatureSet {
    /// Keccak256 of the body the signatures were verified over.
    pub hash: [u8; 32],
    /// Guardian set the signatures were verified against.
    pub guardian_set_index: u32,
    /// How many signatures passed verification.
    pub num_verified: usize,
}

impl Bridge {
    /// Parses and quorum-verifies a raw VAA in one call, producing the
    /// signature set consumed by [`Bridge::post_vaa`].
    pub fn verify_signatures(&self, data: &[u8], now: u32) -> Result<SignatureSet, BridgeError> {
        let (header, body_offset) = Header::parse(data)?;
        let set = self.guardian_sets.get(header.guardian_set_index)?;
        let message_digest = digest(&data[body_offset..]);

        verify_quorum(
            &message_digest.secp256k_hash,
            &header.signatures,
            set,
            now,
            header.guardian_set_index == self.guardian_sets.current_index(),
        )?;

        Ok(SignatureSet {
            hash: message_digest.hash,
            guardian_set_index: header.guardian_set_index,
            num_verified: header.signatures.len(),
        })
    }

    /// Posts a message whose signatures were verified by
    /// [`Bridge::verify_signatures`]. The body is re-serialized from the
    /// caller's copy and its hash checked against the signature set before
    /// anything else happens.
    pub fn post_vaa(
        &mut self,
        body: &Body,
        signature_set: &SignatureSet,
        now: u32,
    ) -> Result<Posted, BridgeError> {
        let derived = digest(&body.to_vec());
        if derived.hash != signature_set.hash {
            return Err(BridgeError::InvalidMessageHash);
        }

        let set = self.guardian_sets.get(signature_set.guardian_set_index)?;
        let is_current =
            signature_set.guardian_set_index == self.guardian_sets.current_index();
        if !is_current && !set.is_active(now) {
            return Err(BridgeError::GuardianSetExpired);
        }
        if signature_set.num_verified < set.quorum() {
            return Err(BridgeError::NoQuorum);
        }

        self.post_body(body.clone(), signature_set.guardian_set_index, now)
    }
}
