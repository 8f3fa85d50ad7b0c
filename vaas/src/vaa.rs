//! VAA wire format.
//!
//! A VAA is a guardian-quorum-signed attestation of an event observed on a
//! source chain. The byte layout is fixed and chain-agnostic:
//!
//! ```markdown
//! header (length 6 + 66 per signature):
//! 0   uint8   version (0x01)
//! 1   uint32  guardian set index
//! 5   uint8   len signatures
//!
//! per signature (length 66):
//! 0   uint8       index of the signer (in guardian keys)
//! 1   [32]uint8   r
//! 33  [32]uint8   s
//! 65  uint8       recovery id
//!
//! body (signed content):
//! 0   uint32      timestamp (unix in seconds)
//! 4   uint32      nonce
//! 8   uint16      emitter_chain
//! 10  [32]uint8   emitter_address
//! 42  uint64      sequence
//! 50  uint8       consistency_level
//! 51  []uint8     payload
//! ```
//!
//! All multi-byte integers are big-endian. The payload has no length prefix;
//! it runs to the end of the buffer.

use serde::{Deserialize, Serialize};
use sha3::{Digest as Sha3Digest, Keccak256};

use crate::{byte_utils::ByteUtils, error::VaaError, Address};

pub const HEADER_LEN: usize = 6;
pub const SIGNATURE_LEN: usize = 66;
/// Fixed-width body fields preceding the payload.
pub const BODY_META_LEN: usize = 51;

const GUARDIAN_SET_INDEX_POS: usize = 1;
const LEN_SIGNERS_POS: usize = 5;

const BODY_NONCE_POS: usize = 4;
const BODY_EMITTER_CHAIN_POS: usize = 8;
const BODY_EMITTER_ADDRESS_POS: usize = 10;
const BODY_SEQUENCE_POS: usize = 42;
const BODY_CONSISTENCY_LEVEL_POS: usize = 50;

const SIG_R_POS: usize = 1;
const SIG_S_POS: usize = 33;
const SIG_RECOVERY_POS: usize = 65;

/// A single guardian signature, prefixed with the signer's position in the
/// guardian set. Only meaningful relative to a digest and a guardian set.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub index: u8,
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub recovery_id: u8,
}

impl Signature {
    fn parse(data: &[u8], offset: usize) -> Result<Self, VaaError> {
        Ok(Signature {
            index: data.get_u8(offset)?,
            r: data.get_const_bytes(offset + SIG_R_POS)?,
            s: data.get_const_bytes(offset + SIG_S_POS)?,
            recovery_id: data.get_u8(offset + SIG_RECOVERY_POS)?,
        })
    }

    /// The 64-byte `r || s` form expected by recovery primitives.
    pub fn rs(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r);
        out[32..].copy_from_slice(&self.s);
        out
    }
}

/// The unsigned header: version, guardian set index and signature list.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub guardian_set_index: u32,
    pub signatures: Vec<Signature>,
}

impl Header {
    /// Parses the header and returns it along with the offset at which the
    /// signed body begins.
    pub fn parse(data: &[u8]) -> Result<(Self, usize), VaaError> {
        let version = data.get_u8(0)?;
        if version != 1 {
            return Err(VaaError::InvalidVersion(version));
        }

        let guardian_set_index = data.get_u32(GUARDIAN_SET_INDEX_POS)?;
        let len_signers = data.get_u8(LEN_SIGNERS_POS)? as usize;
        if len_signers == 0 {
            return Err(VaaError::NoSignatures);
        }

        let mut signatures = Vec::with_capacity(len_signers);
        for i in 0..len_signers {
            signatures.push(Signature::parse(data, HEADER_LEN + SIGNATURE_LEN * i)?);
        }

        let body_offset = HEADER_LEN + SIGNATURE_LEN * len_signers;
        if body_offset >= data.len() {
            return Err(VaaError::Truncated);
        }

        Ok((
            Header {
                version,
                guardian_set_index,
                signatures,
            },
            body_offset,
        ))
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let mut v = Vec::with_capacity(HEADER_LEN + SIGNATURE_LEN * self.signatures.len());
        v.push(self.version);
        v.extend_from_slice(&self.guardian_set_index.to_be_bytes());
        v.push(self.signatures.len() as u8);
        for sig in &self.signatures {
            v.push(sig.index);
            v.extend_from_slice(&sig.r);
            v.extend_from_slice(&sig.s);
            v.push(sig.recovery_id);
        }
        v
    }
}

/// The signed body of a VAA. Application messages are uniquely identified by
/// `(emitter_chain, emitter_address, sequence)`.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Body {
    /// Seconds since UNIX epoch.
    pub timestamp: u32,
    pub nonce: u32,
    pub emitter_chain: u16,
    pub emitter_address: Address,
    pub sequence: u64,
    pub consistency_level: u8,
    pub payload: Vec<u8>,
}

impl Body {
    pub fn parse(data: &[u8]) -> Result<Self, VaaError> {
        if data.len() < BODY_META_LEN {
            return Err(VaaError::Truncated);
        }
        Ok(Body {
            timestamp: data.get_u32(0)?,
            nonce: data.get_u32(BODY_NONCE_POS)?,
            emitter_chain: data.get_u16(BODY_EMITTER_CHAIN_POS)?,
            emitter_address: Address(data.get_const_bytes(BODY_EMITTER_ADDRESS_POS)?),
            sequence: data.get_u64(BODY_SEQUENCE_POS)?,
            consistency_level: data.get_u8(BODY_CONSISTENCY_LEVEL_POS)?,
            payload: data[BODY_META_LEN..].to_vec(),
        })
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let mut v = Vec::with_capacity(BODY_META_LEN + self.payload.len());
        v.extend_from_slice(&self.timestamp.to_be_bytes());
        v.extend_from_slice(&self.nonce.to_be_bytes());
        v.extend_from_slice(&self.emitter_chain.to_be_bytes());
        v.extend_from_slice(&self.emitter_address.0);
        v.extend_from_slice(&self.sequence.to_be_bytes());
        v.push(self.consistency_level);
        v.extend_from_slice(&self.payload);
        v
    }

    pub fn digest(&self) -> MessageDigest {
        digest(&self.to_vec())
    }

    /// Whether this message originates from the configured governance
    /// emitter. Matching messages carry protocol administration, not
    /// application payloads.
    pub fn is_governance(&self, governance_chain: u16, governance_address: &Address) -> bool {
        self.emitter_chain == governance_chain && self.emitter_address == *governance_address
    }
}

/// A fully parsed VAA: header plus body.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Vaa {
    pub version: u8,
    pub guardian_set_index: u32,
    pub signatures: Vec<Signature>,
    pub timestamp: u32,
    pub nonce: u32,
    pub emitter_chain: u16,
    pub emitter_address: Address,
    pub sequence: u64,
    pub consistency_level: u8,
    pub payload: Vec<u8>,
}

impl Vaa {
    pub fn parse(data: &[u8]) -> Result<Self, VaaError> {
        let (header, body_offset) = Header::parse(data)?;
        let body = Body::parse(&data[body_offset..])?;
        Ok((header, body).into())
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let (header, body) = self.clone().into_parts();
        let mut v = header.to_vec();
        v.extend_from_slice(&body.to_vec());
        v
    }

    pub fn into_parts(self) -> (Header, Body) {
        (
            Header {
                version: self.version,
                guardian_set_index: self.guardian_set_index,
                signatures: self.signatures,
            },
            Body {
                timestamp: self.timestamp,
                nonce: self.nonce,
                emitter_chain: self.emitter_chain,
                emitter_address: self.emitter_address,
                sequence: self.sequence,
                consistency_level: self.consistency_level,
                payload: self.payload,
            },
        )
    }

    pub fn body(&self) -> Body {
        self.clone().into_parts().1
    }

    pub fn digest(&self) -> MessageDigest {
        self.body().digest()
    }

    pub fn is_governance(&self, governance_chain: u16, governance_address: &Address) -> bool {
        self.emitter_chain == governance_chain && self.emitter_address == *governance_address
    }
}

impl From<(Header, Body)> for Vaa {
    fn from((hdr, body): (Header, Body)) -> Self {
        Vaa {
            version: hdr.version,
            guardian_set_index: hdr.guardian_set_index,
            signatures: hdr.signatures,
            timestamp: body.timestamp,
            nonce: body.nonce,
            emitter_chain: body.emitter_chain,
            emitter_address: body.emitter_address,
            sequence: body.sequence,
            consistency_level: body.consistency_level,
            payload: body.payload,
        }
    }
}

/// Digest data for a VAA body.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MessageDigest {
    /// Keccak256 of the body. Guardians hash the body once and sign the
    /// hash, so submitting hosts only ever need to transfer 32 bytes.
    pub hash: [u8; 32],

    /// Keccak256 of `hash`. secp256k1 signing operates on a hash of its
    /// input, so recovery primitives such as `ecrecover` expect this double
    /// hash rather than the body hash itself.
    pub secp256k_hash: [u8; 32],
}

/// Calculates the digest for `body`, the serialized signed content of a VAA.
///
/// The single hash uniquely identifies a VAA across every component of the
/// protocol; the double hash is what guardian signatures verify against.
pub fn digest(body: &[u8]) -> MessageDigest {
    let hash: [u8; 32] = {
        let mut h = Keccak256::new();
        h.update(body);
        h.finalize().into()
    };

    let secp256k_hash: [u8; 32] = {
        let mut h = Keccak256::new();
        h.update(hash);
        h.finalize().into()
    };

    MessageDigest {
        hash,
        secp256k_hash,
    }
}
