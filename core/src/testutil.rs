//! Signing helpers shared by the unit tests. Real secp256k1 keys, real
//! signatures; nothing here stubs out the crypto.

use causeway_vaas::{digest, Body, GuardianAddress, Header, Signature, Vaa};
use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use sha3::{Digest, Keccak256};

pub(crate) struct GuardianKeys(pub Vec<SigningKey>);

impl GuardianKeys {
    pub fn generate(n: usize) -> Self {
        GuardianKeys((0..n).map(|_| SigningKey::random(&mut OsRng)).collect())
    }
}

pub(crate) fn guardian_address(key: &SigningKey) -> GuardianAddress {
    let point = key.verifying_key().to_encoded_point(false);
    let hashed = Keccak256::digest(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hashed[12..]);
    GuardianAddress(address)
}

pub(crate) fn guardian_addresses(keys: &GuardianKeys) -> Vec<GuardianAddress> {
    keys.0.iter().map(guardian_address).collect()
}

pub(crate) fn sign_digest(key: &SigningKey, digest: &[u8; 32], index: u8) -> Signature {
    let (sig, recovery_id) = key.sign_prehash_recoverable(digest).unwrap();
    let bytes = sig.to_bytes();
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&bytes[..32]);
    s.copy_from_slice(&bytes[32..]);
    Signature {
        index,
        r,
        s,
        recovery_id: recovery_id.to_byte(),
    }
}

/// Serializes `body`, has the guardians named by `signers` sign its double
/// digest, and returns the complete VAA byte stream.
pub(crate) fn sign_vaa(keys: &GuardianKeys, set_index: u32, signers: &[u8], body: &Body) -> Vec<u8> {
    let message_digest = digest(&body.to_vec());
    let signatures = signers
        .iter()
        .map(|&i| sign_digest(&keys.0[usize::from(i)], &message_digest.secp256k_hash, i))
        .collect();
    let header = Header {
        version: 1,
        guardian_set_index: set_index,
        signatures,
    };
    Vaa::from((header, body.clone())).to_vec()
}
