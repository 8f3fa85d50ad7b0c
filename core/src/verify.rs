//! Quorum verification over guardian signatures.

use causeway_vaas::{GuardianAddress, Signature};
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey};
use sha3::{Digest, Keccak256};

use crate::{error::BridgeError, guardians::GuardianSet};

/// Recovers the 20-byte guardian identity that produced `sig` over the
/// double-hash `digest`.
///
/// This is the single seam behind which host differences in key recovery
/// live: hosts that recover a public key hash it down to an address here,
/// and the quorum walk itself stays chain-agnostic.
pub fn recover_guardian_address(
    digest: &[u8; 32],
    sig: &Signature,
) -> Result<GuardianAddress, BridgeError> {
    let recovery_id =
        RecoveryId::from_byte(sig.recovery_id).ok_or(BridgeError::InvalidSignature)?;
    let signature =
        EcdsaSignature::from_slice(&sig.rs()).map_err(|_| BridgeError::InvalidSignature)?;
    let pubkey = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
        .map_err(|_| BridgeError::InvalidGuardianKeyRecovery)?;

    // The guardian identity is the last 20 bytes of the Keccak256 hash of
    // the uncompressed EC point, sans its 0x04 tag byte.
    let point = pubkey.to_encoded_point(false);
    let hashed = Keccak256::digest(&point.as_bytes()[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&hashed[12..]);
    Ok(GuardianAddress(address))
}

/// Proves that a quorum of distinct guardians from `set` signed `digest`.
///
/// Signatures must arrive sorted by strictly increasing guardian index. This
/// turns duplicate-signature and reordering attacks into one comparison per
/// signature instead of a seen-set; emitting in ascending order is an
/// external contract the off-chain signer upholds.
///
/// `is_current` relaxes the expiry check: the current set has no expiration,
/// while a superseded set only verifies until its grace window closes.
pub fn verify_quorum(
    digest: &[u8; 32],
    signatures: &[Signature],
    set: &GuardianSet,
    now: u32,
    is_current: bool,
) -> Result<(), BridgeError> {
    if signatures.is_empty() {
        return Err(BridgeError::NoQuorum);
    }

    let mut last_index: i32 = -1;
    for sig in signatures {
        if i32::from(sig.index) <= last_index {
            return Err(BridgeError::InvalidGuardianIndexNonIncreasing);
        }
        let index = usize::from(sig.index);
        if index >= set.keys.len() {
            return Err(BridgeError::InvalidGuardianIndexOutOfRange);
        }

        let recovered = recover_guardian_address(digest, sig)?;
        if recovered != set.keys[index] {
            return Err(BridgeError::InvalidGuardianKeyRecovery);
        }

        last_index = i32::from(sig.index);
    }

    if signatures.len() < set.quorum() {
        return Err(BridgeError::NoQuorum);
    }

    if !is_current && !set.is_active(now) {
        return Err(BridgeError::GuardianSetExpired);
    }

    Ok(())
}
