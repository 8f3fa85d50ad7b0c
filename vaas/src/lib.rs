//! Chain-agnostic VAA (Verified Action Approval) primitives.
//!
//! This crate provides the wire format shared by every component of the
//! protocol and nothing else: no state, no signature cryptography. It
//! includes:
//!
//! - Parsers and serializers for VAA headers, bodies and governance packets.
//! - The double-Keccak digest guardians sign.
//! - Data types for guardian addresses and signatures.

#![deny(warnings)]

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod byte_utils;
pub mod error;
pub mod governance;
pub mod vaa;

pub use error::VaaError;
pub use vaa::{digest, Body, Header, MessageDigest, Signature, Vaa};

/// A 20-byte guardian identity, derived from a secp256k1 public key the same
/// way Ethereum derives account addresses.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GuardianAddress(pub [u8; 20]);

impl fmt::Display for GuardianAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Addresses on the wire are 32 bytes. Shorter identifiers, for example
/// 20-byte Ethereum addresses, are left zero padded to 32.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 32]);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}
