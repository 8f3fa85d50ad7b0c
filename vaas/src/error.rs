use thiserror::Error;

/// Structural decode failures. Any of these mean the byte sequence is not a
/// well-formed VAA and the caller must re-fetch it; retrying with the same
/// bytes can never succeed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaaError {
    #[error("buffer ends before the declared structure")]
    Truncated,

    #[error("unsupported vaa version {0}")]
    InvalidVersion(u8),

    #[error("vaa carries no signatures")]
    NoSignatures,

    #[error("governance packet layout is invalid")]
    InvalidGovernancePacket,
}
