use causeway_vaas::VaaError;
use thiserror::Error;

/// Every failure the core can surface. Variants are grouped by the caller's
/// recovery options: structural decode failures require new bytes,
/// cryptographic failures are terminal for the `(bytes, guardian set)` pair,
/// resource failures require restructuring the call, and replay/authority
/// failures are terminal by intent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("malformed vaa: {0}")]
    MalformedVaa(#[from] VaaError),

    // Cryptographic.
    #[error("no guardian set exists with the requested index")]
    InvalidGuardianSetIndex,

    #[error("guardian set is past its expiration time")]
    GuardianSetExpired,

    #[error("signature count below quorum threshold")]
    NoQuorum,

    #[error("guardian signature indices must be strictly increasing")]
    InvalidGuardianIndexNonIncreasing,

    #[error("guardian signature index exceeds guardian set size")]
    InvalidGuardianIndexOutOfRange,

    #[error("recovered key does not match the guardian at this index")]
    InvalidGuardianKeyRecovery,

    #[error("signature is not a valid secp256k1 signature")]
    InvalidSignature,

    // Verification records.
    #[error("a record already exists under this key")]
    AlreadyExists,

    #[error("no record exists under this key")]
    RecordNotFound,

    #[error("caller is not the record's write authority")]
    WriteAuthorityMismatch,

    #[error("record is not in writing status")]
    NotInWritingStatus,

    #[error("record has not been verified")]
    UnverifiedVaa,

    #[error("chunk of {len} bytes exceeds the per-call ceiling of {max}")]
    ChunkTooLarge { len: usize, max: usize },

    #[error("write would extend past the declared total length")]
    DataOverflow,

    #[error("not all declared bytes have been written")]
    IncompleteMessage,

    #[error("payload of {len} bytes exceeds the finalize ceiling of {max}")]
    PayloadTooLarge { len: usize, max: usize },

    // Replay.
    #[error("this message has already been posted")]
    AlreadyPosted,

    // Legacy signature-set profile.
    #[error("signature set was produced for a different guardian set")]
    GuardianSetMismatch,

    #[error("body hash does not match the verified signature set")]
    InvalidMessageHash,

    // Governance.
    #[error("vaa does not originate from the governance emitter")]
    InvalidGovernanceEmitter,

    #[error("governance vaas must be verified against the current guardian set")]
    LatestGuardianSetRequired,

    #[error("governance packet names an unknown module")]
    InvalidModule,

    #[error("governance vaa targets another chain")]
    GovernanceForAnotherChain,

    #[error("unknown or undecodable governance action {0}")]
    InvalidGovernanceAction(u8),

    #[error("new guardian set index must increment the current index")]
    InvalidNewGuardianSetIndex,

    #[error("an emitter is already registered for chain {0}")]
    ChainAlreadyRegistered(u16),
}
