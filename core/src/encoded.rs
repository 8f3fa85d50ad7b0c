//! Resumable ingestion and verification of encoded VAAs.
//!
//! Hosts with per-call message-size and compute ceilings cannot upload and
//! verify a large VAA in one call, so the work is split into independently
//! schedulable phases: create a record sized to the full VAA, stream the
//! bytes in bounded chunks, verify signatures once everything is present,
//! and finally post the message. A failure in any phase only wastes that
//! phase's work; the uploaded bytes survive a failed verification attempt.

use std::fmt;

use causeway_vaas::{digest, Body, Header, Vaa};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::BridgeError, governance::Posted, verify::verify_quorum, Bridge};

/// Host-chosen identifier for a verification record, typically the account
/// or storage key the record lives under.
pub type RecordKey = [u8; 32];

/// The caller identity that created a record. Only this identity may write
/// to, verify or reclaim it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WriteAuthority(pub [u8; 32]);

impl fmt::Display for WriteAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0[..4] {
            write!(f, "{b:02x}")?;
        }
        write!(f, "..")
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStatus {
    Writing,
    Verified,
}

/// An in-progress or verified VAA upload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EncodedVaa {
    status: ProcessingStatus,
    write_authority: WriteAuthority,
    /// Zero until verified, then the VAA version that was verified.
    version: u8,
    /// The guardian set the signatures were verified against.
    guardian_set_index: Option<u32>,
    bytes: Vec<u8>,
    /// Covered byte ranges, sorted and coalesced. Chunks may arrive in any
    /// order and overlap; last write wins per offset.
    written: Vec<(usize, usize)>,
}

impl EncodedVaa {
    fn new(write_authority: WriteAuthority, total_len: usize) -> Self {
        EncodedVaa {
            status: ProcessingStatus::Writing,
            write_authority,
            version: 0,
            guardian_set_index: None,
            bytes: vec![0; total_len],
            written: Vec::new(),
        }
    }

    pub fn status(&self) -> ProcessingStatus {
        self.status
    }

    pub fn write_authority(&self) -> &WriteAuthority {
        &self.write_authority
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn guardian_set_index(&self) -> Option<u32> {
        self.guardian_set_index
    }

    pub fn total_length(&self) -> usize {
        self.bytes.len()
    }

    pub fn bytes_written(&self) -> usize {
        self.written.iter().map(|(start, end)| end - start).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.written == [(0, self.bytes.len())]
    }

    /// The raw VAA. Only meaningful once `is_complete`.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn write(&mut self, offset: usize, chunk: &[u8]) -> Result<(), BridgeError> {
        let end = offset
            .checked_add(chunk.len())
            .ok_or(BridgeError::DataOverflow)?;
        if end > self.bytes.len() {
            return Err(BridgeError::DataOverflow);
        }
        self.bytes[offset..end].copy_from_slice(chunk);
        self.mark_written(offset, end);
        Ok(())
    }

    fn mark_written(&mut self, start: usize, end: usize) {
        if start == end {
            return;
        }
        self.written.push((start, end));
        self.written.sort_unstable();

        let mut merged: Vec<(usize, usize)> = Vec::with_capacity(self.written.len());
        for &(s, e) in &self.written {
            match merged.last_mut() {
                Some((_, last_end)) if s <= *last_end => *last_end = (*last_end).max(e),
                _ => merged.push((s, e)),
            }
        }
        self.written = merged;
    }
}

impl Bridge {
    /// Begins ingestion of a VAA of `total_len` bytes under `key`.
    pub fn init_encoded(
        &mut self,
        key: RecordKey,
        write_authority: WriteAuthority,
        total_len: usize,
    ) -> Result<(), BridgeError> {
        if self.records.contains_key(&key) {
            return Err(BridgeError::AlreadyExists);
        }
        let _ = self
            .records
            .insert(key, EncodedVaa::new(write_authority, total_len));
        debug!(authority = %write_authority, total_len, "encoded vaa record created");
        Ok(())
    }

    /// Copies `chunk` into the record at `offset`. Legal in any order,
    /// resumable, idempotent per offset.
    pub fn write_encoded(
        &mut self,
        key: &RecordKey,
        write_authority: &WriteAuthority,
        offset: usize,
        chunk: &[u8],
    ) -> Result<(), BridgeError> {
        let max = self.config.max_chunk_size;
        if chunk.len() > max {
            return Err(BridgeError::ChunkTooLarge {
                len: chunk.len(),
                max,
            });
        }

        let record = self.record_mut(key, write_authority)?;
        if record.status != ProcessingStatus::Writing {
            return Err(BridgeError::NotInWritingStatus);
        }
        record.write(offset, chunk)
    }

    /// Verifies the uploaded bytes against guardian set `guardian_set_index`,
    /// which must be the set named in the VAA header, and marks the record
    /// `Verified`. On failure the record is left in `Writing` untouched, so
    /// verification can be retried without re-uploading, for example once the
    /// caller fetches the set index the header actually names.
    pub fn verify_encoded(
        &mut self,
        key: &RecordKey,
        write_authority: &WriteAuthority,
        guardian_set_index: u32,
        now: u32,
    ) -> Result<(), BridgeError> {
        let current_index = self.guardian_sets.current_index();

        let record = match self.records.get(key) {
            Some(r) => r,
            None => return Err(BridgeError::RecordNotFound),
        };
        if record.write_authority != *write_authority {
            return Err(BridgeError::WriteAuthorityMismatch);
        }
        if record.status != ProcessingStatus::Writing {
            return Err(BridgeError::NotInWritingStatus);
        }
        if !record.is_complete() {
            return Err(BridgeError::IncompleteMessage);
        }

        let (header, body_offset) = Header::parse(record.bytes())?;
        if header.guardian_set_index != guardian_set_index {
            return Err(BridgeError::GuardianSetMismatch);
        }

        let set = self.guardian_sets.get(guardian_set_index)?;
        let message_digest = digest(&record.bytes()[body_offset..]);
        verify_quorum(
            &message_digest.secp256k_hash,
            &header.signatures,
            set,
            now,
            guardian_set_index == current_index,
        )?;

        // Nothing below can fail; only now is the record mutated.
        let record = self
            .records
            .get_mut(key)
            .ok_or(BridgeError::RecordNotFound)?;
        record.status = ProcessingStatus::Verified;
        record.version = header.version;
        record.guardian_set_index = Some(guardian_set_index);
        debug!(guardian_set_index, "encoded vaa verified");
        Ok(())
    }

    /// Finalizes a verified record: enforces the payload ceiling, registers
    /// the replay claim, and either returns the application message or
    /// dispatches it as governance.
    pub fn post_encoded(&mut self, key: &RecordKey, now: u32) -> Result<Posted, BridgeError> {
        let (body, set_index) = {
            let record = self.records.get(key).ok_or(BridgeError::RecordNotFound)?;
            if record.status != ProcessingStatus::Verified {
                return Err(BridgeError::UnverifiedVaa);
            }
            let set_index = record
                .guardian_set_index
                .ok_or(BridgeError::UnverifiedVaa)?;
            (Vaa::parse(record.bytes())?.body(), set_index)
        };

        self.post_body(body, set_index, now)
    }

    /// Reclaims a record in any state. Abandoning an upload has no side
    /// effects on the rest of the system.
    pub fn close_encoded(
        &mut self,
        key: &RecordKey,
        write_authority: &WriteAuthority,
    ) -> Result<(), BridgeError> {
        let _ = self.record_mut(key, write_authority)?;
        let _ = self.records.remove(key);
        debug!("encoded vaa record closed");
        Ok(())
    }

    pub fn record(&self, key: &RecordKey) -> Option<&EncodedVaa> {
        self.records.get(key)
    }

    /// Shared ceiling + claim + dispatch path for both verification
    /// profiles.
    pub(crate) fn post_body(
        &mut self,
        body: Body,
        set_index: u32,
        now: u32,
    ) -> Result<Posted, BridgeError> {
        let max = self.config.max_payload_size;
        if body.payload.len() > max {
            return Err(BridgeError::PayloadTooLarge {
                len: body.payload.len(),
                max,
            });
        }

        self.claims.register(crate::claims::claim_key_for(&body))?;

        if body.is_governance(self.config.governance_chain, &self.config.governance_address) {
            let effect = self.dispatch_governance(set_index, &body, now)?;
            return Ok(Posted::Governance(effect));
        }
        Ok(Posted::Application(body))
    }

    fn record_mut(
        &mut self,
        key: &RecordKey,
        write_authority: &WriteAuthority,
    ) -> Result<&mut EncodedVaa, BridgeError> {
        let record = self
            .records
            .get_mut(key)
            .ok_or(BridgeError::RecordNotFound)?;
        if record.write_authority != *write_authority {
            return Err(BridgeError::WriteAuthorityMismatch);
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use causeway_vaas::Address;

    use super::*;
    use crate::{BridgeConfig, GuardianAddress};

    const KEY: RecordKey = [7; 32];
    const AUTHORITY: WriteAuthority = WriteAuthority([1; 32]);

    fn test_bridge() -> Bridge {
        Bridge::initialize(
            BridgeConfig::new(1, 1, Address([4; 32])),
            vec![GuardianAddress([0xaa; 20])],
            0,
        )
    }

    #[test]
    fn init_is_create_once() {
        let mut bridge = test_bridge();
        bridge.init_encoded(KEY, AUTHORITY, 100).unwrap();
        assert_eq!(
            bridge.init_encoded(KEY, AUTHORITY, 100),
            Err(BridgeError::AlreadyExists)
        );
    }

    #[test]
    fn writes_are_authority_gated() {
        let mut bridge = test_bridge();
        bridge.init_encoded(KEY, AUTHORITY, 10).unwrap();
        assert_eq!(
            bridge.write_encoded(&KEY, &WriteAuthority([9; 32]), 0, &[1, 2, 3]),
            Err(BridgeError::WriteAuthorityMismatch)
        );
        assert_eq!(bridge.write_encoded(&KEY, &AUTHORITY, 0, &[1, 2, 3]), Ok(()));
    }

    #[test]
    fn coverage_tracks_any_order_with_overlap() {
        let mut bridge = test_bridge();
        bridge.init_encoded(KEY, AUTHORITY, 10).unwrap();
        bridge.write_encoded(&KEY, &AUTHORITY, 6, &[6, 7, 8, 9]).unwrap();
        bridge.write_encoded(&KEY, &AUTHORITY, 0, &[0, 1, 2]).unwrap();
        assert!(!bridge.record(&KEY).unwrap().is_complete());
        assert_eq!(bridge.record(&KEY).unwrap().bytes_written(), 7);

        // Overlapping chunk fills the hole; last write wins per offset.
        bridge.write_encoded(&KEY, &AUTHORITY, 2, &[9, 3, 4, 5]).unwrap();
        let record = bridge.record(&KEY).unwrap();
        assert!(record.is_complete());
        assert_eq!(record.bytes_written(), 10);
        assert_eq!(record.bytes(), &[0, 1, 9, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn writes_respect_declared_length() {
        let mut bridge = test_bridge();
        bridge.init_encoded(KEY, AUTHORITY, 4).unwrap();
        assert_eq!(
            bridge.write_encoded(&KEY, &AUTHORITY, 2, &[0, 0, 0]),
            Err(BridgeError::DataOverflow)
        );
        assert_eq!(
            bridge.write_encoded(&KEY, &AUTHORITY, usize::MAX, &[0]),
            Err(BridgeError::DataOverflow)
        );
    }

    #[test]
    fn chunks_are_bounded_by_config() {
        let mut bridge = test_bridge();
        bridge.config.max_chunk_size = 4;
        bridge.init_encoded(KEY, AUTHORITY, 100).unwrap();
        assert_eq!(
            bridge.write_encoded(&KEY, &AUTHORITY, 0, &[0; 5]),
            Err(BridgeError::ChunkTooLarge { len: 5, max: 4 })
        );
        assert_eq!(bridge.write_encoded(&KEY, &AUTHORITY, 0, &[0; 4]), Ok(()));
    }

    #[test]
    fn verify_requires_full_coverage() {
        let mut bridge = test_bridge();
        bridge.init_encoded(KEY, AUTHORITY, 10).unwrap();
        bridge.write_encoded(&KEY, &AUTHORITY, 0, &[1; 5]).unwrap();
        assert_eq!(
            bridge.verify_encoded(&KEY, &AUTHORITY, 0, 0),
            Err(BridgeError::IncompleteMessage)
        );
    }

    #[test]
    fn post_requires_verified_status() {
        let mut bridge = test_bridge();
        bridge.init_encoded(KEY, AUTHORITY, 10).unwrap();
        assert_eq!(bridge.post_encoded(&KEY, 0), Err(BridgeError::UnverifiedVaa));
    }

    #[test]
    fn close_reclaims_in_any_state() {
        let mut bridge = test_bridge();
        bridge.init_encoded(KEY, AUTHORITY, 10).unwrap();
        assert_eq!(
            bridge.close_encoded(&KEY, &WriteAuthority([9; 32])),
            Err(BridgeError::WriteAuthorityMismatch)
        );
        bridge.close_encoded(&KEY, &AUTHORITY).unwrap();
        assert!(bridge.record(&KEY).is_none());
        assert_eq!(
            bridge.close_encoded(&KEY, &AUTHORITY),
            Err(BridgeError::RecordNotFound)
        );
    }
}
