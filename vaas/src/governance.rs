//! Governance packet layout.
//!
//! A governance VAA is an ordinary VAA whose emitter is the fixed governance
//! emitter and whose payload is a `GovernancePacket`: a 32-byte module
//! identifier, a 1-byte action code, a 2-byte target chain (0 = any chain)
//! and an action-specific tail.

use serde::{Deserialize, Serialize};

use crate::{
    byte_utils::{string_to_array, ByteUtils},
    error::VaaError,
    Address, GuardianAddress,
};

/// Module identifier for core-protocol governance actions.
pub const CORE_MODULE: &str = "Core";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GovernancePacket {
    pub module: [u8; 32],
    pub action: u8,
    pub chain: u16,
    pub payload: Vec<u8>,
}

impl GovernancePacket {
    pub fn deserialize(data: &[u8]) -> Result<Self, VaaError> {
        Ok(GovernancePacket {
            module: data.get_const_bytes(0)?,
            action: data.get_u8(32)?,
            chain: data.get_u16(33)?,
            payload: data.get_bytes(35, data.len().saturating_sub(35))?.to_vec(),
        })
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let mut v = Vec::with_capacity(35 + self.payload.len());
        v.extend_from_slice(&self.module);
        v.push(self.action);
        v.extend_from_slice(&self.chain.to_be_bytes());
        v.extend_from_slice(&self.payload);
        v
    }

    /// Packet for a core-module action, addressed to `chain`.
    pub fn core(action: &Action, chain: u16) -> Self {
        GovernancePacket {
            module: string_to_array(CORE_MODULE),
            action: action.code(),
            chain,
            payload: action.payload_to_vec(),
        }
    }
}

/// The closed set of administrative actions a governance VAA may carry. New
/// actions extend this enum; there is no open-ended dispatch.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Action 1: migrate to a new contract, identified however the host
    /// chain identifies code (left-padded to 32 bytes).
    ContractUpgrade { new_contract: Address },
    /// Action 2: install the next guardian set.
    GuardianSetUpdate {
        new_index: u32,
        keys: Vec<GuardianAddress>,
    },
    /// Action 3: change the message fee.
    SetMessageFee { amount: u128 },
    /// Action 4: pay out collected fees.
    TransferFees { recipient: Address, amount: u128 },
    /// Action 5: bind a foreign chain id to its emitter address.
    RegisterChain {
        chain: u16,
        emitter_address: Address,
    },
}

impl Action {
    pub fn code(&self) -> u8 {
        match self {
            Action::ContractUpgrade { .. } => 1,
            Action::GuardianSetUpdate { .. } => 2,
            Action::SetMessageFee { .. } => 3,
            Action::TransferFees { .. } => 4,
            Action::RegisterChain { .. } => 5,
        }
    }

    pub fn deserialize(action: u8, data: &[u8]) -> Result<Self, VaaError> {
        match action {
            // 0   [32]uint8 new_contract
            1 => Ok(Action::ContractUpgrade {
                new_contract: Address(data.get_const_bytes(0)?),
            }),
            // 0   uint32 new_index
            // 4   uint8 len(keys)
            // 5   [][20]uint8 guardian addresses
            2 => {
                let new_index = data.get_u32(0)?;
                let n_guardians = data.get_u8(4)? as usize;
                let mut keys = Vec::with_capacity(n_guardians);
                for i in 0..n_guardians {
                    keys.push(GuardianAddress(data.get_const_bytes(5 + i * 20)?));
                }
                Ok(Action::GuardianSetUpdate { new_index, keys })
            }
            // 0   uint256 amount
            3 => Ok(Action::SetMessageFee {
                amount: read_u256_as_u128(data, 0)?,
            }),
            // 0   [32]uint8 recipient
            // 32  uint256 amount
            4 => Ok(Action::TransferFees {
                recipient: Address(data.get_const_bytes(0)?),
                amount: read_u256_as_u128(data, 32)?,
            }),
            // 0   uint16 chain
            // 2   [32]uint8 emitter
            5 => Ok(Action::RegisterChain {
                chain: data.get_u16(0)?,
                emitter_address: Address(data.get_const_bytes(2)?),
            }),
            _ => Err(VaaError::InvalidGovernancePacket),
        }
    }

    fn payload_to_vec(&self) -> Vec<u8> {
        let mut v = Vec::new();
        match self {
            Action::ContractUpgrade { new_contract } => {
                v.extend_from_slice(&new_contract.0);
            }
            Action::GuardianSetUpdate { new_index, keys } => {
                v.extend_from_slice(&new_index.to_be_bytes());
                v.push(keys.len() as u8);
                for key in keys {
                    v.extend_from_slice(&key.0);
                }
            }
            Action::SetMessageFee { amount } => {
                v.extend_from_slice(&[0u8; 16]);
                v.extend_from_slice(&amount.to_be_bytes());
            }
            Action::TransferFees { recipient, amount } => {
                v.extend_from_slice(&recipient.0);
                v.extend_from_slice(&[0u8; 16]);
                v.extend_from_slice(&amount.to_be_bytes());
            }
            Action::RegisterChain {
                chain,
                emitter_address,
            } => {
                v.extend_from_slice(&chain.to_be_bytes());
                v.extend_from_slice(&emitter_address.0);
            }
        }
        v
    }
}

/// Amounts are encoded as 256-bit big-endian on the wire; anything above
/// u128 range is rejected rather than truncated.
fn read_u256_as_u128(data: &[u8], index: usize) -> Result<u128, VaaError> {
    let high = data.get_u128_be(index)?;
    if high != 0 {
        return Err(VaaError::InvalidGovernancePacket);
    }
    data.get_u128_be(index + 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(action: Action, chain: u16) -> (GovernancePacket, Action) {
        let packet = GovernancePacket::core(&action, chain);
        let parsed = GovernancePacket::deserialize(&packet.to_vec()).unwrap();
        let decoded = Action::deserialize(parsed.action, &parsed.payload).unwrap();
        (parsed, decoded)
    }

    #[test]
    fn guardian_set_update_round_trip() {
        let action = Action::GuardianSetUpdate {
            new_index: 7,
            keys: vec![GuardianAddress([0xaa; 20]), GuardianAddress([0xbb; 20])],
        };
        let (packet, decoded) = round_trip(action.clone(), 0);
        assert_eq!(packet.action, 2);
        assert_eq!(packet.chain, 0);
        assert_eq!(decoded, action);
    }

    #[test]
    fn fee_actions_round_trip() {
        let (_, decoded) = round_trip(Action::SetMessageFee { amount: 12_500 }, 3);
        assert_eq!(decoded, Action::SetMessageFee { amount: 12_500 });

        let transfer = Action::TransferFees {
            recipient: Address([0x12; 32]),
            amount: u128::MAX,
        };
        let (_, decoded) = round_trip(transfer.clone(), 3);
        assert_eq!(decoded, transfer);
    }

    #[test]
    fn oversized_amount_is_rejected() {
        let mut payload = vec![0xffu8; 32];
        payload[0] = 0x01;
        assert_eq!(
            Action::deserialize(3, &payload),
            Err(VaaError::InvalidGovernancePacket)
        );
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert_eq!(
            Action::deserialize(9, &[]),
            Err(VaaError::InvalidGovernancePacket)
        );
    }

    #[test]
    fn truncated_guardian_list_is_rejected() {
        // Claims two keys, carries one and a half.
        let mut payload = Vec::new();
        payload.extend_from_slice(&1u32.to_be_bytes());
        payload.push(2);
        payload.extend_from_slice(&[0xaa; 30]);
        assert_eq!(
            Action::deserialize(2, &payload),
            Err(VaaError::Truncated)
        );
    }
}
