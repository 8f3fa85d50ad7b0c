//! Decoding and dispatch of governance VAAs.
//!
//! Governance instructions ride the same verification pipeline as every
//! other message, including replay protection; the only extra requirements
//! are the fixed governance emitter and verification against the *current*
//! guardian set. Each action performs exactly one privileged state change.
//! Changes that live outside this core (code upgrades, fund movement) are
//! returned as effects for the host to enact.

use causeway_vaas::{
    byte_utils::get_string_from_32,
    governance::{Action, GovernancePacket, CORE_MODULE},
    Address, Body, GuardianAddress, VaaError,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{error::BridgeError, Bridge};

/// Outcome of finalizing a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Posted {
    /// An application message; the payload is handed to the consumer.
    Application(Body),
    /// A governance instruction that was dispatched.
    Governance(GovernanceEffect),
}

/// The privileged state change a governance VAA caused, including the parts
/// the host must carry out itself.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum GovernanceEffect {
    /// The host must migrate to the named contract.
    ContractUpgraded { new_contract: Address },
    GuardianSetRotated { old_index: u32, new_index: u32 },
    MessageFeeSet { amount: u128 },
    /// The host must pay `amount` of collected fees to `recipient`.
    FeesTransferred { recipient: Address, amount: u128 },
    ChainRegistered { chain: u16, emitter_address: Address },
}

impl Bridge {
    /// Routes a verified governance body to its action handler.
    /// `set_index_used` is the guardian set the enclosing VAA was verified
    /// against.
    pub(crate) fn dispatch_governance(
        &mut self,
        set_index_used: u32,
        body: &Body,
        now: u32,
    ) -> Result<GovernanceEffect, BridgeError> {
        if !body.is_governance(self.config.governance_chain, &self.config.governance_address) {
            return Err(BridgeError::InvalidGovernanceEmitter);
        }

        // A superseded set within its grace window may still verify
        // application traffic, but must never administer the protocol.
        if set_index_used != self.guardian_sets.current_index() {
            return Err(BridgeError::LatestGuardianSetRequired);
        }

        let packet = GovernancePacket::deserialize(&body.payload)?;
        if get_string_from_32(&packet.module) != CORE_MODULE {
            return Err(BridgeError::InvalidModule);
        }
        if packet.chain != 0 && packet.chain != self.config.chain_id {
            return Err(BridgeError::GovernanceForAnotherChain);
        }

        let action = Action::deserialize(packet.action, &packet.payload).map_err(|e| match e {
            VaaError::InvalidGovernancePacket => {
                BridgeError::InvalidGovernanceAction(packet.action)
            }
            other => BridgeError::MalformedVaa(other),
        })?;

        match action {
            Action::ContractUpgrade { new_contract } => {
                info!(%new_contract, "contract upgrade authorized");
                Ok(GovernanceEffect::ContractUpgraded { new_contract })
            }
            Action::GuardianSetUpdate { new_index, keys } => {
                self.update_guardian_set(new_index, keys, now)
            }
            Action::SetMessageFee { amount } => {
                self.config.fee = amount;
                info!(amount, "message fee changed");
                Ok(GovernanceEffect::MessageFeeSet { amount })
            }
            Action::TransferFees { recipient, amount } => {
                info!(%recipient, amount, "fee transfer authorized");
                Ok(GovernanceEffect::FeesTransferred { recipient, amount })
            }
            Action::RegisterChain {
                chain,
                emitter_address,
            } => self.register_chain(chain, emitter_address),
        }
    }

    fn update_guardian_set(
        &mut self,
        new_index: u32,
        keys: Vec<GuardianAddress>,
        now: u32,
    ) -> Result<GovernanceEffect, BridgeError> {
        let old_index = self.guardian_sets.current_index();
        self.guardian_sets
            .rotate(new_index, keys, now, self.config.guardian_set_expirity)?;
        Ok(GovernanceEffect::GuardianSetRotated {
            old_index,
            new_index,
        })
    }

    fn register_chain(
        &mut self,
        chain: u16,
        emitter_address: Address,
    ) -> Result<GovernanceEffect, BridgeError> {
        if self.registered_emitters.contains_key(&chain) {
            return Err(BridgeError::ChainAlreadyRegistered(chain));
        }
        let _ = self.registered_emitters.insert(chain, emitter_address);
        info!(chain, %emitter_address, "foreign chain registered");
        Ok(GovernanceEffect::ChainRegistered {
            chain,
            emitter_address,
        })
    }
}
