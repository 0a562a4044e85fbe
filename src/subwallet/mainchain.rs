//! ELA main chain sub wallet
//!
//! Adds deposits to side chains, votes and the governance transactions to
//! the shared UTXO operations. Governance payloads follow one pattern: a
//! `*_digest` call returns what the signer must sign, the caller fills the
//! signature fields, and a `create_*` call wraps the finished payload in a
//! transaction.

use super::utxo::UtxoCore;
use super::{parse_digest, SubWallet};
use crate::blockchain::elastos::address;
use crate::blockchain::elastos::builder::TxBuilder;
use crate::blockchain::elastos::payload::cr::{CRCouncilMemberClaimNode, CRInfo, UnregisterCR, CR_INFO_DID_VERSION};
use crate::blockchain::elastos::payload::cross_chain::{
    locked_amount, CrossChainOutput, TransferCrossChainAsset, DEPOSIT_VERSION_OUTPUT, DEPOSIT_VERSION_PAYLOAD,
};
use crate::blockchain::elastos::payload::producer::{ProcessProducerInfo, ProducerInfo};
use crate::blockchain::elastos::payload::proposal::{proposal_type, CRCProposal};
use crate::blockchain::elastos::payload::review::CRCProposalReview;
use crate::blockchain::elastos::payload::tracking::CRCProposalTracking;
use crate::blockchain::elastos::payload::vote::VoteOutput;
use crate::blockchain::elastos::payload::withdraw::CRCProposalWithdraw;
use crate::blockchain::elastos::payload::{output_type, parse_amount, parse_public_key_field, tx_type, PayloadBytes};
use crate::blockchain::elastos::transaction::TxOutput;
use crate::blockchain::elastos::utxo::parse_inputs;
use crate::blockchain::elastos::{signing, Transaction};
use crate::core::chain::ChainId;
use crate::core::derivation::KeyPurpose;
use crate::core::errors::{Result, WalletError};
use crate::core::key_ring::KeyLocation;
use crate::core::master_wallet::MasterWallet;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Kinds of CRC proposal, each with its own owner and council digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalFamily {
    /// Normal and ELIP proposals.
    Normal,
    SecretaryGeneralElection,
    ChangeOwner,
    Terminate,
    ReserveCustomId,
    ReceiveCustomId,
    ChangeCustomIdFee,
}

impl ProposalFamily {
    fn accepts(self, kind: u16) -> bool {
        use proposal_type::*;
        match self {
            ProposalFamily::Normal => kind == NORMAL || kind == ELIP,
            ProposalFamily::SecretaryGeneralElection => kind == SECRETARY_GENERAL,
            ProposalFamily::ChangeOwner => kind == CHANGE_OWNER,
            ProposalFamily::Terminate => kind == CLOSE,
            ProposalFamily::ReserveCustomId => kind == RESERVE_CUSTOM_ID,
            ProposalFamily::ReceiveCustomId => kind == RECEIVE_CUSTOM_ID,
            ProposalFamily::ChangeCustomIdFee => kind == CHANGE_CUSTOM_ID_FEE,
        }
    }

    fn parse(self, payload: &Value) -> Result<CRCProposal> {
        let proposal = CRCProposal::from_json(payload)?;
        if !self.accepts(proposal.proposal_type) {
            return Err(WalletError::validation(format!(
                "proposal type {:#06x} is not a {:?} proposal",
                proposal.proposal_type, self
            )));
        }
        Ok(proposal)
    }
}

fn from_payload<T: serde::de::DeserializeOwned>(payload: &Value) -> Result<T> {
    Ok(serde_json::from_value(payload.clone())?)
}

fn with_digest<T: Serialize>(payload: &T, digest: String) -> Result<Value> {
    let mut value = serde_json::to_value(payload)?;
    if let Value::Object(map) = &mut value {
        map.insert("Digest".to_string(), Value::String(digest));
    }
    Ok(value)
}

#[derive(Debug, Clone)]
pub struct MainchainSubWallet {
    utxo: UtxoCore,
}

impl MainchainSubWallet {
    pub fn new(wallet: Arc<MasterWallet>) -> Self {
        Self { utxo: UtxoCore::new(wallet, ChainId::Ela) }
    }

    fn wallet(&self) -> &Arc<MasterWallet> {
        self.utxo.wallet()
    }

    // deposits and votes

    /// Moves `amount` to a side chain by locking it, plus the cross chain
    /// fee, at `lock_address`. Version 0 names the target in the
    /// transaction payload, version 1 in the lock output's payload.
    #[allow(clippy::too_many_arguments)]
    pub fn create_deposit_transaction(
        &self,
        version: u8,
        inputs: &Value,
        side_chain_id: &str,
        amount: &str,
        side_chain_address: &str,
        lock_address: &str,
        fee: &str,
        memo: &str,
    ) -> Result<Value> {
        if side_chain_id.is_empty() || side_chain_address.is_empty() {
            return Err(WalletError::validation("side chain id and address are required"));
        }
        let (amount, locked) = locked_amount(amount)?;
        let lock = UtxoCore::program_hash(lock_address)?;
        let builder = match version {
            DEPOSIT_VERSION_PAYLOAD => {
                let payload = TransferCrossChainAsset::single(side_chain_address, amount).to_payload();
                self.utxo.builder(payload, inputs, fee, memo)?.output(TxOutput::ela(lock, locked)?)
            }
            DEPOSIT_VERSION_OUTPUT => {
                let payload = PayloadBytes::new(tx_type::TRANSFER_CROSS_CHAIN_ASSET, DEPOSIT_VERSION_OUTPUT, Vec::new());
                let target = CrossChainOutput {
                    target_address: side_chain_address.to_string(),
                    target_amount: amount,
                    target_data: Vec::new(),
                };
                let output = TxOutput::ela(lock, locked)?.with_payload(output_type::CROSS_CHAIN, target.serialize());
                self.utxo.builder(payload, inputs, fee, memo)?.output(output)
            }
            other => return Err(WalletError::validation(format!("unknown deposit version {}", other))),
        };
        self.utxo.finish(builder)
    }

    /// Spends every input, minus the fee, into one output back to the first
    /// input address carrying `vote_contents`.
    pub fn create_vote_transaction(&self, inputs: &Value, vote_contents: &Value, fee: &str, memo: &str) -> Result<Value> {
        let votes = VoteOutput::from_json(vote_contents)?;
        let builder = self.utxo.builder(PayloadBytes::empty(tx_type::TRANSFER_ASSET), inputs, fee, memo)?;
        let amount = builder.spendable()?;
        if votes.max_vote()? > amount {
            return Err(WalletError::InsufficientFundsError(format!(
                "votes need {} but inputs cover {}",
                votes.max_vote()?,
                amount
            )));
        }
        let voter = parse_inputs(inputs)?
            .first()
            .map(|i| i.address.clone())
            .ok_or_else(|| WalletError::validation("inputs are empty"))?;
        let output = TxOutput::ela(UtxoCore::program_hash(&voter)?, amount)?
            .with_payload(output_type::VOTE, votes.serialize(amount)?);
        self.utxo.finish(builder.output(output))
    }

    // producer

    pub fn get_owner_public_key(&self) -> Result<String> {
        self.wallet().ensure_live()?;
        Ok(hex::encode(self.wallet().keys().owner_public_key()?))
    }

    pub fn get_owner_address(&self) -> Result<String> {
        self.wallet().ensure_live()?;
        Ok(address::standard_address(&self.wallet().keys().owner_public_key()?))
    }

    pub fn get_owner_deposit_address(&self) -> Result<String> {
        self.wallet().ensure_live()?;
        Ok(address::deposit_address(&self.wallet().keys().owner_public_key()?))
    }

    fn owner_location(&self, owner_public_key: &str) -> Result<KeyLocation> {
        let owner = parse_public_key_field("OwnerPublicKey", owner_public_key)?;
        if owner != self.wallet().keys().owner_public_key()? {
            return Err(WalletError::validation("owner public key does not belong to this wallet"));
        }
        Ok(KeyLocation { purpose: KeyPurpose::Owner, tail: Vec::new() })
    }

    /// Producer info signed with the owner key.
    #[allow(clippy::too_many_arguments)]
    pub fn generate_producer_payload(
        &self,
        owner_public_key: &str,
        node_public_key: &str,
        nick_name: &str,
        url: &str,
        net_address: &str,
        location: u64,
        pay_password: &str,
    ) -> Result<Value> {
        let owner = self.owner_location(owner_public_key)?;
        let mut info = ProducerInfo {
            owner_public_key: owner_public_key.to_lowercase(),
            node_public_key: node_public_key.to_lowercase(),
            nick_name: nick_name.to_string(),
            url: url.to_string(),
            location,
            net_address: net_address.to_string(),
            signature: String::new(),
        };
        let digest = parse_digest(&info.digest()?)?;
        info.signature = hex::encode(self.wallet().sign_prehash(&owner, &digest, pay_password)?);
        Ok(serde_json::to_value(info)?)
    }

    pub fn generate_cancel_producer_payload(&self, owner_public_key: &str, pay_password: &str) -> Result<Value> {
        let owner = self.owner_location(owner_public_key)?;
        let mut info = ProcessProducerInfo {
            owner_public_key: owner_public_key.to_lowercase(),
            signature: String::new(),
        };
        let digest = parse_digest(&info.digest()?)?;
        info.signature = hex::encode(self.wallet().sign_prehash(&owner, &digest, pay_password)?);
        Ok(serde_json::to_value(info)?)
    }

    /// Registers a producer, locking `amount` at the owner deposit address.
    pub fn create_register_producer_transaction(
        &self,
        inputs: &Value,
        payload: &Value,
        amount: &str,
        fee: &str,
        memo: &str,
    ) -> Result<Value> {
        let info: ProducerInfo = from_payload(payload)?;
        let owner = parse_public_key_field("OwnerPublicKey", &info.owner_public_key)?;
        let payload = PayloadBytes::new(tx_type::REGISTER_PRODUCER, 0, info.serialize()?);
        let builder = self
            .utxo
            .builder(payload, inputs, fee, memo)?
            .pay_to(&address::deposit_address(&owner), parse_amount("Amount", amount)?)?;
        self.utxo.finish(builder)
    }

    pub fn create_update_producer_transaction(&self, inputs: &Value, payload: &Value, fee: &str, memo: &str) -> Result<Value> {
        let info: ProducerInfo = from_payload(payload)?;
        let payload = PayloadBytes::new(tx_type::UPDATE_PRODUCER, 0, info.serialize()?);
        self.utxo.finish(self.utxo.builder(payload, inputs, fee, memo)?)
    }

    pub fn create_cancel_producer_transaction(&self, inputs: &Value, payload: &Value, fee: &str, memo: &str) -> Result<Value> {
        let info: ProcessProducerInfo = from_payload(payload)?;
        let payload = PayloadBytes::new(tx_type::CANCEL_PRODUCER, 0, info.serialize()?);
        self.utxo.finish(self.utxo.builder(payload, inputs, fee, memo)?)
    }

    /// Returns a deposit to the address it was paid from: the owner address
    /// for producer deposits, the CR address for CR deposits.
    fn retrieve_deposit(&self, kind: u8, inputs: &Value, amount: &str, fee: &str, memo: &str, to: &str) -> Result<Value> {
        let builder: TxBuilder = self
            .utxo
            .builder(PayloadBytes::empty(kind), inputs, fee, memo)?
            .pay_to(to, parse_amount("Amount", amount)?)?
            .change_to(to);
        self.utxo.finish(builder)
    }

    pub fn create_retrieve_deposit_transaction(&self, inputs: &Value, amount: &str, fee: &str, memo: &str) -> Result<Value> {
        let to = self.get_owner_address()?;
        self.retrieve_deposit(tx_type::RETURN_DEPOSIT_COIN, inputs, amount, fee, memo, &to)
    }

    // CR

    pub fn get_cr_public_key(&self) -> Result<String> {
        self.wallet().ensure_live()?;
        Ok(hex::encode(self.wallet().keys().cr_public_key()?))
    }

    pub fn get_cr_deposit_address(&self) -> Result<String> {
        self.wallet().ensure_live()?;
        Ok(address::deposit_address(&self.wallet().keys().cr_public_key()?))
    }

    /// Unsigned CR info with its `Digest`. The CR key signs the digest and
    /// the caller stores the result in `Signature`.
    pub fn generate_cr_info_payload(&self, cr_public_key: &str, nick_name: &str, url: &str, location: u64) -> Result<Value> {
        let pk = parse_public_key_field("CRPublicKey", cr_public_key)?;
        let info = CRInfo::new(&pk, nick_name, url, location);
        let digest = info.digest()?;
        with_digest(&info, digest)
    }

    pub fn generate_unregister_cr_payload(&self, cid: &str) -> Result<Value> {
        let payload = UnregisterCR { cid: cid.to_string(), signature: String::new() };
        let digest = payload.digest()?;
        with_digest(&payload, digest)
    }

    /// Registers a CR candidate, locking `amount` at its deposit address.
    pub fn create_register_cr_transaction(&self, inputs: &Value, payload: &Value, amount: &str, fee: &str, memo: &str) -> Result<Value> {
        let info: CRInfo = from_payload(payload)?;
        let deposit = address::deposit_address(&info.public_key()?);
        let payload = PayloadBytes::new(tx_type::REGISTER_CR, CR_INFO_DID_VERSION, info.serialize()?);
        let builder = self
            .utxo
            .builder(payload, inputs, fee, memo)?
            .pay_to(&deposit, parse_amount("Amount", amount)?)?;
        self.utxo.finish(builder)
    }

    pub fn create_update_cr_transaction(&self, inputs: &Value, payload: &Value, fee: &str, memo: &str) -> Result<Value> {
        let info: CRInfo = from_payload(payload)?;
        let payload = PayloadBytes::new(tx_type::UPDATE_CR, CR_INFO_DID_VERSION, info.serialize()?);
        self.utxo.finish(self.utxo.builder(payload, inputs, fee, memo)?)
    }

    pub fn create_unregister_cr_transaction(&self, inputs: &Value, payload: &Value, fee: &str, memo: &str) -> Result<Value> {
        let info: UnregisterCR = from_payload(payload)?;
        let payload = PayloadBytes::new(tx_type::UNREGISTER_CR, 0, info.serialize()?);
        self.utxo.finish(self.utxo.builder(payload, inputs, fee, memo)?)
    }

    pub fn create_retrieve_cr_deposit_transaction(&self, inputs: &Value, amount: &str, fee: &str, memo: &str) -> Result<Value> {
        let to = address::standard_address(&self.wallet().keys().cr_public_key()?);
        self.retrieve_deposit(tx_type::RETURN_CR_DEPOSIT_COIN, inputs, amount, fee, memo, &to)
    }

    pub fn cr_council_member_claim_node_digest(&self, payload: &Value) -> Result<String> {
        from_payload::<CRCouncilMemberClaimNode>(payload)?.digest()
    }

    pub fn create_cr_council_member_claim_node_transaction(&self, inputs: &Value, payload: &Value, fee: &str, memo: &str) -> Result<Value> {
        let claim: CRCouncilMemberClaimNode = from_payload(payload)?;
        let payload = PayloadBytes::new(tx_type::CR_COUNCIL_MEMBER_CLAIM_NODE, 0, claim.serialize()?);
        self.utxo.finish(self.utxo.builder(payload, inputs, fee, memo)?)
    }

    // proposals

    /// What the owner side signs: the owner, plus the secretary general or
    /// the new owner where the kind has one.
    pub fn proposal_owner_digest(&self, family: ProposalFamily, payload: &Value) -> Result<String> {
        family.parse(payload)?.owner_digest()
    }

    /// What the sponsoring council member signs, once the owner side
    /// signatures and `CRCouncilMemberDID` are in the payload.
    pub fn proposal_council_member_digest(&self, family: ProposalFamily, payload: &Value) -> Result<String> {
        family.parse(payload)?.council_digest()
    }

    pub fn calculate_proposal_hash(&self, payload: &Value) -> Result<String> {
        CRCProposal::from_json(payload)?.proposal_hash()
    }

    pub fn create_proposal_transaction(&self, family: ProposalFamily, inputs: &Value, payload: &Value, fee: &str, memo: &str) -> Result<Value> {
        let payload = family.parse(payload)?.to_payload()?;
        self.utxo.finish(self.utxo.builder(payload, inputs, fee, memo)?)
    }

    pub fn proposal_review_digest(&self, payload: &Value) -> Result<String> {
        from_payload::<CRCProposalReview>(payload)?.digest()
    }

    pub fn create_proposal_review_transaction(&self, inputs: &Value, payload: &Value, fee: &str, memo: &str) -> Result<Value> {
        let payload = from_payload::<CRCProposalReview>(payload)?.to_payload()?;
        self.utxo.finish(self.utxo.builder(payload, inputs, fee, memo)?)
    }

    pub fn proposal_tracking_owner_digest(&self, payload: &Value) -> Result<String> {
        from_payload::<CRCProposalTracking>(payload)?.owner_digest()
    }

    pub fn proposal_tracking_new_owner_digest(&self, payload: &Value) -> Result<String> {
        from_payload::<CRCProposalTracking>(payload)?.new_owner_digest()
    }

    pub fn proposal_tracking_secretary_digest(&self, payload: &Value) -> Result<String> {
        from_payload::<CRCProposalTracking>(payload)?.secretary_general_digest()
    }

    pub fn create_proposal_tracking_transaction(&self, inputs: &Value, payload: &Value, fee: &str, memo: &str) -> Result<Value> {
        let payload = from_payload::<CRCProposalTracking>(payload)?.to_payload()?;
        self.utxo.finish(self.utxo.builder(payload, inputs, fee, memo)?)
    }

    pub fn proposal_withdraw_digest(&self, payload: &Value) -> Result<String> {
        from_payload::<CRCProposalWithdraw>(payload)?.digest()
    }

    /// Pays the recipient from the CRC expense address. The inputs belong to
    /// that address, so the transaction carries no programs; the owner's
    /// payload signature authorizes it.
    pub fn create_proposal_withdraw_transaction(&self, inputs: &Value, payload: &Value, fee: &str, memo: &str) -> Result<Value> {
        let withdraw: CRCProposalWithdraw = from_payload(payload)?;
        let amount = parse_amount("Amount", &withdraw.amount)?;
        let builder = self
            .utxo
            .builder(withdraw.to_payload()?, inputs, fee, memo)?
            .pay_to(&withdraw.recipient, amount)?;
        self.utxo.finish_unowned(builder)
    }
}

impl SubWallet for MainchainSubWallet {
    fn chain_id(&self) -> ChainId {
        ChainId::Ela
    }

    fn master_wallet(&self) -> &Arc<MasterWallet> {
        self.utxo.wallet()
    }

    fn address_at(&self, index: u32, internal: bool) -> Result<String> {
        self.utxo.address_at(index, internal)
    }

    fn public_key_at(&self, index: u32, internal: bool) -> Result<String> {
        self.utxo.public_key_at(index, internal)
    }

    fn is_address_valid(&self, address: &str) -> bool {
        self.utxo.is_address_valid(address)
    }

    fn create_transaction(&self, inputs: &Value, outputs: &Value, fee: &str, memo: &str) -> Result<Value> {
        self.utxo.create_transaction(inputs, outputs, fee, memo)
    }

    fn sign_transaction(&self, tx: &Value, pay_password: &str) -> Result<Value> {
        self.utxo.sign_transaction(tx, pay_password)
    }

    fn get_transaction_signed_info(&self, tx: &Value) -> Result<Value> {
        self.utxo.signed_info(tx)
    }

    fn convert_to_raw_transaction(&self, tx: &Value) -> Result<String> {
        let parsed: Transaction = self.utxo.parse(tx)?;
        if parsed.tx_type == tx_type::CRC_PROPOSAL_WITHDRAW && parsed.programs.is_empty() {
            return Ok(hex::encode(parsed.raw()?));
        }
        signing::convert_to_raw(&parsed)
    }

    fn sign_digest(&self, address: &str, digest: &str, pay_password: &str) -> Result<String> {
        self.utxo.sign_digest(address, digest, pay_password)
    }

    fn as_mainchain(&self) -> Result<&MainchainSubWallet> {
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proposal_family_gate() {
        assert!(ProposalFamily::Normal.accepts(proposal_type::ELIP));
        assert!(!ProposalFamily::Normal.accepts(proposal_type::CLOSE));
        assert!(ProposalFamily::ChangeCustomIdFee.accepts(proposal_type::CHANGE_CUSTOM_ID_FEE));
    }

    #[test]
    fn test_with_digest_adds_field() {
        let payload = UnregisterCR { cid: "iX".into(), signature: String::new() };
        let value = with_digest(&payload, "00".into()).unwrap();
        assert_eq!(value["Digest"], "00");
        assert_eq!(value["CID"], "iX");
    }
}
