//! Vote output payload (output type 0x01)
//!
//! A vote is an ordinary transfer whose single output back to the voter
//! carries the vote contents. Every candidate's vote weight is bounded by the
//! value of that output.

use super::{parse_amount, parse_hash, parse_public_key_field};
use crate::blockchain::elastos::address::ProgramHash;
use crate::blockchain::elastos::codec::ByteWriter;
use crate::core::errors::{Result, WalletError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const VOTE_OUTPUT_VERSION: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteType {
    Delegate,
    CRC,
    CRCProposal,
    CRCImpeachment,
}

impl VoteType {
    pub fn as_byte(self) -> u8 {
        match self {
            VoteType::Delegate => 0x00,
            VoteType::CRC => 0x01,
            VoteType::CRCProposal => 0x02,
            VoteType::CRCImpeachment => 0x03,
        }
    }

    /// Wire form of a candidate identifier.
    fn candidate_bytes(self, candidate: &str) -> Result<Vec<u8>> {
        match self {
            VoteType::Delegate => Ok(parse_public_key_field("Candidate", candidate)?.to_vec()),
            VoteType::CRC | VoteType::CRCImpeachment => {
                let cid = ProgramHash::from_address(candidate)
                    .map_err(|_| WalletError::validation(format!("invalid CR candidate {}", candidate)))?;
                Ok(cid.as_bytes().to_vec())
            }
            VoteType::CRCProposal => Ok(parse_hash("Candidate", candidate)?.to_vec()),
        }
    }
}

/// One vote type with candidates mapped to their vote amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VoteContent {
    #[serde(rename = "Type")]
    pub vote_type: VoteType,
    pub candidates: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteOutput {
    pub contents: Vec<VoteContent>,
}

impl VoteOutput {
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let contents: Vec<VoteContent> = serde_json::from_value(value.clone())?;
        if contents.is_empty() {
            return Err(WalletError::validation("vote contents are empty"));
        }
        let mut seen = Vec::with_capacity(contents.len());
        for content in &contents {
            if seen.contains(&content.vote_type) {
                return Err(WalletError::validation(format!("duplicate vote type {:?}", content.vote_type)));
            }
            if content.candidates.is_empty() {
                return Err(WalletError::validation(format!("no candidates for {:?}", content.vote_type)));
            }
            seen.push(content.vote_type);
        }
        Ok(Self { contents })
    }

    /// Largest single vote, which the voting output must cover.
    pub fn max_vote(&self) -> Result<i64> {
        let mut max = 0;
        for content in &self.contents {
            for amount in content.candidates.values() {
                max = max.max(parse_amount("Votes", amount)?);
            }
        }
        Ok(max)
    }

    pub fn serialize(&self, output_amount: i64) -> Result<Vec<u8>> {
        let mut w = ByteWriter::new();
        w.u8(VOTE_OUTPUT_VERSION).varint(self.contents.len() as u64);
        for content in &self.contents {
            w.u8(content.vote_type.as_byte()).varint(content.candidates.len() as u64);
            for (candidate, amount) in &content.candidates {
                let votes = parse_amount("Votes", amount)?;
                if votes > output_amount {
                    return Err(WalletError::validation(format!(
                        "vote {} for {} exceeds the voting amount {}",
                        votes, candidate, output_amount
                    )));
                }
                w.var_bytes(&content.vote_type.candidate_bytes(candidate)?).i64(votes);
            }
        }
        Ok(w.into_bytes())
    }
}
