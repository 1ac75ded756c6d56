//! # Persisted Records
//!
//! Encodings of the values stored under each key prefix.

use serde::{Deserialize, Serialize};
use shared_types::{hash_from_hex, hash_to_hex, Address, TransferEvent, U256};

use super::errors::StoreError;

/// Names of the ledger meta entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaKey {
    LastProcessedBlock,
    CurrentAuthoritativeAddress,
}

impl MetaKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetaKey::LastProcessedBlock => "last_processed_block",
            MetaKey::CurrentAuthoritativeAddress => "current_authoritative_address",
        }
    }
}

/// In-memory copy of the ledger meta table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerMeta {
    /// `None` until the first batch commits, and again after a cutover.
    pub last_processed_block: Option<u64>,
    pub current_authoritative_address: Option<Address>,
}

/// JSON row stored under `events:<block><log_index>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRow {
    pub block: u64,
    pub log_index: u64,
    pub txhash: String,
    pub from_address: String,
    pub to_address: String,
    /// Decimal, so values above 2^53 survive any JSON reader.
    pub value: String,
    pub topic0: String,
    /// Hex without `0x`.
    pub data: String,
}

impl From<&TransferEvent> for EventRow {
    fn from(event: &TransferEvent) -> Self {
        Self {
            block: event.block,
            log_index: event.log_index,
            txhash: hash_to_hex(&event.transaction_hash),
            from_address: event.from.to_string(),
            to_address: event.to.to_string(),
            value: event.value.to_string(),
            topic0: hash_to_hex(&event.topic),
            data: hex::encode(&event.raw_data),
        }
    }
}

impl EventRow {
    pub fn encode(&self) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(self).map_err(|e| StoreError::Corrupt {
            key: format!("events:{}:{}", self.block, self.log_index),
            reason: e.to_string(),
        })
    }

    pub fn decode(key: &[u8], bytes: &[u8]) -> Result<Self, StoreError> {
        serde_json::from_slice(bytes).map_err(|e| corrupt(key, e.to_string()))
    }

    /// Convert back to the domain event.
    pub fn into_event(self, key: &[u8]) -> Result<TransferEvent, StoreError> {
        let transaction_hash =
            hash_from_hex(&self.txhash).ok_or_else(|| corrupt(key, "bad txhash"))?;
        let topic = hash_from_hex(&self.topic0).ok_or_else(|| corrupt(key, "bad topic0"))?;
        let from = self
            .from_address
            .parse::<Address>()
            .map_err(|e| corrupt(key, e.to_string()))?;
        let to = self
            .to_address
            .parse::<Address>()
            .map_err(|e| corrupt(key, e.to_string()))?;
        let value = U256::from_dec_str(&self.value).map_err(|_| corrupt(key, "bad value"))?;
        let raw_data = hex::decode(&self.data).map_err(|e| corrupt(key, e.to_string()))?;
        Ok(TransferEvent {
            block: self.block,
            log_index: self.log_index,
            transaction_hash,
            from,
            to,
            value,
            topic,
            raw_data,
        })
    }
}

pub fn encode_balance(balance: &U256) -> Vec<u8> {
    balance.to_string().into_bytes()
}

pub fn decode_balance(key: &[u8], bytes: &[u8]) -> Result<U256, StoreError> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| U256::from_dec_str(s).ok())
        .ok_or_else(|| corrupt(key, "balance is not a decimal integer"))
}

pub fn decode_text<'a>(key: &[u8], bytes: &'a [u8]) -> Result<&'a str, StoreError> {
    std::str::from_utf8(bytes).map_err(|e| corrupt(key, e.to_string()))
}

pub(crate) fn corrupt(key: &[u8], reason: impl Into<String>) -> StoreError {
    StoreError::Corrupt {
        key: String::from_utf8_lossy(key).into_owned(),
        reason: reason.into(),
    }
}
