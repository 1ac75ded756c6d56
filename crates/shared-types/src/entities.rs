//! # Core Domain Entities
//!
//! Defines the ledger entities observed on chain.
//!
//! ## Clusters
//!
//! - **Identity**: `Address`, `Hash`
//! - **Events**: `TransferEvent`, `EventSequence`, `RawLog`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// Re-export U256 from primitive-types for use across all subsystems
pub use primitive_types::U256;

/// A 32-byte hash (transaction hash, event topic).
pub type Hash = [u8; 32];

/// Keccak-256 of `Transfer(address,address,uint256)`.
///
/// This is `topic0` of every ERC-20 Transfer log.
pub const TRANSFER_TOPIC: Hash = [
    0xdd, 0xf2, 0x52, 0xad, 0x1b, 0xe2, 0xc8, 0x9b, 0x69, 0xc2, 0xb0, 0x68, 0xfc, 0x37, 0x8d, 0xaa,
    0x95, 0x2b, 0xa7, 0xf1, 0x63, 0xc4, 0xa1, 0x16, 0x28, 0xf5, 0x5a, 0x4d, 0xf5, 0x23, 0xb3, 0xef,
];

/// Human-readable signature matching [`TRANSFER_TOPIC`].
pub const TRANSFER_EVENT_SIGNATURE: &str = "Transfer(address,address,uint256)";

/// A 20-byte Ethereum-style address.
///
/// Parsing is case-insensitive, so `0xAbC...` and `0xabc...` are the same
/// address and always collapse to one ledger entry. `Display` renders
/// lowercase `0x`-prefixed hex. Ordering is byte order, which equals the
/// lexicographic order of the lowercase rendering.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address: mint source and burn sink. Never holds a balance.
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

/// Errors from parsing an address string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    #[error("address must be 40 hex characters, got {0}")]
    InvalidLength(usize),

    #[error("address contains non-hex characters")]
    InvalidHex,
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != 40 {
            return Err(AddressParseError::InvalidLength(digits.len()));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| AddressParseError::InvalidHex)?;
        Ok(Address(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

/// Render a 32-byte hash as `0x`-prefixed lowercase hex.
pub fn hash_to_hex(hash: &Hash) -> String {
    format!("0x{}", hex::encode(hash))
}

/// Parse a `0x`-prefixed (or bare) 64-digit hex string into a hash.
pub fn hash_from_hex(s: &str) -> Option<Hash> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let mut out = [0u8; 32];
    hex::decode_to_slice(digits, &mut out).ok()?;
    Some(out)
}

/// Position of an event in the chain's total order.
///
/// Ordering is `(block asc, log_index asc)`, which is the derived ordering
/// because `block` is declared first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventSequence {
    pub block: u64,
    pub log_index: u64,
}

impl EventSequence {
    pub fn new(block: u64, log_index: u64) -> Self {
        Self { block, log_index }
    }
}

impl fmt::Display for EventSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block, self.log_index)
    }
}

/// A log as returned by the chain client's `get_logs`.
///
/// `from`/`to`/`value` are already decoded from the indexed topics and data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub block: u64,
    pub log_index: u64,
    pub transaction_hash: Hash,
    pub topic0: Hash,
    pub data: Vec<u8>,
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

/// An observed ERC-20 Transfer event. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    pub block: u64,
    pub log_index: u64,
    pub transaction_hash: Hash,
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub topic: Hash,
    pub raw_data: Vec<u8>,
}

impl TransferEvent {
    pub fn sequence(&self) -> EventSequence {
        EventSequence::new(self.block, self.log_index)
    }

    /// True when the event creates supply (sent from the zero address).
    pub fn is_mint(&self) -> bool {
        self.from.is_zero()
    }

    /// True when the event destroys supply (sent to the zero address).
    pub fn is_burn(&self) -> bool {
        self.to.is_zero()
    }
}

impl From<RawLog> for TransferEvent {
    fn from(log: RawLog) -> Self {
        Self {
            block: log.block,
            log_index: log.log_index,
            transaction_hash: log.transaction_hash,
            from: log.from,
            to: log.to,
            value: log.value,
            topic: log.topic0,
            raw_data: log.data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parse_is_case_insensitive() {
        let lower: Address = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8".parse().unwrap();
        let mixed: Address = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse().unwrap();
        assert_eq!(lower, mixed);
        assert_eq!(
            mixed.to_string(),
            "0x70997970c51812dc3a010c7d01b50e0d17dc79c8"
        );
    }

    #[test]
    fn test_address_parse_rejects_bad_input() {
        assert_eq!(
            "0x1234".parse::<Address>(),
            Err(AddressParseError::InvalidLength(4))
        );
        assert_eq!(
            "0xzz997970c51812dc3a010c7d01b50e0d17dc79c8".parse::<Address>(),
            Err(AddressParseError::InvalidHex)
        );
    }

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address([1; 20]).is_zero());
    }

    #[test]
    fn test_event_sequence_order() {
        let a = EventSequence::new(10, 5);
        let b = EventSequence::new(11, 0);
        let c = EventSequence::new(11, 1);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_address_serde_uses_hex_string() {
        let addr = Address([0xAB; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "ab".repeat(20)));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_hash_hex_helpers() {
        let hex = hash_to_hex(&TRANSFER_TOPIC);
        assert!(hex.starts_with("0xddf252ad"));
        assert_eq!(hash_from_hex(&hex), Some(TRANSFER_TOPIC));
        assert_eq!(hash_from_hex("0x12"), None);
    }
}
