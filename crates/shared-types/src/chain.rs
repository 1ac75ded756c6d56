//! # Chain Client Port
//!
//! The outbound interface every subsystem uses to reach the chain.
//!
//! Production: a JSON-RPC client (not part of this workspace).
//! Testing and local runs: [`crate::devchain::DevChain`].
//!
//! All calls are suspension points. The ledger never imposes its own
//! deadline; a stuck call stalls the caller until the client resolves or
//! errors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::entities::{Address, Hash, RawLog, U256};
use crate::errors::ChainError;

/// View functions of the gated token contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractRead {
    BalanceOf(Address),
    TotalSupply,
    Name,
    Symbol,
    Paused,
}

impl ContractRead {
    pub fn function_name(&self) -> &'static str {
        match self {
            Self::BalanceOf(_) => "balanceOf",
            Self::TotalSupply => "totalSupply",
            Self::Name => "name",
            Self::Symbol => "symbol",
            Self::Paused => "paused",
        }
    }
}

/// A typed value returned by a contract read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadValue {
    Uint(U256),
    Text(String),
    Bool(bool),
}

impl ReadValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Uint(_) => "uint256",
            Self::Text(_) => "string",
            Self::Bool(_) => "bool",
        }
    }

    pub fn into_uint(self) -> Result<U256, ChainError> {
        match self {
            Self::Uint(v) => Ok(v),
            other => Err(ChainError::UnexpectedValue {
                expected: "uint256",
                actual: other.kind(),
            }),
        }
    }

    pub fn into_text(self) -> Result<String, ChainError> {
        match self {
            Self::Text(v) => Ok(v),
            other => Err(ChainError::UnexpectedValue {
                expected: "string",
                actual: other.kind(),
            }),
        }
    }

    pub fn into_bool(self) -> Result<bool, ChainError> {
        match self {
            Self::Bool(v) => Ok(v),
            other => Err(ChainError::UnexpectedValue {
                expected: "bool",
                actual: other.kind(),
            }),
        }
    }
}

/// State-changing functions of the gated token contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractCall {
    Pause,
    Unpause,
    SetAllowlistStatus { wallet: Address, approved: bool },
    Mint { to: Address, amount: U256 },
}

impl ContractCall {
    pub fn function_name(&self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Unpause => "unpause",
            Self::SetAllowlistStatus { .. } => "setAllowlistStatus",
            Self::Mint { .. } => "mint",
        }
    }
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: Hash,
    pub block: u64,
    pub success: bool,
    /// Set only for contract deployments.
    pub created_address: Option<Address>,
}

/// Compiled contract artifact used for deployments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractArtifact {
    pub abi: serde_json::Value,
    /// `0x`-prefixed creation bytecode.
    pub bytecode: String,
}

/// Constructor arguments of the gated token: `(name, symbol, admin)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenConstructor {
    pub name: String,
    pub symbol: String,
    pub admin: Address,
}

/// Outbound port to the chain.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Latest block height known to the node.
    async fn get_chain_head(&self) -> Result<u64, ChainError>;

    /// Logs emitted by `address` matching `event_signature` (topic0) in the
    /// inclusive range, ordered by `(block, log_index)`.
    async fn get_logs(
        &self,
        address: Address,
        event_signature: Hash,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<RawLog>, ChainError>;

    /// Call a view function, optionally at a historical block.
    async fn read_contract(
        &self,
        address: Address,
        call: ContractRead,
        at_block: Option<u64>,
    ) -> Result<ReadValue, ChainError>;

    /// Submit a state-changing transaction. Returns its hash.
    async fn submit_transaction(
        &self,
        address: Address,
        call: ContractCall,
    ) -> Result<Hash, ChainError>;

    /// Wait until the transaction is mined.
    async fn wait_for_receipt(&self, tx_hash: Hash) -> Result<TransactionReceipt, ChainError>;

    /// Deploy a new contract instance and wait for its receipt.
    async fn deploy_contract(
        &self,
        artifact: &ContractArtifact,
        constructor: TokenConstructor,
    ) -> Result<TransactionReceipt, ChainError>;
}
