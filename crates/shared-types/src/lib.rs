//! # Shared Types Crate
//!
//! This crate contains the domain entities shared by every ledger subsystem
//! and the `ChainClient` port through which they reach the chain.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Addresses, hashes, and transfer events are
//!   defined here and nowhere else.
//! - **Case-Normalized Addresses**: `Address` is 20 raw bytes. Any hex
//!   spelling of the same account parses to the same value.
//! - **Typed Chain Calls**: Reads and writes against the token contract are
//!   enums, not stringly-typed ABI calls.
//!
//! ## Modules
//!
//! - `entities` - `Address`, `Hash`, `TransferEvent`, `U256`
//! - `chain` - `ChainClient` port and its request/response types
//! - `errors` - `ChainError`
//! - `devchain` - In-memory gated-token chain for tests and local runs

pub mod chain;
pub mod devchain;
pub mod entities;
pub mod errors;

pub use chain::*;
pub use devchain::{DevChain, FailurePoint};
pub use entities::*;
pub use errors::*;
