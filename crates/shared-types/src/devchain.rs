//! # DevChain
//!
//! In-memory emulation of a chain hosting gated ERC-20 token contracts.
//!
//! ## Semantics
//!
//! - Every executed transaction (including deployments) mines exactly one
//!   block; logs inside it are numbered from `log_index = 0`.
//! - `mint` reverts when the token is paused or the recipient is not
//!   allow-listed. Holder transfers additionally require both sides to be
//!   allow-listed.
//! - Balances are versioned per block so `read_contract(.., Some(block))`
//!   answers historical `balanceOf` queries.
//!
//! Failures can be injected with [`DevChain::inject_failure`]. Each injected
//! failure fires once.

use async_trait::async_trait;
use parking_lot::Mutex;
use sha3::{Digest, Keccak256};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::chain::{
    ChainClient, ContractArtifact, ContractCall, ContractRead, ReadValue, TokenConstructor,
    TransactionReceipt,
};
use crate::entities::{Address, Hash, RawLog, TRANSFER_TOPIC, U256};
use crate::errors::ChainError;

/// A one-shot failure to inject into the next matching call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailurePoint {
    /// Next `get_chain_head` returns an RPC error.
    ChainHead,
    /// Next `get_logs` whose range starts at `from_block` returns an RPC error.
    Logs { from_block: u64 },
    /// Next `read_contract` returns an RPC error.
    Read,
    /// Next submitted call to `function` returns an RPC error before mining.
    Submit { function: &'static str },
    /// Next deployment is mined but its receipt carries no created address.
    DeployWithoutAddress,
}

#[derive(Debug)]
struct DevToken {
    name: String,
    symbol: String,
    paused: bool,
    allowlist: HashSet<Address>,
    balances: BTreeMap<Address, U256>,
    /// Balances after each block that touched this token.
    history: BTreeMap<u64, BTreeMap<Address, U256>>,
}

impl DevToken {
    fn balance(&self, holder: &Address) -> U256 {
        self.balances.get(holder).copied().unwrap_or_default()
    }

    fn balance_at(&self, holder: &Address, block: u64) -> U256 {
        self.history
            .range(..=block)
            .next_back()
            .and_then(|(_, balances)| balances.get(holder).copied())
            .unwrap_or_default()
    }

    fn total_supply(&self) -> U256 {
        self.balances
            .values()
            .fold(U256::zero(), |acc, v| acc.saturating_add(*v))
    }

    fn set_balance(&mut self, holder: Address, amount: U256) {
        if amount.is_zero() {
            self.balances.remove(&holder);
        } else {
            self.balances.insert(holder, amount);
        }
    }

    fn move_value(&mut self, from: Address, to: Address, value: U256) -> Result<(), String> {
        if !from.is_zero() {
            let current = self.balance(&from);
            let next = current
                .checked_sub(value)
                .ok_or_else(|| "ERC20InsufficientBalance".to_string())?;
            self.set_balance(from, next);
        }
        if !to.is_zero() {
            let next = self.balance(&to).saturating_add(value);
            self.set_balance(to, next);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct DevChainState {
    head: u64,
    nonce: u64,
    tokens: HashMap<Address, DevToken>,
    logs: Vec<(Address, RawLog)>,
    receipts: HashMap<Hash, TransactionReceipt>,
    failures: Vec<FailurePoint>,
    call_log: Vec<String>,
}

impl DevChainState {
    fn take_failure(&mut self, matches: impl Fn(&FailurePoint) -> bool) -> bool {
        if let Some(pos) = self.failures.iter().position(matches) {
            self.failures.remove(pos);
            true
        } else {
            false
        }
    }

    fn next_tx_hash(&mut self, tag: &str) -> Hash {
        self.nonce += 1;
        let mut hasher = Keccak256::new();
        hasher.update(b"devchain-tx");
        hasher.update(self.nonce.to_be_bytes());
        hasher.update(tag.as_bytes());
        hasher.finalize().into()
    }

    fn next_contract_address(&mut self, admin: &Address) -> Address {
        self.nonce += 1;
        let mut hasher = Keccak256::new();
        hasher.update(b"devchain-create");
        hasher.update(admin.as_bytes());
        hasher.update(self.nonce.to_be_bytes());
        let digest: Hash = hasher.finalize().into();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[12..]);
        Address(bytes)
    }

    /// Mine one block containing the given transfers for `token`.
    fn mine(&mut self, token: Address, tx_hash: Hash, transfers: &[(Address, Address, U256)]) -> u64 {
        self.head += 1;
        let block = self.head;
        for (i, (from, to, value)) in transfers.iter().enumerate() {
            let mut data = vec![0u8; 32];
            value.to_big_endian(&mut data);
            self.logs.push((
                token,
                RawLog {
                    block,
                    log_index: i as u64,
                    transaction_hash: tx_hash,
                    topic0: TRANSFER_TOPIC,
                    data,
                    from: *from,
                    to: *to,
                    value: *value,
                },
            ));
        }
        if let Some(t) = self.tokens.get_mut(&token) {
            t.history.insert(block, t.balances.clone());
        }
        block
    }

    fn execute(
        &mut self,
        token_address: Address,
        call: &ContractCall,
    ) -> Result<Vec<(Address, Address, U256)>, String> {
        let token = self
            .tokens
            .get_mut(&token_address)
            .ok_or_else(|| "no contract code at address".to_string())?;
        match call {
            ContractCall::Pause => {
                if token.paused {
                    return Err("EnforcedPause".into());
                }
                token.paused = true;
                Ok(vec![])
            }
            ContractCall::Unpause => {
                if !token.paused {
                    return Err("ExpectedPause".into());
                }
                token.paused = false;
                Ok(vec![])
            }
            ContractCall::SetAllowlistStatus { wallet, approved } => {
                if *approved {
                    token.allowlist.insert(*wallet);
                } else {
                    token.allowlist.remove(wallet);
                }
                Ok(vec![])
            }
            ContractCall::Mint { to, amount } => {
                if token.paused {
                    return Err("EnforcedPause".into());
                }
                if !token.allowlist.contains(to) {
                    return Err("NotAllowlisted".into());
                }
                token.move_value(Address::ZERO, *to, *amount)?;
                Ok(vec![(Address::ZERO, *to, *amount)])
            }
        }
    }

    fn apply_call(&mut self, token: Address, call: ContractCall) -> Result<Hash, ChainError> {
        let tx_hash = self.next_tx_hash(call.function_name());
        self.call_log
            .push(format!("{}@{}", call.function_name(), token));
        let (success, transfers) = match self.execute(token, &call) {
            Ok(transfers) => (true, transfers),
            Err(reason) => {
                if !self.tokens.contains_key(&token) {
                    return Err(ChainError::Reverted { reason });
                }
                (false, vec![])
            }
        };
        let block = self.mine(token, tx_hash, &transfers);
        self.receipts.insert(
            tx_hash,
            TransactionReceipt {
                transaction_hash: tx_hash,
                block,
                success,
                created_address: None,
            },
        );
        Ok(tx_hash)
    }

    fn create_token(&mut self, constructor: TokenConstructor) -> (Address, Hash, u64) {
        let address = self.next_contract_address(&constructor.admin);
        self.create_token_at(address, constructor)
    }

    fn create_token_at(
        &mut self,
        address: Address,
        constructor: TokenConstructor,
    ) -> (Address, Hash, u64) {
        let tx_hash = self.next_tx_hash("deploy");
        self.tokens.insert(
            address,
            DevToken {
                name: constructor.name,
                symbol: constructor.symbol,
                paused: false,
                allowlist: HashSet::new(),
                balances: BTreeMap::new(),
                history: BTreeMap::new(),
            },
        );
        self.call_log.push(format!("deploy@{}", address));
        let block = self.mine(address, tx_hash, &[]);
        (address, tx_hash, block)
    }
}

/// In-memory chain implementing [`ChainClient`].
#[derive(Debug, Default)]
pub struct DevChain {
    state: Mutex<DevChainState>,
}

impl DevChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy a token directly, bypassing the artifact check.
    pub fn deploy_token(&self, name: &str, symbol: &str, admin: Address) -> Address {
        let (address, _, _) = self.state.lock().create_token(TokenConstructor {
            name: name.to_string(),
            symbol: symbol.to_string(),
            admin,
        });
        address
    }

    /// Deploy a token at a fixed address, e.g. to stand up a devnet for a
    /// configured token address. Replaces any token already there.
    pub fn deploy_token_at(&self, address: Address, name: &str, symbol: &str, admin: Address) {
        self.state.lock().create_token_at(
            address,
            TokenConstructor {
                name: name.to_string(),
                symbol: symbol.to_string(),
                admin,
            },
        );
    }

    /// Allow-list `holder` and mint `amount` to it (two blocks).
    pub fn seed_holder(&self, token: Address, holder: Address, amount: U256) -> Result<(), ChainError> {
        self.execute_confirmed(
            token,
            ContractCall::SetAllowlistStatus {
                wallet: holder,
                approved: true,
            },
        )?;
        self.execute_confirmed(token, ContractCall::Mint { to: holder, amount })
    }

    /// Holder-to-holder transfer in its own block.
    pub fn transfer(
        &self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), ChainError> {
        self.move_tokens(token, from, to, amount, true)
    }

    /// Burn from a holder in its own block.
    pub fn burn(&self, token: Address, from: Address, amount: U256) -> Result<(), ChainError> {
        self.move_tokens(token, from, Address::ZERO, amount, false)
    }

    fn move_tokens(
        &self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
        check_recipient: bool,
    ) -> Result<(), ChainError> {
        let mut state = self.state.lock();
        let tx_hash = state.next_tx_hash("transfer");
        let t = state
            .tokens
            .get_mut(&token)
            .ok_or_else(|| ChainError::Rpc(format!("no contract at {}", token)))?;
        if t.paused {
            return Err(ChainError::Reverted {
                reason: "EnforcedPause".into(),
            });
        }
        if !t.allowlist.contains(&from) || (check_recipient && !t.allowlist.contains(&to)) {
            return Err(ChainError::Reverted {
                reason: "NotAllowlisted".into(),
            });
        }
        t.move_value(from, to, amount)
            .map_err(|reason| ChainError::Reverted { reason })?;
        state.mine(token, tx_hash, &[(from, to, amount)]);
        Ok(())
    }

    fn execute_confirmed(&self, token: Address, call: ContractCall) -> Result<(), ChainError> {
        let mut state = self.state.lock();
        let hash = state.apply_call(token, call)?;
        match state.receipts.get(&hash) {
            Some(r) if r.success => Ok(()),
            _ => Err(ChainError::Reverted {
                reason: "transaction failed".into(),
            }),
        }
    }

    /// Overwrite a balance without emitting a Transfer log.
    ///
    /// Simulates on-chain drift that the ledger cannot observe.
    pub fn set_balance_unlogged(&self, token: Address, holder: Address, amount: U256) {
        let mut state = self.state.lock();
        state.head += 1;
        let block = state.head;
        if let Some(t) = state.tokens.get_mut(&token) {
            t.set_balance(holder, amount);
            t.history.insert(block, t.balances.clone());
        }
    }

    /// Mine `n` empty blocks.
    pub fn mine_blocks(&self, n: u64) {
        self.state.lock().head += n;
    }

    pub fn head(&self) -> u64 {
        self.state.lock().head
    }

    pub fn inject_failure(&self, failure: FailurePoint) {
        self.state.lock().failures.push(failure);
    }

    pub fn balance_of(&self, token: Address, holder: Address) -> U256 {
        self.state
            .lock()
            .tokens
            .get(&token)
            .map(|t| t.balance(&holder))
            .unwrap_or_default()
    }

    pub fn symbol(&self, token: Address) -> Option<String> {
        self.state.lock().tokens.get(&token).map(|t| t.symbol.clone())
    }

    pub fn name(&self, token: Address) -> Option<String> {
        self.state.lock().tokens.get(&token).map(|t| t.name.clone())
    }

    pub fn is_paused(&self, token: Address) -> bool {
        self.state
            .lock()
            .tokens
            .get(&token)
            .map(|t| t.paused)
            .unwrap_or(false)
    }

    pub fn is_allowlisted(&self, token: Address, wallet: Address) -> bool {
        self.state
            .lock()
            .tokens
            .get(&token)
            .map(|t| t.allowlist.contains(&wallet))
            .unwrap_or(false)
    }

    /// Every submitted call and deployment as `function@address`, in order.
    pub fn call_log(&self) -> Vec<String> {
        self.state.lock().call_log.clone()
    }
}

#[async_trait]
impl ChainClient for DevChain {
    async fn get_chain_head(&self) -> Result<u64, ChainError> {
        let mut state = self.state.lock();
        if state.take_failure(|f| *f == FailurePoint::ChainHead) {
            return Err(ChainError::Rpc("connection refused".into()));
        }
        Ok(state.head)
    }

    async fn get_logs(
        &self,
        address: Address,
        event_signature: Hash,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<RawLog>, ChainError> {
        let mut state = self.state.lock();
        if state.take_failure(|f| *f == FailurePoint::Logs { from_block }) {
            return Err(ChainError::Rpc("log query failed".into()));
        }
        if from_block > to_block {
            return Err(ChainError::Rpc(format!(
                "invalid block range {}..{}",
                from_block, to_block
            )));
        }
        Ok(state
            .logs
            .iter()
            .filter(|(emitter, log)| {
                *emitter == address
                    && log.topic0 == event_signature
                    && log.block >= from_block
                    && log.block <= to_block
            })
            .map(|(_, log)| log.clone())
            .collect())
    }

    async fn read_contract(
        &self,
        address: Address,
        call: ContractRead,
        at_block: Option<u64>,
    ) -> Result<ReadValue, ChainError> {
        let mut state = self.state.lock();
        if state.take_failure(|f| *f == FailurePoint::Read) {
            return Err(ChainError::Rpc("eth_call failed".into()));
        }
        if let Some(block) = at_block {
            if block > state.head {
                return Err(ChainError::Rpc(format!("block {} not yet mined", block)));
            }
        }
        let token = state
            .tokens
            .get(&address)
            .ok_or_else(|| ChainError::Rpc(format!("no contract at {}", address)))?;
        Ok(match call {
            ContractRead::BalanceOf(holder) => ReadValue::Uint(match at_block {
                Some(block) => token.balance_at(&holder, block),
                None => token.balance(&holder),
            }),
            ContractRead::TotalSupply => ReadValue::Uint(token.total_supply()),
            ContractRead::Name => ReadValue::Text(token.name.clone()),
            ContractRead::Symbol => ReadValue::Text(token.symbol.clone()),
            ContractRead::Paused => ReadValue::Bool(token.paused),
        })
    }

    async fn submit_transaction(
        &self,
        address: Address,
        call: ContractCall,
    ) -> Result<Hash, ChainError> {
        let mut state = self.state.lock();
        let function = call.function_name();
        if state.take_failure(|f| *f == FailurePoint::Submit { function }) {
            return Err(ChainError::Rpc(format!("failed to submit {}", function)));
        }
        state.apply_call(address, call)
    }

    async fn wait_for_receipt(&self, tx_hash: Hash) -> Result<TransactionReceipt, ChainError> {
        self.state
            .lock()
            .receipts
            .get(&tx_hash)
            .cloned()
            .ok_or_else(|| ChainError::UnknownTransaction(hex::encode(tx_hash)))
    }

    async fn deploy_contract(
        &self,
        artifact: &ContractArtifact,
        constructor: TokenConstructor,
    ) -> Result<TransactionReceipt, ChainError> {
        if !artifact.bytecode.starts_with("0x") {
            return Err(ChainError::Reverted {
                reason: "invalid creation bytecode".into(),
            });
        }
        let mut state = self.state.lock();
        let (address, tx_hash, block) = state.create_token(constructor);
        let created_address = if state.take_failure(|f| *f == FailurePoint::DeployWithoutAddress) {
            None
        } else {
            Some(address)
        };
        let receipt = TransactionReceipt {
            transaction_hash: tx_hash,
            block,
            success: true,
            created_address,
        };
        state.receipts.insert(tx_hash, receipt.clone());
        Ok(receipt)
    }
}
