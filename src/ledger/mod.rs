use std::collections::BTreeMap;

use alloy_primitives::Address;
use num_bigint::BigUint;
use num_traits::Zero;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::amount::{serde_amount, serde_balances};

pub type TokenId = Address;
pub type AccountId = Address;
pub type Amount = BigUint;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error(
        "insufficient balance for {account} in token {token}: have {available}, need {requested}"
    )]
    InsufficientBalance {
        token: TokenId,
        account: AccountId,
        available: Amount,
        requested: Amount,
    },
}

/// Supply and non-zero balances of a single token.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TokenBook {
    #[serde(with = "serde_amount")]
    pub total_supply: Amount,
    #[serde(with = "serde_balances")]
    pub balances: BTreeMap<AccountId, Amount>,
}

impl TokenBook {
    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).cloned().unwrap_or_default()
    }

    // zero balances are dropped so an untouched account and a drained one look the same
    fn set_balance(&mut self, account: AccountId, amount: Amount) {
        if amount.is_zero() {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, amount);
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    Mint {
        height: u64,
        token: TokenId,
        to: AccountId,
        #[serde(with = "serde_amount")]
        amount: Amount,
    },
    Transfer {
        height: u64,
        token: TokenId,
        from: AccountId,
        to: AccountId,
        #[serde(with = "serde_amount")]
        amount: Amount,
    },
}

impl LedgerEvent {
    pub fn height(&self) -> u64 {
        match self {
            LedgerEvent::Mint { height, .. } | LedgerEvent::Transfer { height, .. } => *height,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub height: u64,
    pub tokens: BTreeMap<TokenId, TokenBook>,
    #[serde(with = "hex::serde")]
    pub state_root: [u8; 32],
}

/// Unsynchronized ledger state. [`Ledger`] is the shareable wrapper.
#[derive(Default, Debug)]
pub struct LedgerState {
    height: u64,
    tokens: BTreeMap<TokenId, TokenBook>,
    // events[i] has height drained_through + i + 1
    events: Vec<LedgerEvent>,
    drained_through: u64,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    /// Retained events with a height above `after`.
    pub fn events_since(&self, after: u64) -> &[LedgerEvent] {
        let skip = after.saturating_sub(self.drained_through) as usize;
        self.events.get(skip..).unwrap_or(&[])
    }

    /// Hands the retained journal to the caller. Height keeps counting.
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        self.drained_through = self.height;
        std::mem::take(&mut self.events)
    }

    pub fn balance_of(&self, token: &TokenId, account: &AccountId) -> Amount {
        self.tokens
            .get(token)
            .map(|book| book.balance_of(account))
            .unwrap_or_default()
    }

    pub fn total_supply(&self, token: &TokenId) -> Amount {
        self.tokens
            .get(token)
            .map(|book| book.total_supply.clone())
            .unwrap_or_default()
    }

    pub fn accounts(&self, token: &TokenId) -> Vec<(AccountId, Amount)> {
        self.tokens
            .get(token)
            .map(|book| {
                book.balances
                    .iter()
                    .map(|(account, balance)| (*account, balance.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Credits `account` and the token supply together. Returns the new height.
    pub fn mint(&mut self, token: TokenId, account: AccountId, amount: &Amount) -> u64 {
        if !amount.is_zero() {
            let book = self.tokens.entry(token).or_default();
            book.total_supply += amount;
            let balance = book.balance_of(&account) + amount;
            book.set_balance(account, balance);
        }

        self.height += 1;
        self.events.push(LedgerEvent::Mint {
            height: self.height,
            token,
            to: account,
            amount: amount.clone(),
        });
        self.height
    }

    /// Moves `amount` between two accounts of the same token. Returns the new height.
    pub fn transfer(
        &mut self,
        token: TokenId,
        from: AccountId,
        to: AccountId,
        amount: &Amount,
    ) -> Result<u64, LedgerError> {
        let available = self.balance_of(&token, &from);
        if &available < amount {
            return Err(LedgerError::InsufficientBalance {
                token,
                account: from,
                available,
                requested: amount.clone(),
            });
        }

        if from != to && !amount.is_zero() {
            // available >= amount > 0 so the book exists
            if let Some(book) = self.tokens.get_mut(&token) {
                let credited = book.balance_of(&to) + amount;
                book.set_balance(from, available - amount);
                book.set_balance(to, credited);
            }
        }

        self.height += 1;
        self.events.push(LedgerEvent::Transfer {
            height: self.height,
            token,
            from,
            to,
            amount: amount.clone(),
        });
        Ok(self.height)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            height: self.height,
            tokens: self.tokens.clone(),
            state_root: compute_state_root(&self.tokens),
        }
    }
}

/// Native-token ledger safe to share between threads.
///
/// Every mutation holds the write lock for its whole read-modify-write, so
/// readers only ever observe states where each token's supply equals the sum
/// of its balances.
#[derive(Default, Debug)]
pub struct Ledger {
    state: RwLock<LedgerState>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&self, token: TokenId, account: AccountId, amount: Amount) {
        let height = self.state.write().mint(token, account, &amount);
        debug!(%token, %account, %amount, height, "mint applied");
    }

    pub fn transfer(
        &self,
        token: TokenId,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let result = self.state.write().transfer(token, from, to, &amount);
        match result {
            Ok(height) => {
                debug!(%token, %from, %to, %amount, height, "transfer applied");
                Ok(())
            }
            Err(err) => {
                warn!(%token, %from, %to, %amount, error = %err, "transfer rejected");
                Err(err)
            }
        }
    }

    pub fn balance_of(&self, token: &TokenId, account: &AccountId) -> Amount {
        self.state.read().balance_of(token, account)
    }

    pub fn total_supply(&self, token: &TokenId) -> Amount {
        self.state.read().total_supply(token)
    }

    pub fn accounts(&self, token: &TokenId) -> Vec<(AccountId, Amount)> {
        self.state.read().accounts(token)
    }

    pub fn height(&self) -> u64 {
        self.state.read().height()
    }

    pub fn events_since(&self, after: u64) -> Vec<LedgerEvent> {
        self.state.read().events_since(after).to_vec()
    }

    pub fn drain_events(&self) -> Vec<LedgerEvent> {
        self.state.write().drain_events()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.state.read().snapshot()
    }
}

fn hash_amount(hasher: &mut Sha256, amount: &Amount) {
    let bytes = amount.to_bytes_be();
    hasher.update((bytes.len() as u32).to_be_bytes());
    hasher.update(&bytes);
}

/// Merkle root over supply and balance leaves in key order. Inner nodes are
/// tagged with their level; an unpaired node moves up a level unchanged.
fn compute_state_root(tokens: &BTreeMap<TokenId, TokenBook>) -> [u8; 32] {
    let mut level: Vec<[u8; 32]> = Vec::new();
    for (token, book) in tokens {
        let mut hasher = Sha256::new();
        hasher.update(b"supply");
        hasher.update(token.as_slice());
        hash_amount(&mut hasher, &book.total_supply);
        level.push(hasher.finalize().into());
        for (account, balance) in &book.balances {
            let mut hasher = Sha256::new();
            hasher.update(b"balance");
            hasher.update(token.as_slice());
            hasher.update(account.as_slice());
            hash_amount(&mut hasher, balance);
            level.push(hasher.finalize().into());
        }
    }
    if level.is_empty() {
        return Sha256::digest(b"native-ledger-empty").into();
    }

    let mut depth: u32 = 0;
    while level.len() > 1 {
        depth += 1;
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => {
                    let mut hasher = Sha256::new();
                    hasher.update(depth.to_be_bytes());
                    hasher.update(left);
                    hasher.update(right);
                    hasher.finalize().into()
                }
                _ => pair[0],
            })
            .collect();
    }
    level[0]
}
