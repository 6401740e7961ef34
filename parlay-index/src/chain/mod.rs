//! Wallet-session and ledger collaborator interfaces.
//!
//! The engine never talks to a chain directly - it consumes these traits,
//! implemented elsewhere by the embedding application. Token amounts are
//! [`Decimal`]: transfer arithmetic never goes through `f64`.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mint/redeem orchestration over the wallet + ledger pair.
pub mod vault;

/// Wallet connection lifecycle.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Confirmation receipt for a submitted chain operation.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransferReceipt {
    pub tx_hash: String,
    pub block_number: u64,
}

/// All errors surfaced by the wallet and ledger collaborators.
///
/// Unlike index resolution, chain operations are NOT total - a failed
/// transfer is a real error the caller must see.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainError {
    #[error("wallet is not connected")]
    NotConnected,

    #[error("wrong network: expected chain {expected}, connected to {actual}")]
    WrongNetwork { expected: u64, actual: u64 },

    #[error("insufficient balance: have {available}, need {required}")]
    InsufficientBalance {
        available: Decimal,
        required: Decimal,
    },

    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("rpc error: {0}")]
    Rpc(String),
}

/// External wallet session: connection state, account, and network control.
#[async_trait]
pub trait WalletSession: Send + Sync {
    fn state(&self) -> ConnectionState;

    /// Connected account address, if any.
    fn account(&self) -> Option<String>;

    /// Chain id of the connected network, if any.
    fn chain_id(&self) -> Option<u64>;

    /// Prompt a connection; resolves with the connected account address.
    async fn connect(&self) -> Result<String, ChainError>;

    /// Ask the wallet to switch to `chain_id`.
    async fn switch_network(&self, chain_id: u64) -> Result<(), ChainError>;
}

/// External token ledger: balances, allowances, and transfer submission.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn balance_of(&self, token: &str, owner: &str) -> Result<Decimal, ChainError>;

    async fn allowance(
        &self,
        token: &str,
        owner: &str,
        spender: &str,
    ) -> Result<Decimal, ChainError>;

    async fn approve(
        &self,
        token: &str,
        spender: &str,
        amount: Decimal,
    ) -> Result<TransferReceipt, ChainError>;

    /// Supply `amount` collateral to an index contract, minting index tokens.
    async fn deposit(&self, contract: &str, amount: Decimal)
    -> Result<TransferReceipt, ChainError>;

    /// Redeem `amount` index tokens from an index contract for collateral.
    async fn withdraw(
        &self,
        contract: &str,
        amount: Decimal,
    ) -> Result<TransferReceipt, ChainError>;
}
