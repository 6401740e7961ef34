use super::{ChainError, ConnectionState, Ledger, TransferReceipt, WalletSession};
use crate::composite::Index;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

/// Mint/redeem orchestration for index tokens.
///
/// Runs the staged flow the dashboard triggers against the external wallet
/// and ledger collaborators: session checks, then balance/allowance reads,
/// then the minimum set of mutations. Every step can fail with a
/// [`ChainError`]; nothing here is retried or absorbed.
pub struct IndexVault {
    wallet: Arc<dyn WalletSession>,
    ledger: Arc<dyn Ledger>,
    /// Collateral token address spent on mint.
    collateral_token: String,
    /// Chain id the index contracts are deployed on.
    chain_id: u64,
}

impl IndexVault {
    pub fn new(
        wallet: Arc<dyn WalletSession>,
        ledger: Arc<dyn Ledger>,
        collateral_token: impl Into<String>,
        chain_id: u64,
    ) -> Self {
        Self {
            wallet,
            ledger,
            collateral_token: collateral_token.into(),
            chain_id,
        }
    }

    /// Supply `amount` collateral to `index` and mint index tokens.
    ///
    /// Steps: ensure session on the right network, check collateral balance,
    /// approve the index contract when its allowance is short, deposit.
    pub async fn mint(&self, index: &Index, amount: Decimal) -> Result<TransferReceipt, ChainError> {
        let account = self.ensure_session().await?;

        let balance = self
            .ledger
            .balance_of(&self.collateral_token, &account)
            .await?;
        if balance < amount {
            return Err(ChainError::InsufficientBalance {
                available: balance,
                required: amount,
            });
        }

        let allowance = self
            .ledger
            .allowance(&self.collateral_token, &account, &index.contract_address)
            .await?;
        if allowance < amount {
            debug!(index = %index.id, %allowance, %amount, "approving collateral spend");
            self.ledger
                .approve(&self.collateral_token, &index.contract_address, amount)
                .await?;
        }

        let receipt = self.ledger.deposit(&index.contract_address, amount).await?;
        info!(index = %index.id, %amount, tx = %receipt.tx_hash, "minted index tokens");
        Ok(receipt)
    }

    /// Redeem `amount` index tokens from `index` for collateral.
    pub async fn redeem(
        &self,
        index: &Index,
        amount: Decimal,
    ) -> Result<TransferReceipt, ChainError> {
        let account = self.ensure_session().await?;

        let balance = self
            .ledger
            .balance_of(&index.contract_address, &account)
            .await?;
        if balance < amount {
            return Err(ChainError::InsufficientBalance {
                available: balance,
                required: amount,
            });
        }

        let receipt = self.ledger.withdraw(&index.contract_address, amount).await?;
        info!(index = %index.id, %amount, tx = %receipt.tx_hash, "redeemed index tokens");
        Ok(receipt)
    }

    /// Connect the wallet if needed and make sure it sits on the expected
    /// network. Returns the connected account address.
    async fn ensure_session(&self) -> Result<String, ChainError> {
        let account = match (self.wallet.state(), self.wallet.account()) {
            (ConnectionState::Connected, Some(account)) => account,
            _ => self.wallet.connect().await?,
        };

        match self.wallet.chain_id() {
            Some(chain_id) if chain_id == self.chain_id => {}
            _ => self.wallet.switch_network(self.chain_id).await?,
        }

        Ok(account)
    }
}
