use thiserror::Error;

use crate::{
    Identity, Wei,
    command::Call,
    error::{LedgerError, ValidationError},
};

pub mod in_memory_runtime;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Cell(#[from] ValidationError),
    #[error("Caller {caller} holds {held} wei, cannot attach {value} wei")]
    InsufficientWallet {
        caller: Identity,
        held: Wei,
        value: Wei,
    },
    #[error("Ledger address {ledger_address} cannot deposit into itself")]
    SelfDeposit { ledger_address: Identity },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Ledger address {ledger_address} is one of the funded accounts")]
    LedgerAddressFunded { ledger_address: Identity },
    #[error("Deployer {deployer} cannot be the ledger address, payouts would stay in custody")]
    DeployerIsLedger { deployer: Identity },
    #[error("{funded_accounts} accounts holding {initial_wallet_balance} wei each exceed the wei range")]
    SupplyOverflow {
        funded_accounts: u16,
        initial_wallet_balance: Wei,
    },
}

/// What a successful call hands back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutput {
    Unit,
    Balance(Wei),
    Value(i64),
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Identity deploying the ledger, and therefore its owner.
    pub deployer: Identity,
    /// Identity under which the runtime keeps the value custodied by the ledger.
    pub ledger_address: Identity,
    /// Identities `0..funded_accounts` start with `initial_wallet_balance`.
    pub funded_accounts: u16,
    pub initial_wallet_balance: Wei,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            deployer: 0,
            ledger_address: Identity::MAX,
            funded_accounts: 20,
            initial_wallet_balance: 10_000 * crate::WEI_PER_ETHER,
        }
    }
}

/// Hosts the ledger and the cell, executing calls one at a time.
pub trait CallRuntime {
    fn execute(&mut self, caller: Identity, call: Call) -> Result<CallOutput, RuntimeError>;
}
