use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::{
    Identity, Wei,
    cell::ScalarCell,
    command::Call,
    error::{LedgerError, TransferError},
    ledger::{Ledger, ValueTransfer},
};

use super::{CallOutput, CallRuntime, ConfigError, RuntimeConfig, RuntimeError};

/// Value held by every identity known to the runtime, the ledger's custody included.
#[derive(Debug)]
pub struct Wallets {
    ledger_address: Identity,
    balances: BTreeMap<Identity, Wei>,
    rejecting: BTreeSet<Identity>,
}

impl Wallets {
    pub fn balance_of(&self, identity: Identity) -> Wei {
        self.balances.get(&identity).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Identity, Wei)> + '_ {
        self.balances.iter().map(|(identity, wei)| (*identity, *wei))
    }

    // callers check that `from` holds `amount`
    fn settle(&mut self, from: Identity, to: Identity, amount: Wei) {
        if amount == 0 {
            return;
        }
        *self.balances.entry(from).or_default() -= amount;
        // total value is fixed at genesis, so no wallet can overflow
        *self.balances.entry(to).or_default() += amount;
    }
}

impl ValueTransfer for Wallets {
    fn transfer(
        &mut self,
        _ledger: &mut Ledger,
        to: Identity,
        amount: Wei,
    ) -> Result<(), TransferError> {
        if self.rejecting.contains(&to) {
            return Err(TransferError::Rejected { to });
        }
        let from = self.ledger_address;
        let held = self.balance_of(from);
        if held < amount {
            return Err(TransferError::InsufficientHoldings { from, held, amount });
        }
        self.settle(from, to, amount);
        Ok(())
    }
}

#[derive(Debug)]
pub struct InMemoryRuntime {
    wallets: Wallets,
    ledger: Ledger,
    cell: ScalarCell,
}

impl InMemoryRuntime {
    /// Funds the genesis wallets and deploys the ledger from `config.deployer`.
    pub fn new(config: RuntimeConfig) -> Result<Self, ConfigError> {
        if config.deployer == config.ledger_address {
            return Err(ConfigError::DeployerIsLedger {
                deployer: config.deployer,
            });
        }
        if config.ledger_address < config.funded_accounts {
            return Err(ConfigError::LedgerAddressFunded {
                ledger_address: config.ledger_address,
            });
        }
        if Wei::from(config.funded_accounts)
            .checked_mul(config.initial_wallet_balance)
            .is_none()
        {
            return Err(ConfigError::SupplyOverflow {
                funded_accounts: config.funded_accounts,
                initial_wallet_balance: config.initial_wallet_balance,
            });
        }

        let mut balances: BTreeMap<Identity, Wei> = (0..config.funded_accounts)
            .map(|identity| (identity, config.initial_wallet_balance))
            .collect();
        balances.insert(config.ledger_address, 0);

        debug!(
            deployer = config.deployer,
            ledger_address = config.ledger_address,
            "ledger deployed"
        );
        Ok(Self {
            wallets: Wallets {
                ledger_address: config.ledger_address,
                balances,
                rejecting: BTreeSet::new(),
            },
            ledger: Ledger::new(config.deployer),
            cell: ScalarCell::default(),
        })
    }

    pub fn wallets(&self) -> &Wallets {
        &self.wallets
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn cell(&self) -> &ScalarCell {
        &self.cell
    }

    pub fn ledger_address(&self) -> Identity {
        self.wallets.ledger_address
    }

    /// Any value sent to `identity` fails until [`Self::accept_transfers_to`] is called.
    pub fn reject_transfers_to(&mut self, identity: Identity) {
        self.wallets.rejecting.insert(identity);
    }

    pub fn accept_transfers_to(&mut self, identity: Identity) {
        self.wallets.rejecting.remove(&identity);
    }

    fn deposit(&mut self, caller: Identity, value: Wei) -> Result<CallOutput, RuntimeError> {
        let ledger_address = self.wallets.ledger_address;
        // value attached by the custody address itself would never leave it
        if caller == ledger_address {
            return Err(RuntimeError::SelfDeposit { ledger_address });
        }
        let held = self.wallets.balance_of(caller);
        if held < value {
            return Err(RuntimeError::InsufficientWallet {
                caller,
                held,
                value,
            });
        }
        self.wallets.settle(caller, ledger_address, value);

        if let Err(err) = self.ledger.deposit(caller, value) {
            self.wallets.settle(ledger_address, caller, value);
            warn!(caller, value, %err, "deposit refunded");
            return Err(LedgerError::from(err).into());
        }
        Ok(CallOutput::Unit)
    }
}

impl CallRuntime for InMemoryRuntime {
    fn execute(&mut self, caller: Identity, call: Call) -> Result<CallOutput, RuntimeError> {
        match call {
            Call::Deposit { value } => self.deposit(caller, value),
            Call::Withdraw { amount } => {
                debug!(caller, amount, "withdrawal requested");
                self.ledger.withdraw(amount, &mut self.wallets)?;
                Ok(CallOutput::Unit)
            }
            Call::GetBalance => Ok(CallOutput::Balance(self.ledger.get_balance())),
            Call::Set { value } => {
                self.cell.set(value)?;
                Ok(CallOutput::Unit)
            }
            Call::Get => Ok(CallOutput::Value(self.cell.get())),
        }
    }
}
