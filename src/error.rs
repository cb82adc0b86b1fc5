use thiserror::Error;

use crate::{Identity, Wei};

/// Caller supplied input failed a guard. State is never touched when this is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please deposit some money")]
    ZeroDeposit,
    #[error("Withdrawal amount must be greater than zero")]
    ZeroWithdrawal,
    #[error("Not enough money")]
    InsufficientFunds { requested: Wei, available: Wei },
    #[error("must be > 0")]
    NonPositiveValue { value: i64 },
    #[error("Balance overflow")]
    BalanceOverflow,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("Recipient {to} cannot accept value")]
    Rejected { to: Identity },
    #[error("{from} holds {held} wei, cannot send {amount} wei")]
    InsufficientHoldings { from: Identity, held: Wei, amount: Wei },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
}
