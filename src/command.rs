use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::Wei;

/// Number of decimal places between one ether and one wei.
pub const ETHER_DECIMALS: u32 = 18;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Deposit,
    Withdraw,
    Balance,
    Set,
    Get,
}

/// A call against the hosted ledger or cell, with amounts already in base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Deposit { value: Wei },
    Withdraw { amount: Wei },
    GetBalance,
    Set { value: i64 },
    Get,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallParseError {
    #[error("Amount is required for {kind:?}")]
    AmountRequired { kind: CallKind },
    #[error("Amount must not be negative for {kind:?}")]
    NegativeAmount { kind: CallKind },
    #[error("Amount {amount} is smaller than one wei")]
    SubWeiPrecision { amount: Decimal },
    #[error("Amount {amount} is not a whole number")]
    NotAnInteger { amount: Decimal },
    #[error("Amount {amount} is out of range for {kind:?}")]
    OutOfRange { kind: CallKind, amount: Decimal },
}

impl Call {
    /// Builds a call from a CSV row. Ether amounts are converted to wei here,
    /// zero amounts are left for the ledger and cell guards to reject.
    pub fn parse_call(kind: CallKind, amount: Option<Decimal>) -> Result<Self, CallParseError> {
        match kind {
            CallKind::Deposit => Ok(Self::Deposit {
                value: Self::parse_wei(kind, amount)?,
            }),
            CallKind::Withdraw => Ok(Self::Withdraw {
                amount: Self::parse_wei(kind, amount)?,
            }),
            CallKind::Balance => Ok(Self::GetBalance),
            CallKind::Set => Ok(Self::Set {
                value: Self::parse_scalar(kind, amount)?,
            }),
            CallKind::Get => Ok(Self::Get),
        }
    }

    fn parse_wei(kind: CallKind, amount: Option<Decimal>) -> Result<Wei, CallParseError> {
        let Some(amount) = amount else {
            return Err(CallParseError::AmountRequired { kind });
        };
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(CallParseError::NegativeAmount { kind });
        }
        let wei = amount
            .checked_mul(Decimal::from(10u64.pow(ETHER_DECIMALS)))
            .ok_or(CallParseError::OutOfRange { kind, amount })?;
        if !wei.fract().is_zero() {
            return Err(CallParseError::SubWeiPrecision { amount });
        }
        Wei::try_from(wei.normalize().mantissa())
            .map_err(|_| CallParseError::OutOfRange { kind, amount })
    }

    fn parse_scalar(kind: CallKind, amount: Option<Decimal>) -> Result<i64, CallParseError> {
        let Some(amount) = amount else {
            return Err(CallParseError::AmountRequired { kind });
        };
        if !amount.fract().is_zero() {
            return Err(CallParseError::NotAnInteger { amount });
        }
        i64::try_from(amount.normalize().mantissa())
            .map_err(|_| CallParseError::OutOfRange { kind, amount })
    }
}

/// Renders a wei amount in ether, `None` when it exceeds what [`Decimal`] can hold.
pub fn wei_to_ether(wei: Wei) -> Option<Decimal> {
    let wei = i128::try_from(wei).ok()?;
    Decimal::try_from_i128_with_scale(wei, ETHER_DECIMALS)
        .ok()
        .map(|ether| ether.normalize())
}
