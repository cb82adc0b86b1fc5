/// Aggregate value custody: guarded deposits, withdrawals paid out to a fixed owner.
/// State changes are driven by events, which are created by checking each call's guards.
pub mod ledger;

/// Single positive-only integer cell, independent of the ledger.
pub mod cell;

/// Error types shared by [`ledger`] and [`cell`].
pub mod error;

/// Calls as read from input, with ether amounts converted to wei.
pub mod command;

/// Hosting runtime interface, plus an "in memory" implementation that holds
/// every wallet and moves value in and out of the ledger.
pub mod runtime;

/// Used by the binary and by the integration test to run a CSV of calls.
pub mod bin_utils;

/// Smallest indivisible unit of value.
pub type Wei = u128;

/// Identity of a caller or a value recipient.
pub type Identity = u16;

pub const WEI_PER_ETHER: Wei = 1_000_000_000_000_000_000;
