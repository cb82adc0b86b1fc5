use std::io::Write;

use crate::{Identity, Wei, command::wei_to_ether};
use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Holding {
    pub account: Identity,
    /// In ether.
    pub balance: Decimal,
}

pub fn print_holdings<W>(
    output: &mut W,
    holdings: impl Iterator<Item = (Identity, Wei)>,
) -> anyhow::Result<()>
where
    W: Write,
{
    let mut writer = Writer::from_writer(output);
    for (account, wei) in holdings {
        let Some(balance) = wei_to_ether(wei) else {
            anyhow::bail!("Balance of {account} ({wei} wei) cannot be shown in ether")
        };
        if let Err(err) = writer.serialize(Holding { account, balance }) {
            anyhow::bail!("Failed to write to CSV: {err}")
        }
    }
    if let Err(err) = writer.flush() {
        anyhow::bail!("Failed to flush CSV writer: {err}")
    }
    Ok(())
}
