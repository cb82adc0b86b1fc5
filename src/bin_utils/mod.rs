//! Bootstraps [`crate::runtime`] for the binary: reads calls from CSV, runs them
//! in order and prints every wallet at the end.

use std::io::{Read, Write};

use crate::{
    command::{Call, CallParseError},
    runtime::{
        CallRuntime, RuntimeConfig, RuntimeError, in_memory_runtime::InMemoryRuntime,
    },
};
use anyhow::Result;
use csv_parser::{CallRecord, CsvCallParser};
use csv_printer::print_holdings;
use thiserror::Error;
use tracing::info;
pub mod csv_parser;
pub mod csv_printer;

#[derive(Debug, Error)]
pub enum CallError {
    #[error("Malformed row: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Parse(#[from] CallParseError),
    #[error("Call reverted: {0}")]
    Reverted(#[from] RuntimeError),
}

pub struct Service<'w, R, W: 'w> {
    pub input: R,
    pub output: &'w mut W,
    pub config: RuntimeConfig,
    pub error_printer: Box<dyn FnMut(u64, CallError)>,
}

impl<'w, R, W> Service<'w, R, W>
where
    R: Read,
    W: Write + 'w,
{
    pub fn run(mut self) -> Result<()> {
        let parser = CsvCallParser::new(self.input)?;

        let mut runtime = InMemoryRuntime::new(self.config)?;

        for (line, row) in parser {
            match row
                .map_err(CallError::from)
                .and_then(|record| execute_record(&mut runtime, record))
            {
                Ok(output) => info!(line, ?output, "call executed"),
                Err(err) => (self.error_printer)(line, err),
            }
        }

        info!(
            balance = runtime.ledger().get_balance(),
            cell = runtime.cell().get(),
            "final state"
        );
        print_holdings(self.output, runtime.wallets().iter())
    }
}

fn execute_record(
    runtime: &mut impl CallRuntime,
    record: CallRecord,
) -> Result<crate::runtime::CallOutput, CallError> {
    let call = Call::parse_call(record.kind, record.amount)?;
    Ok(runtime.execute(record.caller, call)?)
}
