use std::io::Read;

use crate::{Identity, command::CallKind};
use csv::{Reader, StringRecord, Trim};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CallRecord {
    #[serde(rename = "type")]
    pub kind: CallKind,
    pub caller: Identity,
    /// Ether for `deposit` and `withdraw`, a plain integer for `set`.
    pub amount: Option<Decimal>,
}

/// Parses a list of calls in CSV format, yielding each row with the line it starts on.
pub struct CsvCallParser<R> {
    reader: Reader<R>,
    headers: StringRecord,
    record: StringRecord,
}

impl<R> CsvCallParser<R>
where
    R: Read,
{
    pub fn new(source: R) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(source);
        let headers = reader.headers()?.clone();

        Ok(Self {
            reader,
            headers,
            record: StringRecord::new(),
        })
    }
}

impl<R> Iterator for CsvCallParser<R>
where
    R: Read,
{
    type Item = (u64, Result<CallRecord, csv::Error>);

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record(&mut self.record) {
            Ok(false) => None,
            Ok(true) => {
                let line = self.record.position().map_or(0, |pos| pos.line());
                Some((line, self.record.deserialize(Some(&self.headers))))
            }
            Err(err) => {
                let line = err.position().map_or(0, |pos| pos.line());
                Some((line, Err(err)))
            }
        }
    }
}
