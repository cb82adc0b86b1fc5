use std::fs::File;

use anyhow::{Context, Result};
use simple_bank::{
    bin_utils::{CallError, Service},
    runtime::RuntimeConfig,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let filename = std::env::args()
        .nth(1)
        .context("Expected a file name as the first argument")?;
    let file = File::open(&filename).with_context(|| format!("Failed to open `{filename}`"))?;

    let service = Service {
        input: file,
        output: &mut std::io::stdout(),
        config: RuntimeConfig::default(),
        error_printer: Box::new(|line, err| match err {
            CallError::Reverted(err) => eprintln!("Call at line {line} reverted: {err}"),
            err => eprintln!("Error at line {line}: {err}"),
        }),
    };
    service.run()
}
