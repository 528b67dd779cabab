use anyhow::Context as _;
use clap::{Args, Subcommand};
use prost::Message as _;
use proton_protocol::interactive::PreparedTransaction;

#[derive(Subcommand, Debug)]
pub enum DamlCommand {
    /// Compute the V2 secure hash of a prepared transaction
    Hash(FileArgs),
    /// Decode a binary PreparedTransaction into JSON
    Decode(FileArgs),
}

#[derive(Args, Debug)]
pub struct FileArgs {
    /// Prepared transaction (input specifier)
    file: String,
}

pub fn run(command: DamlCommand) -> anyhow::Result<()> {
    match command {
        DamlCommand::Hash(args) => {
            let tx = read_prepared_transaction(&args.file)?;
            let hash = txhash::hash_prepared_transaction(&tx)?;
            println!("{}", hex::encode(hash));
            Ok(())
        }
        DamlCommand::Decode(args) => {
            let tx = read_prepared_transaction(&args.file)?;
            println!("{}", serde_json::to_string_pretty(&tx)?);
            Ok(())
        }
    }
}

fn read_prepared_transaction(input: &str) -> anyhow::Result<PreparedTransaction> {
    let data = iodata::read(input, false)?;
    PreparedTransaction::decode(data.as_slice())
        .context("failed to unmarshal prepared transaction")
}
