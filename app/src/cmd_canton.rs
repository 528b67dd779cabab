use anyhow::bail;
use cancel::CancelToken;
use clap::{Args, Subcommand};
use engine::Engine;
use std::path::PathBuf;
use topology::{PrepareDelegationArgs, Restrictions, SignatureStatus};

#[derive(Subcommand, Debug)]
pub enum CantonCommand {
    /// Canton topology transaction commands
    #[command(subcommand)]
    Topology(TopologyCommand),
}

#[derive(Subcommand, Debug)]
pub enum TopologyCommand {
    /// Preparation commands for topology transactions
    #[command(subcommand)]
    Prepare(PrepareCommand),
    /// Assemble a signed topology transaction
    Assemble(AssembleArgs),
    /// Verify signatures in a SignedTopologyTransaction
    Verify(VerifyArgs),
}

#[derive(Subcommand, Debug)]
pub enum PrepareCommand {
    /// Prepare a namespace delegation transaction
    Delegation(DelegationArgs),
}

#[derive(Args, Debug)]
pub struct DelegationArgs {
    /// Is this a self-signed root delegation
    #[arg(long)]
    root: bool,
    /// Path to root public key
    #[arg(long = "root-key")]
    root_key: String,
    /// Path to target public key
    #[arg(long = "target-key")]
    target_key: Option<String>,
    /// Revoke the delegation (operation = REMOVE)
    #[arg(long)]
    revoke: bool,
    /// Transaction serial number
    #[arg(long, default_value_t = 1)]
    serial: i64,
    /// Signing restrictions (all, all-but-delegation, or comma-separated mapping codes)
    #[arg(long, default_value = "all")]
    restrictions: String,
    /// Output prefix
    #[arg(long)]
    output: PathBuf,
}

#[derive(Args, Debug)]
pub struct AssembleArgs {
    /// Path to prepared transaction (.prep)
    #[arg(long = "prepared-transaction")]
    prepared_transaction: String,
    /// Path to signature file
    #[arg(long)]
    signature: String,
    /// Signature algorithm (ed25519, ecdsa256, ecdsa384)
    #[arg(long = "signature-algorithm")]
    signature_algorithm: String,
    /// Fingerprint of the signer
    #[arg(long = "signed-by")]
    signed_by: String,
    /// Output path
    #[arg(long)]
    output: PathBuf,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Path to SignedTopologyTransaction binary
    #[arg(long)]
    input: String,
    /// Path(s) to public key(s) for verification
    #[arg(long = "public-key", required = true)]
    public_key: Vec<String>,
}

pub fn run(command: CantonCommand, engine: &Engine, token: &CancelToken) -> anyhow::Result<()> {
    match command {
        CantonCommand::Topology(TopologyCommand::Prepare(PrepareCommand::Delegation(args))) => {
            delegation(args, engine, token)
        }
        CantonCommand::Topology(TopologyCommand::Assemble(args)) => assemble(args, engine, token),
        CantonCommand::Topology(TopologyCommand::Verify(args)) => verify(args, token),
    }
}

fn delegation(args: DelegationArgs, engine: &Engine, token: &CancelToken) -> anyhow::Result<()> {
    if args.target_key.is_none() && !args.root {
        bail!("missing required flags: --target-key (unless --root)");
    }
    let schema = crate::default_image()?;

    let root_key = iodata::read(&args.root_key, false)?;
    let target_key = match (&args.target_key, args.root) {
        (_, true) => None,
        (Some(path), false) => Some(iodata::read(path, false)?),
        (None, false) => unreachable!("validated above"),
    };

    let prepared = topology::prepare_delegation(
        engine,
        token,
        &schema,
        &PrepareDelegationArgs {
            root_key: &root_key,
            target_key: target_key.as_deref(),
            restrictions: Restrictions::parse(&args.restrictions),
            revoke: args.revoke,
            serial: args.serial,
        },
    )?;
    println!(
        "Root namespace fingerprint: {}",
        prepared.namespace_fingerprint
    );

    let prep_path = args.output.with_extension("prep");
    crate::write_output(&prep_path, &prepared.transaction)?;
    println!(
        "Namespace delegation transaction written to {}",
        prep_path.display()
    );

    let hash_path = args.output.with_extension("hash");
    crate::write_output(&hash_path, &prepared.hash)?;
    println!(
        "Namespace delegation transaction hash written to {}",
        hash_path.display()
    );
    Ok(())
}

fn assemble(args: AssembleArgs, engine: &Engine, token: &CancelToken) -> anyhow::Result<()> {
    let schema = crate::default_image()?;

    let prepared = iodata::read(&args.prepared_transaction, false)?;
    let signature = iodata::read(&args.signature, false)?;

    let signed = topology::assemble(
        engine,
        token,
        &schema,
        &prepared,
        &signature,
        &args.signature_algorithm,
        &args.signed_by,
    )?;

    crate::write_output(&args.output, &signed)?;
    println!("Certificate written to {}", args.output.display());
    Ok(())
}

fn verify(args: VerifyArgs, token: &CancelToken) -> anyhow::Result<()> {
    let schema = crate::default_image()?;

    let mut keys = Vec::new();
    for path in &args.public_key {
        let key = iodata::read(path, false)?;
        println!("Loaded key for fingerprint: {}", canton::fingerprint(&key));
        keys.push(key);
    }
    let input = iodata::read(&args.input, false)?;

    let outcome = topology::verify(token, &schema, &input, &keys)?;
    println!(
        "Computed transaction hash: {}",
        hex::encode(&outcome.transaction_hash)
    );

    for (index, check) in outcome.checks.iter().enumerate() {
        println!(
            "Checking signature {index} by {} ({})...",
            check.signed_by, check.algorithm
        );
        match &check.status {
            SignatureStatus::Valid => println!("  SUCCESS: signature is valid"),
            SignatureStatus::Invalid(reason) => {
                println!("  FAILURE: signature is invalid: {reason}")
            }
            SignatureStatus::MissingKey => {
                println!(
                    "  WARNING: public key for fingerprint {} not provided",
                    check.signed_by
                )
            }
        }
    }

    if !outcome.all_valid() {
        bail!("signature verification failed");
    }
    Ok(())
}
