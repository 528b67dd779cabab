#![forbid(unsafe_code)]

use anyhow::{bail, Context as _};
use cancel::CancelToken;
use clap::{Parser, Subcommand};
use config::Config;
use engine::Engine;
use std::path::PathBuf;

mod cmd_canton;
mod cmd_crypto;
mod cmd_daml;
mod cmd_proto;

/// Proton: universal Protobuf & Canton toolkit.
#[derive(Parser, Debug)]
#[command(name = "proton", version, about)]
struct Cli {
    /// Path to configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generic Protobuf utilities
    #[command(subcommand)]
    Proto(cmd_proto::ProtoCommand),
    /// Canton topology transaction commands
    #[command(subcommand)]
    Canton(cmd_canton::CantonCommand),
    /// Key and signature utilities
    #[command(subcommand)]
    Crypto(cmd_crypto::CryptoCommand),
    /// Daml transaction utilities
    #[command(subcommand)]
    Daml(cmd_daml::DamlCommand),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let engine = Engine::new(load_config(cli.config.as_deref()));
    let token = CancelToken::new();

    match cli.command {
        Commands::Proto(command) => cmd_proto::run(command, &engine, &token),
        Commands::Canton(command) => cmd_canton::run(command, &engine, &token),
        Commands::Crypto(command) => cmd_crypto::run(command),
        Commands::Daml(command) => cmd_daml::run(command),
    }
}

/// Load the explicit config path, or `$HOME/.proton/config.json` when it
/// exists. Load failures are a warning, not fatal.
fn load_config(explicit: Option<&std::path::Path>) -> Config {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => home_dir()
            .map(|home| home.join(".proton").join("config.json"))
            .filter(|path| path.is_file()),
    };
    let Some(path) = path else {
        return Config::default();
    };
    match Config::load(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("failed to load config: {e}");
            Config::default()
        }
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Resolve the descriptor image and remaining positional arguments.
///
/// The first positional wins when it names an existing file; otherwise the
/// `PROTO_IMAGE` environment variable, then the well-known fallbacks.
fn resolve_schema_args(args: &[String]) -> anyhow::Result<(PathBuf, &[String])> {
    if let Some(first) = args.first() {
        let candidate = PathBuf::from(first);
        if candidate.is_file() {
            return Ok((candidate, &args[1..]));
        }
    }
    Ok((default_image()?, args))
}

fn default_image() -> anyhow::Result<PathBuf> {
    if let Some(image) = std::env::var_os("PROTO_IMAGE") {
        return Ok(PathBuf::from(image));
    }
    if let Some(image) = home_dir()
        .map(|home| home.join(".proton").join("proton.binpb"))
        .filter(|path| path.is_file())
    {
        return Ok(image);
    }
    let local = PathBuf::from("canton_buf_image.binpb");
    if local.is_file() {
        return Ok(local);
    }
    bail!("no schema file given and PROTO_IMAGE not set");
}

/// Write a fully-computed artifact to disk; nothing is written on the error
/// paths that precede this call.
fn write_output(path: &std::path::Path, data: &[u8]) -> anyhow::Result<()> {
    std::fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))
}
