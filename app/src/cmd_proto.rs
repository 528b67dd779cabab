use anyhow::bail;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use cancel::CancelToken;
use clap::{Args, Subcommand};
use engine::Engine;
use serde_json::Value;
use std::io::Write as _;

#[derive(Subcommand, Debug)]
pub enum ProtoCommand {
    /// Generate a JSON template from a Protobuf message
    Template(TemplateArgs),
    /// Decode binary Protobuf data to JSON
    Decode(DecodeArgs),
    /// Serialize JSON to binary Protobuf
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
pub struct TemplateArgs {
    /// [schema-file] message-name
    #[arg(required = true, num_args = 1..=2)]
    args: Vec<String>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// [schema-file] message-name [data]
    #[arg(required = true, num_args = 1..=3)]
    args: Vec<String>,
    /// Input data (binary or base64)
    #[arg(short, long)]
    data: Option<String>,
    /// Interpret input data as base64
    #[arg(short = 'b', long)]
    base64: bool,
    /// Unwrap from the versioned envelope
    #[arg(short = 'V', long)]
    versioned: bool,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// [schema-file] message-name [json-data]
    #[arg(required = true, num_args = 1..=3)]
    args: Vec<String>,
    /// Input JSON data
    #[arg(short, long)]
    data: Option<String>,
    /// Output base64 encoded binary
    #[arg(short = 'b', long)]
    base64: bool,
    /// Wrap in the versioned envelope with this version
    #[arg(short = 'V', long, num_args = 0..=1, default_missing_value = "30")]
    versioned: Option<i32>,
    /// Set fields using path=value (repeatable)
    #[arg(short = 's', long = "set")]
    set: Vec<String>,
}

pub fn run(command: ProtoCommand, engine: &Engine, token: &CancelToken) -> anyhow::Result<()> {
    match command {
        ProtoCommand::Template(args) => template(args, engine, token),
        ProtoCommand::Decode(args) => decode(args, engine, token),
        ProtoCommand::Generate(args) => generate(args, engine, token),
    }
}

fn template(args: TemplateArgs, engine: &Engine, token: &CancelToken) -> anyhow::Result<()> {
    let (schema, remaining) = crate::resolve_schema_args(&args.args)?;
    let Some(message_name) = remaining.first() else {
        bail!("missing message name");
    };

    let template = engine.template(token, &schema, message_name)?;
    println!("{}", serde_json::to_string_pretty(&template)?);
    Ok(())
}

fn decode(args: DecodeArgs, engine: &Engine, token: &CancelToken) -> anyhow::Result<()> {
    let (schema, remaining) = crate::resolve_schema_args(&args.args)?;
    let Some(message_name) = remaining.first() else {
        bail!("missing message name");
    };

    let input = args
        .data
        .or_else(|| remaining.get(1).cloned())
        .unwrap_or_else(|| "-".to_string());
    let binary = iodata::read(&input, args.base64)?;

    let decoded = engine.decode(token, &schema, message_name, &binary, args.versioned)?;
    println!("{}", serde_json::to_string_pretty(&decoded)?);
    Ok(())
}

fn generate(args: GenerateArgs, engine: &Engine, token: &CancelToken) -> anyhow::Result<()> {
    let (schema, remaining) = crate::resolve_schema_args(&args.args)?;
    let Some(message_name) = remaining.first() else {
        bail!("missing message name");
    };

    // Without data or a positional payload, generate from an empty object.
    let input = args
        .data
        .or_else(|| remaining.get(1).cloned())
        .unwrap_or_else(|| "{}".to_string());
    let json_data = if input == "{}" {
        b"{}".to_vec()
    } else {
        iodata::read(&input, false)?
    };
    let mut value: Value = serde_json::from_slice(&json_data)?;

    if !args.set.is_empty() {
        let Value::Object(ref mut map) = value else {
            bail!("--set requires a JSON object input");
        };
        for entry in &args.set {
            let Some((path, literal)) = entry.split_once('=') else {
                bail!("invalid --set format {entry:?}, expected key=value");
            };
            patch::set(map, path, patch::parse_value(literal));
        }
    }

    let binary = engine.generate(token, &schema, message_name, &value, args.versioned)?;

    if args.base64 {
        println!("{}", STANDARD.encode(&binary));
    } else {
        std::io::stdout().write_all(&binary)?;
    }
    Ok(())
}
