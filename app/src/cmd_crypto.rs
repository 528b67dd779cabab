use clap::{Args, Subcommand};

#[derive(Subcommand, Debug)]
pub enum CryptoCommand {
    /// Compute the Canton fingerprint of a public key
    Fingerprint(FingerprintArgs),
    /// Sign data using a private key
    Sign(SignArgs),
}

#[derive(Args, Debug)]
pub struct FingerprintArgs {
    /// Public key (input specifier)
    key: String,
    /// Is input base64 encoded
    #[arg(short = 'b', long)]
    base64: bool,
}

#[derive(Args, Debug)]
pub struct SignArgs {
    /// Private key (input specifier)
    private_key: String,
    /// Data to sign (input specifier)
    data: String,
    /// Signing algorithm (ed25519, ecdsa256, ecdsa384)
    #[arg(short, long, default_value = "ed25519")]
    algo: String,
    /// Is input base64 encoded
    #[arg(short = 'b', long)]
    base64: bool,
}

pub fn run(command: CryptoCommand) -> anyhow::Result<()> {
    match command {
        CryptoCommand::Fingerprint(args) => {
            let key = iodata::read(&args.key, args.base64)?;
            println!("{}", canton::fingerprint(&key));
            Ok(())
        }
        CryptoCommand::Sign(args) => {
            let private_key = iodata::read(&args.private_key, args.base64)?;
            let data = iodata::read(&args.data, args.base64)?;
            let signature = canton::sign(&data, &private_key, &args.algo)?;
            print!("{}", iodata::encode(&signature, true));
            Ok(())
        }
    }
}
