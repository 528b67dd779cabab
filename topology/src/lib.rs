#![forbid(unsafe_code)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use cancel::CancelToken;
use canton::CryptoError;
use engine::{Engine, EngineError};
use prost::Message as _;
use prost_reflect::{DynamicMessage, Kind, ReflectMessage};
use proton_protocol::version::v1::VersionedMessage;
use schema::{Registry, SchemaError};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

pub const TOPOLOGY_TRANSACTION: &str = "com.digitalasset.canton.protocol.v30.TopologyTransaction";
pub const SIGNED_TOPOLOGY_TRANSACTION: &str =
    "com.digitalasset.canton.protocol.v30.SignedTopologyTransaction";
/// Envelope version all topology payloads are wrapped at.
pub const TOPOLOGY_ENVELOPE_VERSION: i32 = 30;

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("transaction field is empty")]
    EmptyTransaction,
    #[error(transparent)]
    Cancelled(#[from] cancel::Cancelled),
}

/// Which mappings a delegated key may sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restrictions {
    All,
    AllButNamespaceDelegations,
    Specific(Vec<String>),
}

impl Restrictions {
    /// `all`, `all-but-delegation`, or a comma-separated list of mapping codes.
    pub fn parse(s: &str) -> Self {
        match s {
            "all" => Restrictions::All,
            "all-but-delegation" => Restrictions::AllButNamespaceDelegations,
            codes => Restrictions::Specific(codes.split(',').map(str::to_string).collect()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PrepareDelegationArgs<'a> {
    pub root_key: &'a [u8],
    /// Defaults to the root key for self-signed root delegations.
    pub target_key: Option<&'a [u8]>,
    pub restrictions: Restrictions,
    pub revoke: bool,
    pub serial: i64,
}

#[derive(Debug, Clone)]
pub struct PreparedDelegation {
    /// Versioned-wrapped binary `TopologyTransaction`, the exact payload
    /// that must later be signed.
    pub transaction: Vec<u8>,
    /// 34-byte purpose-11 multihash of the transaction bytes.
    pub hash: Vec<u8>,
    pub namespace_fingerprint: String,
}

/// Build a namespace delegation transaction and its signing hash.
pub fn prepare_delegation(
    engine: &Engine,
    token: &CancelToken,
    schema_path: &Path,
    args: &PrepareDelegationArgs,
) -> Result<PreparedDelegation, TopologyError> {
    let namespace_fingerprint = canton::fingerprint(args.root_key);
    tracing::debug!(namespace = %namespace_fingerprint, "preparing namespace delegation");

    let target_key = args.target_key.unwrap_or(args.root_key);
    let info = canton::inspect_public_key(target_key)?;

    let mut tx = Map::new();
    let operation = if args.revoke {
        "TOPOLOGY_CHANGE_OP_REMOVE"
    } else {
        "TOPOLOGY_CHANGE_OP_ADD_REPLACE"
    };
    patch::set(&mut tx, "operation", json!(operation));
    patch::set(&mut tx, "serial", json!(args.serial));

    let prefix = "mapping.namespaceDelegation";
    patch::set(&mut tx, &format!("{prefix}.namespace"), json!(namespace_fingerprint));
    patch::set(&mut tx, &format!("{prefix}.targetKey.format"), json!(info.format));
    patch::set(
        &mut tx,
        &format!("{prefix}.targetKey.publicKey"),
        json!(STANDARD.encode(target_key)),
    );
    patch::set(
        &mut tx,
        &format!("{prefix}.targetKey.usage"),
        json!(["SIGNING_KEY_USAGE_NAMESPACE"]),
    );
    patch::set(&mut tx, &format!("{prefix}.targetKey.keySpec"), json!(info.key_spec));

    match &args.restrictions {
        Restrictions::All => {
            patch::set(&mut tx, &format!("{prefix}.canSignAllMappings"), json!({}));
        }
        Restrictions::AllButNamespaceDelegations => {
            patch::set(
                &mut tx,
                &format!("{prefix}.canSignAllButNamespaceDelegations"),
                json!({}),
            );
        }
        Restrictions::Specific(codes) => {
            patch::set(
                &mut tx,
                &format!("{prefix}.canSignSpecificMapings.mappings"),
                json!(codes),
            );
        }
    }

    let transaction = engine.generate(
        token,
        schema_path,
        TOPOLOGY_TRANSACTION,
        &Value::Object(tx),
        Some(TOPOLOGY_ENVELOPE_VERSION),
    )?;
    let hash = canton::compute_hash(&transaction, canton::HASH_PURPOSE_TOPOLOGY_TRANSACTION);

    Ok(PreparedDelegation {
        transaction,
        hash,
        namespace_fingerprint,
    })
}

/// Combine prepared transaction bytes with an external signature into a
/// versioned `SignedTopologyTransaction`.
pub fn assemble(
    engine: &Engine,
    token: &CancelToken,
    schema_path: &Path,
    prepared: &[u8],
    signature: &[u8],
    algorithm: &str,
    signed_by: &str,
) -> Result<Vec<u8>, TopologyError> {
    let metadata = canton::signature_metadata(algorithm)?;
    tracing::debug!(signed_by, algorithm, "assembling signed topology transaction");

    let signed = json!({
        "transaction": STANDARD.encode(prepared),
        "signatures": [{
            "format": metadata.format,
            "signature": STANDARD.encode(signature),
            "signedBy": signed_by,
            "signingAlgorithmSpec": metadata.algorithm,
        }],
        "proposal": false,
    });

    Ok(engine.generate(
        token,
        schema_path,
        SIGNED_TOPOLOGY_TRANSACTION,
        &signed,
        Some(TOPOLOGY_ENVELOPE_VERSION),
    )?)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureStatus {
    Valid,
    Invalid(String),
    MissingKey,
}

#[derive(Debug, Clone)]
pub struct SignatureCheck {
    pub signed_by: String,
    pub algorithm: String,
    pub status: SignatureStatus,
}

#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub transaction_hash: Vec<u8>,
    pub checks: Vec<SignatureCheck>,
}

impl VerifyOutcome {
    /// True iff every signature verified and every referenced fingerprint
    /// had a provided key.
    pub fn all_valid(&self) -> bool {
        self.checks
            .iter()
            .all(|check| check.status == SignatureStatus::Valid)
    }
}

/// Verify every signature of a (possibly version-wrapped) signed topology
/// transaction against the provided public keys, matched by fingerprint.
pub fn verify(
    token: &CancelToken,
    schema_path: &Path,
    input: &[u8],
    public_keys: &[Vec<u8>],
) -> Result<VerifyOutcome, TopologyError> {
    token.check()?;

    let mut keys: HashMap<String, &[u8]> = HashMap::new();
    for key in public_keys {
        keys.insert(canton::fingerprint(key), key.as_slice());
    }

    // Unwrap the envelope only when it parses with a non-empty payload.
    let data = match VersionedMessage::decode(input) {
        Ok(envelope) if !envelope.data.is_empty() => envelope.data,
        _ => input.to_vec(),
    };

    let registry = Registry::load(schema_path)?;
    let descriptor = registry
        .find_message(SIGNED_TOPOLOGY_TRANSACTION)
        .ok_or_else(|| SchemaError::MessageNotFound(SIGNED_TOPOLOGY_TRANSACTION.to_string()))?;
    // Raw dynamic decode: signature payload bytes must stay untouched, so
    // no nesting expansion happens here.
    let message = schema::decode_message(&descriptor, &data)?;

    let transaction = bytes_field(&message, "transaction");
    if transaction.is_empty() {
        return Err(TopologyError::EmptyTransaction);
    }
    let transaction_hash =
        canton::compute_hash(&transaction, canton::HASH_PURPOSE_TOPOLOGY_TRANSACTION);
    tracing::debug!(hash = %hex::encode(&transaction_hash), "computed transaction hash");

    let mut checks = Vec::new();
    if let Some(signatures) = message.get_field_by_name("signatures") {
        if let Some(list) = signatures.as_list() {
            for entry in list {
                let Some(signature) = entry.as_message() else {
                    continue;
                };
                checks.push(check_signature(signature, &transaction_hash, &keys));
            }
        }
    }

    Ok(VerifyOutcome {
        transaction_hash,
        checks,
    })
}

fn check_signature(
    signature: &DynamicMessage,
    transaction_hash: &[u8],
    keys: &HashMap<String, &[u8]>,
) -> SignatureCheck {
    let signed_by = string_field(signature, "signed_by", "signedBy");
    let algorithm = enum_field_name(signature, "signing_algorithm_spec", "signingAlgorithmSpec");
    let signature_bytes = bytes_field(signature, "signature");

    let status = match keys.get(&signed_by).copied() {
        None => SignatureStatus::MissingKey,
        Some(public_key) => {
            match canton::verify_signature(transaction_hash, &signature_bytes, public_key, &algorithm)
            {
                Ok(()) => SignatureStatus::Valid,
                Err(e) => SignatureStatus::Invalid(e.to_string()),
            }
        }
    };

    SignatureCheck {
        signed_by,
        algorithm,
        status,
    }
}

/// Read a string field, preferring the canonical snake_case name and
/// falling back to the JSON name.
fn string_field(message: &DynamicMessage, name: &str, json_name: &str) -> String {
    let descriptor = message.descriptor();
    let Some(field) = descriptor
        .get_field_by_name(name)
        .or_else(|| descriptor.get_field_by_json_name(json_name))
    else {
        return String::new();
    };
    message
        .get_field(&field)
        .as_str()
        .map(str::to_string)
        .unwrap_or_default()
}

fn bytes_field(message: &DynamicMessage, name: &str) -> Vec<u8> {
    message
        .get_field_by_name(name)
        .and_then(|value| value.as_bytes().map(|bytes| bytes.to_vec()))
        .unwrap_or_default()
}

/// Resolve an enum field to its declared value name.
fn enum_field_name(message: &DynamicMessage, name: &str, json_name: &str) -> String {
    let descriptor = message.descriptor();
    let Some(field) = descriptor
        .get_field_by_name(name)
        .or_else(|| descriptor.get_field_by_json_name(json_name))
    else {
        return String::new();
    };
    let Kind::Enum(enum_descriptor) = field.kind() else {
        return String::new();
    };
    let number = message.get_field(&field).as_enum_number().unwrap_or(0);
    enum_descriptor
        .get_value(number)
        .map(|value| value.name().to_string())
        .unwrap_or_default()
}
