#![forbid(unsafe_code)]

use proton_protocol::daml::v2::{value, Identifier, Value};
use proton_protocol::interactive::transaction::v1 as tx_v1;
use proton_protocol::interactive::{
    input_contract, node, DamlTransaction, InputContract, Metadata, Node, PreparedTransaction,
};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use thiserror::Error;

/// Four big-endian bytes of the hash purpose for prepared transactions.
pub const PREPARED_TRANSACTION_HASH_PURPOSE: [u8; 4] = [0x00, 0x00, 0x00, 0x30];
/// Version byte of the hashing scheme.
pub const HASHING_SCHEME_VERSION: u8 = 0x02;
/// Version byte of the node encoding.
pub const NODE_ENCODING_VERSION: u8 = 0x01;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashError {
    #[error("prepared transaction has no transaction")]
    MissingTransaction,
    #[error("prepared transaction has no metadata")]
    MissingMetadata,
}

/// Compute the V2 SHA-256 hash binding the whole prepared transaction:
/// `SHA256(purpose || scheme || tx_hash || meta_hash)`.
///
/// The encoding is a pure function of the input structure, so the result is
/// bit-identical across runs and platforms.
pub fn hash_prepared_transaction(tx: &PreparedTransaction) -> Result<[u8; 32], HashError> {
    let transaction = tx.transaction.as_ref().ok_or(HashError::MissingTransaction)?;
    let metadata = tx.metadata.as_ref().ok_or(HashError::MissingMetadata)?;

    let nodes = nodes_by_id(transaction);
    let seeds = seeds_by_node_id(transaction);

    let tx_hash = purpose_hash(&encode_transaction(transaction, &nodes, &seeds));
    let meta_hash = purpose_hash(&encode_metadata(metadata));

    let mut hasher = Sha256::new();
    hasher.update(PREPARED_TRANSACTION_HASH_PURPOSE);
    hasher.update([HASHING_SCHEME_VERSION]);
    hasher.update(tx_hash);
    hasher.update(meta_hash);
    Ok(hasher.finalize().into())
}

type NodeMap<'a> = HashMap<&'a str, &'a Node>;
type SeedMap<'a> = HashMap<String, &'a [u8]>;

fn nodes_by_id(tx: &DamlTransaction) -> NodeMap<'_> {
    tx.nodes
        .iter()
        .map(|node| (node.node_id.as_str(), node))
        .collect()
}

// Seed node ids are integers on the wire but reference string node ids.
fn seeds_by_node_id(tx: &DamlTransaction) -> SeedMap<'_> {
    tx.node_seeds
        .iter()
        .map(|seed| (seed.node_id.to_string(), seed.seed.as_slice()))
        .collect()
}

fn purpose_hash(encoded: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(PREPARED_TRANSACTION_HASH_PURPOSE);
    hasher.update(encoded);
    hasher.finalize().into()
}

fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

fn encode_transaction(tx: &DamlTransaction, nodes: &NodeMap, seeds: &SeedMap) -> Vec<u8> {
    let mut out = encode_string(&tx.version);
    out.extend(encode_repeated(&tx.roots, |root_id| {
        hash_referenced_node(root_id, nodes, seeds)
    }));
    out
}

/// Hash of the referenced node's encoding, or 32 zero bytes when the id has
/// no matching node.
fn hash_referenced_node(id: &String, nodes: &NodeMap, seeds: &SeedMap) -> Vec<u8> {
    match nodes.get(id.as_str()) {
        Some(node) => sha256(&encode_node(node, nodes, seeds)).to_vec(),
        None => vec![0u8; 32],
    }
}

fn encode_node(node: &Node, nodes: &NodeMap, seeds: &SeedMap) -> Vec<u8> {
    let Some(node::VersionedNode::V1(v1)) = &node.versioned_node else {
        return Vec::new();
    };
    match &v1.node_type {
        Some(tx_v1::node::NodeType::Create(create)) => {
            encode_create_node(create, &node.node_id, seeds)
        }
        Some(tx_v1::node::NodeType::Exercise(exercise)) => {
            encode_exercise_node(exercise, &node.node_id, nodes, seeds)
        }
        Some(tx_v1::node::NodeType::Fetch(fetch)) => encode_fetch_node(fetch),
        Some(tx_v1::node::NodeType::Rollback(rollback)) => {
            encode_rollback_node(rollback, nodes, seeds)
        }
        None => Vec::new(),
    }
}

fn encode_create_node(create: &tx_v1::Create, node_id: &str, seeds: &SeedMap) -> Vec<u8> {
    let mut out = vec![NODE_ENCODING_VERSION];
    out.extend(encode_string(&create.lf_version));
    out.push(0x00); // Create node tag

    // Optional seed: marker byte then the raw seed, no length prefix.
    match seeds.get(node_id) {
        Some(seed) => {
            out.push(0x01);
            out.extend_from_slice(seed);
        }
        None => out.push(0x00),
    }

    out.extend(encode_hex_string(&create.contract_id));
    out.extend(encode_string(&create.package_name));
    out.extend(encode_identifier(create.template_id.as_ref()));
    out.extend(encode_value(create.argument.as_ref()));
    out.extend(encode_repeated(&create.signatories, |s| encode_string(s)));
    out.extend(encode_repeated(&create.stakeholders, |s| encode_string(s)));
    out
}

fn encode_exercise_node(
    exercise: &tx_v1::Exercise,
    node_id: &str,
    nodes: &NodeMap,
    seeds: &SeedMap,
) -> Vec<u8> {
    let mut out = vec![NODE_ENCODING_VERSION];
    out.extend(encode_string(&exercise.lf_version));
    out.push(0x01); // Exercise node tag

    // Exercise seeds are emitted raw, with neither marker nor length.
    if let Some(seed) = seeds.get(node_id) {
        out.extend_from_slice(seed);
    }

    out.extend(encode_hex_string(&exercise.contract_id));
    out.extend(encode_string(&exercise.package_name));
    out.extend(encode_identifier(exercise.template_id.as_ref()));
    out.extend(encode_repeated(&exercise.signatories, |s| encode_string(s)));
    out.extend(encode_repeated(&exercise.stakeholders, |s| encode_string(s)));
    out.extend(encode_repeated(&exercise.acting_parties, |s| {
        encode_string(s)
    }));
    out.extend(encode_optional(exercise.interface_id.as_ref(), |id| {
        encode_identifier(Some(id))
    }));
    out.extend(encode_string(&exercise.choice_id));
    out.extend(encode_value(exercise.chosen_value.as_ref()));
    out.extend(encode_bool(exercise.consuming));
    out.extend(encode_optional(exercise.exercise_result.as_ref(), |v| {
        encode_value(Some(v))
    }));
    out.extend(encode_repeated(&exercise.choice_observers, |s| {
        encode_string(s)
    }));
    out.extend(encode_repeated(&exercise.children, |child_id| {
        hash_referenced_node(child_id, nodes, seeds)
    }));
    out
}

fn encode_fetch_node(fetch: &tx_v1::Fetch) -> Vec<u8> {
    let mut out = vec![NODE_ENCODING_VERSION];
    out.extend(encode_string(&fetch.lf_version));
    out.push(0x02); // Fetch node tag
    out.extend(encode_hex_string(&fetch.contract_id));
    out.extend(encode_string(&fetch.package_name));
    out.extend(encode_identifier(fetch.template_id.as_ref()));
    out.extend(encode_repeated(&fetch.signatories, |s| encode_string(s)));
    out.extend(encode_repeated(&fetch.stakeholders, |s| encode_string(s)));
    out.extend(encode_optional(fetch.interface_id.as_ref(), |id| {
        encode_identifier(Some(id))
    }));
    out.extend(encode_repeated(&fetch.acting_parties, |s| encode_string(s)));
    out
}

// Rollback carries no lf_version between the encoding version and its tag
// byte. Existing hash consumers depend on this exact layout.
fn encode_rollback_node(rollback: &tx_v1::Rollback, nodes: &NodeMap, seeds: &SeedMap) -> Vec<u8> {
    let mut out = vec![NODE_ENCODING_VERSION];
    out.push(0x03); // Rollback node tag
    out.extend(encode_repeated(&rollback.children, |child_id| {
        hash_referenced_node(child_id, nodes, seeds)
    }));
    out
}

fn encode_metadata(metadata: &Metadata) -> Vec<u8> {
    let mut out = vec![0x01];
    match &metadata.submitter_info {
        Some(info) => {
            out.extend(encode_repeated(&info.act_as, |s| encode_string(s)));
            out.extend(encode_string(&info.command_id));
        }
        None => {
            out.extend(encode_i32(0));
            out.extend(encode_string(""));
        }
    }
    out.extend(encode_string(&metadata.transaction_uuid));
    out.extend(encode_i32(metadata.mediator_group as i32));
    out.extend(encode_string(&metadata.synchronizer_id));
    out.extend(encode_optional(
        metadata.min_ledger_effective_time.as_ref(),
        |t| encode_i64(*t as i64),
    ));
    out.extend(encode_optional(
        metadata.max_ledger_effective_time.as_ref(),
        |t| encode_i64(*t as i64),
    ));
    out.extend(encode_i64(metadata.preparation_time as i64));
    out.extend(encode_repeated(&metadata.input_contracts, |c| {
        encode_input_contract(c)
    }));
    out
}

fn encode_input_contract(contract: &InputContract) -> Vec<u8> {
    let mut out = encode_i64(contract.created_at as i64);
    let encoded_node = match &contract.contract {
        // Input contracts hash with an empty seed map: the optional-seed
        // marker is always absent regardless of the enclosing transaction.
        Some(input_contract::Contract::V1(create)) => {
            encode_create_node(create, "unused_node_id", &SeedMap::new())
        }
        None => Vec::new(),
    };
    out.extend(sha256(&encoded_node));
    out
}

fn encode_identifier(id: Option<&Identifier>) -> Vec<u8> {
    let Some(id) = id else {
        return Vec::new();
    };
    let mut out = encode_string(&id.package_id);
    out.extend(encode_repeated(&split_parts(&id.module_name), |p| {
        encode_string(p)
    }));
    out.extend(encode_repeated(&split_parts(&id.entity_name), |p| {
        encode_string(p)
    }));
    out
}

/// An empty name splits to the empty list, not `[""]`.
fn split_parts(name: &str) -> Vec<String> {
    if name.is_empty() {
        Vec::new()
    } else {
        name.split('.').map(str::to_string).collect()
    }
}

fn encode_value(value: Option<&Value>) -> Vec<u8> {
    let Some(value) = value else {
        return Vec::new();
    };
    let Some(sum) = &value.sum else {
        return Vec::new();
    };
    match sum {
        value::Sum::Unit(()) => vec![0x00],
        value::Sum::Bool(b) => prefixed(0x01, encode_bool(*b)),
        value::Sum::Int64(n) => prefixed(0x02, encode_i64(*n)),
        value::Sum::Numeric(s) => prefixed(0x03, encode_string(s)),
        value::Sum::Timestamp(t) => prefixed(0x04, encode_i64(*t)),
        value::Sum::Date(d) => prefixed(0x05, encode_i32(*d)),
        value::Sum::Party(p) => prefixed(0x06, encode_string(p)),
        value::Sum::Text(t) => prefixed(0x07, encode_string(t)),
        value::Sum::ContractId(cid) => prefixed(0x08, encode_hex_string(cid)),
        value::Sum::Optional(opt) => prefixed(
            0x09,
            encode_optional(opt.value.as_deref(), |v| encode_value(Some(v))),
        ),
        value::Sum::List(list) => prefixed(
            0x0a,
            encode_repeated(&list.elements, |v| encode_value(Some(v))),
        ),
        value::Sum::TextMap(map) => prefixed(
            0x0b,
            encode_repeated(&map.entries, |entry| {
                let mut out = encode_string(&entry.key);
                out.extend(encode_value(entry.value.as_ref()));
                out
            }),
        ),
        value::Sum::Record(record) => {
            let mut out = vec![0x0c];
            out.extend(encode_optional(record.record_id.as_ref(), |id| {
                encode_identifier(Some(id))
            }));
            out.extend(encode_repeated(&record.fields, |field| {
                let mut encoded = if field.label.is_empty() {
                    vec![0x00]
                } else {
                    prefixed(0x01, encode_string(&field.label))
                };
                encoded.extend(encode_value(field.value.as_ref()));
                encoded
            }));
            out
        }
        value::Sum::Variant(variant) => {
            let mut out = vec![0x0d];
            out.extend(encode_optional(variant.variant_id.as_ref(), |id| {
                encode_identifier(Some(id))
            }));
            out.extend(encode_string(&variant.constructor));
            out.extend(encode_value(variant.value.as_deref()));
            out
        }
        value::Sum::Enum(en) => {
            let mut out = vec![0x0e];
            out.extend(encode_optional(en.enum_id.as_ref(), |id| {
                encode_identifier(Some(id))
            }));
            out.extend(encode_string(&en.constructor));
            out
        }
        value::Sum::GenMap(map) => prefixed(
            0x0f,
            encode_repeated(&map.entries, |entry| {
                let mut out = encode_value(entry.key.as_ref());
                out.extend(encode_value(entry.value.as_ref()));
                out
            }),
        ),
    }
}

fn prefixed(tag: u8, mut payload: Vec<u8>) -> Vec<u8> {
    payload.insert(0, tag);
    payload
}

// --- Primitive encoders; all lengths and integers are big-endian. ---

fn encode_bytes(data: &[u8]) -> Vec<u8> {
    let mut out = (data.len() as u32).to_be_bytes().to_vec();
    out.extend_from_slice(data);
    out
}

fn encode_string(s: &str) -> Vec<u8> {
    encode_bytes(s.as_bytes())
}

// Invalid hex characters are dropped rather than rejected; contract ids in
// well-formed transactions are hex by construction.
fn encode_hex_string(s: &str) -> Vec<u8> {
    encode_bytes(&hex::decode(s).unwrap_or_default())
}

fn encode_i32(n: i32) -> Vec<u8> {
    n.to_be_bytes().to_vec()
}

fn encode_i64(n: i64) -> Vec<u8> {
    n.to_be_bytes().to_vec()
}

fn encode_bool(b: bool) -> Vec<u8> {
    vec![u8::from(b)]
}

fn encode_optional<T: ?Sized>(value: Option<&T>, encode: impl FnOnce(&T) -> Vec<u8>) -> Vec<u8> {
    match value {
        Some(inner) => prefixed(0x01, encode(inner)),
        None => vec![0x00],
    }
}

fn encode_repeated<T>(items: &[T], encode: impl Fn(&T) -> Vec<u8>) -> Vec<u8> {
    let mut out = encode_i32(items.len() as i32);
    for item in items {
        out.extend(encode(item));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proton_protocol::daml::v2::{List, Optional, Record, RecordField};
    use proton_protocol::interactive::{NodeSeed, SubmitterInfo};

    fn minimal_transaction() -> PreparedTransaction {
        PreparedTransaction {
            transaction: Some(DamlTransaction {
                version: "1".to_string(),
                roots: vec!["0".to_string()],
                nodes: vec![Node {
                    node_id: "0".to_string(),
                    versioned_node: None,
                }],
                node_seeds: Vec::new(),
            }),
            metadata: Some(Metadata {
                submitter_info: Some(SubmitterInfo {
                    act_as: vec!["party1".to_string()],
                    command_id: "cmd1".to_string(),
                }),
                transaction_uuid: "uuid1".to_string(),
                synchronizer_id: "sync1".to_string(),
                ..Default::default()
            }),
        }
    }

    fn create_node(node_id: &str, signatory: &str) -> Node {
        Node {
            node_id: node_id.to_string(),
            versioned_node: Some(node::VersionedNode::V1(tx_v1::Node {
                node_type: Some(tx_v1::node::NodeType::Create(tx_v1::Create {
                    lf_version: "2.1".to_string(),
                    contract_id: "00deadbeef".to_string(),
                    package_name: "pkg".to_string(),
                    template_id: Some(Identifier {
                        package_id: "pid".to_string(),
                        module_name: "Mod.Sub".to_string(),
                        entity_name: "Entity".to_string(),
                    }),
                    argument: Some(Value {
                        sum: Some(value::Sum::Record(Record {
                            record_id: None,
                            fields: vec![RecordField {
                                label: "owner".to_string(),
                                value: Some(Value {
                                    sum: Some(value::Sum::Party(signatory.to_string())),
                                }),
                            }],
                        })),
                    }),
                    signatories: vec![signatory.to_string()],
                    stakeholders: vec![signatory.to_string()],
                })),
            })),
        }
    }

    #[test]
    fn hash_is_deterministic() {
        let tx = minimal_transaction();
        let first = hash_prepared_transaction(&tx).unwrap();
        let second = hash_prepared_transaction(&tx).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
    }

    #[test]
    fn missing_parts_are_rejected() {
        let mut tx = minimal_transaction();
        tx.transaction = None;
        assert_eq!(
            hash_prepared_transaction(&tx),
            Err(HashError::MissingTransaction)
        );

        let mut tx = minimal_transaction();
        tx.metadata = None;
        assert_eq!(
            hash_prepared_transaction(&tx),
            Err(HashError::MissingMetadata)
        );
    }

    #[test]
    fn leaf_mutations_change_the_hash() {
        let base = hash_prepared_transaction(&minimal_transaction()).unwrap();

        let mut tx = minimal_transaction();
        tx.metadata.as_mut().unwrap().transaction_uuid = "uuid2".to_string();
        assert_ne!(hash_prepared_transaction(&tx).unwrap(), base);

        let mut tx = minimal_transaction();
        tx.transaction.as_mut().unwrap().version = "2".to_string();
        assert_ne!(hash_prepared_transaction(&tx).unwrap(), base);

        let mut tx = minimal_transaction();
        tx.metadata.as_mut().unwrap().mediator_group = 1;
        assert_ne!(hash_prepared_transaction(&tx).unwrap(), base);

        let mut tx = minimal_transaction();
        tx.metadata.as_mut().unwrap().submitter_info = None;
        assert_ne!(hash_prepared_transaction(&tx).unwrap(), base);
    }

    #[test]
    fn unknown_root_hashes_like_zero_digest() {
        // A root without a node contributes 32 zero bytes, which differs
        // from a root resolving to an empty-encoding node.
        let mut tx = minimal_transaction();
        tx.transaction.as_mut().unwrap().roots = vec!["missing".to_string()];
        let dangling = hash_prepared_transaction(&tx).unwrap();

        let present = hash_prepared_transaction(&minimal_transaction()).unwrap();
        assert_ne!(dangling, present);
    }

    #[test]
    fn node_seed_binds_create_nodes() {
        let mut tx = minimal_transaction();
        {
            let transaction = tx.transaction.as_mut().unwrap();
            transaction.nodes = vec![create_node("0", "alice")];
        }
        let unseeded = hash_prepared_transaction(&tx).unwrap();

        tx.transaction.as_mut().unwrap().node_seeds = vec![NodeSeed {
            node_id: 0,
            seed: vec![7u8; 32],
        }];
        let seeded = hash_prepared_transaction(&tx).unwrap();
        assert_ne!(unseeded, seeded);
    }

    #[test]
    fn exercise_children_are_hashed_into_parent() {
        let exercise = |children: Vec<String>| Node {
            node_id: "0".to_string(),
            versioned_node: Some(node::VersionedNode::V1(tx_v1::Node {
                node_type: Some(tx_v1::node::NodeType::Exercise(tx_v1::Exercise {
                    lf_version: "2.1".to_string(),
                    contract_id: "00aa".to_string(),
                    package_name: "pkg".to_string(),
                    choice_id: "Choice".to_string(),
                    consuming: true,
                    children,
                    ..Default::default()
                })),
            })),
        };

        let mut tx = minimal_transaction();
        {
            let transaction = tx.transaction.as_mut().unwrap();
            transaction.nodes = vec![exercise(vec!["1".to_string()]), create_node("1", "alice")];
        }
        let with_alice = hash_prepared_transaction(&tx).unwrap();

        {
            let transaction = tx.transaction.as_mut().unwrap();
            transaction.nodes = vec![exercise(vec!["1".to_string()]), create_node("1", "bob")];
        }
        let with_bob = hash_prepared_transaction(&tx).unwrap();
        assert_ne!(with_alice, with_bob);
    }

    #[test]
    fn rollback_encoding_has_no_lf_version() {
        let rollback = Node {
            node_id: "0".to_string(),
            versioned_node: Some(node::VersionedNode::V1(tx_v1::Node {
                node_type: Some(tx_v1::node::NodeType::Rollback(tx_v1::Rollback {
                    children: Vec::new(),
                })),
            })),
        };
        let encoded = encode_node(&rollback, &NodeMap::new(), &SeedMap::new());
        // version byte, tag byte, then an empty repeated count.
        assert_eq!(
            encoded,
            vec![NODE_ENCODING_VERSION, 0x03, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn input_contract_hashes_without_seed_marker() {
        let create = tx_v1::Create {
            lf_version: "2.1".to_string(),
            contract_id: "00aa".to_string(),
            package_name: "pkg".to_string(),
            ..Default::default()
        };
        let contract = InputContract {
            contract: Some(input_contract::Contract::V1(create.clone())),
            created_at: 5,
        };
        let encoded = encode_input_contract(&contract);
        assert_eq!(&encoded[..8], &5i64.to_be_bytes());

        // The digest matches the Create encoding under an empty seed map.
        let expected = sha256(&encode_create_node(&create, "unused_node_id", &SeedMap::new()));
        assert_eq!(&encoded[8..], &expected);
    }

    #[test]
    fn identifier_splits_dotted_names_and_empty_to_nothing() {
        let id = Identifier {
            package_id: "p".to_string(),
            module_name: "A.B".to_string(),
            entity_name: String::new(),
        };
        let encoded = encode_identifier(Some(&id));
        let mut expected = encode_string("p");
        expected.extend(encode_i32(2));
        expected.extend(encode_string("A"));
        expected.extend(encode_string("B"));
        expected.extend(encode_i32(0));
        assert_eq!(encoded, expected);
    }

    #[test]
    fn value_encodings_are_tag_discriminated() {
        let unit = Value {
            sum: Some(value::Sum::Unit(())),
        };
        assert_eq!(encode_value(Some(&unit)), vec![0x00]);

        let text = Value {
            sum: Some(value::Sum::Text("hi".to_string())),
        };
        let mut expected = vec![0x07];
        expected.extend(encode_string("hi"));
        assert_eq!(encode_value(Some(&text)), expected);

        let absent_optional = Value {
            sum: Some(value::Sum::Optional(Box::new(Optional { value: None }))),
        };
        assert_eq!(encode_value(Some(&absent_optional)), vec![0x09, 0x00]);

        let empty_list = Value {
            sum: Some(value::Sum::List(List {
                elements: Vec::new(),
            })),
        };
        assert_eq!(
            encode_value(Some(&empty_list)),
            vec![0x0a, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn optional_present_of_empty_bytes_form() {
        let empty = String::new();
        let encoded = encode_optional(Some(&empty), |s| encode_string(s));
        assert_eq!(encoded, vec![0x01, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(
            encode_optional(None::<&String>, |s| encode_string(s)),
            vec![0x00]
        );
    }
}
