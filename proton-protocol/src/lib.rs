#![forbid(unsafe_code)]

/// Versioned envelope used as the ledger-wide evolution boundary.
pub mod version {
    pub mod v1 {
        use prost::Message;
        use serde::{Deserialize, Serialize};

        /// Two-field wrapper `{data, version}`. Unknown fields are
        /// tolerated on read, which the already-wrapped heuristics rely on.
        #[derive(Serialize, Deserialize)]
        #[derive(Clone, PartialEq, Eq, Message)]
        pub struct VersionedMessage {
            #[prost(bytes = "vec", tag = "1")]
            pub data: Vec<u8>,
            #[prost(int32, tag = "2")]
            pub version: i32,
        }

        impl VersionedMessage {
            /// Wrap a payload at the given envelope version.
            pub fn wrap(data: Vec<u8>, version: i32) -> Vec<u8> {
                VersionedMessage { data, version }.encode_to_vec()
            }
        }
    }
}

/// Ledger API value model shared by transaction nodes.
pub mod daml {
    pub mod v2 {
        use prost::Message;
        use serde::{Deserialize, Serialize};

        #[derive(Serialize, Deserialize)]
        #[derive(Clone, PartialEq, Eq, Message)]
        pub struct Identifier {
            #[prost(string, tag = "1")]
            pub package_id: String,
            #[prost(string, tag = "3")]
            pub module_name: String,
            #[prost(string, tag = "4")]
            pub entity_name: String,
        }

        #[derive(Serialize, Deserialize)]
        #[derive(Clone, PartialEq, Message)]
        pub struct Value {
            #[prost(
                oneof = "value::Sum",
                tags = "1, 2, 3, 4, 5, 6, 8, 9, 11, 12, 13, 14, 15, 16, 17, 18"
            )]
            pub sum: Option<value::Sum>,
        }

        pub mod value {
            use serde::{Deserialize, Serialize};

            #[derive(Serialize, Deserialize)]
            #[derive(Clone, PartialEq, prost::Oneof)]
            pub enum Sum {
                #[prost(message, tag = "1")]
                Record(super::Record),
                #[prost(message, tag = "2")]
                Variant(Box<super::Variant>),
                /// Hex-encoded opaque contract identifier.
                #[prost(string, tag = "3")]
                ContractId(String),
                #[prost(message, tag = "4")]
                List(super::List),
                #[prost(sint64, tag = "5")]
                Int64(i64),
                /// Decimal string with up to 38 digits of precision.
                #[prost(string, tag = "6")]
                Numeric(String),
                #[prost(string, tag = "8")]
                Text(String),
                /// Microseconds since the UNIX epoch, UTC.
                #[prost(sfixed64, tag = "9")]
                Timestamp(i64),
                #[prost(string, tag = "11")]
                Party(String),
                #[prost(bool, tag = "12")]
                Bool(bool),
                #[prost(message, tag = "13")]
                Unit(()),
                /// Days since the UNIX epoch.
                #[prost(int32, tag = "14")]
                Date(i32),
                #[prost(message, tag = "15")]
                Optional(Box<super::Optional>),
                #[prost(message, tag = "16")]
                TextMap(super::TextMap),
                #[prost(message, tag = "17")]
                Enum(super::Enum),
                #[prost(message, tag = "18")]
                GenMap(super::GenMap),
            }
        }

        #[derive(Serialize, Deserialize)]
        #[derive(Clone, PartialEq, Message)]
        pub struct Record {
            #[prost(message, optional, tag = "1")]
            pub record_id: Option<Identifier>,
            #[prost(message, repeated, tag = "2")]
            pub fields: Vec<RecordField>,
        }

        #[derive(Serialize, Deserialize)]
        #[derive(Clone, PartialEq, Message)]
        pub struct RecordField {
            #[prost(string, tag = "1")]
            pub label: String,
            #[prost(message, optional, tag = "2")]
            pub value: Option<Value>,
        }

        #[derive(Serialize, Deserialize)]
        #[derive(Clone, PartialEq, Message)]
        pub struct Variant {
            #[prost(message, optional, tag = "1")]
            pub variant_id: Option<Identifier>,
            #[prost(string, tag = "2")]
            pub constructor: String,
            #[prost(message, optional, boxed, tag = "3")]
            pub value: Option<Box<Value>>,
        }

        #[derive(Serialize, Deserialize)]
        #[derive(Clone, PartialEq, Message)]
        pub struct Enum {
            #[prost(message, optional, tag = "1")]
            pub enum_id: Option<Identifier>,
            #[prost(string, tag = "2")]
            pub constructor: String,
        }

        #[derive(Serialize, Deserialize)]
        #[derive(Clone, PartialEq, Message)]
        pub struct List {
            #[prost(message, repeated, tag = "1")]
            pub elements: Vec<Value>,
        }

        #[derive(Serialize, Deserialize)]
        #[derive(Clone, PartialEq, Message)]
        pub struct Optional {
            #[prost(message, optional, boxed, tag = "1")]
            pub value: Option<Box<Value>>,
        }

        #[derive(Serialize, Deserialize)]
        #[derive(Clone, PartialEq, Message)]
        pub struct TextMap {
            #[prost(message, repeated, tag = "1")]
            pub entries: Vec<text_map::Entry>,
        }

        pub mod text_map {
            use prost::Message;
            use serde::{Deserialize, Serialize};

            #[derive(Serialize, Deserialize)]
            #[derive(Clone, PartialEq, Message)]
            pub struct Entry {
                #[prost(string, tag = "1")]
                pub key: String,
                #[prost(message, optional, tag = "2")]
                pub value: Option<super::Value>,
            }
        }

        #[derive(Serialize, Deserialize)]
        #[derive(Clone, PartialEq, Message)]
        pub struct GenMap {
            #[prost(message, repeated, tag = "1")]
            pub entries: Vec<gen_map::Entry>,
        }

        pub mod gen_map {
            use prost::Message;
            use serde::{Deserialize, Serialize};

            #[derive(Serialize, Deserialize)]
            #[derive(Clone, PartialEq, Message)]
            pub struct Entry {
                #[prost(message, optional, tag = "1")]
                pub key: Option<super::Value>,
                #[prost(message, optional, tag = "2")]
                pub value: Option<super::Value>,
            }
        }
    }
}

/// Interactive-submission prepared transaction tree.
pub mod interactive {
    use prost::Message;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    #[derive(Clone, PartialEq, Message)]
    pub struct PreparedTransaction {
        #[prost(message, optional, tag = "1")]
        pub transaction: Option<DamlTransaction>,
        #[prost(message, optional, tag = "2")]
        pub metadata: Option<Metadata>,
    }

    #[derive(Serialize, Deserialize)]
    #[derive(Clone, PartialEq, Message)]
    pub struct DamlTransaction {
        #[prost(string, tag = "1")]
        pub version: String,
        #[prost(string, repeated, tag = "2")]
        pub roots: Vec<String>,
        #[prost(message, repeated, tag = "3")]
        pub nodes: Vec<Node>,
        #[prost(message, repeated, tag = "4")]
        pub node_seeds: Vec<NodeSeed>,
    }

    #[derive(Serialize, Deserialize)]
    #[derive(Clone, PartialEq, Message)]
    pub struct Node {
        /// Identifier unique within the transaction; referenced by
        /// `roots`, exercise/rollback `children` and `node_seeds`.
        #[prost(string, tag = "1")]
        pub node_id: String,
        #[prost(oneof = "node::VersionedNode", tags = "2")]
        pub versioned_node: Option<node::VersionedNode>,
    }

    pub mod node {
        use serde::{Deserialize, Serialize};

        #[derive(Serialize, Deserialize)]
        #[derive(Clone, PartialEq, prost::Oneof)]
        pub enum VersionedNode {
            #[prost(message, tag = "2")]
            V1(super::transaction::v1::Node),
        }
    }

    #[derive(Serialize, Deserialize)]
    #[derive(Clone, PartialEq, Eq, Message)]
    pub struct NodeSeed {
        #[prost(int32, tag = "1")]
        pub node_id: i32,
        #[prost(bytes = "vec", tag = "2")]
        pub seed: Vec<u8>,
    }

    #[derive(Serialize, Deserialize)]
    #[derive(Clone, PartialEq, Message)]
    pub struct Metadata {
        #[prost(message, optional, tag = "2")]
        pub submitter_info: Option<SubmitterInfo>,
        #[prost(string, tag = "3")]
        pub transaction_uuid: String,
        #[prost(uint32, tag = "4")]
        pub mediator_group: u32,
        #[prost(string, tag = "5")]
        pub synchronizer_id: String,
        #[prost(uint64, optional, tag = "6")]
        pub min_ledger_effective_time: Option<u64>,
        #[prost(uint64, optional, tag = "7")]
        pub max_ledger_effective_time: Option<u64>,
        #[prost(uint64, tag = "8")]
        pub preparation_time: u64,
        #[prost(message, repeated, tag = "9")]
        pub input_contracts: Vec<InputContract>,
    }

    #[derive(Serialize, Deserialize)]
    #[derive(Clone, PartialEq, Eq, Message)]
    pub struct SubmitterInfo {
        #[prost(string, repeated, tag = "1")]
        pub act_as: Vec<String>,
        #[prost(string, tag = "2")]
        pub command_id: String,
    }

    #[derive(Serialize, Deserialize)]
    #[derive(Clone, PartialEq, Message)]
    pub struct InputContract {
        #[prost(oneof = "input_contract::Contract", tags = "1")]
        pub contract: Option<input_contract::Contract>,
        #[prost(uint64, tag = "2")]
        pub created_at: u64,
    }

    pub mod input_contract {
        use serde::{Deserialize, Serialize};

        #[derive(Serialize, Deserialize)]
        #[derive(Clone, PartialEq, prost::Oneof)]
        pub enum Contract {
            #[prost(message, tag = "1")]
            V1(super::transaction::v1::Create),
        }
    }

    pub mod transaction {
        pub mod v1 {
            use crate::daml::v2::{Identifier, Value};
            use prost::Message;
            use serde::{Deserialize, Serialize};

            #[derive(Serialize, Deserialize)]
            #[derive(Clone, PartialEq, Message)]
            pub struct Node {
                #[prost(oneof = "node::NodeType", tags = "1, 2, 3, 4")]
                pub node_type: Option<node::NodeType>,
            }

            pub mod node {
                use serde::{Deserialize, Serialize};

                #[derive(Serialize, Deserialize)]
                #[derive(Clone, PartialEq, prost::Oneof)]
                pub enum NodeType {
                    #[prost(message, tag = "1")]
                    Create(super::Create),
                    #[prost(message, tag = "2")]
                    Fetch(super::Fetch),
                    #[prost(message, tag = "3")]
                    Exercise(super::Exercise),
                    #[prost(message, tag = "4")]
                    Rollback(super::Rollback),
                }
            }

            #[derive(Serialize, Deserialize)]
            #[derive(Clone, PartialEq, Message)]
            pub struct Create {
                #[prost(string, tag = "1")]
                pub lf_version: String,
                #[prost(string, tag = "2")]
                pub contract_id: String,
                #[prost(string, tag = "3")]
                pub package_name: String,
                #[prost(message, optional, tag = "4")]
                pub template_id: Option<Identifier>,
                #[prost(message, optional, tag = "5")]
                pub argument: Option<Value>,
                #[prost(string, repeated, tag = "6")]
                pub signatories: Vec<String>,
                #[prost(string, repeated, tag = "7")]
                pub stakeholders: Vec<String>,
            }

            #[derive(Serialize, Deserialize)]
            #[derive(Clone, PartialEq, Message)]
            pub struct Fetch {
                #[prost(string, tag = "1")]
                pub lf_version: String,
                #[prost(string, tag = "2")]
                pub contract_id: String,
                #[prost(string, tag = "3")]
                pub package_name: String,
                #[prost(message, optional, tag = "4")]
                pub template_id: Option<Identifier>,
                #[prost(string, repeated, tag = "5")]
                pub signatories: Vec<String>,
                #[prost(string, repeated, tag = "6")]
                pub stakeholders: Vec<String>,
                #[prost(message, optional, tag = "7")]
                pub interface_id: Option<Identifier>,
                #[prost(string, repeated, tag = "8")]
                pub acting_parties: Vec<String>,
            }

            #[derive(Serialize, Deserialize)]
            #[derive(Clone, PartialEq, Message)]
            pub struct Exercise {
                #[prost(string, tag = "1")]
                pub lf_version: String,
                #[prost(string, tag = "2")]
                pub contract_id: String,
                #[prost(string, tag = "3")]
                pub package_name: String,
                #[prost(message, optional, tag = "4")]
                pub template_id: Option<Identifier>,
                #[prost(string, repeated, tag = "5")]
                pub signatories: Vec<String>,
                #[prost(string, repeated, tag = "6")]
                pub stakeholders: Vec<String>,
                #[prost(string, repeated, tag = "7")]
                pub acting_parties: Vec<String>,
                #[prost(message, optional, tag = "8")]
                pub interface_id: Option<Identifier>,
                #[prost(string, tag = "9")]
                pub choice_id: String,
                #[prost(message, optional, tag = "10")]
                pub chosen_value: Option<Value>,
                #[prost(bool, tag = "11")]
                pub consuming: bool,
                #[prost(message, optional, tag = "12")]
                pub exercise_result: Option<Value>,
                #[prost(string, repeated, tag = "13")]
                pub choice_observers: Vec<String>,
                #[prost(string, repeated, tag = "14")]
                pub children: Vec<String>,
            }

            /// Rollback nodes carry no lf_version of their own; only the
            /// subtree they roll back.
            #[derive(Serialize, Deserialize)]
            #[derive(Clone, PartialEq, Eq, Message)]
            pub struct Rollback {
                #[prost(string, repeated, tag = "1")]
                pub children: Vec<String>,
            }
        }
    }
}
