#![forbid(unsafe_code)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use cancel::CancelToken;
use config::{Config, Mapping};
use prost::Message as _;
use prost_reflect::{DynamicMessage, Kind, MessageDescriptor};
use proton_protocol::version::v1::VersionedMessage;
use schema::{Registry, SchemaError};
use serde_json::{Map, Value};
use thiserror::Error;

const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Error)]
pub enum NestingError {
    #[error("mapping error: {0}")]
    Mapping(String),
    #[error("target type {0} not found")]
    TargetTypeNotFound(String),
    #[error("versioned envelope error: {0}")]
    VersionEnvelope(String),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Cancelled(#[from] cancel::Cancelled),
}

/// Configuration-driven engine that expands or compresses bytes fields
/// declared to hold serialized messages of another type.
#[derive(Debug, Clone, Copy)]
pub struct Processor<'a> {
    registry: &'a Registry,
    config: &'a Config,
    max_depth: usize,
}

impl<'a> Processor<'a> {
    pub fn new(registry: &'a Registry, config: &'a Config) -> Self {
        Self {
            registry,
            config,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Project a message to JSON and expand every mapped bytes field into
    /// the typed value it carries, recursively.
    pub fn expand(
        &self,
        token: &CancelToken,
        descriptor: &MessageDescriptor,
        message: &DynamicMessage,
    ) -> Result<Value, NestingError> {
        let value = schema::message_to_json(message)?;
        match value {
            Value::Object(mut map) => {
                self.expand_object(token, descriptor, &mut map, 0)?;
                Ok(Value::Object(map))
            }
            other => Ok(other),
        }
    }

    fn expand_object(
        &self,
        token: &CancelToken,
        descriptor: &MessageDescriptor,
        map: &mut Map<String, Value>,
        depth: usize,
    ) -> Result<(), NestingError> {
        for field in descriptor.fields() {
            let Some(key) = present_key(map, &field) else {
                continue;
            };

            if let Some(mapping) = self.config.mapping_for(descriptor.full_name(), field.name()) {
                if !matches!(field.kind(), Kind::Bytes) {
                    return Err(non_bytes_mapping(mapping));
                }
                let Some(encoded) = map.get(&key).and_then(Value::as_str) else {
                    continue;
                };
                if encoded.is_empty() {
                    continue;
                }
                let bytes = STANDARD.decode(encoded).map_err(|e| {
                    NestingError::Mapping(format!("failed to decode base64 field {key}: {e}"))
                })?;
                let expanded = self.expand_bytes(token, &bytes, mapping, depth + 1)?;
                map.insert(key, expanded);
            } else if let Kind::Message(inner) = field.kind() {
                if field.is_map() {
                    continue;
                }
                match map.get_mut(&key) {
                    Some(Value::Object(sub)) if !field.is_list() => {
                        self.expand_object(token, &inner, sub, depth)?;
                    }
                    Some(Value::Array(items)) if field.is_list() => {
                        for item in items {
                            if let Value::Object(sub) = item {
                                self.expand_object(token, &inner, sub, depth)?;
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn expand_bytes(
        &self,
        token: &CancelToken,
        data: &[u8],
        mapping: &Mapping,
        depth: usize,
    ) -> Result<Value, NestingError> {
        token.check()?;
        self.check_depth(depth, mapping)?;

        let payload = if mapping.versioned {
            VersionedMessage::decode(data)
                .map_err(|e| NestingError::VersionEnvelope(e.to_string()))?
                .data
        } else {
            data.to_vec()
        };

        let target = self
            .registry
            .find_message(&mapping.target_type)
            .ok_or_else(|| NestingError::TargetTypeNotFound(mapping.target_type.clone()))?;
        let message = schema::decode_message(&target, &payload)?;

        let value = schema::message_to_json(&message)?;
        match value {
            Value::Object(mut map) => {
                self.expand_object(token, &target, &mut map, depth)?;
                Ok(Value::Object(map))
            }
            other => Ok(other),
        }
    }

    /// Compress every mapped field of a JSON value back into base64-encoded
    /// binary, wrapping in the versioned envelope where declared.
    pub fn compress(
        &self,
        token: &CancelToken,
        descriptor: &MessageDescriptor,
        value: Value,
    ) -> Result<Value, NestingError> {
        self.compress_value(token, descriptor, value, 0)
    }

    fn compress_value(
        &self,
        token: &CancelToken,
        descriptor: &MessageDescriptor,
        value: Value,
        depth: usize,
    ) -> Result<Value, NestingError> {
        let Value::Object(mut map) = value else {
            return Ok(value);
        };

        for field in descriptor.fields() {
            let Some(key) = present_key(&map, &field) else {
                continue;
            };

            if let Some(mapping) = self.config.mapping_for(descriptor.full_name(), field.name()) {
                if !matches!(field.kind(), Kind::Bytes) {
                    return Err(non_bytes_mapping(mapping));
                }
                let current = map.remove(&key).expect("key presence checked above");
                let bytes = self.compress_bytes(token, current, mapping, depth + 1)?;
                map.insert(key, Value::String(STANDARD.encode(bytes)));
            } else if let Kind::Message(inner) = field.kind() {
                if field.is_map() {
                    continue;
                }
                if field.is_list() {
                    if let Some(Value::Array(items)) = map.remove(&key) {
                        let mut compressed = Vec::with_capacity(items.len());
                        for item in items {
                            compressed.push(self.compress_value(token, &inner, item, depth)?);
                        }
                        map.insert(key, Value::Array(compressed));
                    }
                } else if let Some(sub) = map.remove(&key) {
                    let compressed = self.compress_value(token, &inner, sub, depth)?;
                    map.insert(key, compressed);
                }
            }
        }
        Ok(Value::Object(map))
    }

    fn compress_bytes(
        &self,
        token: &CancelToken,
        value: Value,
        mapping: &Mapping,
        depth: usize,
    ) -> Result<Vec<u8>, NestingError> {
        token.check()?;
        self.check_depth(depth, mapping)?;

        // A string is taken as base64 of already-binary content; anything
        // else is a nested value to compress and encode as the target type.
        let binary = match value {
            Value::String(encoded) => STANDARD.decode(&encoded).map_err(|e| {
                NestingError::Mapping(format!(
                    "failed to decode base64 string for mapped field {}.{}: {e}",
                    mapping.source_type, mapping.field
                ))
            })?,
            nested => {
                let target = self
                    .registry
                    .find_message(&mapping.target_type)
                    .ok_or_else(|| NestingError::TargetTypeNotFound(mapping.target_type.clone()))?;
                let compressed = self.compress_value(token, &target, nested, depth)?;
                let message = schema::message_from_json(target, &compressed)?;
                schema::encode_message(&message)
            }
        };

        if !mapping.versioned {
            return Ok(binary);
        }

        // Already-wrapped detection: bytes that parse as an envelope with a
        // non-empty data field are left untouched, keeping wrap idempotent.
        let already_wrapped = VersionedMessage::decode(binary.as_slice())
            .map(|envelope| !envelope.data.is_empty())
            .unwrap_or(false);
        if already_wrapped {
            Ok(binary)
        } else {
            Ok(VersionedMessage::wrap(binary, mapping.default_version))
        }
    }

    fn check_depth(&self, depth: usize, mapping: &Mapping) -> Result<(), NestingError> {
        if depth > self.max_depth {
            return Err(NestingError::Mapping(format!(
                "expansion depth {depth} exceeds limit {} at {}.{}",
                self.max_depth, mapping.source_type, mapping.field
            )));
        }
        Ok(())
    }
}

/// The JSON key a field is present under, preferring the JSON name and
/// falling back to the declared proto name.
fn present_key(map: &Map<String, Value>, field: &prost_reflect::FieldDescriptor) -> Option<String> {
    if map.contains_key(field.json_name()) {
        Some(field.json_name().to_string())
    } else if map.contains_key(field.name()) {
        Some(field.name().to_string())
    } else {
        None
    }
}

fn non_bytes_mapping(mapping: &Mapping) -> NestingError {
    NestingError::Mapping(format!(
        "mapping for {}.{} refers to a non-bytes field",
        mapping.source_type, mapping.field
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message as _;
    use prost_types::{
        field_descriptor_proto, DescriptorProto, FieldDescriptorProto, FileDescriptorProto,
        FileDescriptorSet,
    };
    use serde_json::json;

    fn field(
        name: &str,
        number: i32,
        ty: field_descriptor_proto::Type,
        type_name: Option<&str>,
    ) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            r#type: Some(ty as i32),
            type_name: type_name.map(str::to_string),
            label: Some(field_descriptor_proto::Label::Optional as i32),
            ..Default::default()
        }
    }

    // Inner deliberately uses field number 3 so its encoding never parses
    // as an envelope with non-empty data.
    fn registry() -> Registry {
        use field_descriptor_proto::Type;
        let set = FileDescriptorSet {
            file: vec![FileDescriptorProto {
                name: Some("nest.proto".to_string()),
                package: Some("nest".to_string()),
                syntax: Some("proto3".to_string()),
                message_type: vec![
                    DescriptorProto {
                        name: Some("Outer".to_string()),
                        field: vec![
                            field("title", 1, Type::String, None),
                            field("payload", 2, Type::Bytes, None),
                            field("plain_payload", 3, Type::Bytes, None),
                            field("tag", 4, Type::String, None),
                        ],
                        ..Default::default()
                    },
                    DescriptorProto {
                        name: Some("Inner".to_string()),
                        field: vec![field("note", 3, Type::String, None)],
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }],
        };
        Registry::from_file_descriptor_set(set).unwrap()
    }

    fn config() -> Config {
        serde_json::from_value(json!({
            "mappings": [
                {
                    "type": "nest.Outer",
                    "field": "payload",
                    "target_type": "nest.Inner",
                    "versioned": true,
                    "default_version": 30
                },
                {
                    "type": "nest.Outer",
                    "field": "plain_payload",
                    "target_type": "nest.Inner"
                }
            ]
        }))
        .unwrap()
    }

    fn inner_bytes(note: &str) -> Vec<u8> {
        let registry = registry();
        let desc = registry.find_message("nest.Inner").unwrap();
        let message = schema::message_from_json(desc, &json!({"note": note})).unwrap();
        schema::encode_message(&message)
    }

    #[test]
    fn expand_unwraps_versioned_payload_into_object() {
        let registry = registry();
        let config = config();
        let processor = Processor::new(&registry, &config);
        let token = CancelToken::new();
        let outer = registry.find_message("nest.Outer").unwrap();

        let wrapped = VersionedMessage::wrap(inner_bytes("hello"), 30);
        let message = schema::message_from_json(
            outer.clone(),
            &json!({"title": "t", "payload": STANDARD.encode(&wrapped)}),
        )
        .unwrap();

        let expanded = processor.expand(&token, &outer, &message).unwrap();
        assert_eq!(
            expanded,
            json!({"title": "t", "payload": {"note": "hello"}})
        );
    }

    #[test]
    fn compress_expand_round_trip_is_identity() {
        let registry = registry();
        let config = config();
        let processor = Processor::new(&registry, &config);
        let token = CancelToken::new();
        let outer = registry.find_message("nest.Outer").unwrap();

        let original = json!({
            "title": "t",
            "payload": {"note": "hello"},
            "plainPayload": {"note": "plain"}
        });
        let compressed = processor
            .compress(&token, &outer, original.clone())
            .unwrap();

        // Both payloads are now base64 strings.
        assert!(compressed["payload"].is_string());
        assert!(compressed["plainPayload"].is_string());

        let message = schema::message_from_json(outer.clone(), &compressed).unwrap();
        let expanded = processor.expand(&token, &outer, &message).unwrap();
        assert_eq!(expanded, original);
    }

    #[test]
    fn compress_leaves_already_wrapped_bytes_untouched() {
        let registry = registry();
        let config = config();
        let processor = Processor::new(&registry, &config);
        let token = CancelToken::new();
        let outer = registry.find_message("nest.Outer").unwrap();

        let wrapped = VersionedMessage::wrap(inner_bytes("hello"), 30);
        let value = json!({"payload": STANDARD.encode(&wrapped)});

        let compressed = processor.compress(&token, &outer, value).unwrap();
        let emitted = STANDARD
            .decode(compressed["payload"].as_str().unwrap())
            .unwrap();
        assert_eq!(emitted, wrapped);
    }

    #[test]
    fn compress_wraps_unwrapped_binary_at_default_version() {
        let registry = registry();
        let config = config();
        let processor = Processor::new(&registry, &config);
        let token = CancelToken::new();
        let outer = registry.find_message("nest.Outer").unwrap();

        let raw = inner_bytes("hello");
        let value = json!({"payload": STANDARD.encode(&raw)});

        let compressed = processor.compress(&token, &outer, value).unwrap();
        let emitted = STANDARD
            .decode(compressed["payload"].as_str().unwrap())
            .unwrap();
        let envelope = VersionedMessage::decode(emitted.as_slice()).unwrap();
        assert_eq!(envelope.data, raw);
        assert_eq!(envelope.version, 30);
    }

    #[test]
    fn mapping_on_non_bytes_field_is_an_error() {
        let registry = registry();
        let config: Config = serde_json::from_value(json!({
            "mappings": [
                {"type": "nest.Outer", "field": "tag", "target_type": "nest.Inner"}
            ]
        }))
        .unwrap();
        let processor = Processor::new(&registry, &config);
        let token = CancelToken::new();
        let outer = registry.find_message("nest.Outer").unwrap();

        let result = processor.compress(&token, &outer, json!({"tag": "x"}));
        assert!(matches!(result, Err(NestingError::Mapping(_))));
    }

    #[test]
    fn missing_target_type_surfaces() {
        let registry = registry();
        let config: Config = serde_json::from_value(json!({
            "mappings": [
                {"type": "nest.Outer", "field": "payload", "target_type": "nest.Missing"}
            ]
        }))
        .unwrap();
        let processor = Processor::new(&registry, &config);
        let token = CancelToken::new();
        let outer = registry.find_message("nest.Outer").unwrap();

        let result = processor.compress(&token, &outer, json!({"payload": {"note": "x"}}));
        assert!(matches!(result, Err(NestingError::TargetTypeNotFound(name)) if name == "nest.Missing"));
    }

    #[test]
    fn malformed_base64_in_mapped_field_is_a_mapping_error() {
        let registry = registry();
        let config = config();
        let processor = Processor::new(&registry, &config);
        let token = CancelToken::new();
        let outer = registry.find_message("nest.Outer").unwrap();

        let result = processor.compress(&token, &outer, json!({"payload": "!!! not base64"}));
        assert!(matches!(result, Err(NestingError::Mapping(_))));
    }

    #[test]
    fn cancellation_interrupts_compression() {
        let registry = registry();
        let config = config();
        let processor = Processor::new(&registry, &config);
        let token = CancelToken::new();
        token.cancel();
        let outer = registry.find_message("nest.Outer").unwrap();

        let result = processor.compress(&token, &outer, json!({"payload": {"note": "x"}}));
        assert!(matches!(result, Err(NestingError::Cancelled(_))));
    }
}
