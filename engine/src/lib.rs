#![forbid(unsafe_code)]

use cancel::CancelToken;
use config::Config;
use nesting::{NestingError, Processor};
use prost::Message as _;
use proton_protocol::version::v1::VersionedMessage;
use schema::{Registry, SchemaError};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Nesting(#[from] NestingError),
    #[error("failed to unmarshal versioned wrapper: {0}")]
    VersionEnvelope(String),
    #[error(transparent)]
    Cancelled(#[from] cancel::Cancelled),
}

/// Front door for the schema-driven operations: template generation,
/// binary-to-JSON decoding and JSON-to-binary generation.
///
/// The engine holds only configuration; a registry is loaded per operation
/// from the supplied image path and is immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    pub config: Config,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Generate an example JSON value for a message.
    pub fn template(
        &self,
        token: &CancelToken,
        schema_path: &Path,
        message_name: &str,
    ) -> Result<Value, EngineError> {
        let name = self.config.resolve_alias(message_name);
        let registry = self.load_registry(token, schema_path)?;
        let descriptor = registry
            .find_message(name)
            .ok_or_else(|| SchemaError::MessageNotFound(name.to_string()))?;
        Ok(schema::template(&descriptor))
    }

    /// Decode binary data to a JSON value, expanding mapped bytes fields
    /// when the configuration declares any.
    pub fn decode(
        &self,
        token: &CancelToken,
        schema_path: &Path,
        message_name: &str,
        data: &[u8],
        versioned: bool,
    ) -> Result<Value, EngineError> {
        let name = self.config.resolve_alias(message_name);
        tracing::debug!(message = name, versioned, "decoding binary payload");

        let payload = if versioned {
            VersionedMessage::decode(data)
                .map_err(|e| EngineError::VersionEnvelope(e.to_string()))?
                .data
        } else {
            data.to_vec()
        };

        let registry = self.load_registry(token, schema_path)?;
        let descriptor = registry
            .find_message(name)
            .ok_or_else(|| SchemaError::MessageNotFound(name.to_string()))?;
        let message = schema::decode_message(&descriptor, &payload)?;

        if self.config.has_mappings() {
            let processor = Processor::new(&registry, &self.config);
            Ok(processor.expand(token, &descriptor, &message)?)
        } else {
            Ok(schema::message_to_json(&message)?)
        }
    }

    /// Serialize a JSON value to binary, compressing mapped fields first and
    /// optionally wrapping the result in the versioned envelope.
    pub fn generate(
        &self,
        token: &CancelToken,
        schema_path: &Path,
        message_name: &str,
        json: &Value,
        version: Option<i32>,
    ) -> Result<Vec<u8>, EngineError> {
        let name = self.config.resolve_alias(message_name);
        tracing::debug!(message = name, ?version, "generating binary payload");

        let registry = self.load_registry(token, schema_path)?;
        let descriptor = registry
            .find_message(name)
            .ok_or_else(|| SchemaError::MessageNotFound(name.to_string()))?;

        let prepared = if self.config.has_mappings() {
            let processor = Processor::new(&registry, &self.config);
            processor.compress(token, &descriptor, json.clone())?
        } else {
            json.clone()
        };

        let message = schema::message_from_json(descriptor, &prepared)?;
        let binary = schema::encode_message(&message);

        Ok(match version {
            Some(version) => VersionedMessage::wrap(binary, version),
            None => binary,
        })
    }

    fn load_registry(
        &self,
        token: &CancelToken,
        schema_path: &Path,
    ) -> Result<Registry, EngineError> {
        token.check()?;
        Ok(Registry::load(schema_path)?)
    }
}
