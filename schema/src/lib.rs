#![forbid(unsafe_code)]

use flate2::read::GzDecoder;
use prost::Message as _;
use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor};
use prost_types::FileDescriptorSet;
use std::io::Read as _;
use std::path::Path;
use thiserror::Error;

mod json_image;
mod template;

pub use template::template;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to load schema: {0}")]
    Load(String),
    #[error("could not find message: {0}")]
    MessageNotFound(String),
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// An immutable, indexed set of file descriptors.
///
/// One instance may be shared across any number of decode/encode operations
/// within a process; nothing mutates it after load.
#[derive(Debug, Clone)]
pub struct Registry {
    pool: DescriptorPool,
}

impl Registry {
    /// Load a descriptor image from disk.
    ///
    /// Gzipped files (magic `1F 8B`) are decompressed in full first. The
    /// payload is tried as a binary `FileDescriptorSet`; if that fails or
    /// yields zero files, it is retried as a Protobuf-JSON descriptor set
    /// with unknown fields discarded.
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let data = std::fs::read(path)
            .map_err(|e| SchemaError::Load(format!("{}: {e}", path.display())))?;
        Self::from_bytes(&data)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, SchemaError> {
        let data = if data.starts_with(&[0x1f, 0x8b]) {
            let mut decoder = GzDecoder::new(data);
            let mut decompressed = Vec::new();
            decoder
                .read_to_end(&mut decompressed)
                .map_err(|e| SchemaError::Load(format!("failed to decompress gzip content: {e}")))?;
            decompressed
        } else {
            data.to_vec()
        };

        let fds = match FileDescriptorSet::decode(data.as_slice()) {
            Ok(fds) if !fds.file.is_empty() => fds,
            _ => json_image::parse(&data)
                .map_err(|e| SchemaError::Load(format!("image is neither binary nor JSON: {e}")))?,
        };

        Self::from_file_descriptor_set(fds)
    }

    pub fn from_file_descriptor_set(fds: FileDescriptorSet) -> Result<Self, SchemaError> {
        let pool = DescriptorPool::from_file_descriptor_set(fds)
            .map_err(|e| SchemaError::Load(format!("failed to build file registry: {e}")))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// Look up a message by fully-qualified name, including nested messages.
    pub fn find_message(&self, name: &str) -> Option<MessageDescriptor> {
        self.pool.get_message_by_name(name)
    }

    pub fn file_count(&self) -> usize {
        self.pool.files().count()
    }
}

/// Decode a binary payload against a message descriptor.
pub fn decode_message(
    descriptor: &MessageDescriptor,
    data: &[u8],
) -> Result<DynamicMessage, SchemaError> {
    DynamicMessage::decode(descriptor.clone(), data)
        .map_err(|e| SchemaError::Serialization(format!("failed to unmarshal binary data: {e}")))
}

/// Encode a dynamic message back to its binary wire form.
pub fn encode_message(message: &DynamicMessage) -> Vec<u8> {
    message.encode_to_vec()
}

/// Project a dynamic message to a JSON value using the standard mapping:
/// camelCase JSON names, base64 bytes, string enums, stringified 64-bit
/// integers, defaults omitted.
pub fn message_to_json(message: &DynamicMessage) -> Result<serde_json::Value, SchemaError> {
    serde_json::to_value(message)
        .map_err(|e| SchemaError::Serialization(format!("failed to project message to JSON: {e}")))
}

/// Build a dynamic message from a JSON value using the standard mapping.
pub fn message_from_json(
    descriptor: MessageDescriptor,
    value: &serde_json::Value,
) -> Result<DynamicMessage, SchemaError> {
    DynamicMessage::deserialize(descriptor, value.clone())
        .map_err(|e| SchemaError::Serialization(format!("failed to unmarshal JSON: {e}")))
}
