//! Runtime message schemas built from serialized `FileDescriptorSet`s.
//!
//! Nothing about the messages is known at compile time: each interaction
//! ships the descriptor set for its body inline, and a message descriptor is
//! rebuilt from those bytes whenever a body has to be transcoded.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use prost::Message;
use prost_reflect::{DescriptorPool, MessageDescriptor};
use prost_types::FileDescriptorSet;
use sha2::{Digest, Sha256};
use tracing::debug;
use wirepact_contract::ProtobufDescription;

use crate::error::SchemaError;

/// One message type resolved out of a descriptor set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchema {
    descriptor: MessageDescriptor,
}

impl ResolvedSchema {
    /// The short name the message was looked up by.
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Package-qualified name, e.g. `contract.Person`.
    pub fn full_name(&self) -> &str {
        self.descriptor.full_name()
    }

    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }
}

/// Parse `schema_set`, link it, and find the top-level message `message_name`.
///
/// The match is on the message's short name, exact and case-sensitive.
/// Nested messages are not candidates. When several files declare a message
/// with the same short name, the first file in the set wins.
pub fn resolve(schema_set: &[u8], message_name: &str) -> Result<ResolvedSchema, SchemaError> {
    let files =
        FileDescriptorSet::decode(schema_set).map_err(|source| SchemaError::Malformed { source })?;
    let pool = DescriptorPool::from_file_descriptor_set(files)
        .map_err(|source| SchemaError::Unlinkable { source })?;

    let found = pool
        .all_messages()
        .find(|message| message.parent_message().is_none() && message.name() == message_name)
        .map(|descriptor| ResolvedSchema { descriptor })
        .ok_or_else(|| SchemaError::MessageNotFound {
            message_name: message_name.to_string(),
            path: None,
        });
    found
}

type CacheKey = (String, [u8; 32]);

/// Resolves schemas, optionally remembering results.
///
/// The cache is keyed by message name and the SHA-256 of the schema set, so
/// a hit returns exactly what a fresh resolution of the same bytes would.
#[derive(Debug, Default)]
pub struct SchemaResolver {
    cache: Option<RwLock<HashMap<CacheKey, ResolvedSchema>>>,
}

impl SchemaResolver {
    /// Re-parse the schema set on every call.
    pub fn uncached() -> Self {
        SchemaResolver { cache: None }
    }

    pub fn cached() -> Self {
        SchemaResolver {
            cache: Some(RwLock::new(HashMap::new())),
        }
    }

    pub fn resolve(&self, description: &ProtobufDescription) -> Result<ResolvedSchema, SchemaError> {
        let cache = match &self.cache {
            Some(cache) => cache,
            None => return resolve(&description.schema_set, &description.message_name),
        };

        let key: CacheKey = (
            description.message_name.clone(),
            Sha256::digest(&description.schema_set).into(),
        );
        if let Some(schema) = cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(schema.clone());
        }

        // Failures are not cached; they are surfaced every time.
        let schema = resolve(&description.schema_set, &description.message_name)?;
        debug!(message = %schema.full_name(), "cached resolved schema");
        cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, schema.clone());
        Ok(schema)
    }

    #[cfg(test)]
    fn cached_len(&self) -> usize {
        self.cache
            .as_ref()
            .map(|c| c.read().unwrap_or_else(PoisonError::into_inner).len())
            .unwrap_or(0)
    }
}
