//! wirepact-core: interaction registry, runtime protobuf schemas and the
//! request dispatcher of the serialization proxy.
//!
//! # Public API
//!
//! - [`InteractionRegistry`] -- signature-keyed store of registered interactions
//! - [`SchemaResolver`] / [`resolve`] -- build a message descriptor from a
//!   serialized `FileDescriptorSet`
//! - [`json_to_binary`] / [`binary_to_json`] -- schema-driven body conversion
//! - [`Dispatcher`] -- one proxied exchange, builtin routes included
//! - [`assemble`] -- merge encoding metadata into the upstream's contract
//! - [`UpstreamClient`] / [`ContractWriter`] -- injected I/O capabilities
//!
//! Nothing in this crate opens a socket or touches the filesystem directly.

pub mod assemble;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod persist;
pub mod registry;
pub mod schema;
pub mod transcode;
pub mod upstream;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

// ── Convenience re-exports ───────────────────────────────────────────

pub use assemble::{assemble, contract_file_name, merge_encodings, AssembledContract};
pub use config::{ProxyConfig, ProxyMode};
pub use dispatch::Dispatcher;
pub use error::{
    ConflictError, DispatchError, PersistError, SchemaError, TranscodeError, UpstreamError,
};
pub use persist::ContractWriter;
pub use registry::InteractionRegistry;
pub use schema::{resolve, ResolvedSchema, SchemaResolver};
pub use transcode::{binary_to_json, json_to_binary};
pub use upstream::UpstreamClient;
