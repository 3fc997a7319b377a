//! wirepact-contract: typed Pact documents as seen by the serialization proxy.
//!
//! Interactions posted to the mock service and contract documents written by
//! the upstream core are validated once at the boundary and deserialized into
//! the types in this crate. Fields the proxy does not interpret (headers,
//! bodies, matching rules, anything unknown) are carried through verbatim so
//! documents round-trip without losing data.

pub mod encoding;
pub mod matcher;
pub mod signature;
pub mod types;

pub use encoding::{EncodingDescriptor, ProtobufDescription, PROTOBUF_ENCODING};
pub use matcher::PossiblyRegexedString;
pub use signature::InteractionSignature;
pub use types::*;

/// Errors raised while reading interaction or contract JSON.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    /// The bytes are not a valid document of the expected kind.
    #[error("malformed {kind} document: {source}")]
    Malformed {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize contract: {0}")]
    Serialize(#[source] serde_json::Error),
}
