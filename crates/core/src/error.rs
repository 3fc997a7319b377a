use std::path::PathBuf;

use http::StatusCode;
use wirepact_contract::{ContractError, InteractionSignature};

/// A second registration under a signature that is already present.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("interaction already registered for {signature}")]
pub struct ConflictError {
    pub signature: InteractionSignature,
}

/// The schema set attached to an interaction cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The bytes are not a serialized `FileDescriptorSet`.
    #[error("schema set is not a valid FileDescriptorSet: {source}")]
    Malformed {
        #[source]
        source: prost::DecodeError,
    },

    /// The files in the set reference types that cannot be resolved.
    #[error("schema set failed to link: {source}")]
    Unlinkable {
        #[source]
        source: prost_reflect::DescriptorError,
    },

    /// No top-level message in the set carries the declared name.
    #[error(
        "declared route's message type '{message_name}' not found{}",
        .path.as_deref().map(|p| format!(" (route {})", p)).unwrap_or_default()
    )]
    MessageNotFound {
        message_name: String,
        path: Option<String>,
    },
}

impl SchemaError {
    /// Attach the request path the failed resolution was made for.
    pub fn for_path(self, request_path: &str) -> Self {
        match self {
            SchemaError::MessageNotFound { message_name, .. } => SchemaError::MessageNotFound {
                message_name,
                path: Some(request_path.to_string()),
            },
            other => other,
        }
    }
}

/// A body does not conform to the resolved message schema.
#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("JSON body cannot be read as message '{message}': {source}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("binary body is not a valid encoding of message '{message}': {source}")]
    Binary {
        message: String,
        #[source]
        source: prost::DecodeError,
    },

    #[error("message '{message}' could not be rendered as JSON: {source}")]
    Render {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Talking to the upstream core failed. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("invalid upstream URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("upstream request to {url} failed: {message}")]
    Transport { url: String, message: String },
}

/// The assembled contract could not be written.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("failed to write contract to {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything a single proxied exchange can fail with.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("invalid interaction registration: {0}")]
    InvalidRegistration(#[source] ContractError),

    #[error("upstream returned an invalid contract document: {0}")]
    InvalidContract(#[source] ContractError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error("no interaction registered for {signature}")]
    LookupMiss { signature: InteractionSignature },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

impl DispatchError {
    /// Status returned to the real caller. Only a registration body that is
    /// not an interaction is the caller's fault.
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::InvalidRegistration(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
