//! Interactions and contract documents.
//!
//! Headers, bodies and matching rules are kept as `serde_json::Value`: the
//! proxy never interprets them, it only has to hand them back unchanged.
//! Unknown fields are collected into `extra` maps for the same reason.

use serde::{Deserialize, Serialize};

use crate::encoding::EncodingDescriptor;
use crate::matcher::PossiblyRegexedString;
use crate::signature::InteractionSignature;
use crate::ContractError;

type ExtraFields = serde_json::Map<String, serde_json::Value>;

// ── Request / response ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRequest {
    pub method: String,
    pub path: PossiblyRegexedString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<PossiblyRegexedString>,
    #[serde(default, skip_serializing_if = "EncodingDescriptor::is_plain")]
    pub encoding: EncodingDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    /// Only present in contract documents, never in registrations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching_rules: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResponse {
    pub status: u16,
    #[serde(default, skip_serializing_if = "EncodingDescriptor::is_plain")]
    pub encoding: EncodingDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching_rules: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl Default for ProviderResponse {
    fn default() -> Self {
        ProviderResponse {
            status: 200,
            encoding: EncodingDescriptor::Plain,
            headers: None,
            body: None,
            matching_rules: None,
            extra: ExtraFields::new(),
        }
    }
}

// ── Interaction ─────────────────────────────────────────────────────

/// One request/response example, as posted to `POST /interactions` or found
/// in a contract document's `interactions` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_state: Option<String>,
    pub request: ProviderRequest,
    pub response: ProviderResponse,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl Interaction {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ContractError> {
        serde_json::from_slice(bytes).map_err(|source| ContractError::Malformed {
            kind: "interaction",
            source,
        })
    }

    pub fn signature(&self) -> InteractionSignature {
        InteractionSignature::from_request(&self.request)
    }
}

// ── Contract document ───────────────────────────────────────────────

/// Consumer or provider identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pacticipant {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecificationVersion {
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pact_specification: Option<SpecificationVersion>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// A full pact file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractDocument {
    pub consumer: Pacticipant,
    pub provider: Pacticipant,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
    #[serde(default)]
    pub metadata: ContractMetadata,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl ContractDocument {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ContractError> {
        serde_json::from_slice(bytes).map_err(|source| ContractError::Malformed {
            kind: "contract",
            source,
        })
    }

    /// Serialize to the bytes written to disk and returned to callers.
    pub fn to_vec(&self) -> Result<Vec<u8>, ContractError> {
        serde_json::to_vec(self).map_err(ContractError::Serialize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registration_without_encoding_is_plain() {
        let interaction: Interaction = serde_json::from_value(json!({
            "description": "a request for users",
            "providerState": "users exist",
            "request": {"method": "GET", "path": "/users", "query": "type=verified"},
            "response": {"status": 200, "body": {"name": "Joe"}}
        }))
        .unwrap();
        assert!(interaction.request.encoding.is_plain());
        assert!(interaction.response.encoding.is_plain());
        assert_eq!(interaction.signature().to_string(), "GET /users?type=verified");
    }

    #[test]
    fn unknown_fields_round_trip() {
        let source = json!({
            "description": "d",
            "request": {"method": "GET", "path": "/", "generators": {"x": 1}},
            "response": {"status": 201},
            "_id": "abc"
        });
        let interaction: Interaction = serde_json::from_value(source.clone()).unwrap();
        assert_eq!(serde_json::to_value(&interaction).unwrap(), source);
    }

    #[test]
    fn plain_encoding_is_omitted_on_output() {
        let interaction = Interaction {
            request: ProviderRequest {
                method: "GET".into(),
                path: "/".into(),
                ..ProviderRequest::default()
            },
            ..Interaction::default()
        };
        let value = serde_json::to_value(&interaction).unwrap();
        assert!(value["request"].get("encoding").is_none());
        assert!(value["response"].get("encoding").is_none());
    }

    #[test]
    fn contract_document_parses_metadata() {
        let document = ContractDocument::from_slice(
            br#"{
                "consumer": {"name": "web"},
                "provider": {"name": "users"},
                "interactions": [],
                "metadata": {"pactSpecification": {"version": "2.0.0"}}
            }"#,
        )
        .unwrap();
        assert_eq!(document.consumer.name, "web");
        assert_eq!(
            document.metadata.pact_specification,
            Some(SpecificationVersion {
                version: "2.0.0".into()
            })
        );
    }

    #[test]
    fn malformed_interaction_reports_kind() {
        let err = Interaction::from_slice(b"{not json").unwrap_err();
        assert!(err.to_string().starts_with("malformed interaction document"));
    }
}
