//! Wire-encoding metadata attached to a request or response.
//!
//! On the wire an encoding looks like
//! `{"type": "protobuf", "description": {"messageName": "Person", "fileDescriptorSet": [10, 14, ...]}}`.
//! The schema set travels as a JSON array of byte values, not base64.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The only structured encoding currently understood.
pub const PROTOBUF_ENCODING: &str = "protobuf";

/// How a request or response body is represented on the real wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EncodingDescriptor {
    /// No special encoding: the body is opaque JSON/text and passes through.
    #[default]
    Plain,
    /// The body is a protobuf message described by an inline schema set.
    Protobuf(ProtobufDescription),
}

/// Schema information for a protobuf-encoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtobufDescription {
    /// Name of the top-level message within `schema_set`.
    pub message_name: String,
    /// Serialized `FileDescriptorSet` holding the message and its dependencies.
    pub schema_set: Vec<u8>,
}

impl EncodingDescriptor {
    pub fn protobuf(message_name: impl Into<String>, schema_set: Vec<u8>) -> Self {
        EncodingDescriptor::Protobuf(ProtobufDescription {
            message_name: message_name.into(),
            schema_set,
        })
    }

    pub fn is_plain(&self) -> bool {
        matches!(self, EncodingDescriptor::Plain)
    }

    /// The protobuf description, if this encoding requires transcoding.
    pub fn as_protobuf(&self) -> Option<&ProtobufDescription> {
        match self {
            EncodingDescriptor::Plain => None,
            EncodingDescriptor::Protobuf(description) => Some(description),
        }
    }
}

#[derive(Deserialize)]
struct RawEncoding {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    description: Option<RawDescription>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDescription {
    message_name: String,
    #[serde(deserialize_with = "deserialize_byte_array")]
    file_descriptor_set: Vec<u8>,
}

#[derive(Serialize)]
struct WireEncoding<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    description: WireDescription<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireDescription<'a> {
    message_name: &'a str,
    file_descriptor_set: &'a [u8],
}

/// Accepts integral numbers in `0..=255`. Clients that build the array from
/// floating point values send `10.0`, which is accepted as well.
fn deserialize_byte_array<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<f64>::deserialize(deserializer)?;
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            if value.fract() == 0.0 && (0.0..=255.0).contains(&value) {
                Ok(value as u8)
            } else {
                Err(D::Error::custom(format!(
                    "fileDescriptorSet[{}] = {} is not a byte value",
                    index, value
                )))
            }
        })
        .collect()
}

impl<'de> Deserialize<'de> for EncodingDescriptor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = match Option::<RawEncoding>::deserialize(deserializer)? {
            Some(raw) => raw,
            None => return Ok(EncodingDescriptor::Plain),
        };

        match raw.kind.as_deref() {
            None | Some("") => Ok(EncodingDescriptor::Plain),
            Some(PROTOBUF_ENCODING) => match raw.description {
                Some(description) => Ok(EncodingDescriptor::Protobuf(ProtobufDescription {
                    message_name: description.message_name,
                    schema_set: description.file_descriptor_set,
                })),
                None => Err(D::Error::custom(
                    "protobuf encoding requires a description with messageName and fileDescriptorSet",
                )),
            },
            Some(other) => Err(D::Error::custom(format!(
                "unsupported encoding type '{}'",
                other
            ))),
        }
    }
}

impl Serialize for EncodingDescriptor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            EncodingDescriptor::Plain => serializer.serialize_none(),
            EncodingDescriptor::Protobuf(description) => WireEncoding {
                kind: PROTOBUF_ENCODING,
                description: WireDescription {
                    message_name: &description.message_name,
                    file_descriptor_set: &description.schema_set,
                },
            }
            .serialize(serializer),
        }
    }
}
