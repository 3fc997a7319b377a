//! JSON <-> protobuf conversion driven by a [`ResolvedSchema`].
//!
//! Both directions are pure functions of their inputs. Callers must take the
//! content length from the returned bytes, never from the original body.

use prost::Message;
use prost_reflect::{DynamicMessage, SerializeOptions};

use crate::error::TranscodeError;
use crate::schema::ResolvedSchema;

/// Read `json` as a message of `schema` and encode it in the binary wire form.
///
/// Keys may be either the schema's field names or their lowerCamelCase JSON
/// names. Unknown keys, type mismatches and trailing input are errors.
pub fn json_to_binary(json: &[u8], schema: &ResolvedSchema) -> Result<Vec<u8>, TranscodeError> {
    let json_error = |source| TranscodeError::Json {
        message: schema.full_name().to_string(),
        source,
    };

    let mut deserializer = serde_json::Deserializer::from_slice(json);
    let message = DynamicMessage::deserialize(schema.descriptor().clone(), &mut deserializer)
        .map_err(json_error)?;
    deserializer.end().map_err(json_error)?;

    Ok(message.encode_to_vec())
}

/// Decode `binary` as a message of `schema` and render it as JSON.
///
/// Output keys are the schema's field names; fields holding their default
/// value are omitted.
pub fn binary_to_json(binary: &[u8], schema: &ResolvedSchema) -> Result<Vec<u8>, TranscodeError> {
    let message = DynamicMessage::decode(schema.descriptor().clone(), binary).map_err(|source| {
        TranscodeError::Binary {
            message: schema.full_name().to_string(),
            source,
        }
    })?;

    let options = SerializeOptions::new().use_proto_field_name(true);
    let mut serializer = serde_json::Serializer::new(Vec::new());
    message
        .serialize_with_options(&mut serializer, &options)
        .map_err(|source| TranscodeError::Render {
            message: schema.full_name().to_string(),
            source,
        })?;

    Ok(serializer.into_inner())
}
