//! Contract assembly: put the registry's encoding metadata back into the
//! contract document produced by the upstream core.
//!
//! The upstream core has no notion of wire encodings, so the document it
//! returns from `POST /pact` lacks them. The registry is authoritative: for
//! every interaction whose signature is registered, both encodings are
//! overwritten with the registered ones; every other interaction is left
//! plain.

use tracing::debug;
use wirepact_contract::{ContractDocument, EncodingDescriptor};

use crate::error::DispatchError;
use crate::registry::InteractionRegistry;

/// File name used when the consumer name cannot be used as one.
const FALLBACK_FILE_STEM: &str = "contract";

/// A merged contract, ready to be persisted and returned.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledContract {
    pub document: ContractDocument,
    /// Serialized `document`.
    pub bytes: Vec<u8>,
    /// `<consumer>.proto.json`
    pub file_name: String,
}

/// Copy registered encodings onto the interactions of `document`.
///
/// Returns how many interactions matched a registration.
pub fn merge_encodings(document: &mut ContractDocument, registry: &InteractionRegistry) -> usize {
    let mut matched = 0;
    for interaction in &mut document.interactions {
        let signature = interaction.signature();
        match registry.get(&signature) {
            Some(registered) => {
                interaction.request.encoding = registered.request.encoding.clone();
                interaction.response.encoding = registered.response.encoding.clone();
                matched += 1;
            }
            None => {
                debug!(%signature, "no registration for contract interaction");
                interaction.request.encoding = EncodingDescriptor::Plain;
                interaction.response.encoding = EncodingDescriptor::Plain;
            }
        }
    }
    matched
}

/// Parse the upstream core's contract, merge encodings and serialize it.
pub fn assemble(
    core_document: &[u8],
    registry: &InteractionRegistry,
) -> Result<AssembledContract, DispatchError> {
    let mut document =
        ContractDocument::from_slice(core_document).map_err(DispatchError::InvalidContract)?;
    let matched = merge_encodings(&mut document, registry);
    let bytes = document.to_vec().map_err(DispatchError::InvalidContract)?;
    debug!(
        interactions = document.interactions.len(),
        matched, "assembled contract"
    );

    Ok(AssembledContract {
        file_name: contract_file_name(&document.consumer.name),
        document,
        bytes,
    })
}

/// `<consumer>.proto.json`, falling back to `contract.proto.json` when the
/// consumer name is empty or would escape the pact directory.
pub fn contract_file_name(consumer: &str) -> String {
    let stem = if consumer.is_empty()
        || consumer.contains('/')
        || consumer.contains('\\')
        || consumer.contains("..")
    {
        FALLBACK_FILE_STEM
    } else {
        consumer
    };
    format!("{}.proto.json", stem)
}
