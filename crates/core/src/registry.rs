//! Thread-safe store of registered interactions keyed by signature.
//!
//! The lock is only ever held for a single map operation. Callers get an
//! `Arc<Interaction>` back so nothing borrowed from the map outlives the
//! critical section, and no guard is held across upstream I/O or
//! transcoding.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};
use wirepact_contract::{ContractDocument, Interaction, InteractionSignature};

use crate::error::ConflictError;

type InteractionMap = HashMap<InteractionSignature, Arc<Interaction>>;

#[derive(Debug, Default)]
pub struct InteractionRegistry {
    interactions: Mutex<InteractionMap>,
}

impl InteractionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry by replaying every interaction of a contract.
    ///
    /// Signatures ignore provider state, so a contract that exercises one
    /// endpoint under several states yields duplicates. The first one wins and
    /// the rest are logged: the proxy only needs their encodings, which a
    /// well-formed contract keeps identical per endpoint.
    pub fn from_contract(document: &ContractDocument) -> Self {
        let registry = Self::new();
        for interaction in &document.interactions {
            let signature = interaction.signature();
            if let Err(conflict) = registry.set(signature, interaction.clone()) {
                warn!(
                    signature = %conflict.signature,
                    description = %interaction.description,
                    "duplicate interaction in contract, keeping the first"
                );
            }
        }
        registry
    }

    /// Insert `interaction` unless `signature` is already registered.
    pub fn set(
        &self,
        signature: InteractionSignature,
        interaction: Interaction,
    ) -> Result<(), ConflictError> {
        let mut interactions = self.lock();
        if interactions.contains_key(&signature) {
            return Err(ConflictError { signature });
        }
        debug!(%signature, "registered interaction");
        interactions.insert(signature, Arc::new(interaction));
        Ok(())
    }

    pub fn get(&self, signature: &InteractionSignature) -> Option<Arc<Interaction>> {
        self.lock().get(signature).cloned()
    }

    /// Withdraw a single registration, returning it if present.
    pub fn remove(&self, signature: &InteractionSignature) -> Option<Arc<Interaction>> {
        self.lock().remove(signature)
    }

    /// Drop every registration.
    pub fn reset(&self) {
        *self.lock() = InteractionMap::new();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Every critical section is one map call, so a panic elsewhere can't
    // leave the map half-updated.
    fn lock(&self) -> MutexGuard<'_, InteractionMap> {
        self.interactions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
