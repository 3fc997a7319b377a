//! The `(method, path, query)` key interactions are registered under.

use std::fmt;

use crate::types::ProviderRequest;

/// Identifies an interaction by what a caller can observe on the wire.
///
/// Provider state is deliberately not part of the key, so two interactions
/// on the same endpoint under different provider states collide.
///
/// All construction goes through [`InteractionSignature::new`], which
/// upper-cases the method, gives the path exactly one leading `/` and strips
/// one leading `?` from the query. Registration (`"?type=verified"`) and the
/// raw query of a live request (`"type=verified"`) therefore agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InteractionSignature {
    method: String,
    path: String,
    query: String,
}

impl InteractionSignature {
    pub fn new(method: &str, path: &str, query: &str) -> Self {
        InteractionSignature {
            method: method.to_ascii_uppercase(),
            path: format!("/{}", path.trim_start_matches('/')),
            query: query.strip_prefix('?').unwrap_or(query).to_string(),
        }
    }

    /// Signature of a recorded request, using the example value of any regex term.
    pub fn from_request(request: &ProviderRequest) -> Self {
        let query = request.query.as_ref().map(|q| q.example()).unwrap_or("");
        InteractionSignature::new(&request.method, request.path.example(), query)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

impl fmt::Display for InteractionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.query.is_empty() {
            write!(f, "{} {}", self.method, self.path)
        } else {
            write!(f, "{} {}?{}", self.method, self.path, self.query)
        }
    }
}
