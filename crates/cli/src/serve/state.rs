//! Application state.

use wirepact_core::Dispatcher;

/// Application state shared across request handlers.
pub(crate) struct AppState {
    /// Registry, schema resolver and upstream client behind every route.
    pub(crate) dispatcher: Dispatcher,
}
