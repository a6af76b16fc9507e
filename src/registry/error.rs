//! Registry error types

use thiserror::Error;

use super::entry::ListenerId;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Listener id was never issued or has already been removed
    #[error("listener not found: {0}")]
    ListenerNotFound(ListenerId),
    /// Labels must be non-empty
    #[error("topic label must not be empty")]
    EmptyLabel,
}
