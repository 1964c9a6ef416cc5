// ABOUTME: Scope error types with SNAFU pattern.
// ABOUTME: Covers construction failures and the final persist on close.

use snafu::Snafu;

use crate::cloud::CloudError;
use crate::store::StoreError;

/// Errors opening or closing an image scope.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ScopeError {
    #[snafu(display("failed to generate new scope from missing store"))]
    MissingStore,

    #[snafu(display("failed to generate new scope from missing image"))]
    MissingImage,

    #[snafu(display("failed to create cloud client for {name}: {source}"))]
    ClientSetup { name: String, source: CloudError },

    #[snafu(display("failed to persist {name}: {source}"))]
    Persist { name: String, source: StoreError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeErrorKind {
    /// No store handle was supplied.
    MissingStore,
    /// No managed image was supplied.
    MissingImage,
    /// Token, account, zone, or client construction failed.
    ClientSetup,
    /// The closing write to the store failed.
    Persist,
}

impl ScopeError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> ScopeErrorKind {
        match self {
            ScopeError::MissingStore => ScopeErrorKind::MissingStore,
            ScopeError::MissingImage => ScopeErrorKind::MissingImage,
            ScopeError::ClientSetup { .. } => ScopeErrorKind::ClientSetup,
            ScopeError::Persist { .. } => ScopeErrorKind::Persist,
        }
    }

    /// Construction failures are fatal for the pass; nothing was mutated.
    pub fn is_construction(&self) -> bool {
        !matches!(self, ScopeError::Persist { .. })
    }
}
