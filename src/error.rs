// Error types for the splash controller
//
// Setup-time failures are returned to the bootstrap thread, which decides
// whether the host keeps running without a splash screen. Failures inside the
// GUI thread never cross the thread boundary; they are logged there.

use crate::state::SplashState;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors reported by the splash controller and its collaborators
#[derive(Error, Debug)]
pub enum SplashError {
    #[error("Malformed splash resource header: {0}")]
    InvalidHeader(String),

    #[error("Invalid name field in splash resource header: {0}")]
    InvalidName(String),

    #[error("Splash script is not valid UTF-8")]
    InvalidScript,

    #[error("Path exceeds maximum path length ({limit}): {path}")]
    PathTooLong { path: Utf8PathBuf, limit: usize },

    #[error("Could not allocate {len} bytes for splash {what}")]
    Allocation { what: &'static str, len: usize },

    #[error("Could not find requirement {0} in archive")]
    RequirementNotFound(String),

    #[error("Could not extract requirement {name}: {source}")]
    Extraction {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not create splash dependencies directory {path}: {source}")]
    DirectoryCreation {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load shared library: {0}")]
    LibraryLoad(Utf8PathBuf),

    #[error("Failed to bind runtime symbols: {0}")]
    SymbolBinding(String),

    #[error("Invalid splash GUI thread name: {0:?}")]
    InvalidThreadName(String),

    #[error("Could not create splash GUI thread (a threaded runtime is required): {0}")]
    ThreadCreation(#[source] std::io::Error),

    #[error("Splash resources are not loaded")]
    ResourcesNotLoaded,

    #[error("Runtime libraries are not loaded")]
    LibrariesNotLoaded,

    #[error("Splash screen already started")]
    AlreadyStarted,

    #[error("Invalid lifecycle transition from {from:?} to {to:?}")]
    InvalidTransition { from: SplashState, to: SplashState },

    #[error("Splash GUI thread is not running")]
    NotRunning,

    #[error("Splash GUI thread exited before servicing the event")]
    Disconnected,

    #[error("Synchronous send from the splash GUI thread would deadlock")]
    SyncCallFromGuiThread,
}
