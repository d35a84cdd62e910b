//! Services module - everything the splash controller talks to below the thread protocol.
//!
//! Services hold no lifecycle state of their own. The controller in [`crate::ui`] decides
//! when each one runs and which thread it runs on.
//!
//! # Components
//!
//! - [`ResourceStore`]: reads the splash resource entry from the host archive, computes
//!   destination paths and extracts requirement files
//! - [`Archive`]: read access to the host archive, with [`MemoryArchive`] as an in-memory
//!   implementation and [`extract_all`] as the host's unpacking loop
//! - [`library`]: opening the two native libraries and binding the runtime through a
//!   [`LibraryLoader`]
//! - [`runtime`]: the [`RuntimeLibrary`] / [`Interpreter`] seam to the embedded GUI runtime
//! - [`environment`]: command overrides that confine the runtime to bundled files
//! - [`paths`]: bounded path joining and directory helpers
//!
//! # Threading
//!
//! [`Interpreter`] values are created on the GUI thread and never leave it. Everything
//! else in this module may be used from the bootstrap thread.

pub mod archive;
pub mod environment;
pub mod library;
pub mod paths;
pub mod resources;
pub mod runtime;

pub use archive::{Archive, EntryHandle, EntryKind, MemoryArchive, ProgressSink, extract_all};
pub use library::{LibraryLoader, LoadedLibraries, NativeLibrary};
pub use resources::ResourceStore;
pub use runtime::{
    CommandHandler, CommandOutcome, Interpreter, RuntimeError, RuntimeLibrary, RuntimeWaker,
};
