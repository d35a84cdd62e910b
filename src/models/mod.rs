//! Data models for the splash controller.
//!
//! - [`ResourceHeader`]: the decoded descriptor locating script, image and requirements
//!   inside the splash resource entry, plus [`SplashResourceBuilder`] for the encoded form
//! - [`RequirementsList`]: flat NUL-terminated list of files to extract before start
//! - [`SplashResources`] / [`SplashPaths`]: owned buffers and destination paths
//! - [`SplashContext`]: everything guarded by the controller's context lock
//! - [`SplashSettings`]: configuration loaded from `splash.yaml`
//!
//! # Ownership
//!
//! The raw resource is read once and copied into [`SplashResources`]; the image buffer is
//! later moved into the GUI runtime. Library handles in [`SplashContext`] are closed by
//! dropping them, which only the teardown protocol does.

pub mod context;
pub mod header;
pub mod settings;

pub use context::{BootstrapEnvironment, DeploymentMode, SplashContext, SplashPaths, SplashResources};
pub use header::{
    BlobRange, FixedName, HEADER_LEN, NAME_FIELD_LEN, RequirementsList, ResourceHeader,
    SplashResourceBuilder,
};
pub use settings::{LoggingSettings, SplashSettings};
