use crate::models::header::RequirementsList;
use crate::services::library::LoadedLibraries;
use crate::services::runtime::RuntimeLibrary;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How the host application was deployed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// Single executable unpacked into a private, temporary directory.
    /// Splash dependencies are extracted into a sub-directory of it.
    OneFile,
    /// Application directory shipped as-is; dependencies sit at its top level.
    OneDir,
}

/// Facts about the running host that the bootstrap loader provides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapEnvironment {
    /// Top-level application directory (temporary in onefile mode)
    pub application_home_dir: Utf8PathBuf,
    pub deployment: DeploymentMode,
}

impl BootstrapEnvironment {
    pub fn new(application_home_dir: impl Into<Utf8PathBuf>, deployment: DeploymentMode) -> Self {
        Self {
            application_home_dir: application_home_dir.into(),
            deployment,
        }
    }

    pub fn is_onefile(&self) -> bool {
        self.deployment == DeploymentMode::OneFile
    }
}

/// Destination paths computed from the resource header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplashPaths {
    /// Directory holding the runtime's dependencies
    pub dependencies_dir: Utf8PathBuf,
    pub runtime_library: Utf8PathBuf,
    pub toolkit_library: Utf8PathBuf,
    /// Directory the toolkit's init script is sourced from
    pub module_dir: Utf8PathBuf,
}

/// Owned copies of everything the splash resource carried
///
/// `script` and `requirements` are written once during setup and only read
/// afterwards. `image` is handed to the runtime and released once consumed.
#[derive(Debug, Clone)]
pub struct SplashResources {
    pub paths: SplashPaths,
    pub deployment: DeploymentMode,
    pub script: String,
    pub image: Option<Vec<u8>>,
    pub requirements: RequirementsList,
}

/// State guarded by the controller's context lock
///
/// Once the GUI thread exists it holds this lock for its whole lifetime, so
/// event callbacks run with exclusive access.
#[derive(Default)]
pub struct SplashContext {
    pub resources: Option<SplashResources>,
    pub libraries: LoadedLibraries,
    pub runtime: Option<Arc<dyn RuntimeLibrary>>,
}

impl std::fmt::Debug for SplashContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplashContext")
            .field("resources", &self.resources)
            .field("libraries", &self.libraries)
            .field("runtime_bound", &self.runtime.is_some())
            .finish()
    }
}
