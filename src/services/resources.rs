// Resource store: reads the splash resource entry into owned buffers

use crate::error::SplashError;
use crate::models::{
    BootstrapEnvironment, DeploymentMode, RequirementsList, ResourceHeader, SplashPaths,
    SplashResources, SplashSettings,
};
use crate::services::archive::Archive;
use crate::services::paths;

/// Loads and extracts splash resources from the host archive
pub struct ResourceStore;

impl ResourceStore {
    /// Read the splash resource entry and copy its contents out
    ///
    /// # Returns
    /// - `Ok(None)` if the archive has no splash resource (feature disabled)
    /// - `Ok(Some(_))` with fully populated buffers and paths
    ///
    /// # Errors
    /// Malformed header, a path exceeding `max_path_len`, or a failed
    /// allocation. Nothing partially built survives an error.
    pub fn load(
        archive: &dyn Archive,
        environment: &BootstrapEnvironment,
        settings: &SplashSettings,
    ) -> Result<Option<SplashResources>, SplashError> {
        let Some(raw) = archive.find_splash_resource() else {
            return Ok(None);
        };
        tracing::debug!("Found splash screen resources ({} bytes)", raw.len());

        let header = ResourceHeader::parse(&raw)?;
        let paths = Self::resolve_paths(&header, environment, settings.max_path_len)?;

        let script = copy_blob(header.script.slice(&raw, "script")?, "script")?;
        let script = String::from_utf8(script).map_err(|_| SplashError::InvalidScript)?;
        let image = copy_blob(header.image.slice(&raw, "image")?, "image")?;
        let requirements = RequirementsList::from_bytes(copy_blob(
            header.requirements.slice(&raw, "requirements")?,
            "requirements",
        )?)?;

        tracing::info!(
            "Loaded splash resources: script={}B image={}B requirements={}B",
            script.len(),
            image.len(),
            requirements.len()
        );

        Ok(Some(SplashResources {
            paths,
            deployment: environment.deployment,
            script,
            image: Some(image),
            requirements,
        }))
    }

    /// Compute destination paths for the runtime's dependencies
    ///
    /// Onedir deployments keep dependencies in the application directory;
    /// onefile deployments unpack them into a dedicated sub-directory so they
    /// cannot collide with the application's own files.
    pub fn resolve_paths(
        header: &ResourceHeader,
        environment: &BootstrapEnvironment,
        max_path_len: usize,
    ) -> Result<SplashPaths, SplashError> {
        let home = &environment.application_home_dir;

        let dependencies_dir = match environment.deployment {
            DeploymentMode::OneFile => {
                paths::join_bounded(home, header.dependencies_dir.as_str(), max_path_len)?
            }
            DeploymentMode::OneDir => home.clone(),
        };

        Ok(SplashPaths {
            runtime_library: paths::join_bounded(
                &dependencies_dir,
                header.runtime_library.as_str(),
                max_path_len,
            )?,
            toolkit_library: paths::join_bounded(
                &dependencies_dir,
                header.toolkit_library.as_str(),
                max_path_len,
            )?,
            module_dir: paths::join_bounded(
                &dependencies_dir,
                header.module_dir.as_str(),
                max_path_len,
            )?,
            dependencies_dir,
        })
    }

    /// Extract every requirement into the dependencies directory
    ///
    /// No-op in onedir mode, where the files already sit next to the
    /// application.
    pub fn extract_requirements(
        resources: &SplashResources,
        archive: &dyn Archive,
    ) -> Result<usize, SplashError> {
        if resources.deployment == DeploymentMode::OneDir {
            return Ok(0);
        }

        let dir = &resources.paths.dependencies_dir;
        if !paths::exists(dir) {
            paths::make_directory(dir)?;
        }

        let mut count = 0;
        for name in &resources.requirements {
            let entry = archive.find_by_name(name).ok_or_else(|| {
                tracing::error!("Could not find splash requirement {} in archive", name);
                SplashError::RequirementNotFound(name.to_string())
            })?;

            archive
                .extract_to_directory(entry, dir)
                .map_err(|source| SplashError::Extraction {
                    name: name.to_string(),
                    source,
                })?;
            count += 1;
        }

        tracing::debug!("Extracted {} splash requirements into {}", count, dir);
        Ok(count)
    }
}

/// Copy a blob into a freshly allocated buffer, reporting allocation failure
fn copy_blob(src: &[u8], what: &'static str) -> Result<Vec<u8>, SplashError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(src.len())
        .map_err(|_| SplashError::Allocation {
            what,
            len: src.len(),
        })?;
    buf.extend_from_slice(src);
    Ok(buf)
}
