// Native library loading and symbol binding
//
// Opening a shared library and resolving symbols by name is left to a
// `LibraryLoader` implementation. This module only tracks which handles are
// open and whether the runtime is fully bound, and closes handles in a fixed
// order.

use crate::error::SplashError;
use crate::models::SplashPaths;
use crate::services::runtime::RuntimeLibrary;
use camino::Utf8Path;
use std::fmt;
use std::sync::Arc;

/// An open shared library; dropping the handle closes it
pub trait NativeLibrary: Send {
    fn path(&self) -> &Utf8Path;
}

/// Opens shared libraries and binds the runtime's entry points
#[cfg_attr(test, mockall::automock)]
pub trait LibraryLoader: Send + Sync {
    /// Open the library at `path`, or `None` if it cannot be loaded
    fn open(&self, path: &Utf8Path) -> Option<Box<dyn NativeLibrary>>;

    /// Resolve every symbol the splash needs from the opened libraries
    fn bind(&self, libraries: &LoadedLibraries) -> Result<Arc<dyn RuntimeLibrary>, SplashError>;
}

/// Handles of the runtime and toolkit libraries, whichever are open
#[derive(Default)]
pub struct LoadedLibraries {
    pub runtime: Option<Box<dyn NativeLibrary>>,
    pub toolkit: Option<Box<dyn NativeLibrary>>,
}

impl LoadedLibraries {
    /// Close open handles, runtime library first
    pub fn close(&mut self) {
        for library in [self.runtime.take(), self.toolkit.take()].into_iter().flatten() {
            tracing::debug!("Closing shared library: {}", library.path());
            drop(library);
        }
    }
}

impl fmt::Debug for LoadedLibraries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedLibraries")
            .field("runtime", &self.runtime.as_ref().map(|l| l.path().to_string()))
            .field("toolkit", &self.toolkit.as_ref().map(|l| l.path().to_string()))
            .finish()
    }
}

/// Load both native libraries and bind the runtime
///
/// Whatever handles were opened are returned even on failure, so teardown
/// can close them.
pub fn load(
    loader: &dyn LibraryLoader,
    paths: &SplashPaths,
) -> (LoadedLibraries, Result<Arc<dyn RuntimeLibrary>, SplashError>) {
    tracing::debug!("Loading runtime library from: {}", paths.runtime_library);
    tracing::debug!("Loading toolkit library from: {}", paths.toolkit_library);

    let libraries = LoadedLibraries {
        runtime: loader.open(&paths.runtime_library),
        toolkit: loader.open(&paths.toolkit_library),
    };

    let missing = if libraries.runtime.is_none() {
        Some(&paths.runtime_library)
    } else if libraries.toolkit.is_none() {
        Some(&paths.toolkit_library)
    } else {
        None
    };

    if let Some(path) = missing {
        tracing::error!("Failed to load splash runtime library: {}", path);
        return (libraries, Err(SplashError::LibraryLoad(path.clone())));
    }

    let bound = loader.bind(&libraries);
    if let Err(e) = &bound {
        tracing::error!("Failed to bind splash runtime: {}", e);
    }

    (libraries, bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use std::sync::Mutex;

    struct StubLibrary {
        path: Utf8PathBuf,
        closed: Arc<Mutex<Vec<String>>>,
    }

    impl NativeLibrary for StubLibrary {
        fn path(&self) -> &Utf8Path {
            &self.path
        }
    }

    impl Drop for StubLibrary {
        fn drop(&mut self) {
            self.closed.lock().unwrap().push(self.path.to_string());
        }
    }

    fn paths() -> SplashPaths {
        SplashPaths {
            dependencies_dir: "/app".into(),
            runtime_library: "/app/libtcl.so".into(),
            toolkit_library: "/app/libtk.so".into(),
            module_dir: "/app/tk".into(),
        }
    }

    fn loader_failing_on(failing: &'static str, closed: Arc<Mutex<Vec<String>>>) -> MockLibraryLoader {
        let mut loader = MockLibraryLoader::new();
        loader.expect_open().times(2).returning(move |path| {
            if path.as_str() == failing {
                None
            } else {
                Some(Box::new(StubLibrary {
                    path: path.to_path_buf(),
                    closed: Arc::clone(&closed),
                }) as Box<dyn NativeLibrary>)
            }
        });
        loader.expect_bind().never();
        loader
    }

    #[test]
    fn test_second_library_failure_keeps_first_handle() {
        let closed = Arc::new(Mutex::new(Vec::new()));
        let loader = loader_failing_on("/app/libtk.so", Arc::clone(&closed));

        let (mut libraries, bound) = load(&loader, &paths());

        assert!(matches!(bound, Err(SplashError::LibraryLoad(p)) if p == "/app/libtk.so"));
        assert!(libraries.runtime.is_some());
        assert!(libraries.toolkit.is_none());
        assert!(closed.lock().unwrap().is_empty());

        libraries.close();
        assert_eq!(*closed.lock().unwrap(), vec!["/app/libtcl.so".to_string()]);
        assert!(libraries.runtime.is_none());
    }

    #[test]
    fn test_first_library_failure_still_opens_second() {
        let closed = Arc::new(Mutex::new(Vec::new()));
        let loader = loader_failing_on("/app/libtcl.so", Arc::clone(&closed));

        let (libraries, bound) = load(&loader, &paths());

        assert!(matches!(bound, Err(SplashError::LibraryLoad(p)) if p == "/app/libtcl.so"));
        assert!(libraries.toolkit.is_some());
    }

    #[test]
    fn test_bind_failure_is_reported() {
        let closed = Arc::new(Mutex::new(Vec::new()));
        let mut loader = MockLibraryLoader::new();
        let closed_for_open = Arc::clone(&closed);
        loader.expect_open().times(2).returning(move |path| {
            Some(Box::new(StubLibrary {
                path: path.to_path_buf(),
                closed: Arc::clone(&closed_for_open),
            }) as Box<dyn NativeLibrary>)
        });
        loader
            .expect_bind()
            .times(1)
            .returning(|_| Err(SplashError::SymbolBinding("Tcl_CreateInterp".to_string())));

        let (mut libraries, bound) = load(&loader, &paths());
        assert!(matches!(bound, Err(SplashError::SymbolBinding(_))));

        libraries.close();
        assert_eq!(
            *closed.lock().unwrap(),
            vec!["/app/libtcl.so".to_string(), "/app/libtk.so".to_string()]
        );
    }
}
