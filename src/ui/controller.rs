// Splash Controller - drives the splash screen from the bootstrap thread
//
// This module contains the SplashController which coordinates between:
// - ResourceStore (splash resource decoding and requirement extraction)
// - LibraryLoader (native runtime and toolkit libraries)
// - the GUI thread (interpreter, event loop)
// - the event channel (sync / async commands into the GUI thread)
//
// It handles:
// - The start handshake with the GUI thread
// - Cross-thread command dispatch
// - Thread-aware teardown

use crate::error::SplashError;
use crate::metrics::DispatchMetrics;
use crate::models::{BootstrapEnvironment, SplashSettings};
use crate::services::archive::{Archive, ProgressSink};
use crate::services::library::{self, LibraryLoader};
use crate::services::resources::ResourceStore;
use crate::state::{SplashState, StateChange};
use crate::ui::channel::{Command, Dispatch, Event, EventScope};
use crate::ui::gui_thread;
use crate::ui::shared::Shared;
use crate::ui::teardown;
use std::io;
use std::sync::atomic::Ordering;
use std::sync::{Arc, PoisonError};
use std::thread::{self, JoinHandle};
use tokio::sync::broadcast;

/// Body of the GUI thread, handed to a [`ThreadSpawner`]
pub type GuiThreadBody = Box<dyn FnOnce() + Send + 'static>;

/// Starts the GUI thread from a named [`thread::Builder`]
pub type ThreadSpawner =
    Arc<dyn Fn(thread::Builder, GuiThreadBody) -> io::Result<JoinHandle<()>> + Send + Sync>;

/// Result of [`SplashController::setup`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupOutcome {
    /// Resources loaded; continue with `extract` and `load_libraries`
    Ready,
    /// The archive carries no splash resource; every later call is a no-op
    Disabled,
}

/// Cross-thread splash screen controller
///
/// Owned by the bootstrap thread. The typical sequence is:
///
/// 1. [`setup()`](Self::setup) - read the splash resource from the archive
/// 2. [`extract()`](Self::extract) - unpack the runtime's dependencies (onefile only)
/// 3. [`load_libraries()`](Self::load_libraries) - open and bind the native runtime
/// 4. [`start()`](Self::start) - spawn the GUI thread and wait for its handshake
/// 5. [`send()`](Self::send) / [`update_progress()`](Self::update_progress) while unpacking
/// 6. [`finalize()`](Self::finalize) - from either thread; also run on drop
///
/// # Example
/// ```ignore
/// let controller = SplashController::new(settings, environment, loader);
/// if controller.setup(&archive)? == SetupOutcome::Ready {
///     controller.extract(&archive)?;
///     controller.load_libraries()?;
///     controller.start(&executable)?;
/// }
/// extract_all(&archive, &dest, &controller)?;
/// controller.finalize();
/// ```
pub struct SplashController {
    shared: Arc<Shared>,

    /// Application home directory and deployment mode
    environment: BootstrapEnvironment,

    /// Opens the two native libraries and binds the runtime
    loader: Arc<dyn LibraryLoader>,

    spawner: ThreadSpawner,
}

impl SplashController {
    /// Create an idle controller
    ///
    /// # Arguments
    /// * `settings` - Path limit, thread name and runtime variable names
    /// * `environment` - Where the application lives and how it was deployed
    /// * `loader` - Native library loader used by [`load_libraries()`](Self::load_libraries)
    pub fn new(
        settings: SplashSettings,
        environment: BootstrapEnvironment,
        loader: Arc<dyn LibraryLoader>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared::new(settings)),
            environment,
            loader,
            spawner: Arc::new(|builder: thread::Builder, body: GuiThreadBody| {
                builder.spawn(body)
            }),
        }
    }

    /// Replace how the GUI thread is started
    ///
    /// The default spawns an OS thread. Embedders that manage their own
    /// threads (or refuse to create one) plug in here.
    pub fn with_thread_spawner(mut self, spawner: ThreadSpawner) -> Self {
        self.spawner = spawner;
        self
    }

    /// Read the splash resource and copy its contents into the context
    ///
    /// # Returns
    /// - `SetupOutcome::Disabled` when the archive has no splash resource
    /// - `SetupOutcome::Ready` otherwise
    ///
    /// # Errors
    /// Malformed resource, path too long, or allocation failure. The
    /// controller stays `Idle`; dropping it releases everything.
    pub fn setup(&self, archive: &dyn Archive) -> Result<SetupOutcome, SplashError> {
        if self.is_disabled() {
            return Ok(SetupOutcome::Disabled);
        }

        let state = self.state();
        if state != SplashState::Idle {
            return Err(SplashError::InvalidTransition {
                from: state,
                to: SplashState::ResourcesLoaded,
            });
        }

        let Some(resources) =
            ResourceStore::load(archive, &self.environment, &self.shared.settings)?
        else {
            self.shared.lifecycle.disable();
            return Ok(SetupOutcome::Disabled);
        };

        self.shared.lock_context().resources = Some(resources);
        self.shared.lifecycle.transition(SplashState::ResourcesLoaded)?;
        Ok(SetupOutcome::Ready)
    }

    /// Extract the runtime's requirement files from the archive
    ///
    /// # Returns
    /// The number of files extracted; `0` in onedir mode or when disabled
    ///
    /// # Errors
    /// `AlreadyStarted` once a GUI thread exists, since it owns the context
    /// lock from then on.
    pub fn extract(&self, archive: &dyn Archive) -> Result<usize, SplashError> {
        if self.is_disabled() {
            return Ok(0);
        }

        match self.state() {
            SplashState::Idle => return Err(SplashError::ResourcesNotLoaded),
            SplashState::HandshakePending | SplashState::Running => {
                return Err(SplashError::AlreadyStarted);
            }
            _ if self.shared.gui_thread.get().is_some() => {
                return Err(SplashError::AlreadyStarted);
            }
            _ => {}
        }

        let context = self.shared.lock_context();
        let resources = context
            .resources
            .as_ref()
            .ok_or(SplashError::ResourcesNotLoaded)?;

        ResourceStore::extract_requirements(resources, archive)
    }

    /// Open both native libraries and bind the runtime
    ///
    /// # Errors
    /// `LibraryLoad` / `SymbolBinding`. Whatever handles were opened stay in
    /// the context and are closed by [`finalize()`](Self::finalize).
    pub fn load_libraries(&self) -> Result<(), SplashError> {
        if self.is_disabled() {
            return Ok(());
        }

        match self.state() {
            SplashState::ResourcesLoaded => {}
            SplashState::Idle => return Err(SplashError::ResourcesNotLoaded),
            from => {
                return Err(SplashError::InvalidTransition {
                    from,
                    to: SplashState::LibrariesBound,
                });
            }
        }

        let mut context = self.shared.lock_context();
        let paths = context
            .resources
            .as_ref()
            .map(|resources| resources.paths.clone())
            .ok_or(SplashError::ResourcesNotLoaded)?;

        let (libraries, bound) = library::load(self.loader.as_ref(), &paths);
        context.libraries = libraries;

        match bound {
            Ok(runtime) => {
                context.runtime = Some(runtime);
                self.shared.fully_loaded.store(true, Ordering::SeqCst);
                drop(context);
                self.shared.lifecycle.transition(SplashState::LibrariesBound)?;
                tracing::info!("Splash runtime libraries loaded");
                Ok(())
            }
            Err(e) => {
                drop(context);
                self.shared.lifecycle.close();
                Err(e)
            }
        }
    }

    /// Spawn the GUI thread and block until it finished its setup
    ///
    /// Returns once the GUI thread is either running its event loop or has
    /// given up; [`state()`](Self::state) tells which.
    ///
    /// # Arguments
    /// * `executable` - Path of the running executable, handed to the runtime
    ///
    /// # Errors
    /// - `LibrariesNotLoaded` before a successful [`load_libraries()`](Self::load_libraries)
    /// - `AlreadyStarted` if a GUI thread was already spawned
    /// - `InvalidThreadName` if the configured thread name contains a NUL byte
    /// - `ThreadCreation` if the OS refused the thread; the controller is then finalized
    pub fn start(&self, executable: &str) -> Result<(), SplashError> {
        if self.is_disabled() {
            return Ok(());
        }

        match self.state() {
            SplashState::LibrariesBound => {}
            SplashState::Idle | SplashState::ResourcesLoaded => {
                return Err(SplashError::LibrariesNotLoaded);
            }
            SplashState::HandshakePending | SplashState::Running => {
                return Err(SplashError::AlreadyStarted);
            }
            SplashState::Closing | SplashState::Finalized => {
                return Err(match self.shared.gui_thread.get() {
                    Some(_) => SplashError::AlreadyStarted,
                    None => SplashError::LibrariesNotLoaded,
                });
            }
        }

        let thread_name = &self.shared.settings.thread_name;
        if thread_name.contains('\0') {
            return Err(SplashError::InvalidThreadName(thread_name.clone()));
        }

        let context = self.shared.lock_context();
        let runtime = context
            .runtime
            .clone()
            .ok_or(SplashError::LibrariesNotLoaded)?;

        runtime.find_executable(executable);
        self.shared.lifecycle.transition(SplashState::HandshakePending)?;

        let thread_shared = Arc::clone(&self.shared);
        let spawned = (self.spawner)(
            thread::Builder::new().name(thread_name.clone()),
            Box::new(move || gui_thread::run(thread_shared, runtime)),
        );

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!("Could not create splash GUI thread: {}", e);
                drop(context);
                self.shared.lifecycle.close();
                teardown::from_bootstrap(&self.shared);
                return Err(SplashError::ThreadCreation(e));
            }
        };

        let _ = self.shared.gui_thread.set(handle.thread().id());
        *self
            .shared
            .gui_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);

        // Take the start lock before the GUI thread can get the context
        let handshake = self.shared.handshake.lock();
        drop(context);
        drop(self.shared.handshake.wait(handshake));

        tracing::info!("Splash GUI thread started ({})", self.state());
        Ok(())
    }

    /// Run `callback` on the GUI thread
    ///
    /// With [`Dispatch::Sync`] this blocks until the callback has run and
    /// returns its value. With [`Dispatch::Async`] it returns `0` at once.
    /// Callbacks run in the order they were sent.
    ///
    /// Must not be called from inside an async runtime with `Dispatch::Sync`.
    ///
    /// # Errors
    /// - `SyncCallFromGuiThread` for a synchronous send from the GUI thread
    /// - `NotRunning` when there is no GUI thread servicing events
    /// - `Disconnected` when the GUI thread exited before running the callback
    pub fn send<F>(&self, dispatch: Dispatch, callback: F) -> Result<i32, SplashError>
    where
        F: FnOnce(&mut EventScope<'_>) -> i32 + Send + 'static,
    {
        if self.is_disabled() {
            return Ok(0);
        }

        if dispatch == Dispatch::Sync && self.shared.on_gui_thread() {
            return Err(SplashError::SyncCallFromGuiThread);
        }

        let metrics = &self.shared.metrics;
        let Some(sender) = self.shared.sender() else {
            metrics.record_dropped();
            return Err(SplashError::NotRunning);
        };
        let command = Command::Call(Box::new(callback));

        match dispatch {
            Dispatch::Async => {
                sender
                    .post(Event::post(command))
                    .inspect_err(|_| metrics.record_dropped())?;
                metrics.record_posted();
                metrics.record_async_post();
                Ok(0)
            }
            Dispatch::Sync => {
                let (event, reply) = Event::call(command);
                sender
                    .post(event)
                    .inspect_err(|_| metrics.record_dropped())?;
                metrics.record_posted();

                let result = reply
                    .blocking_recv()
                    .map_err(|_| SplashError::Disconnected)?;
                metrics.record_sync_call();
                Ok(result)
            }
        }
    }

    /// Synchronous [`send()`](Self::send)
    pub fn call<F>(&self, callback: F) -> Result<i32, SplashError>
    where
        F: FnOnce(&mut EventScope<'_>) -> i32 + Send + 'static,
    {
        self.send(Dispatch::Sync, callback)
    }

    /// Asynchronous [`send()`](Self::send)
    pub fn post<F>(&self, callback: F) -> Result<(), SplashError>
    where
        F: FnOnce(&mut EventScope<'_>) -> i32 + Send + 'static,
    {
        self.send(Dispatch::Async, callback).map(|_| ())
    }

    /// Show `entry_name` in the splash's status text
    ///
    /// Fire-and-forget; a no-op when the splash is disabled.
    pub fn update_progress(&self, entry_name: &str) -> Result<(), SplashError> {
        if self.is_disabled() {
            return Ok(());
        }

        let metrics = &self.shared.metrics;
        let sender = self.shared.sender().ok_or_else(|| {
            metrics.record_dropped();
            SplashError::NotRunning
        })?;

        sender
            .post(Event::post(Command::UpdateStatus(entry_name.to_string())))
            .inspect_err(|_| metrics.record_dropped())?;
        metrics.record_posted();
        metrics.record_progress_update();
        Ok(())
    }

    /// Tear the splash screen down
    ///
    /// Idempotent. On the GUI thread (from inside a callback) this only asks
    /// the event loop to stop; the GUI thread then cleans up after itself.
    /// Anywhere else it stops and joins the GUI thread, finalizes the
    /// runtime, and closes the native libraries.
    pub fn finalize(&self) {
        if self.state().is_terminal() {
            return;
        }

        if self.shared.on_gui_thread() {
            tracing::debug!("Finalize requested on splash GUI thread; leaving event loop");
            self.shared.exit_requested.store(true, Ordering::SeqCst);
            return;
        }

        teardown::from_bootstrap(&self.shared);
    }

    pub fn state(&self) -> SplashState {
        self.shared.lifecycle.state()
    }

    pub fn is_disabled(&self) -> bool {
        self.shared.lifecycle.is_disabled()
    }

    /// Both native libraries are open and the runtime is bound
    pub fn is_fully_loaded(&self) -> bool {
        self.shared.fully_loaded.load(Ordering::SeqCst)
    }

    /// Subscribe to lifecycle changes
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.shared.lifecycle.subscribe()
    }

    pub fn settings(&self) -> &SplashSettings {
        &self.shared.settings
    }

    pub fn metrics(&self) -> &DispatchMetrics {
        &self.shared.metrics
    }
}

impl ProgressSink for SplashController {
    fn on_progress(&self, entry_name: &str) {
        if let Err(e) = self.update_progress(entry_name) {
            tracing::trace!("Splash progress update for {} dropped: {}", entry_name, e);
        }
    }
}

impl Drop for SplashController {
    fn drop(&mut self) {
        if self.shared.on_gui_thread() {
            // No bootstrap-side finalize will follow; the GUI thread releases on exit
            self.shared.orphaned.store(true, Ordering::SeqCst);
        }
        self.finalize();
    }
}
