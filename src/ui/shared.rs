// Synchronization state shared by the bootstrap thread and the GUI thread

use crate::metrics::DispatchMetrics;
use crate::models::{SplashContext, SplashSettings};
use crate::state::LifecycleManager;
use crate::ui::channel::EventSender;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

/// One-shot signal: a flag guarded by a mutex plus a condition variable
///
/// Waiters check the flag, so a notification that happens before the wait
/// starts is never lost. Poisoning is ignored; a panicking GUI thread must
/// still be able to release the bootstrap thread.
#[derive(Debug, Default)]
pub(crate) struct Latch {
    signaled: Mutex<bool>,
    cond: Condvar,
}

impl Latch {
    pub(crate) fn lock(&self) -> MutexGuard<'_, bool> {
        self.signaled.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn notify(&self) {
        let mut signaled = self.lock();
        *signaled = true;
        self.cond.notify_all();
    }

    /// Release `guard` and block until the latch is signaled
    pub(crate) fn wait<'a>(&self, guard: MutexGuard<'a, bool>) -> MutexGuard<'a, bool> {
        self.cond
            .wait_while(guard, |signaled| !*signaled)
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// State private to one splash controller, shared with its GUI thread
pub(crate) struct Shared {
    /// Status lock: held by the GUI thread for its whole lifetime
    pub context: Mutex<SplashContext>,

    /// Start handshake; signaled once the GUI thread is running or gave up
    pub handshake: Latch,

    /// Signaled as the very last action of the GUI thread
    pub exit: Latch,

    /// Cooperative shutdown flag, checked once per loop iteration
    pub exit_requested: Arc<AtomicBool>,

    /// Both libraries open and the runtime bound
    pub fully_loaded: AtomicBool,

    /// The controller was dropped on the GUI thread
    pub orphaned: AtomicBool,

    pub gui_thread: OnceLock<ThreadId>,
    pub gui_handle: Mutex<Option<JoinHandle<()>>>,

    /// Present only while the GUI thread services its queue
    pub sender: Mutex<Option<EventSender>>,

    pub lifecycle: LifecycleManager,
    pub metrics: DispatchMetrics,
    pub settings: SplashSettings,
}

impl Shared {
    pub(crate) fn new(settings: SplashSettings) -> Self {
        Self {
            context: Mutex::new(SplashContext::default()),
            handshake: Latch::default(),
            exit: Latch::default(),
            exit_requested: Arc::new(AtomicBool::new(false)),
            fully_loaded: AtomicBool::new(false),
            orphaned: AtomicBool::new(false),
            gui_thread: OnceLock::new(),
            gui_handle: Mutex::new(None),
            sender: Mutex::new(None),
            lifecycle: LifecycleManager::new(),
            metrics: DispatchMetrics::new(),
            settings,
        }
    }

    pub(crate) fn lock_context(&self) -> MutexGuard<'_, SplashContext> {
        self.context.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the caller is the splash GUI thread
    pub(crate) fn on_gui_thread(&self) -> bool {
        self.gui_thread.get() == Some(&thread::current().id())
    }

    pub(crate) fn sender(&self) -> Option<EventSender> {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn install_sender(&self, sender: EventSender) {
        *self.sender.lock().unwrap_or_else(PoisonError::into_inner) = Some(sender);
    }

    pub(crate) fn clear_sender(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub(crate) fn take_gui_handle(&self) -> Option<JoinHandle<()>> {
        self.gui_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
