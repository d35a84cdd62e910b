// Splash GUI thread
//
// Owns the interpreter from creation to deletion. Holds the context lock for
// its whole lifetime, so every event callback runs with it held. Whatever
// way the thread leaves (failed init, loop exit, panic), `ExitSignals`
// releases the bootstrap thread in a fixed order.

use crate::models::SplashContext;
use crate::services::environment;
use crate::services::runtime::{Interpreter, RuntimeError, RuntimeLibrary};
use crate::state::SplashState;
use crate::ui::channel::{self, Event, EventScope};
use crate::ui::shared::Shared;
use crate::ui::teardown;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc;

/// Signals sent as the GUI thread exits, on every exit path
///
/// Runs after the interpreter and the context guard have been dropped.
struct ExitSignals<'a> {
    shared: &'a Shared,
    runtime: &'a dyn RuntimeLibrary,
}

impl ExitSignals<'_> {
    /// Stop accepting events and move the lifecycle to `Closing`
    fn close_channel(&self) {
        self.shared.clear_sender();
        self.shared.lifecycle.close();
    }
}

impl Drop for ExitSignals<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::error!("Splash GUI thread panicked; releasing bootstrap thread");
        }

        self.close_channel();

        // Startup may have failed before the handshake
        self.shared.handshake.notify();

        // Must finish before the bootstrap thread may unload the libraries
        self.runtime.finalize_thread();

        if self.shared.orphaned.load(Ordering::SeqCst) {
            teardown::release(self.shared);
        }

        self.shared.exit.notify();
        tracing::debug!("Splash GUI thread exited");
    }
}

/// Body of the GUI thread
pub(crate) fn run(shared: Arc<Shared>, runtime: Arc<dyn RuntimeLibrary>) {
    let signals = ExitSignals {
        shared: &shared,
        runtime: runtime.as_ref(),
    };
    let mut context = shared.lock_context();
    tracing::debug!("Splash GUI thread started");

    let (mut interpreter, events) = match prepare(&shared, runtime.as_ref(), &mut context) {
        Ok(prepared) => prepared,
        Err(e) => {
            tracing::error!("Failed to initialize splash screen: {}", e);
            return;
        }
    };

    if let Err(e) = shared.lifecycle.transition(SplashState::Running) {
        tracing::warn!("Splash lifecycle out of step: {}", e);
    }
    shared.handshake.notify();
    tracing::info!("Splash screen running");

    event_loop(&shared, interpreter.as_mut(), &mut context, events);

    // Only this thread may delete the interpreter
    drop(interpreter);
    signals.close_channel();
    drop(context);
}

/// Create the interpreter, set up the minimal environment and run the script
///
/// Script errors are logged and do not abort the splash; the loop simply
/// ends at once if the script opened no window.
fn prepare(
    shared: &Shared,
    runtime: &dyn RuntimeLibrary,
    context: &mut SplashContext,
) -> Result<(Box<dyn Interpreter>, mpsc::UnboundedReceiver<Event>), RuntimeError> {
    let resources = context
        .resources
        .as_mut()
        .ok_or_else(|| RuntimeError::new("splash resources are not loaded"))?;

    let mut interpreter = runtime.create_interpreter()?;

    environment::install(
        interpreter.as_mut(),
        &resources.paths.module_dir,
        Arc::clone(&shared.exit_requested),
    )
    .map_err(|e| RuntimeError::new(format!("failed to create setup commands: {e}")))?;

    interpreter
        .init()
        .map_err(|e| RuntimeError::new(format!("error while initializing runtime: {e}")))?;
    interpreter
        .init_toolkit()
        .map_err(|e| RuntimeError::new(format!("error while initializing toolkit: {e}")))?;

    tracing::debug!(
        "Splash running runtime version {} and toolkit version {}",
        interpreter.get_var("tcl_patchLevel").unwrap_or_default(),
        interpreter.get_var("tk_patchLevel").unwrap_or_default()
    );

    // The runtime keeps its own copy
    if let Some(image) = resources.image.take() {
        interpreter.set_byte_array(&shared.settings.image_variable, image)?;
    }

    if let Err(e) = interpreter.eval(&resources.script) {
        tracing::error!("Splash script error: {}", e);
    }

    let (sender, events) = channel::channel(interpreter.waker());
    shared.install_sender(sender);

    Ok((interpreter, events))
}

/// Service runtime events and queued commands until the splash closes
fn event_loop(
    shared: &Shared,
    interpreter: &mut dyn Interpreter,
    context: &mut SplashContext,
    mut events: mpsc::UnboundedReceiver<Event>,
) {
    while interpreter.window_count() > 0 && !shared.exit_requested.load(Ordering::SeqCst) {
        interpreter.do_one_event();

        while let Ok(event) = events.try_recv() {
            let mut scope = EventScope::new(interpreter, context);
            event.service(&mut scope, &shared.settings.status_variable);
            shared.metrics.record_serviced();
        }
    }

    if shared.exit_requested.load(Ordering::SeqCst) {
        tracing::info!("Splash screen exit requested");
    } else {
        tracing::info!("Splash screen closed: no windows left");
    }
    // Queued sync callers see their reply slot dropped when `events` goes
}
