// Teardown protocol, bootstrap side
//
// The GUI thread's half lives in `gui_thread::ExitSignals`. This half stops
// the GUI thread if it is still alive, waits for its exit signal, joins it,
// and only then finalizes the runtime and closes the native libraries.

use crate::state::SplashState;
use crate::ui::channel::{Command, Event};
use crate::ui::shared::Shared;
use std::sync::atomic::Ordering;

/// Tear everything down from a thread other than the GUI thread
pub(crate) fn from_bootstrap(shared: &Shared) {
    if shared.gui_thread.get().is_some() {
        stop_gui_thread(shared);
        join_gui_thread(shared);
    }

    release(shared);
}

/// Request loop exit and block until the GUI thread signals it is gone
fn stop_gui_thread(shared: &Shared) {
    let exited = shared.exit.lock();
    if *exited {
        return;
    }

    shared.lifecycle.close();
    shared.exit_requested.store(true, Ordering::SeqCst);

    // Without a queued event the loop would stay blocked in do_one_event
    match shared.sender().filter(|sender| !sender.is_closed()) {
        Some(sender) => match sender.post(Event::post(Command::Wake)) {
            Ok(()) => shared.metrics.record_posted(),
            Err(e) => tracing::debug!("Splash wake-up not delivered: {}", e),
        },
        None => tracing::debug!("Splash GUI thread already leaving its loop"),
    }

    tracing::debug!("Waiting for splash GUI thread to exit");
    let _exited = shared.exit.wait(exited);
}

fn join_gui_thread(shared: &Shared) {
    if let Some(handle) = shared.take_gui_handle() {
        if handle.join().is_err() {
            tracing::error!("Splash GUI thread terminated by panic");
        }
    }
}

/// Finalize the runtime and close the libraries, runtime library first
///
/// Also run by the GUI thread on its way out when the controller was
/// dropped there.
pub(crate) fn release(shared: &Shared) {
    let mut context = shared.lock_context();
    if shared.lifecycle.state().is_terminal() {
        return;
    }

    let runtime = context.runtime.take();
    if shared.fully_loaded.swap(false, Ordering::SeqCst) {
        if let Some(runtime) = &runtime {
            runtime.finalize();
        }
    }
    drop(runtime);

    context.libraries.close();
    drop(context);

    match shared.lifecycle.transition(SplashState::Finalized) {
        Ok(_) => tracing::info!("Splash screen finalized"),
        Err(e) => tracing::warn!("Splash finalized out of order: {}", e),
    }
    shared.metrics.log_summary();
}
