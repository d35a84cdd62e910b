// Event channel - posts commands from any thread to the splash GUI thread
//
// Events travel over an unbounded tokio mpsc queue. After every push the
// runtime is woken so the GUI thread leaves `do_one_event` and drains the
// queue. Synchronous events carry a oneshot reply that the caller blocks on.

use crate::error::SplashError;
use crate::models::{SplashContext, SplashResources};
use crate::services::runtime::{Interpreter, RuntimeError, RuntimeWaker};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// How a `send` waits for its callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Block until the GUI thread has run the callback, returning its result
    Sync,
    /// Return immediately; the result is discarded
    Async,
}

/// Callback executed on the GUI thread with the context lock held
pub type Callback = Box<dyn FnOnce(&mut EventScope<'_>) -> i32 + Send>;

/// Command carried by an [`Event`]
pub enum Command {
    /// Run arbitrary code against the interpreter
    Call(Callback),
    /// Write a progress message to the status variable
    UpdateStatus(String),
    /// No-op; only wakes the loop so it re-checks the exit flag
    Wake,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Call(_) => f.write_str("Call(..)"),
            Command::UpdateStatus(text) => f.debug_tuple("UpdateStatus").field(text).finish(),
            Command::Wake => f.write_str("Wake"),
        }
    }
}

/// A queued command plus, for synchronous sends, the reply slot
#[derive(Debug)]
pub struct Event {
    pub command: Command,
    pub reply: Option<oneshot::Sender<i32>>,
}

impl Event {
    /// Fire-and-forget event
    pub fn post(command: Command) -> Self {
        Self {
            command,
            reply: None,
        }
    }

    /// Event whose result is delivered through the returned receiver
    ///
    /// If the event is dropped unserviced, the receiver reports an error.
    pub fn call(command: Command) -> (Self, oneshot::Receiver<i32>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                command,
                reply: Some(tx),
            },
            rx,
        )
    }

    /// Run the command on the GUI thread and deliver its result
    ///
    /// # Arguments
    /// * `scope` - Interpreter and context, borrowed under the context lock
    /// * `status_variable` - Runtime variable `UpdateStatus` writes to
    ///
    /// # Returns
    /// The callback's value; `0` for status updates and wake-ups, `-1` if
    /// the status variable could not be written
    pub fn service(self, scope: &mut EventScope<'_>, status_variable: &str) -> i32 {
        let result = match self.command {
            Command::Call(callback) => callback(scope),
            Command::UpdateStatus(text) => match scope.set_status(status_variable, &text) {
                Ok(()) => 0,
                Err(e) => {
                    tracing::warn!("Failed to update splash status: {}", e);
                    -1
                }
            },
            Command::Wake => 0,
        };

        if let Some(reply) = self.reply {
            // Caller may have given up (e.g. its thread panicked)
            let _ = reply.send(result);
        }

        result
    }
}

/// What a callback may touch on the GUI thread
pub struct EventScope<'a> {
    interpreter: &'a mut dyn Interpreter,
    context: &'a mut SplashContext,
}

impl<'a> EventScope<'a> {
    pub fn new(interpreter: &'a mut dyn Interpreter, context: &'a mut SplashContext) -> Self {
        Self {
            interpreter,
            context,
        }
    }

    pub fn interpreter(&mut self) -> &mut dyn Interpreter {
        &mut *self.interpreter
    }

    pub fn resources(&self) -> Option<&SplashResources> {
        self.context.resources.as_ref()
    }

    /// Write `text` to the runtime variable named `variable`
    pub fn set_status(&mut self, variable: &str, text: &str) -> Result<(), RuntimeError> {
        self.interpreter.set_var(variable, text)
    }
}

/// Sending half of the event channel, paired with the runtime's waker
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Event>,
    waker: Arc<dyn RuntimeWaker>,
}

impl EventSender {
    /// Queue an event and wake the GUI thread
    ///
    /// # Errors
    /// `NotRunning` if the GUI thread dropped its receiver.
    pub fn post(&self, event: Event) -> Result<(), SplashError> {
        self.tx.send(event).map_err(|_| SplashError::NotRunning)?;
        self.waker.wake();
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl fmt::Debug for EventSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSender")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Create the channel for a GUI thread whose runtime wakes through `waker`
pub fn channel(waker: Arc<dyn RuntimeWaker>) -> (EventSender, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx, waker }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::runtime::CommandHandler;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingWaker(AtomicUsize);

    impl RuntimeWaker for CountingWaker {
        fn wake(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct VarInterpreter {
        vars: HashMap<String, String>,
        read_only: bool,
    }

    impl Interpreter for VarInterpreter {
        fn create_command(&mut self, _: &str, _: CommandHandler) -> Result<(), RuntimeError> {
            Ok(())
        }
        fn rename_command(&mut self, _: &str, _: &str) -> Result<(), RuntimeError> {
            Ok(())
        }
        fn init(&mut self) -> Result<(), RuntimeError> {
            Ok(())
        }
        fn init_toolkit(&mut self) -> Result<(), RuntimeError> {
            Ok(())
        }
        fn set_var(&mut self, name: &str, value: &str) -> Result<(), RuntimeError> {
            if self.read_only {
                return Err(RuntimeError::new("variable is read-only"));
            }
            self.vars.insert(name.to_string(), value.to_string());
            Ok(())
        }
        fn get_var(&self, name: &str) -> Option<String> {
            self.vars.get(name).cloned()
        }
        fn set_byte_array(&mut self, _: &str, _: Vec<u8>) -> Result<(), RuntimeError> {
            Ok(())
        }
        fn eval(&mut self, _: &str) -> Result<(), RuntimeError> {
            Ok(())
        }
        fn window_count(&self) -> usize {
            0
        }
        fn do_one_event(&mut self) {}
        fn waker(&self) -> Arc<dyn RuntimeWaker> {
            Arc::new(CountingWaker::default())
        }
    }

    #[test]
    fn test_post_wakes_runtime() {
        let waker = Arc::new(CountingWaker::default());
        let (sender, mut rx) = channel(waker.clone());

        sender.post(Event::post(Command::Wake)).unwrap();
        sender.post(Event::post(Command::Wake)).unwrap();

        assert_eq!(waker.0.load(Ordering::SeqCst), 2);
        assert!(matches!(rx.try_recv().unwrap().command, Command::Wake));
    }

    #[test]
    fn test_post_after_receiver_dropped_fails() {
        let waker = Arc::new(CountingWaker::default());
        let (sender, rx) = channel(waker.clone());
        drop(rx);

        let result = sender.post(Event::post(Command::Wake));

        assert!(matches!(result, Err(SplashError::NotRunning)));
        assert!(sender.is_closed());
        assert_eq!(waker.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_service_delivers_callback_result() {
        let mut interpreter = VarInterpreter::default();
        let mut context = SplashContext::default();
        let (event, mut reply) = Event::call(Command::Call(Box::new(|scope: &mut EventScope<'_>| {
            scope.interpreter().set_var("x", "1").unwrap();
            42
        })));

        let result = event.service(
            &mut EventScope::new(&mut interpreter, &mut context),
            "status_text",
        );

        assert_eq!(result, 42);
        assert_eq!(reply.try_recv().unwrap(), 42);
        assert_eq!(interpreter.get_var("x").as_deref(), Some("1"));
    }

    #[test]
    fn test_update_status_writes_variable() {
        let mut interpreter = VarInterpreter::default();
        let mut context = SplashContext::default();

        Event::post(Command::UpdateStatus("base_library.zip".to_string())).service(
            &mut EventScope::new(&mut interpreter, &mut context),
            "status_text",
        );

        assert_eq!(
            interpreter.get_var("status_text").as_deref(),
            Some("base_library.zip")
        );
    }

    #[test]
    fn test_update_status_failure_is_reported() {
        let mut interpreter = VarInterpreter {
            read_only: true,
            ..VarInterpreter::default()
        };
        let mut context = SplashContext::default();

        let result = Event::post(Command::UpdateStatus("x".to_string())).service(
            &mut EventScope::new(&mut interpreter, &mut context),
            "status_text",
        );

        assert_eq!(result, -1);
    }

    #[test]
    fn test_dropped_event_disconnects_caller() {
        let (event, mut reply) = Event::call(Command::Wake);
        drop(event);

        assert!(reply.try_recv().is_err());
    }
}
