// Embedded GUI runtime interface
//
// The runtime is reached through the symbols bound from the two native
// libraries. Process-wide entry points live on `RuntimeLibrary`; everything
// tied to a single interpreter lives on `Interpreter`, which is created on the
// GUI thread and must never leave it.

use camino::Utf8PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by the embedded runtime
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RuntimeError {
    pub message: String,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// What the interpreter should do after a native command handler returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Command succeeded
    Ok,
    /// Command failed with the given message
    Error(String),
    /// Optionally set a global variable, then evaluate a script file
    EvalFile {
        script: Utf8PathBuf,
        set_var: Option<(String, String)>,
    },
    /// Re-dispatch the call to another command
    Forward { command: String, args: Vec<String> },
}

/// Native implementation of an interpreter command
///
/// Receives the full argument vector, command name first.
pub type CommandHandler = Box<dyn Fn(&[String]) -> CommandOutcome>;

/// Wakes the GUI thread out of [`Interpreter::do_one_event`]
///
/// Called from other threads after posting to the event channel. A wake
/// delivered before the GUI thread blocks must not be lost.
pub trait RuntimeWaker: Send + Sync {
    fn wake(&self);
}

/// An interpreter instance, bound to the thread that created it
pub trait Interpreter {
    fn create_command(&mut self, name: &str, handler: CommandHandler) -> Result<(), RuntimeError>;

    fn rename_command(&mut self, from: &str, to: &str) -> Result<(), RuntimeError>;

    /// Initialize the scripting runtime
    fn init(&mut self) -> Result<(), RuntimeError>;

    /// Initialize the windowing toolkit
    fn init_toolkit(&mut self) -> Result<(), RuntimeError>;

    fn set_var(&mut self, name: &str, value: &str) -> Result<(), RuntimeError>;

    fn get_var(&self, name: &str) -> Option<String>;

    /// Store binary data in a global variable; the runtime keeps its own copy
    fn set_byte_array(&mut self, name: &str, data: Vec<u8>) -> Result<(), RuntimeError>;

    fn eval(&mut self, script: &str) -> Result<(), RuntimeError>;

    /// Number of open toplevel windows
    fn window_count(&self) -> usize;

    /// Block until at least one event has been processed or a wake arrives
    fn do_one_event(&mut self);

    fn waker(&self) -> Arc<dyn RuntimeWaker>;
}

/// Process-wide runtime entry points resolved from the native libraries
pub trait RuntimeLibrary: Send + Sync {
    /// Must run before anything else touches the runtime
    fn find_executable(&self, executable: &str);

    fn create_interpreter(&self) -> Result<Box<dyn Interpreter>, RuntimeError>;

    /// Release per-thread runtime state; called on the GUI thread as it exits
    fn finalize_thread(&self);

    /// Release process-wide runtime state; called once, after the GUI thread exited
    fn finalize(&self);
}
