// UI module - splash GUI thread and the controller that drives it
//
// This module contains:
// - SplashController: bootstrap-side API (setup, start, send, finalize)
// - channel: event queue into the GUI thread (sync / async commands)
// - gui_thread: the GUI thread body and its exit signals
// - teardown: shutdown from the bootstrap side and library release

pub mod channel;
pub mod controller;
mod gui_thread;
mod shared;
mod teardown;

pub use channel::{Callback, Command, Dispatch, Event, EventScope, EventSender};
pub use controller::{GuiThreadBody, SetupOutcome, SplashController, ThreadSpawner};
