// Lifecycle state management
//
// LifecycleManager tracks where a splash controller is in its lifecycle,
// rejects out-of-order transitions and broadcasts every change to
// subscribers.

use crate::error::SplashError;
use std::fmt;
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

/// Lifecycle states of a splash controller
///
/// The happy path visits every state in declaration order. `Closing` can be
/// entered from any state that owns resources; `Finalized` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplashState {
    /// Nothing loaded yet (or the splash is disabled)
    Idle,
    /// Resource header decoded and buffers copied out
    ResourcesLoaded,
    /// Both native libraries open and the runtime bound
    LibrariesBound,
    /// GUI thread spawned, bootstrap waiting on the start handshake
    HandshakePending,
    /// GUI thread servicing its event loop
    Running,
    /// Shutdown requested or the GUI thread has exited
    Closing,
    /// Libraries released; nothing left to tear down
    Finalized,
}

impl SplashState {
    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(self, next: SplashState) -> bool {
        use SplashState::*;

        match (self, next) {
            (Idle, ResourcesLoaded)
            | (ResourcesLoaded, LibrariesBound)
            | (LibrariesBound, HandshakePending)
            | (HandshakePending, Running) => true,
            (ResourcesLoaded | LibrariesBound | HandshakePending | Running, Closing) => true,
            // A live GUI thread must be closed before teardown
            (HandshakePending | Running | Finalized, Finalized) => false,
            (_, Finalized) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == SplashState::Finalized
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SplashState::Idle => "idle",
            SplashState::ResourcesLoaded => "resources-loaded",
            SplashState::LibrariesBound => "libraries-bound",
            SplashState::HandshakePending => "handshake-pending",
            SplashState::Running => "running",
            SplashState::Closing => "closing",
            SplashState::Finalized => "finalized",
        }
    }
}

impl fmt::Display for SplashState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Change events emitted when the lifecycle moves
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// The controller moved from one state to another
    Transitioned { from: SplashState, to: SplashState },

    /// Setup found no splash resource; every operation is now a no-op
    Disabled,
}

#[derive(Debug)]
struct Lifecycle {
    state: SplashState,
    disabled: bool,
}

/// Thread-safe lifecycle tracker with event emission
///
/// Shared between the bootstrap thread and the GUI thread. Reads never
/// block on the controller's context lock, so the state can be inspected
/// while the GUI thread holds it.
///
/// # Usage
///
/// - [`state()`](Self::state) for the current state
/// - [`transition()`](Self::transition) for validated moves
/// - [`close()`](Self::close) to enter `Closing` from wherever that is legal
/// - [`subscribe()`](Self::subscribe) for listening to changes
pub struct LifecycleManager {
    inner: RwLock<Lifecycle>,

    /// Broadcast channel for lifecycle change events
    state_tx: broadcast::Sender<StateChange>,
}

impl LifecycleManager {
    /// Create a manager in the `Idle` state
    ///
    /// # Returns
    /// A new LifecycleManager with a broadcast channel buffer of 32 events
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(32);
        Self {
            inner: RwLock::new(Lifecycle {
                state: SplashState::Idle,
                disabled: false,
            }),
            state_tx,
        }
    }

    pub fn state(&self) -> SplashState {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).state
    }

    pub fn is_disabled(&self) -> bool {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).disabled
    }

    /// Move to `to`, emitting a [`StateChange::Transitioned`] event
    ///
    /// # Errors
    /// `InvalidTransition` if the move is not allowed from the current state.
    pub fn transition(&self, to: SplashState) -> Result<StateChange, SplashError> {
        let mut lifecycle = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let from = lifecycle.state;

        if !from.can_transition_to(to) {
            return Err(SplashError::InvalidTransition { from, to });
        }

        lifecycle.state = to;
        drop(lifecycle);

        tracing::debug!("Splash state: {} -> {}", from, to);
        Ok(self.emit(StateChange::Transitioned { from, to }))
    }

    /// Enter `Closing` if the current state allows it
    ///
    /// Idempotent: returns `None` when already closing, finalized, or in a
    /// state that never owned a GUI thread or resources.
    pub fn close(&self) -> Option<StateChange> {
        let current = self.state();
        if !current.can_transition_to(SplashState::Closing) {
            return None;
        }
        // Lost race with another closer
        self.transition(SplashState::Closing).ok()
    }

    /// Mark the controller as disabled (no splash resource)
    pub fn disable(&self) -> StateChange {
        self.inner.write().unwrap_or_else(PoisonError::into_inner).disabled = true;
        tracing::info!("Splash screen disabled: no splash resource in archive");
        self.emit(StateChange::Disabled)
    }

    /// Subscribe to lifecycle change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn emit(&self, change: StateChange) -> StateChange {
        // Ignore send errors - it's OK if no one is listening
        let _ = self.state_tx.send(change.clone());
        change
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}
