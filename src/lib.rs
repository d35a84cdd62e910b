// bootsplash - Cross-thread splash screen controller for bootstrap loaders
//
// This is the library crate. A host bootstrap loader embeds it to show a
// splash screen from a dedicated GUI thread while it unpacks the application.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use error::SplashError;
pub use models::{BootstrapEnvironment, DeploymentMode, SplashSettings};
pub use state::{LifecycleManager, SplashState, StateChange};
pub use ui::{Dispatch, EventScope, SetupOutcome, SplashController};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
