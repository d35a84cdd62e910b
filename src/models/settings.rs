use serde::{Deserialize, Serialize};

/// Platform path-length limit (including the terminator) used by default
#[cfg(windows)]
pub const DEFAULT_MAX_PATH_LEN: usize = 260;
#[cfg(not(windows))]
pub const DEFAULT_MAX_PATH_LEN: usize = 4096;

/// Splash controller settings, loaded from `splash.yaml`
///
/// Every field has a default so a partial (or missing) file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplashSettings {
    /// Joined paths must be shorter than this many bytes
    pub max_path_len: usize,

    /// Name given to the GUI runtime thread
    pub thread_name: String,

    /// Runtime variable that progress updates write to
    pub status_variable: String,

    /// Runtime variable the splash image is handed over in
    pub image_variable: String,

    pub logging: LoggingSettings,
}

impl Default for SplashSettings {
    fn default() -> Self {
        Self {
            max_path_len: DEFAULT_MAX_PATH_LEN,
            thread_name: "splash-gui".to_string(),
            status_variable: "status_text".to_string(),
            image_variable: "_image_data".to_string(),
            logging: LoggingSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub directory: String,
    pub prefix: String,
    pub debug: bool,
    pub console: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            prefix: "bootsplash".to_string(),
            debug: false,
            console: false,
        }
    }
}
