// Minimal runtime environment
//
// The splash runs without the runtime's standard library. These command
// overrides replace the stock init procedure, the library search, `source`
// and `exit` so that only files shipped with the splash are ever touched and
// `exit` ends the splash loop instead of the whole process.

use crate::services::paths;
use crate::services::runtime::{CommandOutcome, Interpreter, RuntimeError};
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Init script the toolkit looks up during initialization
pub const TOOLKIT_INIT_SCRIPT: &str = "tk.tcl";

/// Variable the toolkit reads its library directory from
pub const TOOLKIT_LIBRARY_VAR: &str = "tk_library";

/// Name the stock `source` command is preserved under
pub const ORIGINAL_SOURCE: &str = "_source";

/// Stock init procedure: skip the standard library search entirely
pub fn init_command(_args: &[String]) -> CommandOutcome {
    CommandOutcome::Ok
}

/// Library search, answering only for the toolkit's init script
///
/// Arguments follow the stock procedure:
/// `basename version patch initScript enVarName varName`.
pub fn find_library_command(module_dir: &Utf8Path, args: &[String]) -> CommandOutcome {
    match args.get(4).map(String::as_str) {
        Some(TOOLKIT_INIT_SCRIPT) => CommandOutcome::EvalFile {
            script: module_dir.join(TOOLKIT_INIT_SCRIPT),
            set_var: Some((TOOLKIT_LIBRARY_VAR.to_string(), module_dir.to_string())),
        },
        other => CommandOutcome::Error(format!(
            "library not available in splash environment: {}",
            other.unwrap_or("<none>")
        )),
    }
}

/// `source` that silently skips files which were not bundled
pub fn source_command(args: &[String]) -> CommandOutcome {
    let Some(file) = args.last().filter(|_| args.len() > 1) else {
        return CommandOutcome::Error("wrong # args: should be \"source fileName\"".to_string());
    };

    if paths::exists(Utf8Path::new(file)) {
        CommandOutcome::Forward {
            command: ORIGINAL_SOURCE.to_string(),
            args: args[1..].to_vec(),
        }
    } else {
        tracing::debug!("Skipping source of missing file: {}", file);
        CommandOutcome::Ok
    }
}

/// `exit` that only requests the splash loop to stop
pub fn exit_command(exit_requested: &AtomicBool) -> CommandOutcome {
    exit_requested.store(true, Ordering::SeqCst);
    CommandOutcome::Ok
}

/// Install all overrides into a fresh interpreter
///
/// Every registration is attempted; if any fails the first error is returned
/// and the splash must be abandoned.
pub fn install(
    interpreter: &mut dyn Interpreter,
    module_dir: &Utf8Path,
    exit_requested: Arc<AtomicBool>,
) -> Result<(), RuntimeError> {
    let module_dir: Utf8PathBuf = module_dir.to_path_buf();

    let results = [
        interpreter.create_command("tclInit", Box::new(init_command)),
        interpreter.create_command(
            "tcl_findLibrary",
            Box::new(move |args: &[String]| find_library_command(&module_dir, args)),
        ),
        interpreter.create_command("exit", Box::new(move |_: &[String]| exit_command(&exit_requested))),
        interpreter
            .rename_command("::source", &format!("::{ORIGINAL_SOURCE}"))
            .and_then(|_| interpreter.create_command("source", Box::new(source_command))),
    ];

    results.into_iter().collect()
}
