//! Shared fixtures for splash controller integration tests.
//!
//! The fake runtime records every observable action in a [`Journal`] so tests
//! can assert on ordering across the bootstrap and GUI threads. Its script
//! language is line based:
//!
//! - `window <name>` opens a toplevel window
//! - `close` closes one window
//! - `set <var> <value>` sets a variable
//! - `error <message>` fails the evaluation
//! - anything else is dispatched to a registered command (e.g. `exit`)

use bootsplash::SplashController;
use bootsplash::error::SplashError;
use bootsplash::models::{
    BootstrapEnvironment, DeploymentMode, RequirementsList, SplashResourceBuilder, SplashSettings,
};
use bootsplash::services::{
    CommandHandler, CommandOutcome, Interpreter, LibraryLoader, LoadedLibraries, MemoryArchive,
    NativeLibrary, RuntimeError, RuntimeLibrary, RuntimeWaker,
};
use bootsplash::state::{SplashState, StateChange};
use bootsplash::ui::{SetupOutcome, ThreadSpawner};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, Thread};
use tempfile::TempDir;
use tokio::sync::broadcast;

#[allow(dead_code)]
pub const RUNTIME_LIB: &str = "libtcl86.so";
#[allow(dead_code)]
pub const TOOLKIT_LIB: &str = "libtk86.so";
#[allow(dead_code)]
pub const MODULE_DIR: &str = "tk";
#[allow(dead_code)]
pub const DEPENDENCIES_DIR: &str = "__splash";
#[allow(dead_code)]
pub const IMAGE: &[u8] = &[0x89, b'P', b'N', b'G'];

/// Where the fake runtime should fail
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Nothing,
    OpenToolkit,
    Bind,
    CreateInterpreter,
    Init,
    InitToolkit,
}

/// Ordered log of actions shared by every fake
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

#[allow(dead_code)]
impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.0.lock().unwrap().iter().any(|e| e == entry)
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.lock().unwrap().iter().position(|e| e == entry)
    }

    /// Assert that all `entries` were journaled, in this order
    pub fn assert_order(&self, entries: &[&str]) {
        let positions: Vec<usize> = entries
            .iter()
            .map(|entry| {
                self.position(entry).unwrap_or_else(|| {
                    panic!("missing journal entry {entry:?} in {:?}", self.entries())
                })
            })
            .collect();

        assert!(
            positions.windows(2).all(|pair| pair[0] < pair[1]),
            "journal out of order, expected {:?} in {:?}",
            entries,
            self.entries()
        );
    }
}

fn current_thread_name() -> String {
    thread::current().name().unwrap_or("unnamed").to_string()
}

/// Shared library handle that journals its own closing
pub struct FakeLibrary {
    path: Utf8PathBuf,
    journal: Journal,
}

impl NativeLibrary for FakeLibrary {
    fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Drop for FakeLibrary {
    fn drop(&mut self) {
        self.journal
            .push(format!("close {}", self.path.file_name().unwrap_or_default()));
    }
}

pub struct FakeLoader {
    pub journal: Journal,
    pub fail: FailAt,
}

impl LibraryLoader for FakeLoader {
    fn open(&self, path: &Utf8Path) -> Option<Box<dyn NativeLibrary>> {
        let name = path.file_name().unwrap_or_default();
        if self.fail == FailAt::OpenToolkit && name == TOOLKIT_LIB {
            return None;
        }

        self.journal.push(format!("open {name}"));
        Some(Box::new(FakeLibrary {
            path: path.to_path_buf(),
            journal: self.journal.clone(),
        }))
    }

    fn bind(&self, _libraries: &LoadedLibraries) -> Result<Arc<dyn RuntimeLibrary>, SplashError> {
        if self.fail == FailAt::Bind {
            return Err(SplashError::SymbolBinding("Tcl_CreateInterp".to_string()));
        }

        self.journal.push("bind");
        Ok(Arc::new(FakeRuntime {
            journal: self.journal.clone(),
            fail: self.fail,
        }))
    }
}

pub struct FakeRuntime {
    journal: Journal,
    fail: FailAt,
}

impl RuntimeLibrary for FakeRuntime {
    fn find_executable(&self, executable: &str) {
        self.journal.push(format!("find_executable {executable}"));
    }

    fn create_interpreter(&self) -> Result<Box<dyn Interpreter>, RuntimeError> {
        self.journal.push("create_interpreter");
        if self.fail == FailAt::CreateInterpreter {
            return Err(RuntimeError::new("out of memory"));
        }
        Ok(Box::new(FakeInterpreter::new(self.journal.clone(), self.fail)))
    }

    fn finalize_thread(&self) {
        self.journal
            .push(format!("finalize_thread on {}", current_thread_name()));
    }

    fn finalize(&self) {
        self.journal.push("finalize");
    }
}

/// Wakes the thread that created the interpreter; wake-ups are sticky
pub struct ThreadWaker {
    thread: Thread,
    pending: AtomicBool,
}

impl RuntimeWaker for ThreadWaker {
    fn wake(&self) {
        self.pending.store(true, Ordering::SeqCst);
        self.thread.unpark();
    }
}

pub struct FakeInterpreter {
    journal: Journal,
    fail: FailAt,
    commands: HashMap<String, CommandHandler>,
    vars: HashMap<String, String>,
    windows: usize,
    waker: Arc<ThreadWaker>,
}

impl FakeInterpreter {
    fn new(journal: Journal, fail: FailAt) -> Self {
        Self {
            journal,
            fail,
            commands: HashMap::new(),
            vars: HashMap::new(),
            windows: 0,
            waker: Arc::new(ThreadWaker {
                thread: thread::current(),
                pending: AtomicBool::new(false),
            }),
        }
    }

    fn run_line(&mut self, line: &str) -> Result<(), RuntimeError> {
        let words: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        let Some(name) = words.first() else {
            return Ok(());
        };

        match name.as_str() {
            "window" => self.windows += 1,
            "close" => self.windows = self.windows.saturating_sub(1),
            "set" => {
                self.vars.insert(words[1].clone(), words[2..].join(" "));
            }
            "error" => return Err(RuntimeError::new(words[1..].join(" "))),
            _ => return self.invoke(&words),
        }
        Ok(())
    }

    fn invoke(&mut self, words: &[String]) -> Result<(), RuntimeError> {
        let outcome = match self.commands.get(&words[0]) {
            Some(handler) => handler(words),
            None => {
                return Err(RuntimeError::new(format!(
                    "invalid command name \"{}\"",
                    words[0]
                )));
            }
        };

        match outcome {
            CommandOutcome::Ok => Ok(()),
            CommandOutcome::Error(message) => Err(RuntimeError::new(message)),
            CommandOutcome::EvalFile { script, set_var } => {
                if let Some((name, value)) = set_var {
                    self.vars.insert(name, value);
                }
                self.journal.push(format!("eval_file {script}"));
                Ok(())
            }
            CommandOutcome::Forward { command, args } => {
                self.journal
                    .push(format!("forward {command} {}", args.join(" ")));
                Ok(())
            }
        }
    }
}

impl Interpreter for FakeInterpreter {
    fn create_command(&mut self, name: &str, handler: CommandHandler) -> Result<(), RuntimeError> {
        self.commands.insert(name.to_string(), handler);
        Ok(())
    }

    fn rename_command(&mut self, from: &str, to: &str) -> Result<(), RuntimeError> {
        self.journal.push(format!("rename {from} {to}"));
        Ok(())
    }

    fn init(&mut self) -> Result<(), RuntimeError> {
        self.journal.push("init");
        if self.fail == FailAt::Init {
            return Err(RuntimeError::new("can't find a usable init.tcl"));
        }
        self.vars
            .insert("tcl_patchLevel".to_string(), "8.6.13".to_string());
        self.invoke(&["tclInit".to_string()])
    }

    fn init_toolkit(&mut self) -> Result<(), RuntimeError> {
        self.journal.push("init_toolkit");
        if self.fail == FailAt::InitToolkit {
            return Err(RuntimeError::new("no display name"));
        }
        self.vars
            .insert("tk_patchLevel".to_string(), "8.6.13".to_string());
        let args: Vec<String> = [
            "tcl_findLibrary",
            "tk",
            "8.6",
            "8.6.13",
            "tk.tcl",
            "TK_LIBRARY",
            "tk_library",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        self.invoke(&args)
    }

    fn set_var(&mut self, name: &str, value: &str) -> Result<(), RuntimeError> {
        self.journal.push(format!("set {name} {value}"));
        self.vars.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn get_var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    fn set_byte_array(&mut self, name: &str, data: Vec<u8>) -> Result<(), RuntimeError> {
        self.journal.push(format!("image {name} {} bytes", data.len()));
        Ok(())
    }

    fn eval(&mut self, script: &str) -> Result<(), RuntimeError> {
        self.journal.push("eval");
        for line in script.lines() {
            self.run_line(line.trim())?;
        }
        Ok(())
    }

    fn window_count(&self) -> usize {
        self.windows
    }

    fn do_one_event(&mut self) {
        while !self.waker.pending.swap(false, Ordering::SeqCst) {
            thread::park();
        }
    }

    fn waker(&self) -> Arc<dyn RuntimeWaker> {
        self.waker.clone()
    }
}

impl Drop for FakeInterpreter {
    fn drop(&mut self) {
        self.journal
            .push(format!("delete_interpreter on {}", current_thread_name()));
    }
}

/// Archive holding a splash resource with `script` plus a few regular files
#[allow(dead_code)]
pub fn splash_archive(script: &str) -> MemoryArchive {
    let requirements = RequirementsList::from_names([RUNTIME_LIB, TOOLKIT_LIB, "tk/tk.tcl"]);
    let blob = SplashResourceBuilder::new(RUNTIME_LIB, TOOLKIT_LIB, MODULE_DIR, DEPENDENCIES_DIR)
        .expect("fixture names fit the header")
        .script(script)
        .image(IMAGE)
        .requirements(&requirements)
        .build();

    let mut archive = MemoryArchive::new();
    archive
        .insert(RUNTIME_LIB, b"tcl".to_vec())
        .insert(TOOLKIT_LIB, b"tk".to_vec())
        .insert("tk/tk.tcl", b"# toolkit init".to_vec())
        .insert_splash("splash", blob)
        .insert("base_library.zip", b"zip".to_vec())
        .insert("app.pyz", b"pyz".to_vec());
    archive
}

/// Controller wired to the fake runtime, living in a temporary home directory
#[allow(dead_code)]
pub struct Harness {
    pub controller: SplashController,
    pub journal: Journal,
    pub archive: MemoryArchive,
    pub home: Utf8PathBuf,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl Harness {
    pub fn new(script: &str, fail: FailAt) -> Self {
        Self::with_archive(splash_archive(script), fail)
    }

    pub fn with_archive(archive: MemoryArchive, fail: FailAt) -> Self {
        Self::with_settings(archive, fail, SplashSettings::default())
    }

    pub fn with_settings(archive: MemoryArchive, fail: FailAt, settings: SplashSettings) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let home = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let journal = Journal::default();
        let loader = Arc::new(FakeLoader {
            journal: journal.clone(),
            fail,
        });

        let controller = SplashController::new(
            settings,
            BootstrapEnvironment::new(home.clone(), DeploymentMode::OneFile),
            loader,
        );

        Self {
            controller,
            journal,
            archive,
            home,
            _temp_dir: temp_dir,
        }
    }

    /// Harness whose GUI thread is started through `spawner`
    pub fn with_spawner(script: &str, fail: FailAt, spawner: ThreadSpawner) -> Self {
        let mut harness = Self::new(script, fail);
        harness.controller = harness.controller.with_thread_spawner(spawner);
        harness
    }

    /// Run setup, extract and load_libraries
    pub fn prepare(&self) -> Result<(), SplashError> {
        assert_eq!(self.controller.setup(&self.archive)?, SetupOutcome::Ready);
        self.controller.extract(&self.archive)?;
        self.controller.load_libraries()
    }

    /// Run setup, extract, load_libraries and start
    pub fn launch(&self) -> Result<(), SplashError> {
        self.prepare()?;
        self.controller.start("/app/host")
    }
}

/// Block until the lifecycle reaches `target`
#[allow(dead_code)]
pub fn wait_for_state(rx: &mut broadcast::Receiver<StateChange>, target: SplashState) {
    loop {
        match rx.blocking_recv() {
            Ok(StateChange::Transitioned { to, .. }) if to == target => return,
            Ok(_) => continue,
            Err(e) => panic!("lifecycle channel failed while waiting for {target}: {e}"),
        }
    }
}
