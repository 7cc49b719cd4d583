//! Recording doubles shared by lifecycle tests.
//!
//! The fake process table and spawner append to one event log so tests can
//! assert on the interleaving of signals and launches across servers.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;

use glance_config::Config;
use nix::errno::Errno;
use nix::sys::signal::Signal;
use tempfile::TempDir;

use super::probe::ProcessTable;
use super::spawning::{ChildHandle, Redirect, SpawnSpec, Spawner};
use super::types::LifecycleOutput;

pub(crate) type EventLog = Rc<RefCell<Vec<String>>>;

/// In-memory process table.
///
/// Signalled processes die immediately unless registered as stubborn.
#[derive(Clone, Default)]
pub(crate) struct FakeProcessTable {
    alive: Rc<RefCell<HashSet<u32>>>,
    stubborn: Rc<RefCell<HashSet<u32>>>,
    events: EventLog,
}

impl FakeProcessTable {
    pub(crate) fn with_events(events: EventLog) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    pub(crate) fn add_alive(&self, pid: u32) {
        self.alive.borrow_mut().insert(pid);
    }

    pub(crate) fn ignore_signals(&self, pid: u32) {
        self.stubborn.borrow_mut().insert(pid);
    }
}

impl ProcessTable for FakeProcessTable {
    fn is_alive(&self, pid: u32) -> bool {
        self.alive.borrow().contains(&pid)
    }

    fn signal(&self, pid: u32, signal: Signal) -> Result<(), Errno> {
        if !self.alive.borrow().contains(&pid) {
            self.events
                .borrow_mut()
                .push(format!("signal {pid} {signal} failed"));
            return Err(Errno::ESRCH);
        }
        self.events
            .borrow_mut()
            .push(format!("signal {pid} {signal}"));
        if !self.stubborn.borrow().contains(&pid) {
            self.alive.borrow_mut().remove(&pid);
        }
        Ok(())
    }
}

/// A launch captured by [`FakeSpawner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SpawnRecord {
    pub(crate) executable: PathBuf,
    pub(crate) args: Vec<OsString>,
    pub(crate) env: Vec<(OsString, OsString)>,
    pub(crate) stdin_null: bool,
    pub(crate) detach_session: bool,
}

/// Spawner handing out sequential PIDs and registering them as alive.
pub(crate) struct FakeSpawner {
    table: FakeProcessTable,
    events: EventLog,
    next_pid: Cell<u32>,
    missing: RefCell<HashSet<String>>,
    early_exits: RefCell<HashMap<String, i32>>,
    launches: RefCell<Vec<SpawnRecord>>,
}

impl FakeSpawner {
    pub(crate) fn new(table: FakeProcessTable, events: EventLog, first_pid: u32) -> Self {
        Self {
            table,
            events,
            next_pid: Cell::new(first_pid),
            missing: RefCell::default(),
            early_exits: RefCell::default(),
            launches: RefCell::default(),
        }
    }

    /// Makes launching `binary` fail as if it were not installed.
    pub(crate) fn make_missing(&self, binary: &str) {
        self.missing.borrow_mut().insert(binary.to_owned());
    }

    /// Makes `binary` exit with `code` straight after launch.
    pub(crate) fn exit_early(&self, binary: &str, code: i32) {
        self.early_exits.borrow_mut().insert(binary.to_owned(), code);
    }

    pub(crate) fn launches(&self) -> Vec<SpawnRecord> {
        self.launches.borrow().clone()
    }
}

impl Spawner for FakeSpawner {
    fn spawn(&self, spec: SpawnSpec) -> io::Result<Box<dyn ChildHandle>> {
        let binary = spec
            .executable
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.launches.borrow_mut().push(SpawnRecord {
            executable: spec.executable.clone(),
            args: spec.args.clone(),
            env: spec.env.clone(),
            stdin_null: matches!(spec.stdin, Redirect::Null),
            detach_session: spec.detach_session,
        });
        if self.missing.borrow().contains(&binary) {
            self.events.borrow_mut().push(format!("spawn {binary} failed"));
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "No such file or directory (os error 2)",
            ));
        }
        let pid = self.next_pid.get();
        self.next_pid.set(pid + 1);
        self.table.add_alive(pid);
        self.events.borrow_mut().push(format!("spawn {binary} {pid}"));
        let exit_code = self.early_exits.borrow().get(&binary).copied();
        Ok(Box::new(FakeChild { pid, exit_code }))
    }
}

struct FakeChild {
    pid: u32,
    exit_code: Option<i32>,
}

impl ChildHandle for FakeChild {
    fn id(&self) -> u32 {
        self.pid
    }

    fn try_exit_code(&mut self) -> io::Result<Option<i32>> {
        Ok(self.exit_code)
    }
}

/// Temporary PID directory plus a configuration pointing at it.
pub(crate) struct Sandbox {
    pub(crate) dir: TempDir,
    pub(crate) config: Config,
}

impl Sandbox {
    pub(crate) fn new() -> Self {
        let dir = TempDir::new().expect("create pid dir");
        let config = Config {
            pid_dir: dir.path().join("run"),
            ..Config::default()
        };
        Self { dir, config }
    }

    pub(crate) fn pid_path(&self, server: &str) -> PathBuf {
        self.config.pid_dir.join(format!("{server}.pid"))
    }

    pub(crate) fn seed(&self, server: &str, content: &str) {
        std::fs::create_dir_all(&self.config.pid_dir).expect("create run dir");
        std::fs::write(self.pid_path(server), content).expect("seed pid file");
    }
}

/// Output captured into byte buffers.
pub(crate) type BufferedOutput = LifecycleOutput<Vec<u8>, Vec<u8>>;

pub(crate) fn buffered_output() -> BufferedOutput {
    LifecycleOutput::new(Vec::new(), Vec::new())
}

pub(crate) fn stdout_text(output: &BufferedOutput) -> String {
    String::from_utf8(output.stdout.clone()).expect("stdout utf8")
}

pub(crate) fn stderr_text(output: &BufferedOutput) -> String {
    String::from_utf8(output.stderr.clone()).expect("stderr utf8")
}
