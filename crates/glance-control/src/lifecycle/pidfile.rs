//! PID file bookkeeping: path resolution, reading, writing and removal.
//!
//! A PID file is speculative evidence that a server is running. Callers must
//! re-check the recorded PID against the process table before acting on it.
//! Nothing here locks the file, so two invocations racing on the same server
//! can interleave their check, remove and write steps.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use glance_config::{Config, ServerName};
use tempfile::Builder;
use tracing::{debug, info};

use super::LIFECYCLE_TARGET;
use super::error::LifecycleError;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// A PID file found on disk together with the PID it records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PidRecord {
    path: PathBuf,
    pid: u32,
}

impl PidRecord {
    pub(crate) const fn new(path: PathBuf, pid: u32) -> Self {
        Self { path, pid }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) const fn pid(&self) -> u32 {
        self.pid
    }
}

/// Resolves and manipulates the PID files of every managed server.
#[derive(Debug, Clone)]
pub(crate) struct PidFileStore {
    pid_dir: PathBuf,
    pid_file: Option<PathBuf>,
}

impl PidFileStore {
    pub(crate) fn from_config(config: &Config) -> Self {
        Self {
            pid_dir: config.pid_dir().to_path_buf(),
            pid_file: config.pid_file().map(Path::to_path_buf),
        }
    }

    /// PID file location for `server`.
    ///
    /// An explicit override is shared by every server rather than scoped to
    /// one of them.
    pub(crate) fn path_for(&self, server: ServerName) -> PathBuf {
        match &self.pid_file {
            Some(path) => path.clone(),
            None => self.pid_dir.join(format!("{server}.pid")),
        }
    }

    /// Records currently on disk for `server`, read lazily.
    ///
    /// Missing files produce no record. A file whose contents are not a PID
    /// produces an error rather than being skipped.
    pub(crate) fn records(
        &self,
        server: ServerName,
    ) -> impl Iterator<Item = Result<PidRecord, LifecycleError>> {
        std::iter::once(self.path_for(server)).filter_map(|path| match read_pid(&path) {
            Ok(Some(pid)) => Some(Ok(PidRecord::new(path, pid))),
            Ok(None) => None,
            Err(error) => Some(Err(error)),
        })
    }

    /// Creates the directory that will hold the PID file for `server`.
    pub(crate) fn prepare_directory(&self, server: ServerName) -> Result<(), LifecycleError> {
        let path = self.path_for(server);
        let directory = pid_directory(&path);
        fs::create_dir_all(directory).map_err(|source| LifecycleError::PidDirectory {
            path: directory.to_path_buf(),
            source,
        })
    }

    /// Records `pid` as the running instance of `server`.
    pub(crate) fn write(&self, server: ServerName, pid: u32) -> Result<PidRecord, LifecycleError> {
        self.prepare_directory(server)?;
        let path = self.path_for(server);
        atomic_write(&path, format!("{pid}\n").as_bytes()).map_err(|source| {
            LifecycleError::PidWrite {
                path: path.clone(),
                source,
            }
        })?;
        info!(
            target: LIFECYCLE_TARGET,
            %server,
            pid,
            file = %path.display(),
            "pid file written"
        );
        Ok(PidRecord::new(path, pid))
    }
}

/// Reads the PID recorded at `path`.
///
/// Returns `Ok(None)` when the file does not exist.
pub(crate) fn read_pid(path: &Path) -> Result<Option<u32>, LifecycleError> {
    match fs::read_to_string(path) {
        Ok(content) => content
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|source| LifecycleError::ParsePid {
                path: path.to_path_buf(),
                source,
            }),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(LifecycleError::ReadPid {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Removes a PID file, treating an already-missing file as success.
pub(crate) fn remove_pid_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(target: LIFECYCLE_TARGET, file = %path.display(), "pid file removed");
            Ok(())
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error),
    }
}

/// Directory holding `path`; bare file names live in the working directory.
fn pid_directory(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Writes the provided bytes to the path using an atomic persist step.
///
/// Readers never observe a half-written PID.
fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut builder = Builder::new();
    builder.prefix(
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("glance"),
    );
    #[cfg(unix)]
    {
        builder.permissions(fs::Permissions::from_mode(0o644));
    }

    let mut file = builder.tempfile_in(pid_directory(path))?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}
