//! Integration tests for the `glance-control` binary entry point.
//!
//! Fake servers are shell scripts placed in a temporary binary directory so
//! the supervisor launches, records and signals real processes.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use predicates::prelude::*;
use predicates::str::contains;
use rstest::{fixture, rstest};
use tempfile::TempDir;

const LONG_RUNNING: &str = "#!/bin/sh\nexec sleep 30\n";

struct Rig {
    root: TempDir,
}

impl Rig {
    fn bin_dir(&self) -> PathBuf {
        self.root.path().join("bin")
    }

    fn pid_dir(&self) -> PathBuf {
        self.root.path().join("run")
    }

    fn install(&self, binary: &str, script: &str) {
        install_script(&self.bin_dir().join(binary), script);
    }

    /// Empty directory for the supervisor's `PATH`, optionally holding a fake
    /// `logger` that appends its stdin to `capture`.
    fn search_path(&self, capture: Option<&Path>) -> PathBuf {
        let dir = self.root.path().join("path");
        fs::create_dir_all(&dir).expect("create path dir");
        if let Some(sink) = capture {
            let script = format!(
                "#!/bin/sh\nPATH=/usr/bin:/bin\nprintf '%s\\n' \"$@\" > \"{tag}\"\nexec cat >> \"{out}\"\n",
                tag = sink.with_extension("tag").display(),
                out = sink.display(),
            );
            install_script(&dir.join("logger"), &script);
        }
        dir
    }

    fn command(&self) -> Command {
        let mut command = cargo_bin_cmd!("glance-control");
        command
            .env_remove("GLANCE_PID_DIR")
            .env_remove("GLANCE_BIN_DIR")
            .env_remove("GLANCE_LOG_FILTER")
            .env_remove("GLANCE_LOG_FORMAT")
            .arg("--pid-dir")
            .arg(self.pid_dir())
            .arg("--bin-dir")
            .arg(self.bin_dir());
        command
    }

    fn pid_file(&self, server: &str) -> PathBuf {
        self.pid_dir().join(format!("{server}.pid"))
    }

    fn recorded_pid(&self, server: &str) -> Option<i32> {
        fs::read_to_string(self.pid_file(server))
            .ok()
            .and_then(|content| content.trim().parse().ok())
    }
}

impl Drop for Rig {
    fn drop(&mut self) {
        for server in ["glance-api", "glance-registry", "glance-scrubber"] {
            if let Some(pid) = self.recorded_pid(server) {
                let _ = kill(Pid::from_raw(pid), Signal::SIGKILL);
            }
        }
    }
}

fn install_script(path: &Path, script: &str) {
    fs::write(path, script).expect("write fake script");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod fake script");
}

/// Polls `path` until its contents satisfy `ready`.
fn read_when(path: &Path, ready: impl Fn(&str) -> bool) -> String {
    for _ in 0..200 {
        let content = fs::read_to_string(path).unwrap_or_default();
        if ready(&content) {
            return content;
        }
        thread::sleep(Duration::from_millis(50));
    }
    panic!("{} never reached the expected contents", path.display());
}

#[fixture]
fn rig() -> Rig {
    let rig = Rig {
        root: TempDir::new().expect("temp dir"),
    };
    fs::create_dir_all(rig.bin_dir()).expect("create bin dir");
    for binary in ["glance-api", "glance-registry", "glance-scrubber"] {
        rig.install(binary, LONG_RUNNING);
    }
    rig
}

/// Signal-0 liveness, counting unreaped zombies as gone since the test
/// harness is not their parent.
fn is_alive(pid: i32) -> bool {
    if kill(Pid::from_raw(pid), None).is_err() {
        return false;
    }
    let stat = fs::read_to_string(format!("/proc/{pid}/stat")).unwrap_or_default();
    let state = stat
        .rsplit_once(')')
        .and_then(|(_, rest)| rest.split_whitespace().next());
    state != Some("Z")
}

fn wait_until_gone(pid: i32) -> bool {
    for _ in 0..200 {
        if !is_alive(pid) {
            return true;
        }
        thread::sleep(Duration::from_millis(100));
    }
    false
}

#[rstest]
fn start_records_a_live_pid_and_refuses_a_duplicate(rig: Rig) {
    rig.command()
        .args(["api", "start"])
        .assert()
        .success()
        .stdout(contains("Starting glance-api"));

    let pid = rig.recorded_pid("glance-api").expect("pid file written");
    assert!(is_alive(pid));
    let content = fs::read_to_string(rig.pid_file("glance-api")).expect("read pid file");
    assert_eq!(content, format!("{pid}\n"));

    rig.command()
        .args(["glance-api", "start"])
        .assert()
        .success()
        .stdout(contains("glance-api appears to already be running"));
    assert_eq!(rig.recorded_pid("glance-api"), Some(pid));
}

#[rstest]
fn stop_signals_the_server_and_removes_its_pid_file(rig: Rig) {
    rig.command().args(["registry", "start"]).assert().success();
    let pid = rig.recorded_pid("glance-registry").expect("pid file written");

    rig.command()
        .args(["registry", "stop"])
        .assert()
        .success()
        .stdout(contains(format!(
            "Stopping glance-registry  pid: {pid}  signal: SIGTERM"
        )));

    assert!(!rig.pid_file("glance-registry").exists());
    assert!(wait_until_gone(pid));
}

#[rstest]
fn stop_without_a_pid_file_reports_not_running(rig: Rig) {
    rig.command()
        .args(["scrubber", "stop"])
        .assert()
        .success()
        .stdout(contains("glance-scrubber is not running"));
}

#[rstest]
fn stale_pid_file_is_replaced_on_start(rig: Rig) {
    fs::create_dir_all(rig.pid_dir()).expect("create run dir");
    // PIDs above the default pid_max are never allocated.
    fs::write(rig.pid_file("glance-api"), "4194304\n").expect("seed stale pid");

    rig.command().args(["api", "start"]).assert().success();

    let pid = rig.recorded_pid("glance-api").expect("pid file rewritten");
    assert_ne!(pid, 4_194_304);
    assert!(is_alive(pid));
}

#[rstest]
fn await_child_surfaces_an_early_exit_status(rig: Rig) {
    rig.install("glance-scrubber", "#!/bin/sh\nexit 3\n");

    rig.command()
        .args(["--await-child", "2", "scrubber", "start"])
        .assert()
        .code(3)
        .stderr(contains("exited during startup with status 3"));
}

#[rstest]
fn missing_binary_is_reported_without_aborting(rig: Rig) {
    fs::remove_file(rig.bin_dir().join("glance-api")).expect("remove fake api");

    rig.command()
        .args(["all", "start"])
        .assert()
        .success()
        .stderr(contains("unable to launch glance-api"));

    assert!(!rig.pid_file("glance-api").exists());
    assert!(rig.recorded_pid("glance-registry").is_some());
    assert!(rig.recorded_pid("glance-scrubber").is_some());
}

#[rstest]
fn status_reflects_the_pid_files(rig: Rig) {
    rig.command().args(["api", "start"]).assert().success();
    let pid = rig.recorded_pid("glance-api").expect("pid file written");

    rig.command()
        .args(["all", "status"])
        .assert()
        .success()
        .stdout(
            contains(format!("glance-api (pid {pid}) is running..."))
                .and(contains("glance-registry is stopped"))
                .and(contains("glance-scrubber is stopped")),
        );
}

#[rstest]
fn shared_pid_file_holds_the_first_server(rig: Rig) {
    let shared = rig.root.path().join("shared.pid");

    rig.command()
        .arg("--pid-file")
        .arg(&shared)
        .args(["all", "start"])
        .assert()
        .success()
        .stdout(contains("glance-registry appears to already be running"));

    let pid: i32 = fs::read_to_string(&shared)
        .expect("shared pid file written")
        .trim()
        .parse()
        .expect("pid parses");
    let _ = kill(Pid::from_raw(pid), Signal::SIGKILL);
}

#[rstest]
#[case(&["web", "start"], "unknown server 'web'")]
#[case(&["api", "bounce"], "unknown command 'bounce'")]
#[case(&["api"], "Usage:")]
fn usage_errors_exit_with_status_one(
    rig: Rig,
    #[case] args: &[&str],
    #[case] expected: &str,
) {
    rig.command()
        .args(args)
        .assert()
        .code(1)
        .stderr(contains(expected));
    assert!(!rig.pid_dir().exists());
}

#[rstest]
fn unparsable_pid_file_is_fatal(rig: Rig) {
    fs::create_dir_all(rig.pid_dir()).expect("create run dir");
    fs::write(rig.pid_file("glance-api"), "garbage").expect("seed garbage");

    rig.command()
        .args(["api", "stop"])
        .assert()
        .code(1)
        .stderr(contains("failed to parse pid file"));
}

#[rstest]
fn captured_output_is_piped_to_the_system_logger(rig: Rig) {
    let capture = rig.root.path().join("syslog.out");
    rig.install(
        "glance-api",
        "#!/bin/sh\nPATH=/usr/bin:/bin\necho served-out\necho served-err >&2\nexec sleep 30\n",
    );

    rig.command()
        .env("PATH", rig.search_path(Some(&capture)))
        .args(["--capture-output", "api", "start"])
        .assert()
        .success()
        .stderr(contains("log forwarder").not());

    let logged = read_when(&capture, |content| {
        content.contains("served-out") && content.contains("served-err")
    });
    assert_eq!(logged.lines().count(), 2);
    let tag = read_when(&capture.with_extension("tag"), |content| content.lines().count() == 2);
    assert!(tag.starts_with("-t\nglance-api["));
    assert!(rig.recorded_pid("glance-api").is_some_and(is_alive));
}

#[rstest]
fn missing_logger_falls_back_to_discarding_output(rig: Rig) {
    rig.install(
        "glance-api",
        "#!/bin/sh\nPATH=/usr/bin:/bin\necho served-out\nexec sleep 30\n",
    );

    rig.command()
        .env("PATH", rig.search_path(None))
        .args(["--capture-output", "api", "start"])
        .assert()
        .success()
        .stdout(contains("Starting glance-api"))
        .stderr(contains("unable to start log forwarder; discarding server output"));

    let pid = rig.recorded_pid("glance-api").expect("pid file written");
    assert!(is_alive(pid));
}

#[rstest]
fn relative_conf_path_reaches_the_server_as_absolute(rig: Rig) {
    let received = rig.root.path().join("argv.out");
    rig.install(
        "glance-api",
        &format!(
            "#!/bin/sh\nprintf '%s\\n' \"$@\" > \"{}\"\nexec sleep 30\n",
            received.display()
        ),
    );
    fs::create_dir_all(rig.root.path().join("conf")).expect("create conf dir");
    fs::write(rig.root.path().join("conf/glance-api.conf"), "[DEFAULT]\n").expect("write conf");
    let expected = rig
        .root
        .path()
        .canonicalize()
        .expect("canonical root")
        .join("conf/glance-api.conf");

    rig.command()
        .current_dir(rig.root.path())
        .args(["api", "start", "conf/glance-api.conf"])
        .assert()
        .success()
        .stdout(contains(format!("Starting glance-api with {}", expected.display())));

    let argv = read_when(&received, |content| content.lines().count() == 2);
    assert_eq!(argv, format!("--config-file\n{}\n", expected.display()));
}

#[test]
fn help_is_printed_to_stdout() {
    cargo_bin_cmd!("glance-control")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("--await-child").and(contains("--capture-output")));
}
