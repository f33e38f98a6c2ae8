// src/system/process.rs

//! Launching and supervising engine processes.
//!
//! An [`EngineProcess`] is bound to one engine executable and hands out
//! [`ProcessSession`]s. Each session owns exactly one OS process, a
//! cancellation flag and a background thread that drains the process's standard
//! output. Sessions started from the same controller are independent of each
//! other.
//!
//! Lifecycle of a session:
//!
//! ```text
//! Idle -> Starting -> Running -> Stopping -> Terminated
//!                        \___________________/
//!                            natural exit
//! ```
//!
//! Events are published on typed channels (start, output line, end). Subscribers
//! registered before `launch` see every event. When a session terminates its
//! senders are dropped, so receivers observe disconnection after the end event.

use crate::{CancellationToken, core::engine::EngineDescriptor};
use crossbeam_channel::{Receiver, Sender, unbounded};
use scopeguard::defer;
use std::borrow::Cow;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use sysinfo::System;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised when launching a session.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Sessions run at most once.
    #[error("Session {0} was already launched; start a new session instead.")]
    AlreadyLaunched(Uuid),
}

/// Lifecycle of a session. It only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessState {
    /// Not launched yet.
    Idle,
    /// Spawning the process.
    Starting,
    /// The process is alive and its output is being read.
    Running,
    /// `kill` was requested.
    Stopping,
    /// Over; end event published.
    Terminated,
}

/// Published once the process has been spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartEvent {
    /// Session that started.
    pub session: Uuid,
    /// OS process id.
    pub pid: u32,
}

/// One line of process output, without its line terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEvent {
    /// Session that produced the line.
    pub session: Uuid,
    /// Raw line bytes.
    pub data: Vec<u8>,
    /// Set for diagnostics produced by the launcher itself (spawn or read failures).
    pub is_error: bool,
}

impl OutputEvent {
    /// The line decoded as UTF-8, lossily.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// Published exactly once, when the session terminates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndEvent {
    /// Session that ended.
    pub session: Uuid,
    /// `None` if the process never started or was ended by a signal.
    pub exit_code: Option<i32>,
    /// Whether the session ended through `kill`.
    pub killed: bool,
}

#[derive(Debug, Default)]
struct Subscribers {
    start: Vec<Sender<StartEvent>>,
    output: Vec<Sender<OutputEvent>>,
    end: Vec<Sender<EndEvent>>,
}

/// State shared between a session handle and its reader thread.
#[derive(Debug)]
struct Shared {
    id: Uuid,
    state: Mutex<ProcessState>,
    child: Mutex<Option<Child>>,
    cancellation_token: CancellationToken,
    subscribers: Mutex<Subscribers>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sends `event` to every live subscriber, forgetting the ones that hung up.
fn publish<E: Clone>(senders: &mut Vec<Sender<E>>, event: &E) {
    senders.retain(|sender| sender.send(event.clone()).is_ok());
}

impl Shared {
    fn state(&self) -> ProcessState {
        *lock(&self.state)
    }

    fn set_state(&self, state: ProcessState) {
        *lock(&self.state) = state;
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation_token.load(Ordering::SeqCst)
    }

    fn publish_output(&self, data: Vec<u8>, is_error: bool) {
        let event = OutputEvent {
            session: self.id,
            data,
            is_error,
        };
        publish(&mut lock(&self.subscribers).output, &event);
    }

    fn publish_error(&self, message: String) {
        log::error!("[{}] {}", self.id, message);
        self.publish_output(message.into_bytes(), true);
    }

    /// Reaps the process, marks the session terminated and publishes the end event.
    /// Runs exactly once per launched session.
    fn finish(&self) {
        let killed = self.is_cancelled();
        // Released before waiting, so a concurrent `kill` can still run its sweep.
        let child = lock(&self.child).take();
        let exit_code = match child {
            Some(mut child) => {
                if killed {
                    // Already dead if `kill` got there first.
                    let _ = child.kill();
                }
                match child.wait() {
                    Ok(status) => status.code(),
                    Err(e) => {
                        log::warn!("[{}] Failed to reap process: {}", self.id, e);
                        None
                    }
                }
            }
            None => None,
        };

        self.set_state(ProcessState::Terminated);
        log::debug!(
            "[{}] Session ended (exit code: {:?}, killed: {})",
            self.id,
            exit_code,
            killed
        );

        let event = EndEvent {
            session: self.id,
            exit_code,
            killed,
        };
        let mut subscribers = lock(&self.subscribers);
        publish(&mut subscribers.end, &event);
        *subscribers = Subscribers::default();
    }
}

/// One launch of an engine executable.
#[derive(Debug)]
pub struct ProcessSession {
    executable: PathBuf,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ProcessSession {
    fn new(executable: PathBuf) -> Self {
        Self {
            executable,
            shared: Arc::new(Shared {
                id: Uuid::new_v4(),
                state: Mutex::new(ProcessState::Idle),
                child: Mutex::new(None),
                cancellation_token: Arc::new(AtomicBool::new(false)),
                subscribers: Mutex::new(Subscribers::default()),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Unique id, carried by every event of the session.
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Executable this session runs.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProcessState {
        self.shared.state()
    }

    /// Subscribes to the start event.
    pub fn on_start(&self) -> Receiver<StartEvent> {
        let (sender, receiver) = unbounded();
        self.subscribe(|subscribers| subscribers.start.push(sender));
        receiver
    }

    /// Subscribes to output lines.
    pub fn on_output(&self) -> Receiver<OutputEvent> {
        let (sender, receiver) = unbounded();
        self.subscribe(|subscribers| subscribers.output.push(sender));
        receiver
    }

    /// Subscribes to the end event.
    pub fn on_end(&self) -> Receiver<EndEvent> {
        let (sender, receiver) = unbounded();
        self.subscribe(|subscribers| subscribers.end.push(sender));
        receiver
    }

    /// Registers a subscriber unless the session is over, in which case the
    /// sender is dropped and the receiver is disconnected right away.
    fn subscribe(&self, register: impl FnOnce(&mut Subscribers)) {
        let mut subscribers = lock(&self.shared.subscribers);
        if self.state() != ProcessState::Terminated {
            register(&mut subscribers);
        }
    }

    /// Starts the process and its output reader.
    ///
    /// A process that cannot be spawned is not an error here: it is reported as an
    /// error-flagged output event followed by the end event. The only error is
    /// launching a session twice.
    pub fn launch<S: AsRef<str>>(&self, args: &[S]) -> Result<(), ProcessError> {
        {
            let mut state = lock(&self.shared.state);
            if *state != ProcessState::Idle {
                return Err(ProcessError::AlreadyLaunched(self.shared.id));
            }
            *state = ProcessState::Starting;
        }

        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        log::info!(
            "[{}] Launching {} {:?}",
            self.shared.id,
            self.executable.display(),
            args
        );

        let spawned = Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                self.shared.publish_error(format!(
                    "Could not start '{}': {}",
                    self.executable.display(),
                    e
                ));
                self.shared.finish();
                return Ok(());
            }
        };

        let pid = child.id();
        let stdout = child.stdout.take();
        *lock(&self.shared.child) = Some(child);
        {
            let mut state = lock(&self.shared.state);
            if *state == ProcessState::Starting {
                *state = ProcessState::Running;
            }
        }
        let event = StartEvent {
            session: self.shared.id,
            pid,
        };
        publish(&mut lock(&self.shared.subscribers).start, &event);

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(thread_name(&self.executable, self.shared.id))
            .spawn(move || drain_output(&shared, stdout));
        match spawned {
            Ok(handle) => *lock(&self.worker) = Some(handle),
            Err(e) => {
                self.shared.cancellation_token.store(true, Ordering::SeqCst);
                self.shared
                    .publish_error(format!("Could not start output reader: {}", e));
                self.shared.finish();
            }
        }
        Ok(())
    }

    /// Stops the session's process.
    ///
    /// Raises the cancellation flag, kills the tracked process, then kills any
    /// other OS process whose command line mentions this executable. Does nothing
    /// unless the session is starting or running.
    pub fn kill(&self) {
        {
            let mut state = lock(&self.shared.state);
            match *state {
                ProcessState::Starting | ProcessState::Running => {
                    *state = ProcessState::Stopping;
                }
                _ => return,
            }
        }
        self.shared.cancellation_token.store(true, Ordering::SeqCst);

        if let Some(child) = lock(&self.shared.child).as_mut() {
            log::debug!("[{}] Killing process {}", self.shared.id, child.id());
            if let Err(e) = child.kill() {
                log::warn!("[{}] Failed to kill process {}: {}", self.shared.id, child.id(), e);
            }
        }
        kill_matching_processes(&self.executable);
    }

    /// Blocks until the output reader has finished. Returns immediately if no
    /// reader is running.
    pub fn join(&self) {
        let handle = lock(&self.worker).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("[{}] Output reader panicked", self.shared.id);
            }
        }
    }
}

fn drain_output(shared: &Shared, stdout: Option<ChildStdout>) {
    defer! {
        shared.finish();
    }
    let Some(stdout) = stdout else {
        return;
    };

    let mut reader = BufReader::new(stdout);
    let mut line = Vec::new();
    while !shared.is_cancelled() {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {
                trim_line_ending(&mut line);
                shared.publish_output(line.clone(), false);
            }
            Err(e) => {
                shared.publish_error(format!("Failed to read process output: {}", e));
                break;
            }
        }
    }
}

fn trim_line_ending(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
}

/// `<executable file name>@<first uuid group>`, restricted to characters that are
/// safe in thread names.
fn thread_name(executable: &Path, id: Uuid) -> String {
    let file_name = executable
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or(Cow::Borrowed("engine"));
    let sanitized: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let short_id = id.simple().to_string();
    format!("{}@{}", sanitized, short_id.get(..8).unwrap_or(&short_id))
}

/// Best-effort sweep of processes left behind by an engine.
///
/// Matches by substring of the command line, so another installation whose path
/// starts with this one can be hit too. The launcher's own process is skipped.
fn kill_matching_processes(executable: &Path) -> usize {
    let needle = executable.to_string_lossy();
    if needle.is_empty() {
        return 0;
    }

    let mut system = System::new();
    system.refresh_processes();
    let own_pid = sysinfo::get_current_pid().ok();

    let mut killed = 0;
    for (pid, process) in system.processes() {
        if Some(*pid) == own_pid {
            continue;
        }
        let command_line = process.cmd().join(" ");
        let matches_exe = process.exe().is_some_and(|exe| exe == executable);
        if (matches_exe || command_line.contains(needle.as_ref())) && process.kill() {
            log::debug!("Killed leftover process {} ({})", pid, command_line);
            killed += 1;
        }
    }
    killed
}

/// Launch controller for one engine executable.
///
/// Any number of sessions may run at once; the controller keeps track of them so
/// they can be stopped or awaited together.
#[derive(Debug)]
pub struct EngineProcess {
    executable: PathBuf,
    sessions: Mutex<Vec<Arc<ProcessSession>>>,
}

impl EngineProcess {
    /// Controller for a validated engine.
    pub fn new(engine: &EngineDescriptor) -> Self {
        Self::from_executable(engine.path().to_path_buf())
    }

    pub(crate) fn from_executable(executable: PathBuf) -> Self {
        Self {
            executable,
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// Executable every session of this controller runs.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Creates an idle session. Subscribe to it, then call
    /// [`ProcessSession::launch`].
    pub fn session(&self) -> Arc<ProcessSession> {
        let session = Arc::new(ProcessSession::new(self.executable.clone()));
        let mut sessions = lock(&self.sessions);
        sessions.retain(|session| session.state() != ProcessState::Terminated);
        sessions.push(Arc::clone(&session));
        session
    }

    /// Creates a session and launches it right away.
    pub fn launch<S: AsRef<str>>(&self, args: &[S]) -> Arc<ProcessSession> {
        let session = self.session();
        // A fresh session is always idle.
        if let Err(e) = session.launch(args) {
            log::error!("{}", e);
        }
        session
    }

    /// Sessions that have not terminated yet.
    pub fn active_sessions(&self) -> Vec<Arc<ProcessSession>> {
        lock(&self.sessions)
            .iter()
            .filter(|session| session.state() != ProcessState::Terminated)
            .cloned()
            .collect()
    }

    /// Kills every running session. A no-op when nothing runs.
    pub fn kill(&self) {
        for session in self.active_sessions() {
            session.kill();
        }
    }

    /// Waits for every session's output reader to finish.
    pub fn join(&self) {
        let sessions: Vec<_> = lock(&self.sessions).clone();
        for session in sessions {
            session.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[test]
    fn test_kill_without_session_is_noop() {
        let process = EngineProcess::from_executable(PathBuf::from("/definitely/not/here/godot"));
        process.kill();
        process.join();

        let session = process.session();
        session.kill();
        session.join();
        assert_eq!(session.state(), ProcessState::Idle);
    }

    #[test]
    fn test_spawn_failure_is_reported_as_event() {
        let process = EngineProcess::from_executable(PathBuf::from("/definitely/not/here/godot"));
        let session = process.session();
        let start = session.on_start();
        let output = session.on_output();
        let end = session.on_end();

        assert!(session.launch(&["--editor"]).is_ok());
        session.join();

        let events: Vec<OutputEvent> = output.try_iter().collect();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_error);
        assert!(events[0].text().contains("Could not start"));

        assert!(start.try_iter().next().is_none());
        let end_event = end.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(end_event.exit_code, None);
        assert!(!end_event.killed);
        assert_eq!(session.state(), ProcessState::Terminated);
    }

    #[test]
    fn test_session_cannot_be_launched_twice() {
        let process = EngineProcess::from_executable(PathBuf::from("/definitely/not/here/godot"));
        let session = process.session();
        session.launch::<&str>(&[]).unwrap();
        assert!(matches!(
            session.launch::<&str>(&[]),
            Err(ProcessError::AlreadyLaunched(id)) if id == session.id()
        ));
    }

    #[test]
    fn test_subscribing_after_termination_is_disconnected() {
        let process = EngineProcess::from_executable(PathBuf::from("/definitely/not/here/godot"));
        let session = process.launch::<&str>(&[]);
        session.join();
        assert!(session.on_end().recv_timeout(TIMEOUT).is_err());
    }

    #[test]
    fn test_thread_name() {
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(
            thread_name(Path::new("/opt/Godot v3.2 (mono).x86_64"), id),
            "Godot_v3.2__mono_.x86_64@67e55044"
        );
    }

    #[test]
    fn test_trim_line_ending() {
        let mut line = b"hello\r\n".to_vec();
        trim_line_ending(&mut line);
        assert_eq!(line, b"hello");

        let mut line = b"no newline".to_vec();
        trim_line_ending(&mut line);
        assert_eq!(line, b"no newline");
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::fs;
        use tempfile::TempDir;

        /// Copies a system tool into a private directory, so the command-line
        /// sweep in `kill` can only ever match processes started by the test.
        fn private_copy(dir: &TempDir, tool: &str) -> PathBuf {
            let source = ["/bin", "/usr/bin"]
                .iter()
                .map(|prefix| Path::new(prefix).join(tool))
                .find(|path| path.exists())
                .unwrap();
            let target = dir.path().join(tool);
            fs::copy(source, &target).unwrap();
            target
        }

        #[test]
        fn test_output_lines_are_streamed_in_order() {
            let dir = TempDir::new().unwrap();
            let process = EngineProcess::from_executable(private_copy(&dir, "sh"));
            let session = process.session();
            let start = session.on_start();
            let output = session.on_output();
            let end = session.on_end();

            session.launch(&["-c", "echo first; echo second; exit 3"]).unwrap();
            process.join();

            let start_event = start.recv_timeout(TIMEOUT).unwrap();
            assert_eq!(start_event.session, session.id());
            assert!(start_event.pid > 0);

            let lines: Vec<String> = output
                .try_iter()
                .map(|event| {
                    assert!(!event.is_error);
                    event.text().into_owned()
                })
                .collect();
            assert_eq!(lines, vec!["first", "second"]);

            let end_event = end.recv_timeout(TIMEOUT).unwrap();
            assert_eq!(end_event.exit_code, Some(3));
            assert!(!end_event.killed);
            assert_eq!(session.state(), ProcessState::Terminated);
            // Senders are gone once the session is over.
            assert!(output.recv_timeout(TIMEOUT).is_err());
        }

        #[test]
        fn test_kill_stops_a_running_session() {
            let dir = TempDir::new().unwrap();
            let process = EngineProcess::from_executable(private_copy(&dir, "sleep"));
            let session = process.session();
            let end = session.on_end();

            session.launch(&["30"]).unwrap();
            assert_eq!(session.state(), ProcessState::Running);
            assert_eq!(process.active_sessions().len(), 1);

            process.kill();
            session.join();

            let end_event = end.recv_timeout(TIMEOUT).unwrap();
            assert!(end_event.killed);
            assert_eq!(session.state(), ProcessState::Terminated);
            assert!(process.active_sessions().is_empty());
        }

        fn read_pid(path: &Path) -> Option<u32> {
            fs::read_to_string(path).ok()?.trim().parse().ok()
        }

        fn is_gone(system: &mut System, pid: u32) -> bool {
            system.refresh_processes();
            match system.process(sysinfo::Pid::from_u32(pid)) {
                None => true,
                Some(process) => process.status() == sysinfo::ProcessStatus::Zombie,
            }
        }

        #[test]
        fn test_kill_sweeps_processes_started_from_the_same_executable() {
            let dir = TempDir::new().unwrap();
            let shell = private_copy(&dir, "sh");
            let pid_file = dir.path().join("leftover.pid");
            let process = EngineProcess::from_executable(shell.clone());
            let session = process.session();
            let end = session.on_end();

            // The trailing `exit` keeps the background shell from exec'ing into `sleep`.
            let script = format!(
                "'{}' -c 'sleep 30; exit 0' >/dev/null 2>&1 & echo $! > '{}'; wait",
                shell.display(),
                pid_file.display()
            );
            session.launch(&["-c", script.as_str()]).unwrap();

            let deadline = std::time::Instant::now() + TIMEOUT;
            let leftover = loop {
                if let Some(pid) = read_pid(&pid_file) {
                    break pid;
                }
                assert!(std::time::Instant::now() < deadline, "background shell never started");
                thread::sleep(Duration::from_millis(20));
            };

            let mut system = System::new();
            assert!(!is_gone(&mut system, leftover));

            session.kill();
            session.join();
            assert!(end.recv_timeout(TIMEOUT).unwrap().killed);

            let deadline = std::time::Instant::now() + TIMEOUT;
            while !is_gone(&mut system, leftover) {
                assert!(
                    std::time::Instant::now() < deadline,
                    "process {} outlived the session",
                    leftover
                );
                thread::sleep(Duration::from_millis(20));
            }
        }

        #[test]
        fn test_sessions_are_independent() {
            let dir = TempDir::new().unwrap();
            let process = EngineProcess::from_executable(private_copy(&dir, "sh"));

            let first = process.session();
            let first_output = first.on_output();
            let second = process.session();
            let second_output = second.on_output();

            first.launch(&["-c", "echo one"]).unwrap();
            second.launch(&["-c", "echo two"]).unwrap();
            process.join();

            let first_lines: Vec<String> =
                first_output.try_iter().map(|e| e.text().into_owned()).collect();
            let second_lines: Vec<String> =
                second_output.try_iter().map(|e| e.text().into_owned()).collect();
            assert_eq!(first_lines, vec!["one"]);
            assert_eq!(second_lines, vec!["two"]);
            assert_ne!(first.id(), second.id());
        }
    }
}
