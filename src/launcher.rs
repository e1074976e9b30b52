//! Fire-and-forget process launching with per-pane attempt tracking.
//!
//! The spawned process id is deliberately not kept: single-instance apps
//! hand their window to an already running process, so the pid of the
//! child rarely owns the window that eventually appears.

use std::collections::BTreeMap;
use std::io;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Instant;

use thiserror::Error;

use crate::pane::PaneId;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("command is empty")]
    EmptyCommand,
    #[error("failed to parse command line: {0}")]
    Parse(#[from] shell_words::ParseError),
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Starts a process from an argv without waiting for it.
pub trait Spawner {
    fn spawn(&mut self, argv: &[String]) -> io::Result<()>;
}

/// Spawns real processes with stdio detached. Each child is reaped on a
/// short-lived background thread so it never lingers as a zombie.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandSpawner;

impl Spawner for CommandSpawner {
    fn spawn(&mut self, argv: &[String]) -> io::Result<()> {
        let Some((program, args)) = argv.split_first() else {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty argv"));
        };
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        thread::Builder::new()
            .name("pane-reaper".to_string())
            .spawn(move || {
                let _ = child.wait();
            })?;
        Ok(())
    }
}

/// Records argv lists instead of spawning. Can be told to fail.
#[derive(Debug, Default, Clone)]
pub struct RecordingSpawner {
    pub launched: Vec<Vec<String>>,
    pub fail: bool,
}

impl RecordingSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            launched: Vec::new(),
            fail: true,
        }
    }
}

impl Spawner for RecordingSpawner {
    fn spawn(&mut self, argv: &[String]) -> io::Result<()> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::NotFound, "spawn refused"));
        }
        self.launched.push(argv.to_vec());
        Ok(())
    }
}

/// Identifies one launch attempt. `generation` is unique across all panes
/// and increases with every successful spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchHandle {
    pub generation: u64,
    pub launched_at: Instant,
}

pub fn parse_command(command: &str) -> Result<Vec<String>, LaunchError> {
    if command.trim().is_empty() {
        return Err(LaunchError::EmptyCommand);
    }
    let argv = shell_words::split(command)?;
    if argv.is_empty() {
        return Err(LaunchError::EmptyCommand);
    }
    Ok(argv)
}

#[derive(Debug)]
pub struct ProcessLauncher<S> {
    spawner: S,
    next_generation: u64,
    attempts: BTreeMap<PaneId, LaunchHandle>,
}

impl<S: Spawner> ProcessLauncher<S> {
    pub fn new(spawner: S) -> Self {
        Self {
            spawner,
            next_generation: 1,
            attempts: BTreeMap::new(),
        }
    }

    /// Spawn `command` for `pane`. On success the returned handle supersedes
    /// any earlier attempt for the same pane.
    pub fn launch(
        &mut self,
        pane: &PaneId,
        command: &str,
        now: Instant,
    ) -> Result<LaunchHandle, LaunchError> {
        let argv = parse_command(command)?;
        self.spawner
            .spawn(&argv)
            .map_err(|source| LaunchError::Spawn {
                program: argv[0].clone(),
                source,
            })?;
        let handle = LaunchHandle {
            generation: self.next_generation,
            launched_at: now,
        };
        self.next_generation += 1;
        self.attempts.insert(pane.clone(), handle);
        Ok(handle)
    }

    pub fn current(&self, pane: &PaneId) -> Option<LaunchHandle> {
        self.attempts.get(pane).copied()
    }

    /// Whether `handle` is still the latest attempt for `pane`.
    pub fn is_current(&self, pane: &PaneId, handle: LaunchHandle) -> bool {
        self.current(pane)
            .is_some_and(|current| current.generation == handle.generation)
    }

    pub fn forget(&mut self, pane: &PaneId) {
        self.attempts.remove(pane);
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    pub fn spawner_mut(&mut self) -> &mut S {
        &mut self.spawner
    }
}
