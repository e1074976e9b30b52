use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use thiserror::Error;

use crate::constants::MANAGED_APP_SCRIPT;
use crate::geometry::{Position, Size};

/// Opaque pane identity, stable for the pane's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PaneId(String);

impl PaneId {
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PaneId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PaneId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for PaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Composite window identity: owning process id plus window handle.
///
/// Formats as `"<processId>-<windowHandle>"`, the persisted `windowId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowRef {
    pub process_id: u32,
    pub handle: u64,
}

impl WindowRef {
    pub fn new(process_id: u32, handle: u64) -> Self {
        Self { process_id, handle }
    }
}

impl fmt::Display for WindowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.process_id, self.handle)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid window id {0:?}, expected \"<processId>-<windowHandle>\"")]
pub struct WindowRefParseError(pub String);

impl FromStr for WindowRef {
    type Err = WindowRefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || WindowRefParseError(s.to_string());
        let (pid, handle) = s.split_once('-').ok_or_else(err)?;
        Ok(Self {
            process_id: pid.parse().map_err(|_| err())?,
            handle: handle.parse().map_err(|_| err())?,
        })
    }
}

/// A managed floating window plus its launch command and persisted
/// identity/geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pane {
    pub id: PaneId,
    pub command: String,
    /// Intended display state, independent of whether a window is matched.
    pub visible: bool,
    pub window: Option<WindowRef>,
    /// Window-system creation token captured at match time.
    pub creation_token: Option<u32>,
    pub last_position: Option<Position>,
    pub last_size: Option<Size>,
    /// Set on every spawn; never persisted.
    pub launched_at: Option<Instant>,
}

impl Pane {
    pub fn new(id: PaneId, command: impl Into<String>) -> Self {
        Self {
            id,
            command: command.into(),
            visible: true,
            window: None,
            creation_token: None,
            last_position: None,
            last_size: None,
            launched_at: None,
        }
    }

    pub fn is_launchable(&self) -> bool {
        !self.command.trim().is_empty()
    }

    /// True when the pane remembers some window identity, live or not.
    pub fn has_identity(&self) -> bool {
        self.window.is_some() || self.creation_token.is_some()
    }

    pub fn clear_identity(&mut self) {
        self.window = None;
        self.creation_token = None;
    }

    /// Whether the command runs the bundled web application.
    pub fn is_managed_app(&self) -> bool {
        self.command.contains(MANAGED_APP_SCRIPT)
    }
}
