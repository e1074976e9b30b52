//! Abstract window-system capability.
//!
//! The manager never talks to a compositor directly; it is handed a
//! [`WindowSystem`] at construction. Production bindings wrap the real
//! compositor, tests use [`fake::FakeWindowSystem`].

pub mod fake;
pub mod headless;

use thiserror::Error;

use crate::geometry::{FrameRect, Position, Size};
use crate::pane::WindowRef;

pub type WindowHandle = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Normal,
    Dialog,
    Utility,
    Other,
}

/// Snapshot of one top-level window's attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub handle: WindowHandle,
    /// Owning process id, 0 when unknown.
    pub process_id: u32,
    pub class: Option<String>,
    pub title: String,
    /// Monotonically increasing token assigned at creation.
    pub creation_token: u32,
    pub kind: WindowKind,
    pub frame: FrameRect,
    pub minimized: bool,
}

impl WindowInfo {
    pub fn window_ref(&self) -> WindowRef {
        WindowRef::new(self.process_id, self.handle)
    }

    /// Normal top-level windows with a known owner. Dialogs, utility windows
    /// and windows without a process id are never panes.
    pub fn is_interesting(&self) -> bool {
        self.kind == WindowKind::Normal && self.process_id > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    Created(WindowHandle),
    /// Only delivered for windows passed to [`WindowSystem::watch_geometry`].
    PositionChanged(WindowHandle),
    /// Only delivered for windows passed to [`WindowSystem::watch_geometry`].
    SizeChanged(WindowHandle),
    Closed(WindowHandle),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("window {0} is no longer available")]
    Gone(WindowHandle),
    #[error("{op} rejected for window {handle}: {reason}")]
    Rejected {
        op: &'static str,
        handle: WindowHandle,
        reason: String,
    },
    #[error("no window system connection")]
    Unavailable,
}

/// Window enumeration, mutation and signal delivery.
///
/// Every mutation is fallible on its own; callers treat each call as an
/// isolated step.
pub trait WindowSystem {
    /// False when windows cannot be enumerated at all. Saved window
    /// identities are then left untouched instead of being judged stale.
    fn is_live(&self) -> bool {
        true
    }

    /// All top-level windows currently known, in no particular order.
    fn windows(&self) -> Vec<WindowInfo>;

    fn window(&self, handle: WindowHandle) -> Option<WindowInfo> {
        self.windows().into_iter().find(|w| w.handle == handle)
    }

    /// Drain events delivered since the last call, oldest first.
    fn poll_events(&mut self) -> Vec<WindowEvent>;

    /// Attach position/size listeners to a window.
    fn watch_geometry(&mut self, handle: WindowHandle) -> Result<(), WindowError>;

    fn unwatch_geometry(&mut self, handle: WindowHandle);

    fn minimize(&mut self, handle: WindowHandle) -> Result<(), WindowError>;
    fn unminimize(&mut self, handle: WindowHandle) -> Result<(), WindowError>;
    fn raise(&mut self, handle: WindowHandle) -> Result<(), WindowError>;
    fn focus(&mut self, handle: WindowHandle) -> Result<(), WindowError>;

    fn move_frame(&mut self, handle: WindowHandle, position: Position) -> Result<(), WindowError>;

    /// Resize keeping the current frame origin.
    fn resize_frame(&mut self, handle: WindowHandle, size: Size) -> Result<(), WindowError>;

    fn set_above(&mut self, handle: WindowHandle, above: bool) -> Result<(), WindowError>;
    fn unmake_fullscreen(&mut self, handle: WindowHandle) -> Result<(), WindowError>;
    fn unmaximize(&mut self, handle: WindowHandle) -> Result<(), WindowError>;

    /// Politely ask the client to close the window.
    fn close(&mut self, handle: WindowHandle) -> Result<(), WindowError>;

    /// Work area of the monitor that contains `handle`.
    fn work_area(&self, handle: WindowHandle) -> Option<FrameRect>;

    /// Work area of the monitor new windows open on.
    fn primary_work_area(&self) -> Option<FrameRect>;
}
