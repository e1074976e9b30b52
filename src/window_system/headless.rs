use super::{WindowError, WindowEvent, WindowHandle, WindowInfo, WindowSystem};
use crate::geometry::{FrameRect, Position, Size};

/// Window system for front ends without a compositor connection.
///
/// Nothing is ever enumerated, so every pane resolves as window-less and
/// all mutations fail with [`WindowError::Unavailable`].
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessWindowSystem;

impl WindowSystem for HeadlessWindowSystem {
    fn is_live(&self) -> bool {
        false
    }

    fn windows(&self) -> Vec<WindowInfo> {
        Vec::new()
    }

    fn poll_events(&mut self) -> Vec<WindowEvent> {
        Vec::new()
    }

    fn watch_geometry(&mut self, _handle: WindowHandle) -> Result<(), WindowError> {
        Err(WindowError::Unavailable)
    }

    fn unwatch_geometry(&mut self, _handle: WindowHandle) {}

    fn minimize(&mut self, _handle: WindowHandle) -> Result<(), WindowError> {
        Err(WindowError::Unavailable)
    }

    fn unminimize(&mut self, _handle: WindowHandle) -> Result<(), WindowError> {
        Err(WindowError::Unavailable)
    }

    fn raise(&mut self, _handle: WindowHandle) -> Result<(), WindowError> {
        Err(WindowError::Unavailable)
    }

    fn focus(&mut self, _handle: WindowHandle) -> Result<(), WindowError> {
        Err(WindowError::Unavailable)
    }

    fn move_frame(&mut self, _handle: WindowHandle, _position: Position) -> Result<(), WindowError> {
        Err(WindowError::Unavailable)
    }

    fn resize_frame(&mut self, _handle: WindowHandle, _size: Size) -> Result<(), WindowError> {
        Err(WindowError::Unavailable)
    }

    fn set_above(&mut self, _handle: WindowHandle, _above: bool) -> Result<(), WindowError> {
        Err(WindowError::Unavailable)
    }

    fn unmake_fullscreen(&mut self, _handle: WindowHandle) -> Result<(), WindowError> {
        Err(WindowError::Unavailable)
    }

    fn unmaximize(&mut self, _handle: WindowHandle) -> Result<(), WindowError> {
        Err(WindowError::Unavailable)
    }

    fn close(&mut self, _handle: WindowHandle) -> Result<(), WindowError> {
        Err(WindowError::Unavailable)
    }

    fn work_area(&self, _handle: WindowHandle) -> Option<FrameRect> {
        None
    }

    fn primary_work_area(&self) -> Option<FrameRect> {
        None
    }
}
