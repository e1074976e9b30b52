//! Deterministic in-memory window system.
//!
//! Windows are opened, moved and closed by the test script; every mutation
//! the manager performs is recorded in [`FakeWindowSystem::calls`].

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::{WindowError, WindowEvent, WindowHandle, WindowInfo, WindowKind, WindowSystem};
use crate::geometry::{FrameRect, Position, Size};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowCall {
    Watch(WindowHandle),
    Unwatch(WindowHandle),
    Minimize(WindowHandle),
    Unminimize(WindowHandle),
    Raise(WindowHandle),
    Focus(WindowHandle),
    Move(WindowHandle, Position),
    Resize(WindowHandle, Size),
    SetAbove(WindowHandle, bool),
    UnmakeFullscreen(WindowHandle),
    Unmaximize(WindowHandle),
    Close(WindowHandle),
}

impl WindowCall {
    pub fn handle(&self) -> WindowHandle {
        match *self {
            WindowCall::Watch(h)
            | WindowCall::Unwatch(h)
            | WindowCall::Minimize(h)
            | WindowCall::Unminimize(h)
            | WindowCall::Raise(h)
            | WindowCall::Focus(h)
            | WindowCall::Move(h, _)
            | WindowCall::Resize(h, _)
            | WindowCall::SetAbove(h, _)
            | WindowCall::UnmakeFullscreen(h)
            | WindowCall::Unmaximize(h)
            | WindowCall::Close(h) => h,
        }
    }

    fn op(&self) -> &'static str {
        match self {
            WindowCall::Watch(_) => "watch",
            WindowCall::Unwatch(_) => "unwatch",
            WindowCall::Minimize(_) => "minimize",
            WindowCall::Unminimize(_) => "unminimize",
            WindowCall::Raise(_) => "raise",
            WindowCall::Focus(_) => "focus",
            WindowCall::Move(..) => "move",
            WindowCall::Resize(..) => "resize",
            WindowCall::SetAbove(..) => "set-above",
            WindowCall::UnmakeFullscreen(_) => "unmake-fullscreen",
            WindowCall::Unmaximize(_) => "unmaximize",
            WindowCall::Close(_) => "close",
        }
    }
}

/// Attributes for a window the script opens.
#[derive(Debug, Clone)]
pub struct WindowSpec {
    pub process_id: u32,
    pub class: Option<String>,
    pub title: String,
    pub kind: WindowKind,
    pub frame: FrameRect,
}

impl WindowSpec {
    pub fn normal(process_id: u32, title: impl Into<String>) -> Self {
        Self {
            process_id,
            class: None,
            title: title.into(),
            kind: WindowKind::Normal,
            frame: FrameRect::new(0, 0, 800, 600),
        }
    }

    pub fn with_kind(mut self, kind: WindowKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn with_frame(mut self, frame: FrameRect) -> Self {
        self.frame = frame;
        self
    }
}

#[derive(Debug)]
pub struct FakeWindowSystem {
    windows: BTreeMap<WindowHandle, WindowInfo>,
    events: VecDeque<WindowEvent>,
    watched: BTreeSet<WindowHandle>,
    failing: BTreeSet<&'static str>,
    calls: Vec<WindowCall>,
    work_area: FrameRect,
    next_handle: WindowHandle,
    next_token: u32,
}

impl Default for FakeWindowSystem {
    fn default() -> Self {
        Self::new(FrameRect::new(0, 0, 1920, 1080))
    }
}

impl FakeWindowSystem {
    pub fn new(work_area: FrameRect) -> Self {
        Self {
            windows: BTreeMap::new(),
            events: VecDeque::new(),
            watched: BTreeSet::new(),
            failing: BTreeSet::new(),
            calls: Vec::new(),
            work_area,
            next_handle: 1000,
            next_token: 1,
        }
    }

    /// Open a window and queue its creation event.
    pub fn open(&mut self, spec: WindowSpec) -> WindowHandle {
        let handle = self.insert(spec);
        self.events.push_back(WindowEvent::Created(handle));
        handle
    }

    /// Add a window without announcing it, as if it existed before the
    /// manager started.
    pub fn insert(&mut self, spec: WindowSpec) -> WindowHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        let token = self.next_token;
        self.next_token += 1;
        self.windows.insert(
            handle,
            WindowInfo {
                handle,
                process_id: spec.process_id,
                class: spec.class,
                title: spec.title,
                creation_token: token,
                kind: spec.kind,
                frame: spec.frame,
                minimized: false,
            },
        );
        handle
    }

    /// Close a window from outside the manager (e.g. the user clicked X).
    pub fn close_external(&mut self, handle: WindowHandle) {
        if self.windows.remove(&handle).is_some() {
            self.watched.remove(&handle);
            self.events.push_back(WindowEvent::Closed(handle));
        }
    }

    /// Drop a window without any event, leaving stale references behind.
    pub fn vanish(&mut self, handle: WindowHandle) {
        self.windows.remove(&handle);
        self.watched.remove(&handle);
    }

    /// Move a window as the user would, emitting a position event if watched.
    pub fn user_move(&mut self, handle: WindowHandle, position: Position) {
        if let Some(window) = self.windows.get_mut(&handle) {
            window.frame.x = position.x;
            window.frame.y = position.y;
            if self.watched.contains(&handle) {
                self.events.push_back(WindowEvent::PositionChanged(handle));
            }
        }
    }

    pub fn user_resize(&mut self, handle: WindowHandle, size: Size) {
        if let Some(window) = self.windows.get_mut(&handle) {
            window.frame.width = size.width;
            window.frame.height = size.height;
            if self.watched.contains(&handle) {
                self.events.push_back(WindowEvent::SizeChanged(handle));
            }
        }
    }

    /// Make every future call of `op` (e.g. `"move"`) fail.
    pub fn fail_op(&mut self, op: &'static str) {
        self.failing.insert(op);
    }

    pub fn calls(&self) -> &[WindowCall] {
        &self.calls
    }

    pub fn calls_for(&self, handle: WindowHandle) -> Vec<WindowCall> {
        self.calls
            .iter()
            .filter(|call| call.handle() == handle)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn is_watched(&self, handle: WindowHandle) -> bool {
        self.watched.contains(&handle)
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    fn record(&mut self, call: WindowCall) -> Result<(), WindowError> {
        let handle = call.handle();
        let op = call.op();
        self.calls.push(call);
        if !self.windows.contains_key(&handle) {
            return Err(WindowError::Gone(handle));
        }
        if self.failing.contains(op) {
            return Err(WindowError::Rejected {
                op,
                handle,
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn frame_changed(&mut self, handle: WindowHandle, event: WindowEvent) {
        if self.watched.contains(&handle) {
            self.events.push_back(event);
        }
    }
}

impl WindowSystem for FakeWindowSystem {
    fn windows(&self) -> Vec<WindowInfo> {
        self.windows.values().cloned().collect()
    }

    fn window(&self, handle: WindowHandle) -> Option<WindowInfo> {
        self.windows.get(&handle).cloned()
    }

    fn poll_events(&mut self) -> Vec<WindowEvent> {
        self.events.drain(..).collect()
    }

    fn watch_geometry(&mut self, handle: WindowHandle) -> Result<(), WindowError> {
        self.record(WindowCall::Watch(handle))?;
        self.watched.insert(handle);
        Ok(())
    }

    fn unwatch_geometry(&mut self, handle: WindowHandle) {
        self.calls.push(WindowCall::Unwatch(handle));
        self.watched.remove(&handle);
    }

    fn minimize(&mut self, handle: WindowHandle) -> Result<(), WindowError> {
        self.record(WindowCall::Minimize(handle))?;
        if let Some(window) = self.windows.get_mut(&handle) {
            window.minimized = true;
        }
        Ok(())
    }

    fn unminimize(&mut self, handle: WindowHandle) -> Result<(), WindowError> {
        self.record(WindowCall::Unminimize(handle))?;
        if let Some(window) = self.windows.get_mut(&handle) {
            window.minimized = false;
        }
        Ok(())
    }

    fn raise(&mut self, handle: WindowHandle) -> Result<(), WindowError> {
        self.record(WindowCall::Raise(handle))
    }

    fn focus(&mut self, handle: WindowHandle) -> Result<(), WindowError> {
        self.record(WindowCall::Focus(handle))
    }

    fn move_frame(&mut self, handle: WindowHandle, position: Position) -> Result<(), WindowError> {
        self.record(WindowCall::Move(handle, position))?;
        if let Some(window) = self.windows.get_mut(&handle) {
            window.frame.x = position.x;
            window.frame.y = position.y;
        }
        self.frame_changed(handle, WindowEvent::PositionChanged(handle));
        Ok(())
    }

    fn resize_frame(&mut self, handle: WindowHandle, size: Size) -> Result<(), WindowError> {
        self.record(WindowCall::Resize(handle, size))?;
        if let Some(window) = self.windows.get_mut(&handle) {
            window.frame.width = size.width;
            window.frame.height = size.height;
        }
        self.frame_changed(handle, WindowEvent::SizeChanged(handle));
        Ok(())
    }

    fn set_above(&mut self, handle: WindowHandle, above: bool) -> Result<(), WindowError> {
        self.record(WindowCall::SetAbove(handle, above))
    }

    fn unmake_fullscreen(&mut self, handle: WindowHandle) -> Result<(), WindowError> {
        self.record(WindowCall::UnmakeFullscreen(handle))
    }

    fn unmaximize(&mut self, handle: WindowHandle) -> Result<(), WindowError> {
        self.record(WindowCall::Unmaximize(handle))
    }

    fn close(&mut self, handle: WindowHandle) -> Result<(), WindowError> {
        self.record(WindowCall::Close(handle))?;
        self.close_external(handle);
        Ok(())
    }

    fn work_area(&self, handle: WindowHandle) -> Option<FrameRect> {
        self.windows.contains_key(&handle).then_some(self.work_area)
    }

    fn primary_work_area(&self) -> Option<FrameRect> {
        Some(self.work_area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_increase_with_creation_order() {
        let mut ws = FakeWindowSystem::default();
        let a = ws.open(WindowSpec::normal(10, "a"));
        let b = ws.open(WindowSpec::normal(11, "b"));
        let ta = ws.window(a).unwrap().creation_token;
        let tb = ws.window(b).unwrap().creation_token;
        assert!(tb > ta);
        assert_eq!(
            ws.poll_events(),
            vec![WindowEvent::Created(a), WindowEvent::Created(b)]
        );
        assert!(ws.poll_events().is_empty());
    }

    #[test]
    fn geometry_events_only_for_watched_windows() {
        let mut ws = FakeWindowSystem::default();
        let h = ws.insert(WindowSpec::normal(10, "a"));
        ws.user_move(h, Position::new(5, 5));
        assert!(ws.poll_events().is_empty());
        ws.watch_geometry(h).unwrap();
        ws.user_move(h, Position::new(6, 6));
        ws.user_resize(h, Size::new(100, 100));
        assert_eq!(
            ws.poll_events(),
            vec![WindowEvent::PositionChanged(h), WindowEvent::SizeChanged(h)]
        );
    }

    #[test]
    fn injected_failures_and_gone_windows() {
        let mut ws = FakeWindowSystem::default();
        let h = ws.insert(WindowSpec::normal(10, "a"));
        ws.fail_op("move");
        assert!(matches!(
            ws.move_frame(h, Position::new(1, 1)),
            Err(WindowError::Rejected { op: "move", .. })
        ));
        assert!(ws.resize_frame(h, Size::new(1, 1)).is_ok());
        ws.vanish(h);
        assert_eq!(ws.minimize(h), Err(WindowError::Gone(h)));
        assert!(ws.poll_events().is_empty());
    }

    #[test]
    fn close_emits_closed_event() {
        let mut ws = FakeWindowSystem::default();
        let h = ws.insert(WindowSpec::normal(10, "a"));
        ws.close(h).unwrap();
        assert!(ws.window(h).is_none());
        assert_eq!(ws.poll_events(), vec![WindowEvent::Closed(h)]);
    }
}
