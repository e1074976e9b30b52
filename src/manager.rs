//! Pane lifecycle orchestration.
//!
//! [`PaneManager`] owns the pane map and composes the launcher, the
//! correlator and the injected window system. Every entry point runs to
//! completion on the caller's thread; delayed work (launch timeouts and the
//! post-match geometry settle) is queued as timers and fired by
//! [`PaneManager::tick`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use thiserror::Error;

use crate::clock::{Clock, SystemClock};
use crate::command::{AppCommand, default_app_dir};
use crate::constants::{GEOMETRY_SETTLE_DELAY, LAUNCH_TIMEOUT};
use crate::correlator::{Candidate, correlate, rematch};
use crate::geometry::{centered, percent_size};
use crate::launcher::{CommandSpawner, LaunchHandle, ProcessLauncher, Spawner};
use crate::pane::{Pane, PaneId, WindowRef};
use crate::settings::{PaneSettings, SettingsStore};
use crate::store::PaneStore;
use crate::timers::{Timer, TimerQueue};
use crate::window_system::{WindowError, WindowEvent, WindowHandle, WindowInfo, WindowSystem};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaneError {
    #[error("no pane with id {0}")]
    UnknownPane(PaneId),
}

/// A failure that was handled internally but should be surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaneReport {
    LaunchFailed { pane: PaneId, reason: String },
    MatchTimeout { pane: PaneId },
    StaleWindow { pane: PaneId, window: Option<WindowRef> },
    GeometryFailed {
        pane: PaneId,
        op: &'static str,
        error: WindowError,
    },
    PersistFailed { reason: String },
}

impl fmt::Display for PaneReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaneReport::LaunchFailed { pane, reason } => {
                write!(f, "pane {pane}: launch failed: {reason}")
            }
            PaneReport::MatchTimeout { pane } => write!(
                f,
                "pane {pane}: no window appeared within {}s",
                LAUNCH_TIMEOUT.as_secs()
            ),
            PaneReport::StaleWindow {
                pane,
                window: Some(window),
            } => write!(f, "pane {pane}: window {window} is gone"),
            PaneReport::StaleWindow { pane, window: None } => {
                write!(f, "pane {pane}: window is gone")
            }
            PaneReport::GeometryFailed { pane, op, error } => {
                write!(f, "pane {pane}: {op} failed: {error}")
            }
            PaneReport::PersistFailed { reason } => write!(f, "could not save panes: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Shown,
    Hidden,
    /// A process was (re)started; the pane waits for its window.
    Launched,
    /// The pane believed it was visible but its window is gone.
    Demoted,
}

#[derive(Debug, Clone, Copy)]
enum GeometryAxis {
    Position,
    Size,
}

pub struct PaneManager<W, S = CommandSpawner, C = SystemClock> {
    store: PaneStore,
    settings_store: Box<dyn SettingsStore>,
    settings: PaneSettings,
    windows: W,
    launcher: ProcessLauncher<S>,
    clock: C,
    timers: TimerQueue,
    watched: BTreeMap<WindowHandle, PaneId>,
    reports: Vec<PaneReport>,
    app_dir: PathBuf,
}

impl<W: WindowSystem> PaneManager<W> {
    /// Manager that spawns real processes and reads the system clock.
    pub fn new(windows: W, settings_store: Box<dyn SettingsStore>) -> Self {
        Self::with_parts(windows, settings_store, CommandSpawner, SystemClock)
    }
}

impl<W: WindowSystem, S: Spawner, C: Clock> PaneManager<W, S, C> {
    /// Build a manager and restore the saved session.
    pub fn with_parts(
        windows: W,
        settings_store: Box<dyn SettingsStore>,
        spawner: S,
        clock: C,
    ) -> Self {
        let settings = PaneSettings::load(settings_store.as_ref());
        let mut manager = Self {
            store: PaneStore::new(),
            settings_store,
            settings,
            windows,
            launcher: ProcessLauncher::new(spawner),
            clock,
            timers: TimerQueue::new(),
            watched: BTreeMap::new(),
            reports: Vec::new(),
            app_dir: default_app_dir().unwrap_or_default(),
        };
        manager.restore_session();
        manager
    }

    /// Directory holding the bundled application used by default panes.
    pub fn with_app_dir(mut self, app_dir: impl Into<PathBuf>) -> Self {
        self.app_dir = app_dir.into();
        self
    }

    pub fn settings(&self) -> PaneSettings {
        self.settings
    }

    pub fn reload_settings(&mut self) {
        self.settings = PaneSettings::load(self.settings_store.as_ref());
        tracing::info!(settings = ?self.settings, "reloaded settings");
    }

    pub fn settings_store(&self) -> &dyn SettingsStore {
        self.settings_store.as_ref()
    }

    pub fn settings_store_mut(&mut self) -> &mut dyn SettingsStore {
        self.settings_store.as_mut()
    }

    pub fn window_system(&self) -> &W {
        &self.windows
    }

    pub fn window_system_mut(&mut self) -> &mut W {
        &mut self.windows
    }

    pub fn launcher(&self) -> &ProcessLauncher<S> {
        &self.launcher
    }

    /// Snapshot of all panes in creation order.
    pub fn panes(&self) -> Vec<Pane> {
        self.store.snapshot()
    }

    pub fn pane(&self, id: &PaneId) -> Option<&Pane> {
        self.store.get(id)
    }

    pub fn find_by_prefix(&self, prefix: &str) -> Vec<PaneId> {
        self.store.find_by_prefix(prefix)
    }

    /// Drain the reports queued since the last call.
    pub fn take_reports(&mut self) -> Vec<PaneReport> {
        std::mem::take(&mut self.reports)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Create a pane and launch it. `None` selects the bundled application.
    pub fn create_pane(&mut self, command: Option<&str>) -> Pane {
        let command = match command {
            Some(command) => command.to_string(),
            None => self.default_command(),
        };
        let pane = Pane::new(PaneId::random(), command);
        let id = pane.id.clone();
        let created = pane.clone();
        tracing::info!(pane = %id, command = %pane.command, "created pane");
        self.store.insert(pane);
        self.launch(&id);
        self.persist();
        self.store.get(&id).cloned().unwrap_or(created)
    }

    pub fn toggle_pane(&mut self, id: &PaneId) -> Result<ToggleOutcome, PaneError> {
        let pane = self
            .store
            .get(id)
            .ok_or_else(|| PaneError::UnknownPane(id.clone()))?;
        tracing::debug!(
            pane = %id,
            visible = pane.visible,
            window = ?pane.window,
            token = ?pane.creation_token,
            "toggling pane"
        );
        let visible = pane.visible;
        let stale = pane.window;
        let has_identity = pane.has_identity();
        let detached = !self.windows.is_live();

        let outcome = match self.resolve_window(id) {
            Some(info) => {
                self.track_window(id, &info);
                if visible {
                    self.hide_window(id, info.handle);
                    self.set_visible(id, false);
                    ToggleOutcome::Hidden
                } else {
                    self.show_window(id, info.handle);
                    self.set_visible(id, true);
                    ToggleOutcome::Shown
                }
            }
            // another session may own the window, so only the intent changes
            None if detached && has_identity => {
                tracing::info!(pane = %id, visible = !visible, "no window system, recording visibility");
                self.set_visible(id, !visible);
                if visible {
                    ToggleOutcome::Hidden
                } else {
                    ToggleOutcome::Shown
                }
            }
            None if !visible => {
                self.set_visible(id, true);
                self.launch(id);
                ToggleOutcome::Launched
            }
            None if has_identity => {
                self.forget_window(id);
                self.set_visible(id, false);
                tracing::warn!(pane = %id, window = ?stale, "window is gone, hiding pane");
                self.reports.push(PaneReport::StaleWindow {
                    pane: id.clone(),
                    window: stale,
                });
                ToggleOutcome::Demoted
            }
            None => {
                tracing::info!(pane = %id, "pane still has no window, relaunching");
                self.launch(id);
                ToggleOutcome::Launched
            }
        };
        self.persist();
        Ok(outcome)
    }

    /// Hide every pane if any is visible, otherwise show them all. Returns
    /// whether the panes are now shown.
    pub fn toggle_all_panes(&mut self) -> bool {
        let any_visible = self.store.iter().any(|pane| pane.visible);
        let detached = !self.windows.is_live();
        let windows = self.windows.windows();
        for id in self.store.ids() {
            let Some(pane) = self.store.get(&id) else {
                continue;
            };
            let live = live_window(pane, &windows).map(|info| info.handle);
            let stale = pane.window;
            let kept = detached && pane.has_identity();
            if live.is_none() && pane.has_identity() && !detached {
                self.forget_window(&id);
                tracing::warn!(pane = %id, window = ?stale, "window is gone");
                self.reports.push(PaneReport::StaleWindow {
                    pane: id.clone(),
                    window: stale,
                });
            }
            match (any_visible, live) {
                (true, Some(handle)) => self.hide_window(&id, handle),
                (false, Some(handle)) => self.show_window(&id, handle),
                (false, None) if !kept => self.launch(&id),
                (_, None) => {}
            }
            self.set_visible(&id, !any_visible);
        }
        tracing::info!(shown = !any_visible, panes = self.store.len(), "toggled all panes");
        self.persist();
        !any_visible
    }

    /// Close the pane's window if it has one and drop the pane for good.
    pub fn remove_pane(&mut self, id: &PaneId) -> Result<Pane, PaneError> {
        // only the pane's own recorded window is closed, never a re-match guess
        let windows = self.windows.windows();
        let handle = self
            .store
            .get(id)
            .and_then(|pane| live_window(pane, &windows))
            .map(|info| info.handle);
        let pane = self
            .store
            .remove(id)
            .ok_or_else(|| PaneError::UnknownPane(id.clone()))?;
        self.timers.cancel_pane(id);
        self.launcher.forget(id);
        let watched: Vec<WindowHandle> = self
            .watched
            .iter()
            .filter(|(_, owner)| *owner == id)
            .map(|(handle, _)| *handle)
            .collect();
        for handle in watched {
            self.watched.remove(&handle);
            self.windows.unwatch_geometry(handle);
        }
        if let Some(handle) = handle {
            let result = self.windows.close(handle);
            self.isolated(id, "close", result);
        }
        tracing::info!(pane = %id, "removed pane");
        self.persist();
        Ok(pane)
    }

    pub fn handle_event(&mut self, event: WindowEvent) {
        match event {
            WindowEvent::Created(handle) => self.on_window_created(handle),
            WindowEvent::PositionChanged(handle) => {
                self.on_geometry_changed(handle, GeometryAxis::Position)
            }
            WindowEvent::SizeChanged(handle) => self.on_geometry_changed(handle, GeometryAxis::Size),
            WindowEvent::Closed(handle) => self.on_window_closed(handle),
        }
    }

    /// Handle every event the window system has queued. Returns how many
    /// were handled.
    pub fn pump_events(&mut self) -> usize {
        let events = self.windows.poll_events();
        let count = events.len();
        for event in events {
            self.handle_event(event);
        }
        count
    }

    /// Fire every timer that is due.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        for timer in self.timers.take_due(now) {
            match timer {
                Timer::LaunchTimeout { pane, launch } => self.check_launch(&pane, launch),
                Timer::SettleGeometry { pane, window } => self.restore_geometry(&pane, window),
            }
        }
    }

    /// Detach from every window, minimize visible matched panes and save.
    /// Intended visibility is kept so the next session shows them again.
    pub fn shutdown(&mut self) {
        for handle in std::mem::take(&mut self.watched).into_keys() {
            self.windows.unwatch_geometry(handle);
        }
        let windows = self.windows.windows();
        for id in self.store.ids() {
            let handle = self
                .store
                .get(&id)
                .filter(|pane| pane.visible)
                .and_then(|pane| live_window(pane, &windows))
                .map(|info| info.handle);
            if let Some(handle) = handle {
                self.hide_window(&id, handle);
            }
        }
        self.timers = TimerQueue::new();
        tracing::info!(panes = self.store.len(), "shut down pane manager");
        self.persist();
    }

    fn restore_session(&mut self) {
        self.store = match PaneStore::load(self.settings_store.as_ref()) {
            Ok(store) => store,
            Err(err) => {
                tracing::error!(error = %err, "could not load saved panes, starting empty");
                PaneStore::new()
            }
        };
        if !self.windows.is_live() {
            tracing::info!(panes = self.store.len(), "loaded panes without a window system");
            return;
        }
        let windows = self.windows.windows();
        let mut dirty = false;
        for id in self.store.ids() {
            let Some(pane) = self.store.get(&id) else {
                continue;
            };
            let live = live_window(pane, &windows).cloned();
            let visible = pane.visible;
            let has_identity = pane.has_identity();
            let launchable = pane.is_launchable();

            match live {
                Some(info) => {
                    tracing::debug!(pane = %id, window = %info.window_ref(), "re-bound saved pane");
                    self.track_window(&id, &info);
                    if visible && info.minimized {
                        self.show_window(&id, info.handle);
                    }
                    dirty = true;
                }
                None => {
                    if has_identity {
                        tracing::debug!(pane = %id, "saved window no longer exists");
                        self.forget_window(&id);
                        dirty = true;
                    }
                    if visible && launchable {
                        self.launch(&id);
                    }
                }
            }
        }
        tracing::info!(panes = self.store.len(), "restored session");
        if dirty {
            self.persist();
        }
    }

    fn default_command(&self) -> String {
        let mut command = AppCommand::default_in(&self.app_dir);
        if let Some(area) = self.windows.primary_work_area() {
            command = command.sized_for(
                area,
                self.settings.default_width_percent,
                self.settings.default_height_percent,
            );
        }
        command.to_command_line()
    }

    fn launch(&mut self, id: &PaneId) {
        let now = self.clock.now();
        let Some(command) = self.store.get(id).map(|pane| pane.command.clone()) else {
            return;
        };
        match self.launcher.launch(id, &command, now) {
            Ok(launch) => {
                if let Some(pane) = self.store.get_mut(id) {
                    pane.launched_at = Some(launch.launched_at);
                }
                self.timers.schedule(
                    now + LAUNCH_TIMEOUT,
                    Timer::LaunchTimeout {
                        pane: id.clone(),
                        launch,
                    },
                );
                tracing::info!(pane = %id, generation = launch.generation, %command, "launched pane");
            }
            Err(err) => {
                tracing::error!(pane = %id, %command, error = %err, "failed to launch pane");
                self.reports.push(PaneReport::LaunchFailed {
                    pane: id.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    fn check_launch(&mut self, id: &PaneId, launch: LaunchHandle) {
        let Some(pane) = self.store.get(id) else {
            return;
        };
        if pane.window.is_some() || !self.launcher.is_current(id, launch) {
            return;
        }
        tracing::error!(
            pane = %id,
            command = %pane.command,
            timeout = ?LAUNCH_TIMEOUT,
            "no window appeared for launched pane"
        );
        self.reports.push(PaneReport::MatchTimeout { pane: id.clone() });
    }

    /// Find the live window for a pane: creation token, then window id, then
    /// the managed-app re-match pass.
    fn resolve_window(&self, id: &PaneId) -> Option<WindowInfo> {
        let pane = self.store.get(id)?;
        let windows = self.windows.windows();
        if let Some(info) = live_window(pane, &windows) {
            return Some(info.clone());
        }
        if !pane.is_managed_app() {
            return None;
        }
        let claimed: BTreeSet<u32> = self
            .store
            .iter()
            .filter(|other| other.id != *id)
            .filter_map(|other| other.creation_token)
            .collect();
        let launch_age = self
            .launcher
            .current(id)
            .map(|launch| self.clock.now().saturating_duration_since(launch.launched_at));
        let found = rematch(pane, launch_age, &windows, &claimed).cloned();
        if let Some(info) = &found {
            tracing::debug!(pane = %id, window = %info.window_ref(), "re-matched managed app window");
        }
        found
    }

    fn on_window_created(&mut self, handle: WindowHandle) {
        let Some(info) = self.windows.window(handle) else {
            tracing::debug!(handle, "window closed before it could be matched");
            return;
        };
        if !info.is_interesting() {
            tracing::debug!(handle, title = %info.title, "skipping uninteresting window");
            return;
        }
        if self.watched.contains_key(&handle)
            || self.store.find_by_window(info.window_ref()).is_some()
        {
            tracing::debug!(window = %info.window_ref(), "window already belongs to a pane");
            return;
        }

        let windows = self.windows.windows();
        let now = self.clock.now();
        let candidates: Vec<Candidate<'_>> = self
            .store
            .iter()
            .filter(|pane| pane.visible)
            .filter(|pane| live_window(pane, &windows).is_none_or(|live| live.handle == handle))
            .map(|pane| {
                let launch = self.launcher.current(&pane.id);
                Candidate {
                    pane,
                    launch_age: launch.map(|l| now.saturating_duration_since(l.launched_at)),
                    launch_generation: launch.map_or(0, |l| l.generation),
                }
            })
            .collect();
        tracing::debug!(
            window = %info.window_ref(),
            title = %info.title,
            class = ?info.class,
            token = info.creation_token,
            candidates = candidates.len(),
            "new window"
        );
        let Some(correlation) = correlate(&info, &candidates) else {
            tracing::debug!(window = %info.window_ref(), "no pane claims window");
            return;
        };
        self.bind_window(&correlation.pane, &info);
        self.persist();
    }

    fn bind_window(&mut self, id: &PaneId, info: &WindowInfo) {
        self.track_window(id, info);
        let handle = info.handle;
        let result = self.windows.unmake_fullscreen(handle);
        self.isolated(id, "unmake-fullscreen", result);
        let result = self.windows.unmaximize(handle);
        self.isolated(id, "unmaximize", result);
        if self.settings.always_on_top {
            let result = self.windows.set_above(handle, true);
            self.isolated(id, "set-above", result);
        }
        self.timers.schedule(
            self.clock.now() + GEOMETRY_SETTLE_DELAY,
            Timer::SettleGeometry {
                pane: id.clone(),
                window: info.window_ref(),
            },
        );
        tracing::info!(
            pane = %id,
            window = %info.window_ref(),
            token = info.creation_token,
            "matched window to pane"
        );
    }

    /// Record `info` as the pane's window and listen to its geometry.
    fn track_window(&mut self, id: &PaneId, info: &WindowInfo) {
        let Some(pane) = self.store.get_mut(id) else {
            return;
        };
        let previous = pane.window.replace(info.window_ref());
        pane.creation_token = Some(info.creation_token);

        if let Some(previous) = previous.filter(|prev| prev.handle != info.handle)
            && self.watched.remove(&previous.handle).is_some()
        {
            self.windows.unwatch_geometry(previous.handle);
        }
        if !self.watched.contains_key(&info.handle) {
            let result = self.windows.watch_geometry(info.handle);
            if self.isolated(id, "watch", result) {
                self.watched.insert(info.handle, id.clone());
            }
        }
    }

    /// Clear the pane's identity and stop listening to its old window.
    fn forget_window(&mut self, id: &PaneId) {
        let Some(pane) = self.store.get_mut(id) else {
            return;
        };
        let previous = pane.window;
        pane.clear_identity();
        if let Some(previous) = previous
            && self.watched.remove(&previous.handle).is_some()
        {
            self.windows.unwatch_geometry(previous.handle);
        }
    }

    fn on_window_closed(&mut self, handle: WindowHandle) {
        let owner = self.watched.remove(&handle).or_else(|| {
            self.store
                .iter()
                .find(|pane| pane.window.is_some_and(|w| w.handle == handle))
                .map(|pane| pane.id.clone())
        });
        let Some(id) = owner else {
            return;
        };
        let Some(pane) = self.store.get_mut(&id) else {
            return;
        };
        if !pane.window.is_some_and(|w| w.handle == handle) {
            return;
        }
        pane.clear_identity();
        tracing::info!(pane = %id, handle, visible = pane.visible, "pane window closed");
        self.persist();
    }

    fn on_geometry_changed(&mut self, handle: WindowHandle, axis: GeometryAxis) {
        let Some(id) = self.watched.get(&handle).cloned() else {
            return;
        };
        let Some(frame) = self.windows.window(handle).map(|info| info.frame) else {
            return;
        };
        let Some(pane) = self.store.get_mut(&id) else {
            return;
        };
        let changed = match axis {
            GeometryAxis::Position => {
                let position = Some(frame.position());
                let changed = pane.last_position != position;
                pane.last_position = position;
                changed
            }
            GeometryAxis::Size => {
                let size = Some(frame.size());
                let changed = pane.last_size != size;
                pane.last_size = size;
                changed
            }
        };
        if changed {
            tracing::debug!(pane = %id, ?axis, ?frame, "pane geometry changed");
            self.persist();
        }
    }

    /// Post-match geometry: size and position are applied as separate,
    /// independently gated steps, then the window is minimized if the pane
    /// is meant to be hidden.
    fn restore_geometry(&mut self, id: &PaneId, window: WindowRef) {
        let Some(pane) = self.store.get(id) else {
            return;
        };
        if pane.window != Some(window) {
            tracing::debug!(pane = %id, %window, "pane re-matched before geometry settled");
            return;
        }
        let handle = window.handle;
        if self.windows.window(handle).is_none() {
            tracing::debug!(pane = %id, %window, "window closed before geometry settled");
            return;
        }
        let settings = self.settings;
        let saved_size = pane.last_size.filter(|_| settings.remember_size);
        let saved_position = pane.last_position.filter(|_| settings.remember_position);
        let visible = pane.visible;
        let work_area = self.windows.work_area(handle);

        let size = saved_size.or_else(|| {
            work_area.map(|area| {
                percent_size(
                    area,
                    settings.default_width_percent,
                    settings.default_height_percent,
                )
            })
        });
        let position = saved_position.or_else(|| Some(centered(work_area?, size?)));
        if size.is_none() || position.is_none() {
            tracing::warn!(pane = %id, %window, "no work area for window, keeping its geometry");
        }

        if let Some(size) = size {
            let result = self.windows.resize_frame(handle, size);
            if self.isolated(id, "resize", result)
                && saved_size.is_none()
                && let Some(pane) = self.store.get_mut(id)
            {
                pane.last_size = Some(size);
            }
        }
        if let Some(position) = position {
            let result = self.windows.move_frame(handle, position);
            if self.isolated(id, "move", result)
                && saved_position.is_none()
                && let Some(pane) = self.store.get_mut(id)
            {
                pane.last_position = Some(position);
            }
        }
        if !visible {
            self.hide_window(id, handle);
        }
        tracing::debug!(pane = %id, ?size, ?position, visible, "restored pane geometry");
        self.persist();
    }

    fn show_window(&mut self, id: &PaneId, handle: WindowHandle) {
        let result = self.windows.unminimize(handle);
        self.isolated(id, "unminimize", result);
        let result = self.windows.raise(handle);
        self.isolated(id, "raise", result);
        let result = self.windows.focus(handle);
        self.isolated(id, "focus", result);
    }

    fn hide_window(&mut self, id: &PaneId, handle: WindowHandle) {
        let result = self.windows.minimize(handle);
        self.isolated(id, "minimize", result);
    }

    fn set_visible(&mut self, id: &PaneId, visible: bool) {
        if let Some(pane) = self.store.get_mut(id) {
            pane.visible = visible;
        }
    }

    /// Log and report a failed window operation. Returns whether it worked.
    fn isolated(&mut self, id: &PaneId, op: &'static str, result: Result<(), WindowError>) -> bool {
        match result {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(pane = %id, op, error = %error, "window operation failed");
                self.reports.push(PaneReport::GeometryFailed {
                    pane: id.clone(),
                    op,
                    error,
                });
                false
            }
        }
    }

    fn persist(&mut self) {
        if let Err(err) = self.store.flush(self.settings_store.as_mut()) {
            tracing::error!(error = %err, "failed to save panes");
            self.reports.push(PaneReport::PersistFailed {
                reason: err.to_string(),
            });
        }
    }
}

/// The pane's window if it still exists, by creation token then window id.
fn live_window<'w>(pane: &Pane, windows: &'w [WindowInfo]) -> Option<&'w WindowInfo> {
    pane.creation_token
        .and_then(|token| windows.iter().find(|info| info.creation_token == token))
        .or_else(|| {
            let window = pane.window?;
            windows.iter().find(|info| info.window_ref() == window)
        })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::clock::ManualClock;
    use crate::geometry::{Position, Size};
    use crate::launcher::RecordingSpawner;
    use crate::settings::{KEY_ALWAYS_ON_TOP, KEY_SAVED_PANES, MemorySettings};
    use crate::window_system::WindowKind;
    use crate::window_system::fake::{FakeWindowSystem, WindowCall, WindowSpec};

    type TestManager = PaneManager<FakeWindowSystem, RecordingSpawner, ManualClock>;

    fn manager_with(settings: MemorySettings, windows: FakeWindowSystem) -> (TestManager, ManualClock) {
        let clock = ManualClock::new();
        let manager = PaneManager::with_parts(
            windows,
            Box::new(settings),
            RecordingSpawner::new(),
            clock.clone(),
        )
        .with_app_dir("/opt/float-panes");
        (manager, clock)
    }

    fn manager() -> (TestManager, ManualClock) {
        manager_with(MemorySettings::new(), FakeWindowSystem::default())
    }

    #[test]
    fn default_pane_launches_sized_app() {
        let (mut m, _clock) = manager();
        let pane = m.create_pane(None);
        assert!(pane.visible);
        assert!(pane.launched_at.is_some());
        assert_eq!(
            m.launcher().spawner().launched,
            vec![vec![
                "/opt/float-panes/webkit-app.js".to_string(),
                "https://claude.ai/new".to_string(),
                "Claude AI".to_string(),
                "1344".to_string(),
                "756".to_string(),
            ]]
        );
        assert!(m.take_reports().is_empty());
    }

    #[test]
    fn new_window_is_matched_and_floated() {
        let (mut m, clock) = manager();
        let pane = m.create_pane(Some("xterm"));
        clock.advance(Duration::from_secs(1));
        let handle = m.window_system_mut().open(WindowSpec::normal(4242, "xterm"));
        assert_eq!(m.pump_events(), 1);

        let matched = m.pane(&pane.id).unwrap();
        let token = m.window_system().window(handle).unwrap().creation_token;
        assert_eq!(matched.window, Some(WindowRef::new(4242, handle)));
        assert_eq!(matched.creation_token, Some(token));
        assert_eq!(
            m.window_system().calls_for(handle),
            vec![
                WindowCall::Watch(handle),
                WindowCall::UnmakeFullscreen(handle),
                WindowCall::Unmaximize(handle),
                WindowCall::SetAbove(handle, true),
            ]
        );

        // geometry waits for the settle delay
        m.tick();
        assert_eq!(m.window_system().calls().len(), 4);
        clock.advance(GEOMETRY_SETTLE_DELAY);
        m.tick();
        let calls = m.window_system().calls_for(handle);
        assert!(calls.contains(&WindowCall::Resize(handle, Size::new(1344, 756))));
        assert!(calls.contains(&WindowCall::Move(handle, Position::new(288, 162))));
        let settled = m.pane(&pane.id).unwrap();
        assert_eq!(settled.last_size, Some(Size::new(1344, 756)));
        assert_eq!(settled.last_position, Some(Position::new(288, 162)));
        assert!(m.take_reports().is_empty());
    }

    #[test]
    fn always_on_top_can_be_disabled() {
        let settings = MemorySettings::new().with(KEY_ALWAYS_ON_TOP, false);
        let (mut m, _clock) = manager_with(settings, FakeWindowSystem::default());
        m.create_pane(Some("xterm"));
        let handle = m.window_system_mut().open(WindowSpec::normal(1, "xterm"));
        m.pump_events();
        assert!(
            !m.window_system()
                .calls_for(handle)
                .contains(&WindowCall::SetAbove(handle, true))
        );
    }

    #[test]
    fn reloaded_settings_apply_to_the_next_match() {
        let (mut m, _clock) = manager();
        m.settings_store_mut()
            .set(KEY_ALWAYS_ON_TOP, json!(false))
            .unwrap();
        assert!(m.settings().always_on_top);
        m.reload_settings();
        assert!(!m.settings().always_on_top);

        m.create_pane(Some("xterm"));
        let handle = m.window_system_mut().open(WindowSpec::normal(1, "xterm"));
        m.pump_events();
        assert_eq!(m.window_system().calls_for(handle).len(), 3);
    }

    #[test]
    fn timeout_reported_only_for_current_launch() {
        let (mut m, clock) = manager();
        let pane = m.create_pane(Some("xterm"));
        clock.advance(Duration::from_secs(3));
        // still pending: toggling retries the launch
        assert_eq!(m.toggle_pane(&pane.id), Ok(ToggleOutcome::Launched));
        clock.advance(Duration::from_secs(2));
        m.tick();
        assert!(m.take_reports().is_empty());

        clock.advance(Duration::from_secs(3));
        m.tick();
        assert_eq!(
            m.take_reports(),
            vec![PaneReport::MatchTimeout {
                pane: pane.id.clone()
            }]
        );
        assert_eq!(m.launcher().spawner().launched.len(), 2);
    }

    #[test]
    fn matched_pane_never_times_out() {
        let (mut m, clock) = manager();
        m.create_pane(Some("xterm"));
        m.window_system_mut().open(WindowSpec::normal(9, "xterm"));
        m.pump_events();
        clock.advance(LAUNCH_TIMEOUT);
        m.tick();
        assert!(m.take_reports().is_empty());
    }

    #[test]
    fn blank_command_never_launches_or_matches() {
        let (mut m, clock) = manager();
        let pane = m.create_pane(Some("   "));
        assert!(m.launcher().spawner().launched.is_empty());
        assert!(pane.launched_at.is_none());
        assert!(matches!(
            m.take_reports().as_slice(),
            [PaneReport::LaunchFailed { .. }]
        ));

        clock.advance(Duration::from_secs(1));
        m.window_system_mut().open(WindowSpec::normal(5, "other"));
        m.pump_events();
        assert_eq!(m.pane(&pane.id).unwrap().window, None);
    }

    #[test]
    fn spawn_failure_is_reported_and_pane_stays_pending() {
        let (mut m, _clock) = manager();
        m.launcher.spawner_mut().fail = true;
        let pane = m.create_pane(Some("xterm"));
        assert!(pane.visible);
        assert_eq!(pane.window, None);
        assert!(matches!(
            m.take_reports().as_slice(),
            [PaneReport::LaunchFailed { reason, .. }] if reason.contains("xterm")
        ));
    }

    #[test]
    fn foreign_and_uninteresting_windows_are_ignored() {
        let (mut m, clock) = manager();
        let pane = m.create_pane(Some("xterm"));
        m.window_system_mut()
            .open(WindowSpec::normal(7, "prefs").with_kind(WindowKind::Dialog));
        m.window_system_mut().open(WindowSpec::normal(0, "no pid"));
        m.pump_events();
        assert_eq!(m.pane(&pane.id).unwrap().window, None);

        clock.advance(Duration::from_secs(11));
        m.window_system_mut().open(WindowSpec::normal(8, "late"));
        m.pump_events();
        assert_eq!(m.pane(&pane.id).unwrap().window, None);
    }

    #[test]
    fn unknown_pane_is_an_error() {
        let (mut m, _clock) = manager();
        let missing = PaneId::from("missing");
        assert_eq!(
            m.toggle_pane(&missing),
            Err(PaneError::UnknownPane(missing.clone()))
        );
        assert!(m.remove_pane(&missing).is_err());
    }

    #[test]
    fn failed_resize_does_not_stop_move_or_minimize() {
        let (mut m, clock) = manager();
        let pane = m.create_pane(Some("xterm"));
        let handle = m.window_system_mut().open(WindowSpec::normal(3, "xterm"));
        m.pump_events();
        m.window_system_mut().fail_op("resize");
        // hidden before the window settles
        assert_eq!(m.toggle_pane(&pane.id), Ok(ToggleOutcome::Hidden));
        m.window_system_mut().clear_calls();

        clock.advance(GEOMETRY_SETTLE_DELAY);
        m.tick();
        let calls = m.window_system().calls_for(handle);
        assert_eq!(calls[0], WindowCall::Resize(handle, Size::new(1344, 756)));
        assert_eq!(calls[1], WindowCall::Move(handle, Position::new(288, 162)));
        assert_eq!(calls[2], WindowCall::Minimize(handle));
        assert!(matches!(
            m.take_reports().as_slice(),
            [PaneReport::GeometryFailed { op: "resize", .. }]
        ));
        let pane = m.pane(&pane.id).unwrap();
        assert!(pane.window.is_some());
        assert_eq!(pane.last_position, Some(Position::new(288, 162)));
    }

    #[test]
    fn persistence_failure_keeps_memory_state() {
        let mut settings = MemorySettings::new();
        settings.set_read_only(true);
        let (mut m, _clock) = manager_with(settings, FakeWindowSystem::default());
        let pane = m.create_pane(Some("xterm"));
        assert!(m.pane(&pane.id).is_some());
        assert!(matches!(
            m.take_reports().as_slice(),
            [PaneReport::PersistFailed { .. }]
        ));
        assert_eq!(m.toggle_pane(&pane.id), Ok(ToggleOutcome::Launched));
    }

    #[test]
    fn user_geometry_changes_are_saved() {
        let (mut m, _clock) = manager();
        let pane = m.create_pane(Some("xterm"));
        let handle = m.window_system_mut().open(WindowSpec::normal(3, "xterm"));
        m.pump_events();
        m.window_system_mut().user_move(handle, Position::new(40, 50));
        m.window_system_mut().user_resize(handle, Size::new(640, 480));
        assert_eq!(m.pump_events(), 2);

        let saved = m.settings_store().get(KEY_SAVED_PANES).unwrap();
        let record = &saved["panes"][pane.id.as_str()];
        assert_eq!(record["lastPosition"], json!({"x": 40, "y": 50}));
        assert_eq!(record["lastSize"], json!({"width": 640, "height": 480}));
    }

    #[test]
    fn session_restore_rebinds_live_windows_and_relaunches_lost_ones() {
        let mut windows = FakeWindowSystem::default();
        let live = windows.insert(WindowSpec::normal(77, "kept"));
        let token = windows.window(live).unwrap().creation_token;
        let saved = json!({"version": 1, "panes": {
            "kept": {"command": "xterm", "visible": true,
                     "windowId": format!("77-{live}"), "creationToken": token},
            "lost": {"command": "htop", "visible": true,
                     "windowId": "88-5555", "creationToken": 4242},
            "idle": {"command": "top", "visible": false}
        }});
        let settings = MemorySettings::new().with(KEY_SAVED_PANES, saved);
        let (m, _clock) = manager_with(settings, windows);

        let kept = m.pane(&PaneId::from("kept")).unwrap();
        assert_eq!(kept.window, Some(WindowRef::new(77, live)));
        assert!(m.window_system().is_watched(live));

        let lost = m.pane(&PaneId::from("lost")).unwrap();
        assert!(!lost.has_identity());
        assert!(lost.visible);
        assert_eq!(m.launcher().spawner().launched, vec![vec!["htop".to_string()]]);
        assert!(!m.pane(&PaneId::from("idle")).unwrap().visible);
    }

    #[test]
    fn newer_saved_schema_starts_empty_without_overwriting() {
        let saved = json!({"version": 9, "panes": {}});
        let settings = MemorySettings::new().with(KEY_SAVED_PANES, saved.clone());
        let (m, _clock) = manager_with(settings, FakeWindowSystem::default());
        assert!(m.panes().is_empty());
        assert_eq!(m.settings_store().get(KEY_SAVED_PANES), Some(saved));
    }

    #[test]
    fn shutdown_minimizes_but_remembers_visibility() {
        let (mut m, _clock) = manager();
        let pane = m.create_pane(Some("xterm"));
        let handle = m.window_system_mut().open(WindowSpec::normal(3, "xterm"));
        m.pump_events();
        m.shutdown();
        assert!(m.window_system().window(handle).unwrap().minimized);
        assert!(!m.window_system().is_watched(handle));
        assert!(m.pane(&pane.id).unwrap().visible);
        assert!(m.next_deadline().is_none());
    }

    #[test]
    fn managed_app_rematches_newest_unclaimed_window_on_toggle() {
        let (mut m, clock) = manager();
        let pane = m.create_pane(None);
        // the app hands its window to an already-running instance, so no
        // creation event is seen for it
        let older = m.window_system_mut().insert(WindowSpec::normal(50, "old"));
        let newest = m.window_system_mut().insert(WindowSpec::normal(51, "Claude AI"));
        clock.advance(Duration::from_secs(12));

        assert_eq!(m.toggle_pane(&pane.id), Ok(ToggleOutcome::Hidden));
        let pane = m.pane(&pane.id).unwrap();
        assert_eq!(pane.window, Some(WindowRef::new(51, newest)));
        assert!(m.window_system().window(newest).unwrap().minimized);
        assert!(!m.window_system().window(older).unwrap().minimized);
    }
}
