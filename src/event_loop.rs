use std::thread;
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::launcher::Spawner;
use crate::manager::PaneManager;
use crate::window_system::{WindowEvent, WindowSystem};

pub enum ControlFlow {
    Continue,
    Quit,
}

/// Single-threaded pump that drives a [`PaneManager`].
///
/// Each turn of the loop:
/// 1. calls the handler with `None` (an idle turn, e.g. to flush reports),
/// 2. drains every queued window-system event into the manager, calling the
///    handler after each one,
/// 3. fires due timers,
/// 4. sleeps until the next timer or the poll interval, whichever is first,
///    when the turn saw no events.
pub struct EventLoop<W, S, C> {
    manager: PaneManager<W, S, C>,
    poll_interval: Duration,
}

impl<W: WindowSystem, S: Spawner, C: Clock> EventLoop<W, S, C> {
    pub fn new(manager: PaneManager<W, S, C>, poll_interval: Duration) -> Self {
        Self {
            manager,
            poll_interval,
        }
    }

    pub fn manager(&mut self) -> &mut PaneManager<W, S, C> {
        &mut self.manager
    }

    pub fn into_manager(self) -> PaneManager<W, S, C> {
        self.manager
    }

    /// Run one turn without sleeping. Returns the events handled.
    pub fn poll(&mut self) -> Vec<WindowEvent> {
        let events = self.manager.window_system_mut().poll_events();
        for event in &events {
            self.manager.handle_event(*event);
        }
        self.manager.tick();
        events
    }

    /// Runs the loop on the current thread until the handler asks to quit.
    pub fn run<F>(&mut self, mut handler: F)
    where
        F: FnMut(&mut PaneManager<W, S, C>, Option<WindowEvent>) -> ControlFlow,
    {
        loop {
            if let ControlFlow::Quit = handler(&mut self.manager, None) {
                break;
            }

            // Drain the whole batch: a burst of geometry events while the
            // user drags a window must not lag behind.
            let events = self.manager.window_system_mut().poll_events();
            let idle = events.is_empty();
            for event in events {
                self.manager.handle_event(event);
                if let ControlFlow::Quit = handler(&mut self.manager, Some(event)) {
                    return;
                }
            }
            self.manager.tick();

            if idle {
                thread::sleep(self.idle_wait(Instant::now()));
            }
        }
    }

    fn idle_wait(&self, now: Instant) -> Duration {
        match self.manager.next_deadline() {
            Some(deadline) => deadline
                .saturating_duration_since(now)
                .min(self.poll_interval),
            None => self.poll_interval,
        }
    }
}
