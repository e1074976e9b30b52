//! Floating pane manager.
//!
//! A pane is an externally launched single-window application. The manager
//! launches it, works out which newly created window belongs to it, keeps
//! the window floating with a restored geometry, and persists everything
//! needed to pick the panes up again after a restart.

pub mod actions;
pub mod clock;
pub mod command;
pub mod constants;
pub mod correlator;
pub mod event_loop;
pub mod geometry;
pub mod launcher;
pub mod manager;
pub mod pane;
pub mod settings;
pub mod store;
pub mod timers;
pub mod tracing_sub;
pub mod window_system;

pub use manager::{PaneError, PaneManager, PaneReport, ToggleOutcome};
pub use pane::{Pane, PaneId, WindowRef};
