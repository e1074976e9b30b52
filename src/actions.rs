use std::fmt;

use crate::clock::Clock;
use crate::launcher::Spawner;
use crate::manager::{PaneError, PaneManager, ToggleOutcome};
use crate::pane::{Pane, PaneId};
use crate::window_system::WindowSystem;

/// A user request forwarded by a menu or command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaneCommand {
    /// `None` opens the bundled application.
    Create(Option<String>),
    Toggle(PaneId),
    ToggleAll,
    Remove(PaneId),
}

impl fmt::Display for PaneCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaneCommand::Create(None) => "New pane",
            PaneCommand::Create(Some(_)) => "New pane with command",
            PaneCommand::Toggle(_) => "Show / hide pane",
            PaneCommand::ToggleAll => "Show / hide all panes",
            PaneCommand::Remove(_) => "Remove pane",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Created(Pane),
    Toggled(ToggleOutcome),
    ToggledAll { shown: bool },
    Removed(Pane),
}

impl<W: WindowSystem, S: Spawner, C: Clock> PaneManager<W, S, C> {
    pub fn dispatch(&mut self, command: PaneCommand) -> Result<CommandOutcome, PaneError> {
        tracing::debug!(%command, "dispatching");
        match command {
            PaneCommand::Create(command) => {
                Ok(CommandOutcome::Created(self.create_pane(command.as_deref())))
            }
            PaneCommand::Toggle(id) => self.toggle_pane(&id).map(CommandOutcome::Toggled),
            PaneCommand::ToggleAll => Ok(CommandOutcome::ToggledAll {
                shown: self.toggle_all_panes(),
            }),
            PaneCommand::Remove(id) => self.remove_pane(&id).map(CommandOutcome::Removed),
        }
    }
}
