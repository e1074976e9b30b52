use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use indoc::indoc;
use thiserror::Error;

use float_panes::actions::{CommandOutcome, PaneCommand};
use float_panes::event_loop::{ControlFlow, EventLoop};
use float_panes::settings::{JsonFileSettings, PaneSettings, SettingsError, default_settings_path};
use float_panes::window_system::headless::HeadlessWindowSystem;
use float_panes::{Pane, PaneError, PaneId, PaneManager, ToggleOutcome, tracing_sub};

const AFTER_HELP: &str = indoc! {"
    Pane ids may be shortened to any unique prefix.

    Without a compositor connection no windows are visible to this tool:
    it edits the saved panes and launches their processes, and a running
    session picks the windows up.
"};

#[derive(Parser, Debug)]
#[command(
    name = "float-panes",
    version = env!("CARGO_PKG_VERSION"),
    about = "Launch single-window apps as floating panes and keep track of them",
    after_help = AFTER_HELP
)]
struct Cli {
    /// Settings file holding preferences and saved panes.
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Directory containing the bundled webkit-app.js.
    #[arg(long = "app", value_name = "PATH")]
    app_dir: Option<PathBuf>,

    /// Log at debug level regardless of the debug-mode setting.
    #[arg(long)]
    debug: bool,

    /// Append logs to this file instead of stderr.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// List saved panes.
    List,
    /// Create a pane. Without a command the bundled app is opened.
    New {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
        command: Vec<String>,
    },
    /// Show or hide a pane.
    Toggle { id: String },
    /// Hide every pane if any is visible, otherwise show them all.
    ToggleAll,
    /// Close a pane's window and forget the pane.
    Remove { id: String },
    /// Keep running and report launch problems as they happen.
    Run {
        /// Seconds to keep running; runs until killed when omitted.
        #[arg(long, value_name = "SECONDS")]
        duration: Option<u64>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("no --settings given and no config directory could be found")]
    NoSettingsPath,
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Pane(#[from] PaneError),
    #[error("no pane id starts with {0:?}")]
    NoSuchPane(String),
    #[error("{prefix:?} matches {count} panes, use a longer prefix")]
    AmbiguousPane { prefix: String, count: usize },
}

type Manager = PaneManager<HeadlessWindowSystem>;

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("float-panes: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let path = cli
        .settings
        .or_else(default_settings_path)
        .ok_or(CliError::NoSettingsPath)?;
    let settings = JsonFileSettings::open(path)?;
    let debug = cli.debug || PaneSettings::load(&settings).debug_mode;
    tracing_sub::init(debug, cli.log_file.as_deref());
    tracing::debug!(path = %settings.path().display(), "opened settings");

    let mut manager = PaneManager::new(HeadlessWindowSystem, Box::new(settings));
    if let Some(app_dir) = cli.app_dir {
        manager = manager.with_app_dir(app_dir);
    }

    let command = match cli.command {
        CliCommand::List => {
            print_panes(&manager.panes());
            return Ok(());
        }
        CliCommand::Run { duration } => {
            run_loop(manager, duration.map(Duration::from_secs));
            return Ok(());
        }
        CliCommand::New { command } if command.is_empty() => PaneCommand::Create(None),
        CliCommand::New { command } => PaneCommand::Create(Some(shell_words::join(command))),
        CliCommand::Toggle { id } => PaneCommand::Toggle(resolve_id(&manager, &id)?),
        CliCommand::ToggleAll => PaneCommand::ToggleAll,
        CliCommand::Remove { id } => PaneCommand::Remove(resolve_id(&manager, &id)?),
    };

    let outcome = manager.dispatch(command);
    print_reports(&mut manager);
    match outcome? {
        CommandOutcome::Created(pane) => println!("{}", pane.id),
        CommandOutcome::Toggled(outcome) => println!("{}", describe_toggle(outcome)),
        CommandOutcome::ToggledAll { shown } => {
            println!("{}", if shown { "showing all panes" } else { "hid all panes" })
        }
        CommandOutcome::Removed(pane) => println!("removed {}", pane.id),
    }
    Ok(())
}

fn resolve_id(manager: &Manager, prefix: &str) -> Result<PaneId, CliError> {
    let mut matches = manager.find_by_prefix(prefix);
    match matches.len() {
        0 => Err(CliError::NoSuchPane(prefix.to_string())),
        1 => Ok(matches.remove(0)),
        count => Err(CliError::AmbiguousPane {
            prefix: prefix.to_string(),
            count,
        }),
    }
}

fn describe_toggle(outcome: ToggleOutcome) -> &'static str {
    match outcome {
        ToggleOutcome::Shown => "shown",
        ToggleOutcome::Hidden => "hidden",
        ToggleOutcome::Launched => "launched",
        ToggleOutcome::Demoted => "window is gone, pane hidden",
    }
}

fn print_panes(panes: &[Pane]) {
    if panes.is_empty() {
        println!("no panes");
        return;
    }
    for pane in panes {
        let state = if pane.visible { "visible" } else { "hidden" };
        let window = pane
            .window
            .map_or_else(|| "-".to_string(), |window| window.to_string());
        println!(
            "{}  {:<7}  {:<16}  {}",
            pane.id, state, window, pane.command
        );
    }
    let visible = panes.iter().filter(|pane| pane.visible).count();
    println!("{} panes, {visible} visible", panes.len());
}

fn print_reports(manager: &mut Manager) {
    for report in manager.take_reports() {
        eprintln!("warning: {report}");
    }
}

fn run_loop(manager: Manager, duration: Option<Duration>) {
    let started = std::time::Instant::now();
    let mut event_loop = EventLoop::new(manager, Duration::from_millis(250));
    event_loop.run(|manager, _event| {
        print_reports(manager);
        match duration {
            Some(limit) if started.elapsed() >= limit => ControlFlow::Quit,
            _ => ControlFlow::Continue,
        }
    });
    event_loop.manager().shutdown();
    print_reports(event_loop.manager());
}
