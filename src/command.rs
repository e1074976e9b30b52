//! Command lines for the bundled single-window application.
//!
//! The application takes positional arguments
//! `<executable> <url> <title> [<width> <height>]`.

use std::path::{Path, PathBuf};

use crate::constants::{DEFAULT_TITLE, DEFAULT_URL, MANAGED_APP_SCRIPT};
use crate::geometry::{FrameRect, Size, percent_size};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppCommand {
    pub executable: PathBuf,
    pub url: String,
    pub title: String,
    /// Only set when derived from display geometry at launch time.
    pub size: Option<Size>,
}

impl AppCommand {
    pub fn new(executable: impl Into<PathBuf>, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            url: url.into(),
            title: title.into(),
            size: None,
        }
    }

    /// The default pane: the managed web application under `app_dir`.
    pub fn default_in(app_dir: &Path) -> Self {
        Self::new(app_dir.join(MANAGED_APP_SCRIPT), DEFAULT_URL, DEFAULT_TITLE)
    }

    /// Append an initial size taken as a percentage of `work_area`.
    pub fn sized_for(mut self, work_area: FrameRect, width_percent: u8, height_percent: u8) -> Self {
        self.size = Some(percent_size(work_area, width_percent, height_percent));
        self
    }

    pub fn argv(&self) -> Vec<String> {
        let mut argv = vec![
            self.executable.to_string_lossy().into_owned(),
            self.url.clone(),
            self.title.clone(),
        ];
        if let Some(size) = self.size {
            argv.push(size.width.to_string());
            argv.push(size.height.to_string());
        }
        argv
    }

    /// Shell-quoted form stored as the pane command.
    pub fn to_command_line(&self) -> String {
        shell_words::join(self.argv())
    }
}

/// Where the bundled application is installed by default.
pub fn default_app_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("float-panes"))
}
