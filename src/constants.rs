//! Shared crate-wide constants.

use std::time::Duration;

/// How long a launched pane may go without a matched window before the
/// launch is reported as a match timeout.
pub const LAUNCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Window after a launch during which a newly created window may be
/// attributed to the launching pane by recency alone.
pub const LAUNCH_PROXIMITY: Duration = Duration::from_secs(10);

/// Extended proximity window for the managed web application, which can
/// take a long time to render its first frame.
///
/// Also bounds the toggle-time re-match pass for those panes.
pub const SLOW_LAUNCH_PROXIMITY: Duration = Duration::from_secs(20);

/// Delay between matching a window and restoring its geometry, so the
/// client's initial layout has settled.
pub const GEOMETRY_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// File name of the bundled single-window web application. Commands that
/// contain it get the slow-render heuristics.
pub const MANAGED_APP_SCRIPT: &str = "webkit-app.js";

pub const DEFAULT_URL: &str = "https://claude.ai/new";
pub const DEFAULT_TITLE: &str = "Claude AI";

/// Bounds for the default-size percentages read from settings.
pub const MIN_SIZE_PERCENT: u8 = 10;
pub const MAX_SIZE_PERCENT: u8 = 100;
