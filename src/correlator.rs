//! Window-to-pane correlation.
//!
//! A new window carries no link back to the spawn that caused it, so the
//! owner is guessed with an ordered list of strategies. Each strategy is a
//! pure function over the window and the candidate panes; the first one
//! that picks a pane wins.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::constants::{LAUNCH_PROXIMITY, SLOW_LAUNCH_PROXIMITY};
use crate::pane::{Pane, PaneId};
use crate::window_system::WindowInfo;

/// A pane awaiting a window, with its launch timing resolved against "now".
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub pane: &'a Pane,
    /// Time since the pane's latest launch, if it was launched.
    pub launch_age: Option<Duration>,
    /// Generation of the latest launch; orders launches at the same instant.
    pub launch_generation: u64,
}

pub type Strategy = fn(&WindowInfo, &[Candidate<'_>]) -> Option<PaneId>;

#[derive(Clone, Copy)]
pub struct NamedStrategy {
    pub name: &'static str,
    pub run: Strategy,
}

impl std::fmt::Debug for NamedStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// Evaluation order of the matching cascade.
pub const STRATEGIES: [NamedStrategy; 3] = [
    NamedStrategy {
        name: "process-id",
        run: by_process_id,
    },
    NamedStrategy {
        name: "creation-token",
        run: by_creation_token,
    },
    NamedStrategy {
        name: "launch-proximity",
        run: by_launch_proximity,
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlation {
    pub pane: PaneId,
    pub strategy: &'static str,
}

pub fn correlate(window: &WindowInfo, candidates: &[Candidate<'_>]) -> Option<Correlation> {
    STRATEGIES.iter().find_map(|strategy| {
        let pane = (strategy.run)(window, candidates)?;
        tracing::debug!(
            strategy = strategy.name,
            pane = %pane,
            window = %window.window_ref(),
            "correlated window"
        );
        Some(Correlation {
            pane,
            strategy: strategy.name,
        })
    })
}

fn single<'a>(mut matches: impl Iterator<Item = &'a Candidate<'a>>) -> Option<PaneId> {
    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    Some(first.pane.id.clone())
}

/// The window belongs to the process that owned the pane's previous window.
pub fn by_process_id(window: &WindowInfo, candidates: &[Candidate<'_>]) -> Option<PaneId> {
    if window.process_id == 0 {
        return None;
    }
    single(candidates.iter().filter(|c| {
        c.pane
            .window
            .is_some_and(|w| w.process_id == window.process_id)
    }))
}

/// The window is the one the pane was matched to before.
pub fn by_creation_token(window: &WindowInfo, candidates: &[Candidate<'_>]) -> Option<PaneId> {
    single(
        candidates
            .iter()
            .filter(|c| c.pane.creation_token == Some(window.creation_token)),
    )
}

/// How long after a launch a window may still be attributed to it.
pub fn proximity_window(pane: &Pane) -> Duration {
    if pane.is_managed_app() {
        SLOW_LAUNCH_PROXIMITY
    } else {
        LAUNCH_PROXIMITY
    }
}

/// The most recently launched candidate still inside its proximity window.
pub fn by_launch_proximity(_window: &WindowInfo, candidates: &[Candidate<'_>]) -> Option<PaneId> {
    candidates
        .iter()
        .filter(|c| c.pane.visible)
        .filter_map(|c| {
            let age = c.launch_age?;
            (age < proximity_window(c.pane)).then_some((age, c))
        })
        .min_by(|(age_a, a), (age_b, b)| {
            age_a
                .cmp(age_b)
                .then(b.launch_generation.cmp(&a.launch_generation))
        })
        .map(|(_, c)| c.pane.id.clone())
}

/// Toggle-time fallback for managed-app panes whose identity no longer
/// resolves: while the last launch is recent, adopt the newest interesting
/// window that no other pane has claimed.
pub fn rematch<'w>(
    pane: &Pane,
    launch_age: Option<Duration>,
    windows: &'w [WindowInfo],
    claimed_tokens: &BTreeSet<u32>,
) -> Option<&'w WindowInfo> {
    let age = launch_age?;
    if age >= SLOW_LAUNCH_PROXIMITY {
        tracing::debug!(pane = %pane.id, ?age, "launch too old for re-match");
        return None;
    }
    windows
        .iter()
        .filter(|w| w.is_interesting() && !claimed_tokens.contains(&w.creation_token))
        .max_by_key(|w| w.creation_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::FrameRect;
    use crate::pane::WindowRef;
    use crate::window_system::WindowKind;

    fn window(process_id: u32, token: u32) -> WindowInfo {
        WindowInfo {
            handle: u64::from(token) + 500,
            process_id,
            class: None,
            title: "w".to_string(),
            creation_token: token,
            kind: WindowKind::Normal,
            frame: FrameRect::default(),
            minimized: false,
        }
    }

    fn pane(id: &str) -> Pane {
        Pane::new(PaneId::from(id), "xterm")
    }

    fn launched(pane: &Pane, secs: u64, generation: u64) -> Candidate<'_> {
        Candidate {
            pane,
            launch_age: Some(Duration::from_secs(secs)),
            launch_generation: generation,
        }
    }

    #[test]
    fn process_id_outranks_launch_proximity() {
        let mut old = pane("old");
        old.window = Some(WindowRef::new(4242, 1));
        let fresh = pane("fresh");
        let candidates = [launched(&old, 30, 1), launched(&fresh, 1, 2)];
        let hit = correlate(&window(4242, 9), &candidates).unwrap();
        assert_eq!(hit.pane, PaneId::from("old"));
        assert_eq!(hit.strategy, "process-id");
    }

    #[test]
    fn creation_token_refinds_previous_window() {
        let mut known = pane("known");
        known.creation_token = Some(9);
        let fresh = pane("fresh");
        let candidates = [launched(&known, 60, 1), launched(&fresh, 1, 2)];
        let hit = correlate(&window(1, 9), &candidates).unwrap();
        assert_eq!(hit.pane, PaneId::from("known"));
        assert_eq!(hit.strategy, "creation-token");
    }

    #[test]
    fn most_recent_launch_wins() {
        let a = pane("twelve");
        let b = pane("two");
        let candidates = [launched(&a, 12, 1), launched(&b, 2, 2)];
        let hit = correlate(&window(1, 3), &candidates).unwrap();
        assert_eq!(hit.pane, PaneId::from("two"));
        assert_eq!(hit.strategy, "launch-proximity");

        // both inside the window: recency still decides
        let candidates = [launched(&a, 8, 1), launched(&b, 2, 2)];
        assert_eq!(
            by_launch_proximity(&window(1, 3), &candidates),
            Some(PaneId::from("two"))
        );
    }

    #[test]
    fn equal_launch_instants_prefer_later_generation() {
        let a = pane("a");
        let b = pane("b");
        let candidates = [launched(&a, 1, 7), launched(&b, 1, 3)];
        assert_eq!(
            by_launch_proximity(&window(1, 3), &candidates),
            Some(PaneId::from("a"))
        );
    }

    #[test]
    fn managed_app_gets_a_longer_window() {
        let plain = pane("plain");
        let managed = Pane::new(PaneId::from("managed"), "/x/webkit-app.js https://y T");
        assert!(by_launch_proximity(&window(1, 1), &[launched(&plain, 15, 1)]).is_none());
        assert_eq!(
            by_launch_proximity(&window(1, 1), &[launched(&managed, 15, 1)]),
            Some(PaneId::from("managed"))
        );
    }

    #[test]
    fn ambiguous_process_id_falls_through() {
        let mut a = pane("a");
        a.window = Some(WindowRef::new(50, 1));
        let mut b = pane("b");
        b.window = Some(WindowRef::new(50, 2));
        let candidates = [launched(&a, 3, 1), launched(&b, 1, 2)];
        let hit = correlate(&window(50, 8), &candidates).unwrap();
        assert_eq!(hit.strategy, "launch-proximity");
        assert_eq!(hit.pane, PaneId::from("b"));
    }

    #[test]
    fn unrelated_window_is_foreign() {
        let idle = pane("idle");
        let candidates = [Candidate {
            pane: &idle,
            launch_age: None,
            launch_generation: 0,
        }];
        assert!(correlate(&window(1, 1), &candidates).is_none());
        assert!(correlate(&window(1, 1), &[]).is_none());
    }

    #[test]
    fn rematch_takes_newest_unclaimed_interesting_window() {
        let p = Pane::new(PaneId::from("m"), "/x/webkit-app.js u t");
        let mut dialog = window(3, 9);
        dialog.kind = WindowKind::Dialog;
        let windows = vec![window(1, 4), window(2, 6), dialog, window(4, 8)];
        let claimed: BTreeSet<u32> = [8].into_iter().collect();
        let hit = rematch(&p, Some(Duration::from_secs(3)), &windows, &claimed).unwrap();
        assert_eq!(hit.creation_token, 6);
        assert!(rematch(&p, Some(Duration::from_secs(25)), &windows, &claimed).is_none());
        assert!(rematch(&p, None, &windows, &claimed).is_none());
    }
}
