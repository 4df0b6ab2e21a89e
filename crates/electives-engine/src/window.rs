//! Enrollment window clock.
//!
//! Derives whether an elective currently accepts new selections from its
//! optional start/end bounds. Pure and stateless.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use electives_entity::ElectiveWindow;

/// Open/closed state of an elective at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowState {
    /// Within the configured bounds.
    Open,
    /// The start bound has not been reached yet.
    ClosedBefore,
    /// The end bound has passed. Terminal.
    ClosedAfter,
    /// Neither bound is set.
    AlwaysOpen,
}

impl WindowState {
    /// Whether new selections may be created in this state.
    pub fn accepts_selections(&self) -> bool {
        matches!(self, Self::Open | Self::AlwaysOpen)
    }

    /// Return the state as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::ClosedBefore => "closed_before",
            Self::ClosedAfter => "closed_after",
            Self::AlwaysOpen => "always_open",
        }
    }
}

impl fmt::Display for WindowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State of `window` at `now`.
///
/// Both bounds are inclusive: an elective is open at exactly its start and
/// exactly its end instant.
pub fn state(window: &ElectiveWindow, now: DateTime<Utc>) -> WindowState {
    match (window.start_date, window.end_date) {
        (None, None) => WindowState::AlwaysOpen,
        (Some(start), _) if now < start => WindowState::ClosedBefore,
        (_, Some(end)) if now > end => WindowState::ClosedAfter,
        _ => WindowState::Open,
    }
}

/// The next instant at which the state of `window` changes, if any.
pub fn next_transition(window: &ElectiveWindow, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match state(window, now) {
        WindowState::ClosedBefore => window.start_date,
        WindowState::Open => window.end_date,
        WindowState::ClosedAfter | WindowState::AlwaysOpen => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn window(start: Option<i64>, end: Option<i64>, now: DateTime<Utc>) -> ElectiveWindow {
        ElectiveWindow {
            start_date: start.map(|h| now + Duration::hours(h)),
            end_date: end.map(|h| now + Duration::hours(h)),
        }
    }

    #[test]
    fn test_unbounded_is_always_open() {
        let now = Utc::now();
        let w = ElectiveWindow::unbounded();
        assert_eq!(state(&w, now), WindowState::AlwaysOpen);
        assert_eq!(next_transition(&w, now), None);
    }

    #[test]
    fn test_before_start_is_closed() {
        let now = Utc::now();
        let w = window(Some(2), Some(5), now);
        assert_eq!(state(&w, now), WindowState::ClosedBefore);
        assert_eq!(next_transition(&w, now), w.start_date);
    }

    #[test]
    fn test_between_bounds_is_open() {
        let now = Utc::now();
        let w = window(Some(-2), Some(5), now);
        assert_eq!(state(&w, now), WindowState::Open);
        assert_eq!(next_transition(&w, now), w.end_date);
    }

    #[test]
    fn test_after_end_is_terminal() {
        let now = Utc::now();
        let w = window(Some(-5), Some(-1), now);
        assert_eq!(state(&w, now), WindowState::ClosedAfter);
        assert_eq!(next_transition(&w, now), None);
        assert!(!state(&w, now).accepts_selections());
    }

    #[test]
    fn test_half_bounded_windows() {
        let now = Utc::now();

        let started = window(Some(-1), None, now);
        assert_eq!(state(&started, now), WindowState::Open);
        assert_eq!(next_transition(&started, now), None);

        let not_ended = window(None, Some(1), now);
        assert_eq!(state(&not_ended, now), WindowState::Open);
        assert_eq!(next_transition(&not_ended, now), not_ended.end_date);

        let ended = window(None, Some(-1), now);
        assert_eq!(state(&ended, now), WindowState::ClosedAfter);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let now = Utc::now();
        let at_start = window(Some(0), Some(3), now);
        assert_eq!(state(&at_start, now), WindowState::Open);

        let at_end = window(Some(-3), Some(0), now);
        assert_eq!(state(&at_end, now), WindowState::Open);
    }
}
