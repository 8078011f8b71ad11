//! Trackwall Tracker Matcher
//!
//! Matches declared components against the signature database and yields a
//! deduplicated, name-sorted tracker list.

mod matcher;
mod tracker;

pub use matcher::{match_trackers, MatchReport, TrackerMatcher};
pub use tracker::Tracker;

pub use trackwall_components::ComponentKind;
