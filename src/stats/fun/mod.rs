//! Novelty statistics for the dashboard. Each derivation is independent and
//! reads the session snapshot without changing it.

pub mod comeback;
pub mod inconsistency;
pub mod lucky_lanes;
pub mod synergy;

pub use comeback::{comebacks, near_misses};
pub use inconsistency::inconsistency_ranking;
pub use lucky_lanes::{lucky_lanes, sort_lanes, LaneSort};
pub use synergy::synergy_for;
