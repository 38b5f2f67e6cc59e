pub mod league_builders;

// Re-export main utilities for use by test files
pub use league_builders::{date, LeagueBuilder};
