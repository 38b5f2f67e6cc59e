use std::sync::Arc;

use chrono::NaiveDate;
use pinsheet::{InMemoryResultStore, RawGameResult, StatsService};

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

// ============================================================================
// League Builder
// ============================================================================

/// Builds raw score rows one session at a time.
pub struct LeagueBuilder {
    rows: Vec<RawGameResult>,
    session_id: String,
    session_date: NaiveDate,
    lane_number: Option<u32>,
}

impl LeagueBuilder {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            session_id: "session-0".to_string(),
            session_date: date(1, 1),
            lane_number: None,
        }
    }

    /// Starts a new session; following `bowler` calls land in it.
    pub fn session(mut self, id: &str, session_date: NaiveDate, lane: Option<u32>) -> Self {
        self.session_id = id.to_string();
        self.session_date = session_date;
        self.lane_number = lane;
        self
    }

    /// Adds games 1..=n for a member in the current session.
    pub fn bowler(self, member_id: &str, scores: &[u16]) -> Self {
        let games: Vec<(u8, u16)> = scores
            .iter()
            .enumerate()
            .map(|(i, score)| (i as u8 + 1, *score))
            .collect();
        self.bowler_games(member_id, &games)
    }

    /// Adds specific game numbers, leaving the others unplayed.
    pub fn bowler_games(mut self, member_id: &str, games: &[(u8, u16)]) -> Self {
        for (game_number, score) in games {
            self.rows.push(RawGameResult {
                session_id: self.session_id.clone(),
                member_id: member_id.to_string(),
                member_name: capitalize(member_id),
                game_number: *game_number,
                score: *score,
                session_date: self.session_date,
                lane_number: self.lane_number,
                session_name: Some("League night".to_string()),
                strikes: None,
                spares: None,
            });
        }
        self
    }

    pub fn rows(self) -> Vec<RawGameResult> {
        self.rows
    }

    pub fn service(self) -> StatsService {
        let store = Arc::new(InMemoryResultStore::with_results(self.rows));
        StatsService::builder(store).build()
    }
}

fn capitalize(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
