use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::{
    mean, MemberRef, NormalizedBatch, NormalizedMemberSession, RawGameResult, SessionRecord,
    StatsError,
};

pub const MAX_SCORE: u16 = 300;
pub const GAMES_PER_SESSION: usize = 3;

impl RawGameResult {
    /// Checks the row against the store's input contract.
    pub fn validate(&self) -> Result<(), StatsError> {
        if self.session_id.trim().is_empty() {
            return Err(StatsError::Validation("session_id is empty".to_string()));
        }
        if self.member_id.trim().is_empty() {
            return Err(StatsError::Validation("member_id is empty".to_string()));
        }
        if !(1..=GAMES_PER_SESSION as u8).contains(&self.game_number) {
            return Err(StatsError::Validation(format!(
                "game_number {} outside 1..=3",
                self.game_number
            )));
        }
        if self.score > MAX_SCORE {
            return Err(StatsError::Validation(format!(
                "score {} above {}",
                self.score, MAX_SCORE
            )));
        }
        Ok(())
    }
}

#[derive(Default)]
struct GameSlot {
    score: Option<u16>,
    strikes: Option<u8>,
    spares: Option<u8>,
}

struct MemberAccumulator {
    member: MemberRef,
    slots: [GameSlot; GAMES_PER_SESSION],
}

impl MemberAccumulator {
    fn new(row: &RawGameResult) -> Self {
        Self {
            member: MemberRef::new(row.member_id.clone(), row.member_name.clone()),
            slots: Default::default(),
        }
    }

    /// A later row for the same game replaces the earlier one.
    fn record(&mut self, row: &RawGameResult) {
        let slot = &mut self.slots[(row.game_number - 1) as usize];
        if slot.score.is_some() {
            debug!(
                member_id = %row.member_id,
                session_id = %row.session_id,
                game_number = row.game_number,
                "Duplicate game row, keeping the later one"
            );
        }
        *slot = GameSlot {
            score: Some(row.score),
            strikes: row.strikes,
            spares: row.spares,
        };
    }

    fn finish(self) -> Option<NormalizedMemberSession> {
        let games = [
            self.slots[0].score,
            self.slots[1].score,
            self.slots[2].score,
        ];
        let recorded: Vec<f64> = games.iter().flatten().map(|s| f64::from(*s)).collect();
        if recorded.is_empty() {
            return None;
        }

        let strikes = self
            .slots
            .iter()
            .filter(|slot| slot.score.is_some())
            .map(|slot| u32::from(slot.strikes.unwrap_or_default()))
            .sum();
        let spares = self
            .slots
            .iter()
            .filter(|slot| slot.score.is_some())
            .map(|slot| u32::from(slot.spares.unwrap_or_default()))
            .sum();

        Some(NormalizedMemberSession {
            member: self.member,
            games,
            average: mean(&recorded),
            strikes,
            spares,
            rank: 0,
        })
    }
}

struct SessionAccumulator {
    id: String,
    date: NaiveDate,
    lane_number: Option<u32>,
    session_name: Option<String>,
    members: Vec<MemberAccumulator>,
    member_index: HashMap<String, usize>,
}

impl SessionAccumulator {
    fn new(row: &RawGameResult) -> Self {
        Self {
            id: row.session_id.clone(),
            date: row.session_date,
            lane_number: row.lane_number,
            session_name: row.session_name.clone(),
            members: Vec::new(),
            member_index: HashMap::new(),
        }
    }

    fn record(&mut self, row: &RawGameResult) {
        if self.lane_number.is_none() {
            self.lane_number = row.lane_number;
        }
        if self.session_name.is_none() {
            self.session_name = row.session_name.clone();
        }

        let index = match self.member_index.get(&row.member_id) {
            Some(index) => *index,
            None => {
                self.members.push(MemberAccumulator::new(row));
                self.member_index
                    .insert(row.member_id.clone(), self.members.len() - 1);
                self.members.len() - 1
            }
        };
        self.members[index].record(row);
    }

    fn finish(self) -> SessionRecord {
        let mut participants: Vec<NormalizedMemberSession> = self
            .members
            .into_iter()
            .filter_map(MemberAccumulator::finish)
            .collect();

        rank_participants(&mut participants);

        SessionRecord {
            id: self.id,
            date: self.date,
            lane_number: self.lane_number,
            session_name: self.session_name,
            participants,
        }
    }
}

/// Sorts by average descending and assigns 1-based ranks.
///
/// The sort is stable: equal averages keep the order in which the members
/// first appeared in the input rows.
pub fn rank_participants(participants: &mut [NormalizedMemberSession]) {
    participants.sort_by(|a, b| b.average.total_cmp(&a.average));
    for (index, participant) in participants.iter_mut().enumerate() {
        participant.rank = index + 1;
    }
}

/// Groups raw rows into per-session, per-member records.
///
/// Rows that break the input contract are dropped and counted in
/// `rejected_rows`. Sessions come out in order of first appearance.
pub fn normalize_results(rows: &[RawGameResult]) -> NormalizedBatch {
    let mut sessions: Vec<SessionAccumulator> = Vec::new();
    let mut session_index: HashMap<&str, usize> = HashMap::new();
    let mut rejected_rows = 0;

    for row in rows {
        if let Err(err) = row.validate() {
            warn!(
                session_id = %row.session_id,
                member_id = %row.member_id,
                error = %err,
                "Rejecting malformed game row"
            );
            rejected_rows += 1;
            continue;
        }

        let index = match session_index.get(row.session_id.as_str()) {
            Some(index) => *index,
            None => {
                sessions.push(SessionAccumulator::new(row));
                session_index.insert(row.session_id.as_str(), sessions.len() - 1);
                sessions.len() - 1
            }
        };
        sessions[index].record(row);
    }

    let sessions: Vec<SessionRecord> = sessions
        .into_iter()
        .map(SessionAccumulator::finish)
        .filter(|session| !session.participants.is_empty())
        .collect();

    debug!(
        rows = rows.len(),
        sessions = sessions.len(),
        rejected_rows, "Normalized game rows"
    );

    NormalizedBatch {
        sessions,
        rejected_rows,
    }
}
