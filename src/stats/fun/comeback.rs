use super::super::{ComebackEntry, NearMissEntry, NearMissReport, SessionRecord};

pub const HALL_OF_FAME_SCORE: u16 = 200;
pub const ALMOST_THERE_SCORE: u16 = 190;
pub const SO_CLOSE_SCORE: u16 = 180;

/// Member-sessions where game 3 beat game 1, biggest jump first.
///
/// Both game 1 and game 3 must be recorded; game 2 does not matter.
pub fn comebacks(sessions: &[SessionRecord]) -> Vec<ComebackEntry> {
    let mut entries: Vec<ComebackEntry> = sessions
        .iter()
        .flat_map(|session| {
            session.participants.iter().filter_map(move |participant| {
                let game1 = participant.game(1)?;
                let game3 = participant.game(3)?;
                if game3 <= game1 {
                    return None;
                }
                let improvement = game3 - game1;
                let improvement_rate = if game1 > 0 {
                    f64::from(improvement) / f64::from(game1) * 100.0
                } else {
                    0.0
                };
                Some(ComebackEntry {
                    member: participant.member.clone(),
                    session_id: session.id.clone(),
                    date: session.date,
                    game1,
                    game3,
                    improvement,
                    improvement_rate,
                })
            })
        })
        .collect();

    entries.sort_by(|a, b| b.improvement.cmp(&a.improvement));
    entries
}

/// Bands every game of 180 or more relative to 200. Each band is sorted by
/// score, highest first.
pub fn near_misses(sessions: &[SessionRecord]) -> NearMissReport {
    let mut report = NearMissReport::default();

    for session in sessions {
        for participant in &session.participants {
            for (slot, score) in participant.games.iter().enumerate() {
                let Some(score) = *score else {
                    continue;
                };
                if score < SO_CLOSE_SCORE {
                    continue;
                }
                let entry = NearMissEntry {
                    member: participant.member.clone(),
                    score,
                    game_number: slot as u8 + 1,
                    date: session.date,
                    gap_to_200: HALL_OF_FAME_SCORE.saturating_sub(score),
                };
                if score >= HALL_OF_FAME_SCORE {
                    report.hall_of_fame.push(entry);
                } else if score >= ALMOST_THERE_SCORE {
                    report.almost_there.push(entry);
                } else {
                    report.so_close.push(entry);
                }
            }
        }
    }

    for band in [
        &mut report.hall_of_fame,
        &mut report.almost_there,
        &mut report.so_close,
    ] {
        band.sort_by(|a, b| b.score.cmp(&a.score));
    }
    report
}
