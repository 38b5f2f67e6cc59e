use std::collections::HashMap;

use super::super::{mean, MemberRef, SessionRecord, SynergyEntry};

pub const MIN_SHARED_SESSIONS: usize = 2;
pub const MAX_PARTNERS: usize = 5;

/// How `member_id` performs alongside each partner.
///
/// A partner's synergy score is the mean of `member_id`'s session averages
/// over the sessions they both bowled in. Partners with fewer than
/// `MIN_SHARED_SESSIONS` shared sessions are left out. Best five first.
pub fn synergy_for(sessions: &[SessionRecord], member_id: &str) -> Vec<SynergyEntry> {
    let mut partners: Vec<(MemberRef, Vec<f64>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for session in sessions {
        let Some(me) = session.participant(member_id) else {
            continue;
        };
        for other in &session.participants {
            if other.member.id == member_id {
                continue;
            }
            let position = *index.entry(other.member.id.as_str()).or_insert_with(|| {
                partners.push((other.member.clone(), Vec::new()));
                partners.len() - 1
            });
            partners[position].1.push(me.average);
        }
    }

    let mut entries: Vec<SynergyEntry> = partners
        .into_iter()
        .filter(|(_, shared)| shared.len() >= MIN_SHARED_SESSIONS)
        .map(|(partner, shared)| SynergyEntry {
            partner_id: partner.id,
            partner_name: partner.name,
            synergy_score: mean(&shared),
            games_played: shared.len(),
        })
        .collect();

    entries.sort_by(|a, b| b.synergy_score.total_cmp(&a.synergy_score));
    entries.truncate(MAX_PARTNERS);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{normalize_results, RawGameResult};
    use chrono::NaiveDate;

    fn row(session: &str, member: &str, score: u16) -> RawGameResult {
        RawGameResult {
            session_id: session.to_string(),
            member_id: member.to_string(),
            member_name: member.to_string(),
            game_number: 1,
            score,
            session_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            lane_number: None,
            session_name: None,
            strikes: None,
            spares: None,
        }
    }

    #[test]
    fn averages_only_shared_sessions() {
        let rows = vec![
            row("a", "x", 200),
            row("a", "y", 100),
            row("b", "x", 160),
            row("b", "y", 100),
            row("c", "x", 100),
        ];
        let sessions = normalize_results(&rows).sessions;

        let entries = synergy_for(&sessions, "x");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].partner_id, "y");
        assert_eq!(entries[0].synergy_score, 180.0);
        assert_eq!(entries[0].games_played, 2);
    }

    #[test]
    fn excludes_partners_with_one_shared_session() {
        let rows = vec![
            row("a", "x", 200),
            row("a", "y", 100),
            row("a", "z", 100),
            row("b", "x", 160),
            row("b", "y", 100),
        ];
        let sessions = normalize_results(&rows).sessions;

        let partners: Vec<String> = synergy_for(&sessions, "x")
            .into_iter()
            .map(|e| e.partner_id)
            .collect();
        assert_eq!(partners, vec!["y".to_string()]);
    }

    #[test]
    fn keeps_best_five_partners() {
        let mut rows = Vec::new();
        for session in ["a", "b"] {
            rows.push(row(session, "x", 150));
            for partner in 0..7 {
                rows.push(row(session, &format!("p{partner}"), 100));
            }
        }
        // A third session lifts x's score alongside p6 only.
        rows.push(row("c", "x", 300));
        rows.push(row("c", "p6", 100));
        let sessions = normalize_results(&rows).sessions;

        let entries = synergy_for(&sessions, "x");
        assert_eq!(entries.len(), MAX_PARTNERS);
        assert_eq!(entries[0].partner_id, "p6");
        assert_eq!(entries[0].synergy_score, 200.0);
    }

    #[test]
    fn unknown_member_has_no_partners() {
        let sessions = normalize_results(&[row("a", "x", 100)]).sessions;
        assert!(synergy_for(&sessions, "nobody").is_empty());
    }
}
