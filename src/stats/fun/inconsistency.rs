use std::collections::HashMap;

use strum::IntoEnumIterator;

use super::super::{mean, InconsistencyEntry, InconsistencyTier, MemberRef, SessionRecord};

pub const MIN_GAMES: usize = 5;

impl InconsistencyTier {
    /// Lowest standard deviation that still lands in this tier.
    pub fn floor(self) -> f64 {
        match self {
            InconsistencyTier::ChaosAgent => 35.0,
            InconsistencyTier::WildCard => 30.0,
            InconsistencyTier::Unpredictable => 25.0,
            InconsistencyTier::Streaky => 20.0,
            InconsistencyTier::Steady => f64::NEG_INFINITY,
        }
    }

    /// Labels only; a tier never filters a member out.
    pub fn for_deviation(standard_deviation: f64) -> Self {
        InconsistencyTier::iter()
            .find(|tier| standard_deviation >= tier.floor())
            .unwrap_or(InconsistencyTier::Steady)
    }
}

/// Population standard deviation; zero for an empty slice.
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Members ranked by the spread of their individual game scores, widest first.
/// Only members with at least `MIN_GAMES` recorded games are ranked.
pub fn inconsistency_ranking(sessions: &[SessionRecord]) -> Vec<InconsistencyEntry> {
    let mut members: Vec<(MemberRef, Vec<f64>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for session in sessions {
        for participant in &session.participants {
            let position = *index
                .entry(participant.member.id.as_str())
                .or_insert_with(|| {
                    members.push((participant.member.clone(), Vec::new()));
                    members.len() - 1
                });
            members[position]
                .1
                .extend(participant.scores().into_iter().map(f64::from));
        }
    }

    let mut entries: Vec<InconsistencyEntry> = members
        .into_iter()
        .filter(|(_, scores)| scores.len() >= MIN_GAMES)
        .map(|(member, scores)| {
            let mean_score = mean(&scores);
            let standard_deviation = population_std_dev(&scores);
            let unpredictability_index = if mean_score > 0.0 {
                standard_deviation / mean_score * 100.0
            } else {
                0.0
            };
            InconsistencyEntry {
                member,
                total_games: scores.len(),
                mean_score,
                standard_deviation,
                unpredictability_index,
                tier: InconsistencyTier::for_deviation(standard_deviation),
            }
        })
        .collect();

    entries.sort_by(|a, b| b.standard_deviation.total_cmp(&a.standard_deviation));
    entries
}
