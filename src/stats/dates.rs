use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use tracing::debug;

use super::{mean, DateGroup, DayChampion, MemberRef, SessionRecord, TeamDayStat, TeamKey};

pub const MAX_TEAMS_PER_DAY: usize = 5;
const MIN_TEAM_SIZE: usize = 2;
const MAX_TEAM_SIZE: usize = 4;

/// A team inferred from one session: the top performers on that lane.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamCandidate {
    pub key: TeamKey,
    pub members: Vec<MemberRef>,
    pub lane_number: Option<u32>,
    pub average: f64,
    pub games: usize,
}

impl TeamCandidate {
    /// Takes the top `clamp(ceil(n / 2), 2, 4)` participants by rank.
    /// Sessions with fewer than two participants produce no team.
    pub fn from_session(session: &SessionRecord) -> Option<Self> {
        let n = session.participants.len();
        if n < MIN_TEAM_SIZE {
            return None;
        }

        let size = n.div_ceil(2).clamp(MIN_TEAM_SIZE, MAX_TEAM_SIZE).min(n);
        let top = &session.participants[..size];
        let averages: Vec<f64> = top.iter().map(|p| p.average).collect();

        Some(Self {
            key: TeamKey::new(top.iter().map(|p| p.member.id.clone())),
            members: top.iter().map(|p| p.member.clone()).collect(),
            lane_number: session.lane_number,
            average: mean(&averages),
            games: top.iter().map(|p| p.games_played()).sum(),
        })
    }
}

struct TeamAccumulator {
    first: TeamCandidate,
    average_sum: f64,
    appearances: usize,
    games: usize,
}

fn team_name(members: &[MemberRef]) -> String {
    let mut names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
    names.sort_unstable();
    names.join(" & ")
}

/// Merges candidates with the same member set and keeps the best
/// `MAX_TEAMS_PER_DAY`, ranked by team average. Equal averages keep the
/// order in which the team first appeared.
pub fn rank_teams(candidates: Vec<TeamCandidate>) -> Vec<TeamDayStat> {
    let mut accumulators: Vec<TeamAccumulator> = Vec::new();
    let mut index: HashMap<TeamKey, usize> = HashMap::new();

    for candidate in candidates {
        match index.get(&candidate.key) {
            Some(position) => {
                let acc = &mut accumulators[*position];
                acc.average_sum += candidate.average;
                acc.appearances += 1;
                acc.games += candidate.games;
            }
            None => {
                index.insert(candidate.key.clone(), accumulators.len());
                accumulators.push(TeamAccumulator {
                    average_sum: candidate.average,
                    appearances: 1,
                    games: candidate.games,
                    first: candidate,
                });
            }
        }
    }

    let mut teams: Vec<TeamDayStat> = accumulators
        .into_iter()
        .map(|acc| TeamDayStat {
            team_name: team_name(&acc.first.members),
            key: acc.first.key,
            lane_number: acc.first.lane_number,
            members: acc.first.members,
            team_average: acc.average_sum / acc.appearances as f64,
            total_games: acc.games,
            appearances: acc.appearances,
            rank: 0,
        })
        .collect();

    teams.sort_by(|a, b| b.team_average.total_cmp(&a.team_average));
    teams.truncate(MAX_TEAMS_PER_DAY);
    for (position, team) in teams.iter_mut().enumerate() {
        team.rank = position + 1;
    }
    teams
}

fn build_date_group(date: NaiveDate, sessions: Vec<SessionRecord>) -> DateGroup {
    let averages: Vec<f64> = sessions
        .iter()
        .flat_map(|s| s.participants.iter().map(|p| p.average))
        .collect();

    let mut champion: Option<DayChampion> = None;
    for session in &sessions {
        for participant in &session.participants {
            let better = champion
                .as_ref()
                .map_or(true, |current| participant.average > current.average);
            if better {
                champion = Some(DayChampion {
                    member: participant.member.clone(),
                    average: participant.average,
                    session_id: session.id.clone(),
                });
            }
        }
    }

    let total_participants = sessions
        .iter()
        .flat_map(|s| s.participants.iter().map(|p| p.member.id.as_str()))
        .collect::<HashSet<_>>()
        .len();

    let team_stats = rank_teams(
        sessions
            .iter()
            .filter_map(TeamCandidate::from_session)
            .collect(),
    );

    DateGroup {
        date,
        date_average: mean(&averages),
        total_participants,
        champion,
        team_stats,
        sessions,
    }
}

/// Groups sessions by calendar date, newest date first. Sessions within a
/// date keep their input order.
pub fn group_by_date(sessions: &[SessionRecord]) -> Vec<DateGroup> {
    let mut by_date: BTreeMap<NaiveDate, Vec<SessionRecord>> = BTreeMap::new();
    for session in sessions {
        by_date
            .entry(session.date)
            .or_default()
            .push(session.clone());
    }

    let groups: Vec<DateGroup> = by_date
        .into_iter()
        .rev()
        .map(|(date, sessions)| build_date_group(date, sessions))
        .collect();

    debug!(dates = groups.len(), sessions = sessions.len(), "Grouped sessions by date");
    groups
}
