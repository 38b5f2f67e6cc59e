use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use super::super::{mean, LaneBest, LaneStat, LaneTier, SessionRecord, StatsError};

pub const HIGH_GAME_SCORE: u16 = 200;
pub const HIGH_GAME_WEIGHT: f64 = 2.0;

impl LaneTier {
    pub fn floor(self) -> f64 {
        match self {
            LaneTier::Jackpot => 160.0,
            LaneTier::Lucky => 150.0,
            LaneTier::Good => 140.0,
            LaneTier::Ordinary => 130.0,
            LaneTier::Unlucky => f64::NEG_INFINITY,
        }
    }

    pub fn for_luck_index(luck_index: f64) -> Self {
        LaneTier::iter()
            .find(|tier| luck_index >= tier.floor())
            .unwrap_or(LaneTier::Unlucky)
    }
}

/// `averageScore + perfectGameRate * 2`
pub fn luck_index(average_score: f64, perfect_game_rate: f64) -> f64 {
    average_score + perfect_game_rate * HIGH_GAME_WEIGHT
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneSort {
    #[default]
    LuckIndex,
    Average,
    PerfectRate,
    TotalGames,
}

impl FromStr for LaneSort {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "luck" | "luck_index" => Ok(LaneSort::LuckIndex),
            "average" => Ok(LaneSort::Average),
            "perfect" | "perfect_rate" => Ok(LaneSort::PerfectRate),
            "games" | "total_games" => Ok(LaneSort::TotalGames),
            other => Err(StatsError::Validation(format!(
                "unknown lane sort '{other}'"
            ))),
        }
    }
}

/// Re-orders lanes, highest first; ties fall back to lane number.
pub fn sort_lanes(lanes: &mut [LaneStat], sort: LaneSort) {
    lanes.sort_by(|a, b| {
        let primary = match sort {
            LaneSort::LuckIndex => b.luck_index.total_cmp(&a.luck_index),
            LaneSort::Average => b.average_score.total_cmp(&a.average_score),
            LaneSort::PerfectRate => b.perfect_game_rate.total_cmp(&a.perfect_game_rate),
            LaneSort::TotalGames => b.total_games.cmp(&a.total_games),
        };
        primary.then_with(|| a.lane_number.cmp(&b.lane_number))
    });
}

#[derive(Default)]
struct LaneTally<'a> {
    scores: Vec<f64>,
    high_games: usize,
    members: HashSet<&'a str>,
    best: Option<LaneBest>,
}

/// Per-lane scoring luck. Sessions without a lane number are skipped.
pub fn lucky_lanes(sessions: &[SessionRecord], sort: LaneSort) -> Vec<LaneStat> {
    let mut tallies: BTreeMap<u32, LaneTally> = BTreeMap::new();

    for session in sessions {
        let Some(lane) = session.lane_number else {
            continue;
        };
        let tally = tallies.entry(lane).or_default();
        for participant in &session.participants {
            tally.members.insert(participant.member.id.as_str());
            for score in participant.scores() {
                tally.scores.push(f64::from(score));
                if score >= HIGH_GAME_SCORE {
                    tally.high_games += 1;
                }
                if tally.best.as_ref().map_or(true, |b| score > b.score) {
                    tally.best = Some(LaneBest {
                        score,
                        member: participant.member.clone(),
                        date: session.date,
                    });
                }
            }
        }
    }

    let mut lanes: Vec<LaneStat> = tallies
        .into_iter()
        .filter(|(_, tally)| !tally.scores.is_empty())
        .map(|(lane_number, tally)| {
            let average_score = mean(&tally.scores);
            let perfect_game_rate = tally.high_games as f64 / tally.scores.len() as f64 * 100.0;
            let luck = luck_index(average_score, perfect_game_rate);
            LaneStat {
                lane_number,
                average_score,
                perfect_game_rate,
                total_games: tally.scores.len(),
                unique_members: tally.members.len(),
                best: tally.best,
                luck_index: luck,
                tier: LaneTier::for_luck_index(luck),
            }
        })
        .collect();

    sort_lanes(&mut lanes, sort);
    lanes
}
