use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, Months, NaiveDate};
use tracing::debug;

use super::{
    HighestAverage, HighestSingleGame, MemberRef, Milestone, MilestoneKind, MonthlyChampion,
    PerfectStreak, RecordSet, SessionRecord,
};

pub const FIRST_200_SCORE: u16 = 200;
pub const ATTENDANCE_MARKS: [usize; 4] = [10, 25, 50, 100];
pub const IMPROVEMENT_MARGIN: f64 = 10.0;
const MIN_SESSIONS_FOR_MONTHLY: usize = 2;

/// Bounds and thresholds for the records scan.
///
/// `months` and `max_sessions` cap how much history is scanned. They keep the
/// scan cheap; they are not part of what a record means.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordsConfig {
    pub months: u32,
    pub max_sessions: usize,
    /// How many of the newest sessions can produce milestones.
    pub milestone_sessions: usize,
    pub milestone_limit: usize,
    pub high_average_threshold: f64,
    pub monthly_champion_months: usize,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            months: 6,
            max_sessions: 100,
            milestone_sessions: 10,
            milestone_limit: 10,
            high_average_threshold: 180.0,
            monthly_champion_months: 6,
        }
    }
}

/// Sessions inside the history cap, newest first.
pub fn bounded_history<'a>(
    sessions: &'a [SessionRecord],
    as_of: NaiveDate,
    config: &RecordsConfig,
) -> Vec<&'a SessionRecord> {
    let cutoff = as_of
        .checked_sub_months(Months::new(config.months))
        .unwrap_or(NaiveDate::MIN);

    let mut history: Vec<&SessionRecord> = sessions
        .iter()
        .filter(|s| s.date >= cutoff && s.date <= as_of)
        .collect();
    history.sort_by_key(|s| Reverse(s.date));
    history.truncate(config.max_sessions);
    history
}

/// Sessions attended per member before the earliest session handed to the
/// records scan. Seeds the lifetime attendance count.
pub type PriorAttendance = HashMap<String, usize>;

/// Scans the bounded history for all-time bests, monthly champions, the
/// attendance streak and recent milestones.
pub fn extract_records(
    sessions: &[SessionRecord],
    as_of: NaiveDate,
    config: &RecordsConfig,
) -> RecordSet {
    extract_records_with_attendance(sessions, &PriorAttendance::new(), as_of, config)
}

/// Same as `extract_records`, with attendance milestones counted from
/// `prior` plus every session in `sessions` up to `as_of`, not only the
/// bounded history.
pub fn extract_records_with_attendance(
    sessions: &[SessionRecord],
    prior: &PriorAttendance,
    as_of: NaiveDate,
    config: &RecordsConfig,
) -> RecordSet {
    let history = bounded_history(sessions, as_of, config);
    if history.is_empty() {
        return RecordSet::default();
    }

    let mut highest_single_game: Option<HighestSingleGame> = None;
    let mut highest_average: Option<HighestAverage> = None;
    let mut monthly: BTreeMap<(String, String), MonthlyTally> = BTreeMap::new();

    for session in &history {
        for participant in &session.participants {
            if let Some(best) = participant.scores().into_iter().max() {
                if highest_single_game.as_ref().map_or(true, |r| best > r.score) {
                    highest_single_game = Some(HighestSingleGame {
                        score: best,
                        member: participant.member.clone(),
                        date: session.date,
                    });
                }
            }

            if highest_average
                .as_ref()
                .map_or(true, |r| participant.average > r.average)
            {
                highest_average = Some(HighestAverage {
                    average: participant.average,
                    member: participant.member.clone(),
                    date: session.date,
                });
            }

            let month = format!("{:04}-{:02}", session.date.year(), session.date.month());
            let tally = monthly
                .entry((month, participant.member.id.clone()))
                .or_insert_with(|| MonthlyTally::new(participant.member.clone()));
            tally.sum += participant.average;
            tally.sessions += 1;
        }
    }

    let attendance = lifetime_attendance(sessions, prior, as_of);
    let records = RecordSet {
        highest_single_game,
        highest_average,
        perfect_streak: attendance_streak(&history),
        monthly_champions: monthly_champions(monthly, config.monthly_champion_months),
        milestones: milestones(&history, &attendance, config),
        sessions_scanned: history.len(),
    };

    debug!(
        sessions_scanned = records.sessions_scanned,
        milestones = records.milestones.len(),
        "Extracted records"
    );
    records
}

struct MonthlyTally {
    member: MemberRef,
    sum: f64,
    sessions: usize,
}

impl MonthlyTally {
    fn new(member: MemberRef) -> Self {
        Self {
            member,
            sum: 0.0,
            sessions: 0,
        }
    }
}

/// One champion per month, newest month first. Members need at least two
/// sessions in a month to qualify; ties go to the lower member id.
fn monthly_champions(
    tallies: BTreeMap<(String, String), MonthlyTally>,
    months: usize,
) -> Vec<MonthlyChampion> {
    let mut by_month: BTreeMap<String, MonthlyChampion> = BTreeMap::new();

    for ((month, _), tally) in tallies {
        if tally.sessions < MIN_SESSIONS_FOR_MONTHLY {
            continue;
        }
        let average = tally.sum / tally.sessions as f64;
        let replace = by_month
            .get(&month)
            .map_or(true, |current| average > current.average);
        if replace {
            by_month.insert(
                month.clone(),
                MonthlyChampion {
                    month,
                    member: tally.member,
                    average,
                    sessions: tally.sessions,
                },
            );
        }
    }

    by_month.into_values().rev().take(months).collect()
}

/// Approximate streak: how many of the most recent league dates in a row
/// each member attended, counting back from the latest date.
fn attendance_streak(history: &[&SessionRecord]) -> Option<PerfectStreak> {
    let mut dates: Vec<NaiveDate> = history.iter().map(|s| s.date).collect();
    dates.dedup();

    let mut members: Vec<MemberRef> = Vec::new();
    let mut attended: HashMap<&str, HashSet<NaiveDate>> = HashMap::new();
    for session in history {
        for participant in &session.participants {
            let days = attended.entry(participant.member.id.as_str()).or_default();
            if days.is_empty() {
                members.push(participant.member.clone());
            }
            days.insert(session.date);
        }
    }

    let mut best: Option<PerfectStreak> = None;
    for member in members {
        let days = &attended[member.id.as_str()];
        let run = dates.iter().take_while(|d| days.contains(d)).count();
        if run == 0 || best.as_ref().is_some_and(|b| run <= b.sessions) {
            continue;
        }
        best = Some(PerfectStreak {
            start_date: dates[run - 1],
            sessions: run,
            member,
        });
    }
    best
}

/// Running lifetime session count per `(session id, member id)`.
fn lifetime_attendance<'a>(
    sessions: &'a [SessionRecord],
    prior: &PriorAttendance,
    as_of: NaiveDate,
) -> HashMap<(&'a str, &'a str), usize> {
    let mut chronological: Vec<&SessionRecord> =
        sessions.iter().filter(|s| s.date <= as_of).collect();
    chronological.sort_by_key(|s| s.date);

    let mut running: HashMap<&str, usize> = HashMap::new();
    let mut counts = HashMap::new();
    for session in chronological {
        for participant in &session.participants {
            let member_id = participant.member.id.as_str();
            let count = running
                .entry(member_id)
                .or_insert_with(|| prior.get(member_id).copied().unwrap_or(0));
            *count += 1;
            counts.insert((session.id.as_str(), member_id), *count);
        }
    }
    counts
}

fn milestones(
    history: &[&SessionRecord],
    attendance: &HashMap<(&str, &str), usize>,
    config: &RecordsConfig,
) -> Vec<Milestone> {
    let recent: HashSet<&str> = history
        .iter()
        .take(config.milestone_sessions)
        .map(|s| s.id.as_str())
        .collect();

    let mut chronological: Vec<&SessionRecord> = history.to_vec();
    chronological.sort_by_key(|s| s.date);

    let mut best_average: HashMap<&str, f64> = HashMap::new();
    let mut found: Vec<Milestone> = Vec::new();

    for session in chronological {
        let in_scan = recent.contains(session.id.as_str());
        for participant in &session.participants {
            let member_id = participant.member.id.as_str();
            let sessions_attended = attendance
                .get(&(session.id.as_str(), member_id))
                .copied()
                .unwrap_or_default();
            let previous_best = best_average.get(member_id).copied();
            best_average.insert(
                member_id,
                previous_best.map_or(participant.average, |b| b.max(participant.average)),
            );

            if !in_scan {
                continue;
            }

            let name = &participant.member.name;
            let mut push = |kind: MilestoneKind, value: f64, description: String| {
                found.push(Milestone {
                    kind,
                    member: participant.member.clone(),
                    date: session.date,
                    value,
                    description,
                });
            };

            if let Some(top) = participant.scores().into_iter().max() {
                if top >= FIRST_200_SCORE {
                    push(
                        MilestoneKind::First200,
                        f64::from(top),
                        format!("{name} broke 200 with a {top}"),
                    );
                }
            }

            if participant.average >= config.high_average_threshold {
                push(
                    MilestoneKind::HighAverageSession,
                    participant.average,
                    format!("{name} averaged {:.1} for the session", participant.average),
                );
            }

            if ATTENDANCE_MARKS.contains(&sessions_attended) {
                push(
                    MilestoneKind::AttendanceMilestone,
                    sessions_attended as f64,
                    format!("{name} bowled their {sessions_attended}th session"),
                );
            }

            if let Some(best) = previous_best {
                let gain = participant.average - best;
                if gain >= IMPROVEMENT_MARGIN {
                    push(
                        MilestoneKind::ImprovementMilestone,
                        gain,
                        format!("{name} beat their best session average by {gain:.1} pins"),
                    );
                }
            }
        }
    }

    found.sort_by_key(|m| Reverse(m.date));
    found.truncate(config.milestone_limit);
    found
}
