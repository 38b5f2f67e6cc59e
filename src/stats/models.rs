use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

/// A single recorded game as supplied by the result store.
///
/// Rows are immutable facts; everything else in this module is derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGameResult {
    pub session_id: String,
    pub member_id: String,
    pub member_name: String,
    pub game_number: u8,
    pub score: u16,
    pub session_date: NaiveDate,
    #[serde(default)]
    pub lane_number: Option<u32>,
    #[serde(default)]
    pub session_name: Option<String>,
    #[serde(default)]
    pub strikes: Option<u8>,
    #[serde(default)]
    pub spares: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberRef {
    pub id: String,
    pub name: String,
}

impl MemberRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// One member's games within one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMemberSession {
    pub member: MemberRef,
    /// Slot `n` holds game `n + 1`; unplayed games stay `None`.
    pub games: [Option<u16>; 3],
    pub average: f64,
    pub strikes: u32,
    pub spares: u32,
    /// 1-based, session scoped.
    pub rank: usize,
}

impl NormalizedMemberSession {
    /// Recorded scores only, in game order.
    pub fn scores(&self) -> Vec<u16> {
        self.games.iter().flatten().copied().collect()
    }

    pub fn games_played(&self) -> usize {
        self.games.iter().flatten().count()
    }

    pub fn game(&self, game_number: u8) -> Option<u16> {
        match game_number {
            1..=3 => self.games[(game_number - 1) as usize],
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub date: NaiveDate,
    pub lane_number: Option<u32>,
    pub session_name: Option<String>,
    /// Ordered by rank.
    pub participants: Vec<NormalizedMemberSession>,
}

impl SessionRecord {
    pub fn participant(&self, member_id: &str) -> Option<&NormalizedMemberSession> {
        self.participants.iter().find(|p| p.member.id == member_id)
    }
}

/// Output of the single normalization entry point.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedBatch {
    pub sessions: Vec<SessionRecord>,
    pub rejected_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub direction: TrendDirection,
    pub percentage: f64,
    pub earlier_average: f64,
    pub later_average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingStats {
    pub recent_average: f64,
    pub games_counted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberTrend {
    pub member: MemberRef,
    pub rank: usize,
    pub total_games: usize,
    #[serde(flatten)]
    pub rolling: RollingStats,
}

/// Inferred team identity: the set of member ids, kept sorted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamKey(Vec<String>);

impl TeamKey {
    pub fn new<I, S>(member_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ids: Vec<String> = member_ids.into_iter().map(Into::into).collect();
        ids.sort();
        ids.dedup();
        Self(ids)
    }

    pub fn member_ids(&self) -> &[String] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamDayStat {
    pub key: TeamKey,
    /// Display only; two teams may share a name.
    pub team_name: String,
    pub lane_number: Option<u32>,
    pub members: Vec<MemberRef>,
    pub team_average: f64,
    pub total_games: usize,
    pub appearances: usize,
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayChampion {
    pub member: MemberRef,
    pub average: f64,
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateGroup {
    pub date: NaiveDate,
    pub sessions: Vec<SessionRecord>,
    pub date_average: f64,
    pub total_participants: usize,
    pub champion: Option<DayChampion>,
    pub team_stats: Vec<TeamDayStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighestSingleGame {
    pub score: u16,
    pub member: MemberRef,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighestAverage {
    pub average: f64,
    pub member: MemberRef,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfectStreak {
    pub member: MemberRef,
    pub sessions: usize,
    pub start_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyChampion {
    /// `YYYY-MM`
    pub month: String,
    pub member: MemberRef,
    pub average: f64,
    pub sessions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    #[serde(rename = "first_200")]
    First200,
    /// Session average at or above the configured threshold. Not a 300 game.
    #[serde(alias = "perfect_game")]
    HighAverageSession,
    AttendanceMilestone,
    ImprovementMilestone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub kind: MilestoneKind,
    pub member: MemberRef,
    pub date: NaiveDate,
    pub value: f64,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    pub highest_single_game: Option<HighestSingleGame>,
    pub highest_average: Option<HighestAverage>,
    pub perfect_streak: Option<PerfectStreak>,
    pub monthly_champions: Vec<MonthlyChampion>,
    pub milestones: Vec<Milestone>,
    pub sessions_scanned: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynergyEntry {
    pub partner_id: String,
    pub partner_name: String,
    pub synergy_score: f64,
    pub games_played: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum InconsistencyTier {
    ChaosAgent,
    WildCard,
    Unpredictable,
    Streaky,
    Steady,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InconsistencyEntry {
    pub member: MemberRef,
    pub total_games: usize,
    pub mean_score: f64,
    pub standard_deviation: f64,
    pub unpredictability_index: f64,
    pub tier: InconsistencyTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum LaneTier {
    Jackpot,
    Lucky,
    Good,
    Ordinary,
    Unlucky,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneBest {
    pub score: u16,
    pub member: MemberRef,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneStat {
    pub lane_number: u32,
    pub average_score: f64,
    pub perfect_game_rate: f64,
    pub total_games: usize,
    pub unique_members: usize,
    pub best: Option<LaneBest>,
    pub luck_index: f64,
    pub tier: LaneTier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComebackEntry {
    pub member: MemberRef,
    pub session_id: String,
    pub date: NaiveDate,
    pub game1: u16,
    pub game3: u16,
    pub improvement: u16,
    pub improvement_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearMissEntry {
    pub member: MemberRef,
    pub score: u16,
    pub game_number: u8,
    pub date: NaiveDate,
    pub gap_to_200: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NearMissReport {
    pub hall_of_fame: Vec<NearMissEntry>,
    pub almost_there: Vec<NearMissEntry>,
    pub so_close: Vec<NearMissEntry>,
}
