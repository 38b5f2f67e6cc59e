use std::cmp::Reverse;
use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::debug;

use super::{mean, MemberRef, MemberTrend, RollingStats, SessionRecord, Trend, TrendDirection};

pub const DEFAULT_WINDOW_SIZE: usize = 20;
pub const DEFAULT_TREND_THRESHOLD_PCT: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingWindow {
    pub size: usize,
    /// A trend is `up`/`down` only when its percentage is strictly beyond this.
    pub threshold_pct: f64,
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self {
            size: DEFAULT_WINDOW_SIZE,
            threshold_pct: DEFAULT_TREND_THRESHOLD_PCT,
        }
    }
}

impl RollingWindow {
    /// Average of the first `size` scores plus the half-vs-half trend.
    ///
    /// `scores` must already be in history order (newest session first, then
    /// game number). The trend compares the first half of the window against
    /// the second half by position; with an odd count the extra score goes to
    /// the second half.
    pub fn compute(&self, scores: &[u16]) -> RollingStats {
        let take = self.size.max(1).min(scores.len());
        let window: Vec<f64> = scores[..take].iter().map(|s| f64::from(*s)).collect();

        RollingStats {
            recent_average: mean(&window),
            games_counted: window.len(),
            trend: self.trend(&window),
        }
    }

    fn trend(&self, window: &[f64]) -> Option<Trend> {
        if window.len() < 2 {
            return None;
        }

        let (earlier, later) = window.split_at(window.len() / 2);
        let earlier_average = mean(earlier);
        let later_average = mean(later);
        let percentage = if earlier_average > 0.0 {
            (later_average - earlier_average) / earlier_average * 100.0
        } else {
            0.0
        };

        let direction = if percentage > self.threshold_pct {
            TrendDirection::Up
        } else if percentage < -self.threshold_pct {
            TrendDirection::Down
        } else {
            TrendDirection::Stable
        };

        Some(Trend {
            direction,
            percentage,
            earlier_average,
            later_average,
        })
    }
}

/// A member's scores flattened across sessions: newest date first, then
/// input session order, then game number.
pub fn member_history(sessions: &[SessionRecord], member_id: &str) -> Vec<u16> {
    let mut entries: Vec<(NaiveDate, u16)> = Vec::new();
    for session in sessions {
        if let Some(participant) = session.participant(member_id) {
            entries.extend(participant.scores().into_iter().map(|s| (session.date, s)));
        }
    }
    entries.sort_by_key(|(date, _)| Reverse(*date));
    entries.into_iter().map(|(_, score)| score).collect()
}

/// Rolling stats for every member, best recent average first.
pub fn member_trends(sessions: &[SessionRecord], window: &RollingWindow) -> Vec<MemberTrend> {
    let mut members: Vec<MemberRef> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for session in sessions {
        for participant in &session.participants {
            if seen.insert(participant.member.id.as_str()) {
                members.push(participant.member.clone());
            }
        }
    }

    let mut trends: Vec<MemberTrend> = members
        .into_iter()
        .map(|member| {
            let history = member_history(sessions, &member.id);
            MemberTrend {
                total_games: history.len(),
                rolling: window.compute(&history),
                member,
                rank: 0,
            }
        })
        .filter(|trend| trend.total_games > 0)
        .collect();

    trends.sort_by(|a, b| {
        b.rolling
            .recent_average
            .total_cmp(&a.rolling.recent_average)
            .then_with(|| a.member.name.cmp(&b.member.name))
    });
    for (index, trend) in trends.iter_mut().enumerate() {
        trend.rank = index + 1;
    }

    debug!(members = trends.len(), window = window.size, "Computed member trends");
    trends
}
