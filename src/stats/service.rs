use std::sync::Arc;

use chrono::{Months, NaiveDate};
use serde::Serialize;
use tracing::{info, instrument};

use crate::config::StatsConfig;

use super::{
    dates::group_by_date,
    fun::{comebacks, inconsistency_ranking, lucky_lanes, near_misses, synergy_for, LaneSort},
    normalize_results,
    records::{extract_records_with_attendance, PriorAttendance},
    repository::{ResultQuery, ResultStore},
    rolling::member_trends,
    ComebackEntry, DateGroup, InconsistencyEntry, LaneStat, MemberTrend, NearMissReport,
    NormalizedBatch, RecordSet, StatsError, SynergyEntry,
};

/// Panels shown together on the dashboard landing page.
///
/// Each panel is computed from its own fetch, so panels may disagree slightly
/// if results are written in between.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardOverview {
    pub top_members: Vec<MemberTrend>,
    pub records: RecordSet,
    pub lucky_lanes: Vec<LaneStat>,
}

/// Fetches a snapshot from the result store and runs one derivation over it.
pub struct StatsService {
    store: Arc<dyn ResultStore>,
    config: StatsConfig,
}

impl StatsService {
    pub fn builder(store: Arc<dyn ResultStore>) -> StatsServiceBuilder {
        StatsServiceBuilder::new(store)
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    /// Fetches rows once and normalizes them. Any store failure aborts the
    /// whole request.
    #[instrument(skip(self))]
    pub async fn snapshot(&self, query: &ResultQuery) -> Result<NormalizedBatch, StatsError> {
        let rows = self.store.fetch_results(query).await?;
        let batch = normalize_results(&rows);
        info!(
            rows = rows.len(),
            sessions = batch.sessions.len(),
            rejected_rows = batch.rejected_rows,
            "Loaded result snapshot"
        );
        Ok(batch)
    }

    #[instrument(skip(self))]
    pub async fn top_members(&self, limit: usize) -> Result<Vec<MemberTrend>, StatsError> {
        let batch = self.snapshot(&ResultQuery::all()).await?;
        let mut trends = member_trends(&batch.sessions, &self.config.rolling);
        trends.truncate(limit);
        Ok(trends)
    }

    #[instrument(skip(self))]
    pub async fn date_groups(&self) -> Result<Vec<DateGroup>, StatsError> {
        let batch = self.snapshot(&ResultQuery::all()).await?;
        Ok(group_by_date(&batch.sessions))
    }

    /// Records over the configured history cap ending at `as_of`. Attendance
    /// milestones still count every session the member ever bowled.
    #[instrument(skip(self))]
    pub async fn records(&self, as_of: NaiveDate) -> Result<RecordSet, StatsError> {
        let cutoff = as_of.checked_sub_months(Months::new(self.config.records.months));
        let query = cutoff.map(ResultQuery::since).unwrap_or_default();
        let prior = async {
            match cutoff {
                Some(before) => self.store.attendance_before(before).await,
                None => Ok(PriorAttendance::new()),
            }
        };

        let (batch, prior) = futures::try_join!(self.snapshot(&query), prior)?;
        Ok(extract_records_with_attendance(&batch.sessions, &prior, as_of, &self.config.records))
    }

    #[instrument(skip(self))]
    pub async fn synergy(&self, member_id: &str) -> Result<Vec<SynergyEntry>, StatsError> {
        let batch = self.snapshot(&ResultQuery::all()).await?;
        Ok(synergy_for(&batch.sessions, member_id))
    }

    #[instrument(skip(self))]
    pub async fn inconsistency(&self) -> Result<Vec<InconsistencyEntry>, StatsError> {
        let batch = self.snapshot(&ResultQuery::all()).await?;
        Ok(inconsistency_ranking(&batch.sessions))
    }

    #[instrument(skip(self))]
    pub async fn lucky_lanes(&self, sort: LaneSort) -> Result<Vec<LaneStat>, StatsError> {
        let batch = self.snapshot(&ResultQuery::all()).await?;
        Ok(lucky_lanes(&batch.sessions, sort))
    }

    #[instrument(skip(self))]
    pub async fn comebacks(&self) -> Result<Vec<ComebackEntry>, StatsError> {
        let batch = self.snapshot(&ResultQuery::all()).await?;
        let mut entries = comebacks(&batch.sessions);
        entries.truncate(self.config.comeback_limit);
        Ok(entries)
    }

    #[instrument(skip(self))]
    pub async fn near_misses(&self) -> Result<NearMissReport, StatsError> {
        let batch = self.snapshot(&ResultQuery::all()).await?;
        Ok(near_misses(&batch.sessions))
    }

    /// Landing page panels, fetched concurrently.
    #[instrument(skip(self))]
    pub async fn overview(&self, as_of: NaiveDate) -> Result<DashboardOverview, StatsError> {
        let (top_members, records, lucky_lanes) = futures::try_join!(
            self.top_members(self.config.top_members),
            self.records(as_of),
            self.lucky_lanes(LaneSort::default()),
        )?;

        Ok(DashboardOverview {
            top_members,
            records,
            lucky_lanes,
        })
    }
}

pub struct StatsServiceBuilder {
    store: Arc<dyn ResultStore>,
    config: StatsConfig,
}

impl StatsServiceBuilder {
    fn new(store: Arc<dyn ResultStore>) -> Self {
        Self {
            store,
            config: StatsConfig::default(),
        }
    }

    pub fn with_config(mut self, config: StatsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> StatsService {
        StatsService {
            store: self.store,
            config: self.config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{repository::InMemoryResultStore, MilestoneKind, RawGameResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingStore;

    #[async_trait]
    impl ResultStore for FailingStore {
        async fn fetch_results(
            &self,
            _query: &ResultQuery,
        ) -> Result<Vec<RawGameResult>, StatsError> {
            Err(StatsError::Store("connection refused".to_string()))
        }
    }

    #[derive(Default)]
    struct CountingStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ResultStore for CountingStore {
        async fn fetch_results(
            &self,
            _query: &ResultQuery,
        ) -> Result<Vec<RawGameResult>, StatsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    fn row(session: &str, when: NaiveDate, member: &str, game: u8, score: u16) -> RawGameResult {
        RawGameResult {
            session_id: session.to_string(),
            member_id: member.to_string(),
            member_name: member.to_string(),
            game_number: game,
            score,
            session_date: when,
            lane_number: Some(3),
            session_name: None,
            strikes: None,
            spares: None,
        }
    }

    #[tokio::test]
    async fn top_members_respects_limit() {
        let store = Arc::new(InMemoryResultStore::with_results(vec![
            row("a", date(5, 1), "amy", 1, 150),
            row("a", date(5, 1), "bob", 1, 190),
            row("a", date(5, 1), "cat", 1, 170),
        ]));
        let service = StatsService::builder(store).build();

        let top = service.top_members(2).await.unwrap();
        let ids: Vec<&str> = top.iter().map(|t| t.member.id.as_str()).collect();
        assert_eq!(ids, vec!["bob", "cat"]);
    }

    #[tokio::test]
    async fn records_only_fetch_the_capped_history() {
        let store = Arc::new(InMemoryResultStore::with_results(vec![
            row("old", date(1, 1), "amy", 1, 290),
            row("new", date(5, 1), "amy", 1, 150),
        ]));
        let mut config = StatsConfig::default();
        config.records.months = 2;
        let service = StatsService::builder(store).with_config(config).build();

        let records = service.records(date(6, 1)).await.unwrap();
        assert_eq!(records.sessions_scanned, 1);
        assert_eq!(records.highest_single_game.unwrap().score, 150);
    }

    #[tokio::test]
    async fn attendance_milestone_uses_lifetime_session_count() {
        let first = date(1, 1);
        let rows: Vec<RawGameResult> = (0..50)
            .map(|week| {
                let when = first + chrono::Duration::weeks(week);
                row(&format!("w{week}"), when, "amy", 1, 120)
            })
            .collect();
        let service =
            StatsService::builder(Arc::new(InMemoryResultStore::with_results(rows))).build();

        let records = service.records(date(12, 9)).await.unwrap();

        assert_eq!(records.sessions_scanned, 27);
        let attendance: Vec<f64> = records
            .milestones
            .iter()
            .filter(|m| m.kind == MilestoneKind::AttendanceMilestone)
            .map(|m| m.value)
            .collect();
        assert_eq!(attendance, vec![50.0]);
    }

    #[tokio::test]
    async fn store_failure_fails_the_request() {
        let service = StatsService::builder(Arc::new(FailingStore)).build();

        let result = service.date_groups().await;
        assert!(matches!(result, Err(StatsError::Store(_))));

        let overview = service.overview(date(6, 1)).await;
        assert!(matches!(overview, Err(StatsError::Store(_))));
    }

    #[tokio::test]
    async fn overview_fetches_each_panel_independently() {
        let store = Arc::new(CountingStore::default());
        let service = StatsService::builder(store.clone()).build();

        let overview = service.overview(date(6, 1)).await.unwrap();
        assert!(overview.top_members.is_empty());
        assert!(overview.lucky_lanes.is_empty());
        assert_eq!(overview.records, RecordSet::default());
        // Records also counts prior attendance through the store.
        assert_eq!(store.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn comebacks_are_limited_by_config() {
        let rows: Vec<RawGameResult> = (0..15)
            .flat_map(|i| {
                let member = format!("m{i}");
                vec![
                    row("a", date(5, 1), &member, 1, 100),
                    row("a", date(5, 1), &member, 3, 110 + i as u16),
                ]
            })
            .collect();
        let service =
            StatsService::builder(Arc::new(InMemoryResultStore::with_results(rows))).build();

        let entries = service.comebacks().await.unwrap();
        assert_eq!(entries.len(), 10);
        assert_eq!(entries[0].improvement, 24);
    }
}
