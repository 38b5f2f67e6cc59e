use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::{records::PriorAttendance, RawGameResult, StatsError};

/// Filter pushed down to the store so it does not ship unneeded rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultQuery {
    pub since: Option<NaiveDate>,
}

impl ResultQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn since(date: NaiveDate) -> Self {
        Self { since: Some(date) }
    }

    pub fn matches(&self, row: &RawGameResult) -> bool {
        self.since.map_or(true, |since| row.session_date >= since)
    }
}

/// Read side of the raw result store. A failed fetch fails the whole request.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn fetch_results(&self, query: &ResultQuery) -> Result<Vec<RawGameResult>, StatsError>;

    /// Distinct sessions each member bowled strictly before `before`.
    async fn attendance_before(&self, before: NaiveDate) -> Result<PriorAttendance, StatsError> {
        let rows = self.fetch_results(&ResultQuery::all()).await?;
        Ok(count_attendance(&rows, before))
    }
}

/// Counts valid `(member, session)` pairs dated before `before`.
pub fn count_attendance(rows: &[RawGameResult], before: NaiveDate) -> PriorAttendance {
    let attended: HashSet<(&str, &str)> = rows
        .iter()
        .filter(|row| row.session_date < before && row.validate().is_ok())
        .map(|row| (row.member_id.as_str(), row.session_id.as_str()))
        .collect();

    let mut counts = PriorAttendance::new();
    for (member_id, _) in attended {
        *counts.entry(member_id.to_string()).or_default() += 1;
    }
    counts
}

/// In-memory store for development and tests.
#[derive(Debug, Default)]
pub struct InMemoryResultStore {
    rows: RwLock<Vec<RawGameResult>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(rows: Vec<RawGameResult>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    #[instrument(skip(self))]
    async fn fetch_results(&self, query: &ResultQuery) -> Result<Vec<RawGameResult>, StatsError> {
        let rows = self.rows.read().await;
        let matching: Vec<RawGameResult> =
            rows.iter().filter(|row| query.matches(row)).cloned().collect();
        debug!(rows = matching.len(), "Fetched game results from memory");
        Ok(matching)
    }

    #[instrument(skip(self))]
    async fn attendance_before(&self, before: NaiveDate) -> Result<PriorAttendance, StatsError> {
        Ok(count_attendance(&self.rows.read().await, before))
    }
}

/// Row shape of the `game_results` relation.
#[derive(Debug, FromRow)]
struct GameResultRow {
    session_id: String,
    member_id: String,
    member_name: String,
    game_number: i32,
    score: i32,
    session_date: NaiveDate,
    lane_number: Option<i32>,
    session_name: Option<String>,
    strikes: Option<i32>,
    spares: Option<i32>,
}

impl TryFrom<GameResultRow> for RawGameResult {
    type Error = StatsError;

    fn try_from(row: GameResultRow) -> Result<Self, Self::Error> {
        let out_of_range = |column: &str, value: i32| {
            StatsError::Validation(format!("{column} out of range: {value}"))
        };

        Ok(RawGameResult {
            game_number: u8::try_from(row.game_number)
                .map_err(|_| out_of_range("game_number", row.game_number))?,
            score: u16::try_from(row.score).map_err(|_| out_of_range("score", row.score))?,
            lane_number: row
                .lane_number
                .map(|lane| u32::try_from(lane).map_err(|_| out_of_range("lane_number", lane)))
                .transpose()?,
            strikes: row
                .strikes
                .map(|n| u8::try_from(n).map_err(|_| out_of_range("strikes", n)))
                .transpose()?,
            spares: row
                .spares
                .map(|n| u8::try_from(n).map_err(|_| out_of_range("spares", n)))
                .transpose()?,
            session_id: row.session_id,
            member_id: row.member_id,
            member_name: row.member_name,
            session_date: row.session_date,
            session_name: row.session_name,
        })
    }
}

/// PostgreSQL implementation of the result store
pub struct PostgresResultStore {
    pool: PgPool,
}

impl PostgresResultStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultStore for PostgresResultStore {
    #[instrument(skip(self))]
    async fn fetch_results(&self, query: &ResultQuery) -> Result<Vec<RawGameResult>, StatsError> {
        debug!("Fetching game results from database");

        let rows = sqlx::query_as::<_, GameResultRow>(
            r#"
            SELECT session_id, member_id, member_name, game_number, score,
                   session_date, lane_number, session_name, strikes, spares
            FROM game_results
            WHERE ($1::date IS NULL OR session_date >= $1)
            ORDER BY session_date DESC, session_id, game_number
            "#,
        )
        .bind(query.since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to fetch game results from database");
            StatsError::Store(e.to_string())
        })?;

        let fetched = rows.len();
        let results: Vec<RawGameResult> = rows
            .into_iter()
            .filter_map(|row| {
                let session_id = row.session_id.clone();
                RawGameResult::try_from(row)
                    .map_err(|err| {
                        warn!(
                            session_id = %session_id,
                            error = %err,
                            "Dropping unreadable game row"
                        );
                    })
                    .ok()
            })
            .collect();

        debug!(fetched, kept = results.len(), "Game results fetched from database");
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn attendance_before(&self, before: NaiveDate) -> Result<PriorAttendance, StatsError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT member_id, COUNT(DISTINCT session_id)
            FROM game_results
            WHERE session_date < $1
              AND game_number BETWEEN 1 AND 3
              AND score BETWEEN 0 AND 300
              AND btrim(member_id) <> ''
              AND btrim(session_id) <> ''
            GROUP BY member_id
            "#,
        )
        .bind(before)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to count prior attendance");
            StatsError::Store(e.to_string())
        })?;

        debug!(members = rows.len(), "Prior attendance counted in database");
        Ok(rows
            .into_iter()
            .map(|(member_id, sessions)| (member_id, usize::try_from(sessions).unwrap_or(0)))
            .collect())
    }
}
