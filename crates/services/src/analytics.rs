//! Analytics over stored sessions: score-over-time series and the
//! per-interview-flavour score distribution.
//!
//! Every bucket value is a mean of per-session averages, so a long
//! session never outweighs a short one. All bucketing is done in UTC.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use thiserror::Error;

use rehearse_core::Clock;
use rehearse_core::model::{InterviewMeta, SessionRecord, UserId};
use storage::repository::ResultsStore;

use crate::error::AnalyticsError;

// ─── TIME WINDOWS ──────────────────────────────────────────────────────────────

/// Reporting window for the performance series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    /// Per-submission buckets for the current day.
    Today,
    /// Daily buckets for the last seven days.
    SevenDays,
    /// Daily buckets for the last thirty days.
    ThirtyDays,
    /// Monthly buckets for the current calendar year.
    AllTime,
}

impl TimeWindow {
    /// The wire token for this window, the inverse of [`FromStr`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::SevenDays => "7d",
            Self::ThirtyDays => "30d",
            Self::AllTime => "all",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown time window: {0}")]
pub struct ParseTimeWindowError(String);

impl FromStr for TimeWindow {
    type Err = ParseTimeWindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(Self::Today),
            "7d" => Ok(Self::SevenDays),
            "30d" => Ok(Self::ThirtyDays),
            "all" => Ok(Self::AllTime),
            other => Err(ParseTimeWindowError(other.to_string())),
        }
    }
}

/// One labelled bucket in a chart series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
}

// ─── SERIES REDUCTIONS ─────────────────────────────────────────────────────────

/// Score-over-time series for `records` inside `window`, evaluated at
/// `now`.
///
/// Sessions without any scored question contribute an average of 0.0,
/// visible as a dip rather than a gap. Buckets are chronological and only
/// populated buckets appear, except for [`TimeWindow::AllTime`] over an
/// empty year, which yields a single zero point for the current month.
#[must_use]
pub fn performance_series(
    records: &[SessionRecord],
    window: TimeWindow,
    now: DateTime<Utc>,
) -> Vec<SeriesPoint> {
    match window {
        TimeWindow::Today => today_series(records, now),
        TimeWindow::SevenDays => daily_series(records, now, 7, "%a"),
        TimeWindow::ThirtyDays => daily_series(records, now, 30, "%b %-d"),
        TimeWindow::AllTime => monthly_series(records, now),
    }
}

fn today_series(records: &[SessionRecord], now: DateTime<Utc>) -> Vec<SeriesPoint> {
    let today = now.date_naive();
    let mut buckets: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for record in records {
        if record.created_at().date_naive() == today {
            buckets
                .entry(record.created_at().format("%H:%M").to_string())
                .or_default()
                .push(record.average_score());
        }
    }
    buckets
        .into_iter()
        .map(|(label, values)| SeriesPoint {
            label,
            value: mean(&values),
        })
        .collect()
}

fn daily_series(
    records: &[SessionRecord],
    now: DateTime<Utc>,
    days: i64,
    label: &str,
) -> Vec<SeriesPoint> {
    let today = now.date_naive();
    let start = today - Duration::days(days - 1);
    let mut buckets: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for record in records {
        let date = record.created_at().date_naive();
        if date >= start && date <= today {
            buckets.entry(date).or_default().push(record.average_score());
        }
    }
    buckets
        .into_iter()
        .map(|(date, values)| SeriesPoint {
            label: date.format(label).to_string(),
            value: mean(&values),
        })
        .collect()
}

fn monthly_series(records: &[SessionRecord], now: DateTime<Utc>) -> Vec<SeriesPoint> {
    let year = now.year();
    let mut buckets: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for record in records {
        let created = record.created_at();
        if created.year() == year {
            buckets
                .entry(created.month())
                .or_default()
                .push(record.average_score());
        }
    }
    if buckets.is_empty() {
        return vec![SeriesPoint {
            label: month_label(year, now.month()),
            value: 0.0,
        }];
    }
    buckets
        .into_iter()
        .map(|(month, values)| SeriesPoint {
            label: month_label(year, month),
            value: mean(&values),
        })
        .collect()
}

/// Mean score per interview flavour.
///
/// Sessions are grouped by interview type and role; sessions carrying
/// neither are grouped under `Unspecified`. Groups whose mean is exactly
/// 0.0 carry no signal and are dropped. Labels come out in lexicographic
/// order, so the chart is stable across runs.
#[must_use]
pub fn score_distribution(records: &[SessionRecord]) -> Vec<SeriesPoint> {
    let mut buckets: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for record in records {
        buckets
            .entry(flavour_label(record.meta()))
            .or_default()
            .push(record.average_score());
    }
    buckets
        .into_iter()
        .map(|(label, values)| SeriesPoint {
            label,
            value: mean(&values),
        })
        .filter(|point| point.value != 0.0)
        .collect()
}

fn flavour_label(meta: &InterviewMeta) -> String {
    match (meta.interview_type(), meta.interview_role()) {
        (Some(kind), Some(role)) => format!("{kind} / {role}"),
        (Some(kind), None) => kind.to_string(),
        (None, Some(role)) => role.to_string(),
        (None, None) => "Unspecified".to_string(),
    }
}

fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map_or_else(|| month.to_string(), |date| date.format("%B").to_string())
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

// ─── SERVICE ───────────────────────────────────────────────────────────────────

/// Read side over stored sessions, plus retention housekeeping.
#[derive(Clone)]
pub struct AnalyticsService {
    clock: Clock,
    store: Arc<dyn ResultsStore>,
}

impl AnalyticsService {
    #[must_use]
    pub fn new(clock: Clock, store: Arc<dyn ResultsStore>) -> Self {
        Self { clock, store }
    }

    /// Score-over-time series for one user.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::Storage` when the sessions cannot be
    /// fetched.
    pub async fn performance(
        &self,
        user: &UserId,
        window: TimeWindow,
    ) -> Result<Vec<SeriesPoint>, AnalyticsError> {
        let records = self.records_for(user).await?;
        Ok(performance_series(&records, window, self.clock.now()))
    }

    /// Mean score per interview flavour for one user.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::Storage` when the sessions cannot be
    /// fetched.
    pub async fn distribution(&self, user: &UserId) -> Result<Vec<SeriesPoint>, AnalyticsError> {
        let records = self.records_for(user).await?;
        Ok(score_distribution(&records))
    }

    /// Deletes sessions created more than `days` days ago, across all
    /// users. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::Storage` when the purge fails.
    pub async fn purge_older_than(&self, days: i64) -> Result<u64, AnalyticsError> {
        let cutoff = self.clock.now() - Duration::days(days);
        Ok(self.store.purge_older_than(cutoff).await?)
    }

    async fn records_for(&self, user: &UserId) -> Result<Vec<SessionRecord>, AnalyticsError> {
        let sessions = self.store.sessions_for_user(user).await?;
        Ok(sessions.into_iter().map(|stored| stored.record).collect())
    }
}

// ─── TESTS ─────────────────────────────────────────────────────────────────────
