//! Freshness window filtering.
//!
//! The search tool's freshness filter is advisory, so each pass re-checks
//! publication times against the calendar period the caller asked for
//! (today, this ISO week, this month) in a fixed UTC offset. Undated
//! articles are kept. If the calendar window would drop every dated and
//! undated article, a rolling window (1, 7 or 30 days back) is applied
//! instead so an early-morning run is not left empty.

use crate::models::{Article, Freshness};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use tracing::debug;

/// Inclusive UTC bounds of a calendar window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl FreshnessWindow {
    /// Calendar period containing `now`, computed in `offset`.
    pub fn calendar(freshness: Freshness, now: DateTime<Utc>, offset: FixedOffset) -> Self {
        let local = now.with_timezone(&offset).date_naive();
        let (first, next) = match freshness {
            Freshness::Day => (local, local + Duration::days(1)),
            Freshness::Week => {
                let monday = local - Duration::days(local.weekday().num_days_from_monday() as i64);
                (monday, monday + Duration::days(7))
            }
            Freshness::Month => {
                let first = local.with_day(1).unwrap_or(local);
                let next = if first.month() == 12 {
                    NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
                }
                .unwrap_or(first + Duration::days(31));
                (first, next)
            }
        };

        Self {
            start: local_midnight(first, offset),
            end: local_midnight(next, offset) - Duration::seconds(1),
        }
    }

    /// Trailing window ending at `now`.
    pub fn rolling(freshness: Freshness, now: DateTime<Utc>) -> Self {
        let days = match freshness {
            Freshness::Day => 1,
            Freshness::Week => 7,
            Freshness::Month => 30,
        };
        Self {
            start: now - Duration::days(days),
            end: now,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

fn local_midnight(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let naive = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

/// Keep articles published inside the freshness window.
pub fn filter_fresh(
    articles: Vec<Article>,
    freshness: Freshness,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Vec<Article> {
    let calendar = FreshnessWindow::calendar(freshness, now, offset);
    let total = articles.len();

    let in_calendar = |a: &Article| a.published_at.is_none_or(|at| calendar.contains(at));
    if articles.iter().any(in_calendar) || articles.is_empty() {
        let kept: Vec<Article> = articles.into_iter().filter(|a| in_calendar(a)).collect();
        debug!(total, kept = kept.len(), %freshness, "Applied calendar freshness window");
        return kept;
    }

    let rolling = FreshnessWindow::rolling(freshness, now);
    let kept: Vec<Article> = articles
        .into_iter()
        .filter(|a| a.published_at.is_none_or(|at| rolling.contains(at)))
        .collect();
    debug!(total, kept = kept.len(), %freshness, "Calendar window empty; applied rolling window");
    kept
}
