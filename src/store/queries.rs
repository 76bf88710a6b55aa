//! Read-side aggregation over the session store. Totals are computed on every
//! call instead of being maintained incrementally: session volume is low (one
//! record per multi-second focus interval), and recomputing keeps the write
//! path a plain append.
//!
//! Per the crate's degradation policy, the async entry points never surface
//! store read errors. A failing read logs a warning and produces an
//! empty/zero result.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::warn;

use crate::classify::Category;

use super::{record::SessionRecord, session_store::SessionStore};

/// Seconds spent per category. Categories without records are absent, not
/// zero-filled.
pub type CategoryTotals = BTreeMap<Category, i64>;

/// Seconds spent in one category on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub category: Category,
    pub total_secs: i64,
}

/// Recent usage of one application on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub app_name: Arc<str>,
    pub category: Category,
    pub duration_secs: i64,
    pub date: NaiveDate,
}

/// Most history groups a query returns.
pub const HISTORY_LIMIT: usize = 50;
/// How many of the newest records feed the history grouping.
pub const HISTORY_SAMPLE: usize = 100;

/// Today's totals grouped by category.
pub async fn today_totals(store: &impl SessionStore, today: NaiveDate) -> CategoryTotals {
    match store.records_for(today).await {
        Ok(records) => totals_by_category(records),
        Err(e) => {
            warn!("Today's stats query failed, returning empty totals {e:?}");
            CategoryTotals::new()
        }
    }
}

/// Per-day, per-category totals for the `days` most recent days, sorted
/// ascending by date.
pub async fn range_totals(store: &impl SessionStore, today: NaiveDate, days: i64) -> Vec<DailyTotal> {
    let cutoff = today - Duration::days(days);
    match collect_range(store, cutoff).await {
        Ok(records) => totals_by_day(records),
        Err(e) => {
            warn!("Range query failed, returning empty trend {e:?}");
            vec![]
        }
    }
}

/// Recent sessions grouped by application and day, newest days first.
pub async fn recent_history(
    store: &impl SessionStore,
    limit: usize,
    sample_size: usize,
) -> Vec<HistoryEntry> {
    match collect_newest(store, sample_size).await {
        Ok(records) => group_history(records, limit, sample_size),
        Err(e) => {
            warn!("History query failed, returning empty history {e:?}");
            vec![]
        }
    }
}

/// Cumulative seconds spent in learning and productive sessions across all
/// time. Distraction never counts towards career progress.
pub async fn career_xp(store: &impl SessionStore) -> i64 {
    match collect_all(store).await {
        Ok(records) => career_xp_of(&records),
        Err(e) => {
            warn!("Career XP query failed, returning zero {e:?}");
            0
        }
    }
}

async fn collect_range(
    store: &impl SessionStore,
    cutoff: NaiveDate,
) -> anyhow::Result<Vec<SessionRecord>> {
    let mut records = vec![];
    for date in store.dates().await? {
        if date >= cutoff {
            records.extend(store.records_for(date).await?);
        }
    }
    Ok(records)
}

async fn collect_all(store: &impl SessionStore) -> anyhow::Result<Vec<SessionRecord>> {
    let mut records = vec![];
    for date in store.dates().await? {
        records.extend(store.records_for(date).await?);
    }
    Ok(records)
}

/// Reads whole days newest-first until the sample is covered. Days are read
/// entirely, so the caller still has to cut the result down by timestamp.
async fn collect_newest(
    store: &impl SessionStore,
    sample_size: usize,
) -> anyhow::Result<Vec<SessionRecord>> {
    let mut records = vec![];
    for date in store.dates().await?.into_iter().rev() {
        if records.len() >= sample_size {
            break;
        }
        records.extend(store.records_for(date).await?);
    }
    Ok(records)
}

fn totals_by_category(records: impl IntoIterator<Item = SessionRecord>) -> CategoryTotals {
    let mut totals = CategoryTotals::new();
    for record in records {
        *totals.entry(record.category).or_insert(0) += record.duration_secs;
    }
    totals
}

fn totals_by_day(records: impl IntoIterator<Item = SessionRecord>) -> Vec<DailyTotal> {
    let mut totals = BTreeMap::<(NaiveDate, Category), i64>::new();
    for record in records {
        *totals.entry((record.date, record.category)).or_insert(0) += record.duration_secs;
    }
    totals
        .into_iter()
        .map(|((date, category), total_secs)| DailyTotal {
            date,
            category,
            total_secs,
        })
        .collect()
}

fn group_history(
    mut records: Vec<SessionRecord>,
    limit: usize,
    sample_size: usize,
) -> Vec<HistoryEntry> {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    records.truncate(sample_size);

    // Groups keep first-seen order so the newest activity of an app leads its
    // group; the category of that first record labels the whole group.
    let mut groups: Vec<HistoryEntry> = vec![];
    let mut index_of: HashMap<(Arc<str>, NaiveDate), usize> = HashMap::new();
    for record in records {
        match index_of.get(&(record.app_name.clone(), record.date)) {
            Some(&i) => groups[i].duration_secs += record.duration_secs,
            None => {
                index_of.insert((record.app_name.clone(), record.date), groups.len());
                groups.push(HistoryEntry {
                    app_name: record.app_name,
                    category: record.category,
                    duration_secs: record.duration_secs,
                    date: record.date,
                });
            }
        }
    }

    groups.sort_by(|a, b| b.date.cmp(&a.date));
    groups.truncate(limit);
    groups
}

fn career_xp_of(records: &[SessionRecord]) -> i64 {
    records
        .iter()
        .filter(|r| r.category != Category::Distraction)
        .map(|r| r.duration_secs)
        .sum()
}
